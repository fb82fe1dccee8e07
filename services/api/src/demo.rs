use crate::infra::{load_catalog, InMemoryReviewRepository};
use chrono::Utc;
use clap::Args;
use kyp_review::config::{AppConfig, CatalogConfig};
use kyp_review::error::AppError;
use kyp_review::workflows::catalog::{CatalogStatusBoard, ProductCatalog};
use kyp_review::workflows::kyp::{
    DecisionStatus, KypReviewService, PeerTier, ProductCode, ProviderSelection,
    ReviewEventQueue, ReviewSession, ReviewStage,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Optional catalog CSV export. Defaults to KYP_CATALOG_CSV or the bundled sample catalog.
    #[arg(long)]
    pub(crate) catalog_csv: Option<PathBuf>,
    /// Product code to review.
    #[arg(long, default_value = "TDB909")]
    pub(crate) reference: String,
    /// Providers to compare against in manual mode (comma separated).
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [String::from("RBC"), String::from("BMO")]
    )]
    pub(crate) providers: Vec<String>,
    /// Let the engine pick the best and worst peers instead of using --providers.
    #[arg(long)]
    pub(crate) auto: bool,
    /// Number of top-ranked peers in auto mode.
    #[arg(long, default_value_t = 3)]
    pub(crate) better: usize,
    /// Number of bottom-ranked peers in auto mode.
    #[arg(long, default_value_t = 3)]
    pub(crate) worse: usize,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Optional catalog CSV export. Defaults to KYP_CATALOG_CSV or the bundled sample catalog.
    #[arg(long)]
    pub(crate) catalog_csv: Option<PathBuf>,
    /// Only list products whose code, name, or provider matches.
    #[arg(long)]
    pub(crate) query: Option<String>,
}

/// Environment configuration with the CLI's catalog path taking precedence.
fn load_config(catalog_csv: Option<PathBuf>) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if catalog_csv.is_some() {
        config.catalog = CatalogConfig {
            csv_path: catalog_csv,
        };
    }
    Ok(config)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        catalog_csv,
        reference,
        providers,
        auto,
        better,
        worse,
    } = args;

    let config = load_config(catalog_csv)?;
    let catalog = Arc::new(load_catalog(&config.catalog)?);
    let events = Arc::new(ReviewEventQueue::new());
    let service = KypReviewService::new(
        catalog.clone(),
        Arc::new(InMemoryReviewRepository::default()),
        events.clone(),
        config.grading,
    )?;

    let selection = if auto {
        ProviderSelection::auto(better, worse)
    } else {
        ProviderSelection::manual(providers)
    };

    println!("KYP review demo");
    let session = service.start_review(&ProductCode::new(reference), Some(selection))?;
    let id = session.id().clone();
    let product = session.reference();
    println!(
        "Reference: {} {} ({}) | risk {} | {}",
        product.code,
        product.name,
        provider_label(&catalog, &session),
        product.risk.label(),
        product.classification
    );

    let mut session = service.advance(&id)?;
    if session.stage() == ReviewStage::ProductSelection {
        println!("\nProduct selection ({} in pool)", session.pool().len());
        for candidate in session.pool() {
            println!(
                "  - {} {} [{}]",
                candidate.product.code, candidate.product.name, candidate.product.provider
            );
        }
        if session.pool().is_empty() {
            println!("No candidates found for the selected providers; cancelling review.");
            service.cancel(&id)?;
            return Ok(());
        }

        let codes: Vec<ProductCode> = session
            .pool()
            .iter()
            .map(|candidate| candidate.product.code.clone())
            .collect();
        service.select_products(&id, &codes)?;
        session = service.advance(&id)?;
    }

    render_comparison(&session, service.workflow().engine().margin());
    if session.candidates().is_empty() {
        println!("No candidates found; cancelling review.");
        service.cancel(&id)?;
        return Ok(());
    }

    for candidate in session.candidates() {
        let code = &candidate.product.code;
        match candidate.grade.tier {
            PeerTier::Better => {
                service.toggle_decision(&id, code, DecisionStatus::Accepted)?;
                service.set_candidate_note(&id, code, "Outscores the reference")?;
            }
            PeerTier::Worse => {
                service.toggle_decision(&id, code, DecisionStatus::Rejected)?;
                service.set_candidate_note(&id, code, "Trails the reference")?;
            }
            PeerTier::Comparable => {
                service.set_candidate_note(&id, code, "Within margin; advisor to confirm")?;
            }
        }
    }

    let session = service.advance(&id)?;
    let summary = session.summary();
    println!(
        "\nFinal review: {} accepted | {} rejected | {} undecided",
        summary.accepted, summary.rejected, summary.undecided
    );
    println!("\nComparison export");
    print!("{}", service.export(&id)?);

    let record = service.commit(&id, Some("Committed from the CLI demo"), Utc::now())?;
    println!(
        "\nCommitted review {} for {} at {}",
        record.session_id,
        record.reference.code,
        record.committed_at.to_rfc3339()
    );
    for (label, status) in [
        ("Accepted", DecisionStatus::Accepted),
        ("Rejected", DecisionStatus::Rejected),
    ] {
        let codes: Vec<&str> = record
            .entries_with_status(status)
            .map(|entry| entry.product.code.as_str())
            .collect();
        if !codes.is_empty() {
            println!("  {label}: {}", codes.join(", "));
        }
    }
    let on_file = service.records_for(&record.reference.code)?;
    println!(
        "Reviews on file for {}: {}",
        record.reference.code,
        on_file.len()
    );

    let mut board = CatalogStatusBoard::new();
    board.apply_all(&events.drain());
    println!(
        "Catalog status for {}: {}",
        record.reference.code,
        board.status(&record.reference.code).label()
    );

    Ok(())
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let config = load_config(args.catalog_csv)?;
    let catalog = load_catalog(&config.catalog)?;
    let board = CatalogStatusBoard::new();
    let summary = board.summary(&catalog);
    let rows = match args.query.as_deref() {
        Some(query) => board.search(&catalog, query),
        None => board.listing(&catalog),
    };

    println!(
        "Product catalog: {} products from {} providers | {} reviewed | {} pending",
        summary.total_products, summary.providers, summary.reviewed, summary.pending
    );
    for row in rows {
        println!(
            "  - {:<8} {:<45} {:<40} {:<3} {}",
            row.code.as_str(),
            row.name,
            row.provider,
            row.risk.label(),
            row.status_label
        );
    }
    Ok(())
}

fn provider_label(catalog: &ProductCatalog, session: &ReviewSession) -> String {
    let code = &session.reference().provider;
    catalog
        .provider(code)
        .map(|provider| provider.display_name())
        .unwrap_or_else(|| code.to_string())
}

fn render_comparison(session: &ReviewSession, margin: f64) {
    println!(
        "\nComparison ({} candidates, margin {:.2})",
        session.candidates().len(),
        margin
    );
    println!("  Reference score: {:.3}", session.reference_score().value());
    for candidate in session.candidates() {
        println!(
            "  - {:<8} {:<4} score {:>7.3} | delta {:>+7.3} | {}",
            candidate.product.code.as_str(),
            candidate.product.provider.as_str(),
            candidate.grade.score.value(),
            candidate.grade.delta,
            candidate.grade.tier.label()
        );
    }
}
