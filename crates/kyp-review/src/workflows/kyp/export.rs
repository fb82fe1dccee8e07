use std::string::FromUtf8Error;

use serde::Serialize;

use super::domain::CandidateSource;
use super::session::ReviewSession;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write comparison CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush comparison CSV: {0}")]
    Io(#[from] std::io::Error),
    #[error("comparison CSV is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    role: &'static str,
    code: &'a str,
    name: &'a str,
    provider: &'a str,
    tier: &'static str,
    score: String,
    decision: &'static str,
    note: &'a str,
}

fn role(source: CandidateSource) -> &'static str {
    match source {
        CandidateSource::Provider => "candidate",
        CandidateSource::TopRanked => "top_ranked",
        CandidateSource::BottomRanked => "bottom_ranked",
        CandidateSource::AddedByAdvisor => "added",
    }
}

/// Writes the reference row followed by each graded candidate in comparison order.
pub fn comparison_csv(session: &ReviewSession) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let reference = session.reference();
    let reference_score = format!("{:.3}", session.reference_score().value());

    writer.serialize(ExportRow {
        role: "reference",
        code: reference.code.as_str(),
        name: &reference.name,
        provider: reference.provider.as_str(),
        tier: "",
        score: reference_score,
        decision: "",
        note: session.review_note().unwrap_or_default(),
    })?;

    for candidate in session.candidates() {
        let decision = session.decision(&candidate.product.code);
        writer.serialize(ExportRow {
            role: role(candidate.source),
            code: candidate.product.code.as_str(),
            name: &candidate.product.name,
            provider: candidate.product.provider.as_str(),
            tier: candidate.grade.tier.label(),
            score: format!("{:.3}", candidate.grade.score.value()),
            decision: decision
                .map(|decision| decision.status.label())
                .unwrap_or_default(),
            note: decision
                .and_then(|decision| decision.note.as_deref())
                .unwrap_or_default(),
        })?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
