use chrono::{TimeZone, Utc};

use super::common::*;
use crate::workflows::kyp::domain::{
    CandidateSource, DecisionStatus, ProviderSelection, ReviewStage,
};
use crate::workflows::kyp::grading::{CriterionWeightSet, PeerTier};
use crate::workflows::kyp::session::ReviewError;

#[test]
fn manual_without_providers_stays_in_provider_selection() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = opened_session(&workflow, &catalog);
    workflow
        .choose_providers(&mut session, ProviderSelection::manual(Vec::<String>::new()))
        .expect("selection recorded");

    assert_eq!(
        workflow.advance(&mut session, &catalog),
        Err(ReviewError::NoProvidersSelected)
    );
    assert_eq!(session.stage(), ReviewStage::ProviderSelection);
    assert!(session.pool().is_empty());
}

#[test]
fn advance_requires_a_selection_mode() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = opened_session(&workflow, &catalog);

    assert!(matches!(
        workflow.advance(&mut session, &catalog),
        Err(ReviewError::InvalidTransition {
            stage: ReviewStage::ProviderSelection,
            ..
        })
    ));
}

#[test]
fn product_selection_requires_at_least_one_product() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = opened_session(&workflow, &catalog);
    workflow
        .choose_providers(&mut session, ProviderSelection::manual(["RBC", "BMO"]))
        .expect("selection");
    assert_eq!(
        workflow.advance(&mut session, &catalog),
        Ok(ReviewStage::ProductSelection)
    );

    match workflow.advance(&mut session, &catalog) {
        Err(ReviewError::InvalidTransition { reason, .. }) => {
            assert!(reason.contains("at least one product"), "{reason}");
        }
        other => panic!("expected guard failure, got {other:?}"),
    }
    assert_eq!(session.stage(), ReviewStage::ProductSelection);
}

#[test]
fn only_selected_products_are_graded() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = opened_session(&workflow, &catalog);
    workflow
        .choose_providers(&mut session, ProviderSelection::manual(["RBC", "BMO"]))
        .expect("selection");
    workflow.advance(&mut session, &catalog).expect("pool");
    session.toggle_product(&code("BMO200")).expect("select");
    workflow.advance(&mut session, &catalog).expect("grades");

    let codes: Vec<&str> = session
        .candidates()
        .iter()
        .map(|candidate| candidate.product.code.as_str())
        .collect();
    assert_eq!(codes, vec!["BMO200"]);
}

#[test]
fn auto_mode_skips_product_selection() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = opened_session(&workflow, &catalog);
    workflow
        .choose_providers(&mut session, ProviderSelection::auto(3, 3))
        .expect("selection");

    assert_eq!(
        workflow.advance(&mut session, &catalog),
        Ok(ReviewStage::Comparison)
    );
    assert_eq!(session.candidates().len(), 6);
    assert_eq!(
        session.history(),
        &[ReviewStage::Initiated, ReviewStage::ProviderSelection]
    );

    let top: Vec<&str> = session
        .candidates()
        .iter()
        .filter(|candidate| candidate.source == CandidateSource::TopRanked)
        .map(|candidate| candidate.product.code.as_str())
        .collect();
    assert_eq!(top, vec!["MAW104", "CIB851", "RBF556"]);
    assert!(session
        .candidates()
        .iter()
        .all(|candidate| candidate.product.provider.as_str() != "TD"));
}

#[test]
fn back_from_final_review_keeps_decisions() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = manual_comparison(&workflow, &catalog);
    session
        .toggle_decision(&code("RBF556"), DecisionStatus::Accepted)
        .expect("accept");
    workflow.advance(&mut session, &catalog).expect("final review");

    assert_eq!(workflow.back(&mut session), Ok(ReviewStage::Comparison));
    assert_eq!(
        session.decision(&code("RBF556")).map(|decision| decision.status),
        Some(DecisionStatus::Accepted)
    );
}

#[test]
fn back_from_comparison_discards_graded_candidates() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = manual_comparison(&workflow, &catalog);

    assert_eq!(workflow.back(&mut session), Ok(ReviewStage::ProductSelection));
    assert!(session.candidates().is_empty());
    assert_eq!(session.selected_products().len(), 2);

    assert_eq!(workflow.back(&mut session), Ok(ReviewStage::ProviderSelection));
    assert!(session.pool().is_empty());
    assert!(workflow.back(&mut session).is_err());
    assert_eq!(session.stage(), ReviewStage::ProviderSelection);
}

#[test]
fn back_from_auto_comparison_returns_to_provider_selection() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = opened_session(&workflow, &catalog);
    workflow
        .choose_providers(&mut session, ProviderSelection::auto(3, 3))
        .expect("selection");
    workflow.advance(&mut session, &catalog).expect("auto grades");
    assert_eq!(session.stage(), ReviewStage::Comparison);

    assert_eq!(workflow.back(&mut session), Ok(ReviewStage::ProviderSelection));
    assert!(session.candidates().is_empty());
    assert!(session.pool().is_empty());
}

#[test]
fn reweight_regrades_and_preserves_decisions() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = manual_comparison(&workflow, &catalog);
    session
        .toggle_decision(&code("BMO200"), DecisionStatus::Rejected)
        .expect("reject");

    let mer_only = CriterionWeightSet::new(100, 0, 0, 0).expect("valid");
    workflow.reweight(&mut session, mer_only).expect("regrades");

    let bmo = session.candidate(&code("BMO200")).expect("bmo");
    // MER 1.61% vs 2.02%: 0.41 points better, inside the margin.
    assert_eq!(bmo.grade.tier, PeerTier::Comparable);
    assert!((bmo.grade.delta - 0.41).abs() < 1e-9);
    assert_eq!(session.weights(), &mer_only);
    assert_eq!(
        session.decision(&code("BMO200")).map(|decision| decision.status),
        Some(DecisionStatus::Rejected)
    );
}

#[test]
fn advisor_can_add_and_remove_candidates() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = manual_comparison(&workflow, &catalog);

    workflow
        .add_candidate(&mut session, &catalog, &code("MAW104"))
        .expect("adds");
    let added = session.candidate(&code("MAW104")).expect("added");
    assert_eq!(added.source, CandidateSource::AddedByAdvisor);
    assert_eq!(added.grade.tier, PeerTier::Better);

    assert!(matches!(
        workflow.add_candidate(&mut session, &catalog, &code("MAW104")),
        Err(ReviewError::InvalidTransition { .. })
    ));
    assert!(matches!(
        workflow.add_candidate(&mut session, &catalog, &code("TDB909")),
        Err(ReviewError::InvalidTransition { .. })
    ));
    assert_eq!(
        workflow.add_candidate(&mut session, &catalog, &code("NOPE1")),
        Err(ReviewError::UnknownProduct(code("NOPE1")))
    );

    let removed = workflow
        .remove_candidate(&mut session, &code("BMO200"))
        .expect("removes");
    assert_eq!(removed.product.code, code("BMO200"));
    assert!(session.decision(&code("BMO200")).is_none());
    assert_eq!(session.candidates().len(), 2);
}

#[test]
fn commit_produces_record_once() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = manual_comparison(&workflow, &catalog);
    session
        .toggle_decision(&code("RBF556"), DecisionStatus::Accepted)
        .expect("accept");
    session
        .set_candidate_note(&code("RBF556"), "Lower fees")
        .expect("note");
    workflow.advance(&mut session, &catalog).expect("final review");
    session
        .set_review_note("RBC preferred; BMO out of risk band")
        .expect("review note");

    let now = Utc.with_ymd_and_hms(2026, 3, 2, 15, 30, 0).unwrap();
    let record = workflow.commit(&mut session, now).expect("commits");

    assert_eq!(session.stage(), ReviewStage::Committed);
    assert_eq!(record.committed_at, now);
    assert_eq!(record.reference.code, code("TDB909"));
    assert_eq!(record.note.as_deref(), Some("RBC preferred; BMO out of risk band"));
    assert_eq!(record.entries.len(), 2);
    assert_eq!(record.accepted, 1);
    assert_eq!(record.undecided, 1);
    assert_eq!(
        record.entries[0].note.as_deref(),
        Some("Lower fees"),
        "candidate notes survive into the record"
    );
    assert_eq!(record.reviewed_event().product_code, code("TDB909"));

    match workflow.commit(&mut session, now) {
        Err(ReviewError::InvalidTransition { reason, .. }) => {
            assert!(reason.contains("already been committed"), "{reason}");
        }
        other => panic!("expected second commit to fail, got {other:?}"),
    }
}

#[test]
fn commit_outside_final_review_is_rejected() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = manual_comparison(&workflow, &catalog);

    assert!(workflow.commit(&mut session, Utc::now()).is_err());
    assert_eq!(session.stage(), ReviewStage::Comparison);
}

#[test]
fn cancel_discards_work_from_any_open_stage() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = manual_comparison(&workflow, &catalog);
    session
        .toggle_decision(&code("RBF556"), DecisionStatus::Accepted)
        .expect("accept");

    workflow.cancel(&mut session).expect("cancels");
    assert_eq!(session.stage(), ReviewStage::Cancelled);
    assert!(session.candidates().is_empty());
    assert!(session.decision(&code("RBF556")).is_none());

    assert!(workflow.cancel(&mut session).is_err());
    assert!(workflow.advance(&mut session, &catalog).is_err());
    assert!(workflow.commit(&mut session, Utc::now()).is_err());
}
