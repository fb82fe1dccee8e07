use super::common::*;
use crate::workflows::kyp::domain::{
    DecisionStatus, ProviderCode, ProviderSelection, ReviewStage,
};
use crate::workflows::kyp::grading::PeerTier;
use crate::workflows::kyp::session::ReviewError;

#[test]
fn candidates_enter_comparison_undecided() {
    let catalog = catalog();
    let workflow = workflow();
    let session = manual_comparison(&workflow, &catalog);

    for candidate in session.candidates() {
        let decision = session
            .decision(&candidate.product.code)
            .expect("decision created with candidate");
        assert_eq!(decision.status, DecisionStatus::Undecided);
        assert!(decision.note.is_none());
    }
    assert_eq!(session.summary().undecided, 2);
}

#[test]
fn reference_tiers_follow_the_default_margin() {
    let catalog = catalog();
    let workflow = workflow();
    let session = manual_comparison(&workflow, &catalog);

    let rbc = session.candidate(&code("RBF556")).expect("rbc candidate");
    let bmo = session.candidate(&code("BMO200")).expect("bmo candidate");
    assert_eq!(rbc.grade.tier, PeerTier::Better);
    assert_eq!(bmo.grade.tier, PeerTier::Comparable);
    assert!((rbc.grade.reference_score.value() - 2.412).abs() < 1e-9);
    assert!((bmo.grade.delta + 0.496).abs() < 1e-9);
}

#[test]
fn decisions_toggle_in_any_order() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = manual_comparison(&workflow, &catalog);
    let rbc = code("RBF556");

    assert_eq!(
        session.toggle_decision(&rbc, DecisionStatus::Accepted),
        Ok(DecisionStatus::Accepted)
    );
    assert_eq!(
        session.toggle_decision(&rbc, DecisionStatus::Rejected),
        Ok(DecisionStatus::Rejected)
    );
    assert_eq!(
        session.toggle_decision(&rbc, DecisionStatus::Rejected),
        Ok(DecisionStatus::Undecided)
    );

    session
        .toggle_decision(&rbc, DecisionStatus::Accepted)
        .expect("accept");
    session.clear_decision(&rbc).expect("clears");
    assert_eq!(
        session.decision(&rbc).map(|decision| decision.status),
        Some(DecisionStatus::Undecided)
    );
}

#[test]
fn decisions_on_unknown_candidates_are_rejected() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = manual_comparison(&workflow, &catalog);

    assert_eq!(
        session.toggle_decision(&code("CIB851"), DecisionStatus::Accepted),
        Err(ReviewError::UnknownCandidate(code("CIB851")))
    );
}

#[test]
fn decisions_outside_comparison_are_rejected() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = opened_session(&workflow, &catalog);

    match session.toggle_decision(&code("RBF556"), DecisionStatus::Accepted) {
        Err(ReviewError::InvalidTransition { stage, .. }) => {
            assert_eq!(stage, ReviewStage::ProviderSelection);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
    assert_eq!(session.stage(), ReviewStage::ProviderSelection);
}

#[test]
fn product_selection_is_limited_to_the_pool() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = opened_session(&workflow, &catalog);
    workflow
        .choose_providers(&mut session, ProviderSelection::manual(["RBC"]))
        .expect("selection");
    workflow.advance(&mut session, &catalog).expect("pool");

    assert_eq!(session.toggle_product(&code("RBF556")), Ok(true));
    assert_eq!(session.toggle_product(&code("RBF556")), Ok(false));
    assert_eq!(
        session.toggle_product(&code("BMO200")),
        Err(ReviewError::UnknownCandidate(code("BMO200")))
    );
    assert!(session.selected_products().is_empty());
}

#[test]
fn provider_toggle_selects_then_clears_its_products() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = opened_session(&workflow, &catalog);
    workflow
        .choose_providers(&mut session, ProviderSelection::manual(["RBC", "BMO"]))
        .expect("selection");
    workflow.advance(&mut session, &catalog).expect("pool");

    let rbc = ProviderCode::new("RBC");
    session.toggle_provider_products(&rbc).expect("select all");
    assert!(session.selected_products().contains(&code("RBF556")));
    assert!(!session.selected_products().contains(&code("BMO200")));

    session.toggle_provider_products(&rbc).expect("clear all");
    assert!(session.selected_products().is_empty());
}

#[test]
fn notes_are_trimmed_to_none_when_blank() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = manual_comparison(&workflow, &catalog);
    let bmo = code("BMO200");

    session.set_candidate_note(&bmo, "Higher risk band").expect("note");
    assert_eq!(
        session.decision(&bmo).and_then(|decision| decision.note.as_deref()),
        Some("Higher risk band")
    );
    session.set_candidate_note(&bmo, "  ").expect("clear note");
    assert!(session.decision(&bmo).and_then(|d| d.note.clone()).is_none());

    assert!(matches!(
        session.set_review_note("too early"),
        Err(ReviewError::InvalidTransition { .. })
    ));
}

#[test]
fn view_flags_empty_comparisons() {
    let catalog = catalog();
    let workflow = workflow();
    let mut session = opened_session(&workflow, &catalog);
    workflow
        .choose_providers(&mut session, ProviderSelection::auto(0, 0))
        .expect("selection");
    workflow.advance(&mut session, &catalog).expect("auto resolves");

    let view = session.view();
    assert_eq!(view.stage, ReviewStage::Comparison);
    assert!(view.no_candidates_found);
    assert!(view.candidates.is_empty());
    assert!((view.reference_score.value() - 2.412).abs() < 1e-9);
}

#[test]
fn reference_score_is_known_before_grading() {
    let catalog = catalog();
    let workflow = workflow();
    let session = opened_session(&workflow, &catalog);

    assert_eq!(session.stage(), ReviewStage::ProviderSelection);
    assert!((session.reference_score().value() - 2.412).abs() < 1e-9);
}
