use super::super::domain::MetricSet;
use super::weights::{Criterion, CriterionWeightSet};
use super::{CompositeScore, ScoreComponent};

/// Maps a raw metric onto the shared "higher is better" scale, in percentage points.
pub(crate) fn normalized_value(criterion: Criterion, metrics: &MetricSet) -> f64 {
    match criterion {
        Criterion::Mer => -(metrics.mer * 100.0),
        Criterion::OneYearReturn => metrics.return_1y * 100.0,
        Criterion::ThreeYearReturn => metrics.return_3y * 100.0,
        Criterion::FiveYearReturn => metrics.return_5y * 100.0,
    }
}

fn raw_value(criterion: Criterion, metrics: &MetricSet) -> f64 {
    match criterion {
        Criterion::Mer => metrics.mer,
        Criterion::OneYearReturn => metrics.return_1y,
        Criterion::ThreeYearReturn => metrics.return_3y,
        Criterion::FiveYearReturn => metrics.return_5y,
    }
}

pub(crate) fn score_metrics(
    metrics: &MetricSet,
    weights: &CriterionWeightSet,
) -> (Vec<ScoreComponent>, CompositeScore) {
    let mut components = Vec::with_capacity(4);
    let mut total = 0.0;

    for criterion in Criterion::ordered() {
        let weight = weights.weight(criterion);
        let normalized = normalized_value(criterion, metrics);
        let contribution = normalized * f64::from(weight) / 100.0;
        total += contribution;

        components.push(ScoreComponent {
            criterion,
            raw: raw_value(criterion, metrics),
            normalized,
            weight,
            contribution,
        });
    }

    (components, CompositeScore(total))
}
