use std::fmt;

use serde::{Deserialize, Serialize};

use super::GradingError;

/// Grading factors a weight set distributes importance across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Mer,
    OneYearReturn,
    ThreeYearReturn,
    FiveYearReturn,
}

impl Criterion {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Mer,
            Self::OneYearReturn,
            Self::ThreeYearReturn,
            Self::FiveYearReturn,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Mer => "MER",
            Self::OneYearReturn => "1Y Return",
            Self::ThreeYearReturn => "3Y Return",
            Self::FiveYearReturn => "5Y Return",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unvalidated percentages as entered on the grading-rules form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightDraft {
    pub mer: u16,
    pub one_year: u16,
    pub three_year: u16,
    pub five_year: u16,
}

impl WeightDraft {
    pub fn total(&self) -> u32 {
        u32::from(self.mer)
            + u32::from(self.one_year)
            + u32::from(self.three_year)
            + u32::from(self.five_year)
    }
}

/// Relative importance of each criterion. Always sums to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WeightDraft", into = "WeightDraft")]
pub struct CriterionWeightSet {
    mer: u8,
    one_year: u8,
    three_year: u8,
    five_year: u8,
}

impl CriterionWeightSet {
    pub fn new(
        mer: u16,
        one_year: u16,
        three_year: u16,
        five_year: u16,
    ) -> Result<Self, GradingError> {
        Self::try_from(WeightDraft {
            mer,
            one_year,
            three_year,
            five_year,
        })
    }

    pub fn weight(&self, criterion: Criterion) -> u8 {
        match criterion {
            Criterion::Mer => self.mer,
            Criterion::OneYearReturn => self.one_year,
            Criterion::ThreeYearReturn => self.three_year,
            Criterion::FiveYearReturn => self.five_year,
        }
    }

    pub fn total(&self) -> u32 {
        Criterion::ordered()
            .iter()
            .map(|criterion| u32::from(self.weight(*criterion)))
            .sum()
    }

    pub fn validate(&self) -> Result<(), GradingError> {
        match self.total() {
            100 => Ok(()),
            total => Err(GradingError::InvalidConfiguration(format!(
                "criterion weights must sum to 100, found {total}"
            ))),
        }
    }

    /// Parses the `40,20,20,20` form used by environment configuration.
    pub fn parse_list(raw: &str) -> Result<Self, GradingError> {
        let values = raw
            .split(',')
            .map(|part| part.trim().parse::<u16>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                GradingError::InvalidConfiguration(format!("unreadable weight list '{raw}': {err}"))
            })?;

        match values.as_slice() {
            [mer, one_year, three_year, five_year] => {
                Self::new(*mer, *one_year, *three_year, *five_year)
            }
            _ => Err(GradingError::InvalidConfiguration(format!(
                "expected four weights (MER, 1Y, 3Y, 5Y), found {}",
                values.len()
            ))),
        }
    }
}

impl Default for CriterionWeightSet {
    fn default() -> Self {
        Self {
            mer: 40,
            one_year: 20,
            three_year: 20,
            five_year: 20,
        }
    }
}

impl TryFrom<WeightDraft> for CriterionWeightSet {
    type Error = GradingError;

    fn try_from(draft: WeightDraft) -> Result<Self, Self::Error> {
        let narrow = |value: u16, criterion: Criterion| {
            u8::try_from(value)
                .ok()
                .filter(|value| *value <= 100)
                .ok_or_else(|| {
                    GradingError::InvalidConfiguration(format!(
                        "{criterion} weight {value} is outside 0-100"
                    ))
                })
        };

        let weights = Self {
            mer: narrow(draft.mer, Criterion::Mer)?,
            one_year: narrow(draft.one_year, Criterion::OneYearReturn)?,
            three_year: narrow(draft.three_year, Criterion::ThreeYearReturn)?,
            five_year: narrow(draft.five_year, Criterion::FiveYearReturn)?,
        };
        weights.validate()?;
        Ok(weights)
    }
}

impl From<CriterionWeightSet> for WeightDraft {
    fn from(weights: CriterionWeightSet) -> Self {
        Self {
            mer: weights.mer.into(),
            one_year: weights.one_year.into(),
            three_year: weights.three_year.into(),
            five_year: weights.five_year.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_match_console_sliders() {
        let weights = CriterionWeightSet::default();
        assert_eq!(weights.weight(Criterion::Mer), 40);
        assert_eq!(weights.total(), 100);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn rejects_totals_other_than_one_hundred() {
        for (mer, one, three, five) in [(40, 20, 20, 30), (0, 0, 0, 0), (25, 25, 25, 24)] {
            match CriterionWeightSet::new(mer, one, three, five) {
                Err(GradingError::InvalidConfiguration(message)) => {
                    assert!(message.contains("sum to 100"), "{message}");
                }
                other => panic!("expected invalid configuration, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_individual_weights_above_one_hundred() {
        let result = CriterionWeightSet::new(300, 0, 0, 0);
        assert!(matches!(result, Err(GradingError::InvalidConfiguration(_))));
    }

    #[test]
    fn deserialization_enforces_the_sum() {
        let valid: CriterionWeightSet = serde_json::from_str(
            r#"{"mer":10,"one_year":30,"three_year":30,"five_year":30}"#,
        )
        .expect("valid weights deserialize");
        assert_eq!(valid.weight(Criterion::OneYearReturn), 30);

        let invalid = serde_json::from_str::<CriterionWeightSet>(
            r#"{"mer":50,"one_year":30,"three_year":30,"five_year":30}"#,
        );
        assert!(invalid.is_err());
    }

    #[test]
    fn parses_comma_separated_lists() {
        let weights = CriterionWeightSet::parse_list("25, 25, 25, 25").expect("parses");
        assert_eq!(weights.weight(Criterion::FiveYearReturn), 25);
        assert!(CriterionWeightSet::parse_list("50,50").is_err());
        assert!(CriterionWeightSet::parse_list("a,b,c,d").is_err());
    }
}
