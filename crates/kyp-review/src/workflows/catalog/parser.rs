use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::normalizer::{collapse_whitespace, parse_decimal, provider_code};
use super::{CatalogEntry, CatalogImportError, Provider};
use crate::workflows::kyp::domain::{MetricSet, Product, ProductCode, RiskRating};

pub(crate) struct ParsedRow {
    pub(crate) provider: Provider,
    pub(crate) entry: CatalogEntry,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<ParsedRow>, CatalogImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.deserialize::<CatalogRow>().enumerate() {
        // header occupies line 1
        let line = index + 2;
        let row = record?;
        rows.push(row.into_parsed(line)?);
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Provider")]
    provider: String,
    #[serde(
        rename = "Provider Name",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    provider_name: Option<String>,
    #[serde(
        rename = "Classification",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    classification: Option<String>,
    #[serde(rename = "Risk", default, deserialize_with = "empty_string_as_none")]
    risk: Option<String>,
    #[serde(rename = "Objective", default, deserialize_with = "empty_string_as_none")]
    objective: Option<String>,
    #[serde(rename = "MER")]
    mer: String,
    #[serde(rename = "1Y")]
    return_1y: String,
    #[serde(rename = "3Y")]
    return_3y: String,
    #[serde(rename = "5Y")]
    return_5y: String,
}

impl CatalogRow {
    fn into_parsed(self, line: usize) -> Result<ParsedRow, CatalogImportError> {
        let invalid = |reason: String| CatalogImportError::InvalidRow { line, reason };

        let code = self.code.trim();
        if code.is_empty() {
            return Err(invalid("product code is blank".to_string()));
        }

        let provider_id = provider_code(&self.provider)
            .ok_or_else(|| invalid("provider code is blank".to_string()))?;

        let risk = match self.risk.as_deref() {
            Some(raw) => RiskRating::parse(raw)
                .ok_or_else(|| invalid(format!("unknown risk rating '{raw}'")))?,
            None => RiskRating::Medium,
        };

        let metric = |raw: &str, column: &str| {
            parse_decimal(raw)
                .ok_or_else(|| invalid(format!("{column} value '{raw}' is not numeric")))
        };
        let metrics = MetricSet {
            mer: metric(&self.mer, "MER")?,
            return_1y: metric(&self.return_1y, "1Y")?,
            return_3y: metric(&self.return_3y, "3Y")?,
            return_5y: metric(&self.return_5y, "5Y")?,
        };
        if metrics.mer < 0.0 {
            return Err(invalid(format!("MER {} cannot be negative", metrics.mer)));
        }

        let provider = Provider {
            name: self
                .provider_name
                .as_deref()
                .map(collapse_whitespace)
                .unwrap_or_else(|| provider_id.to_string()),
            code: provider_id.clone(),
        };

        let product = Product {
            code: ProductCode::new(code),
            name: collapse_whitespace(&self.name),
            provider: provider_id,
            classification: self
                .classification
                .map(|value| collapse_whitespace(&value))
                .unwrap_or_else(|| "Unclassified".to_string()),
            risk,
            investment_objective: self
                .objective
                .map(|value| collapse_whitespace(&value))
                .unwrap_or_default(),
        };

        Ok(ParsedRow {
            provider,
            entry: CatalogEntry { product, metrics },
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
