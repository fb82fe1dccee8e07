mod normalizer;
mod parser;
mod sample;
mod status;

pub use sample::SAMPLE_CATALOG_CSV;
pub use status::{CatalogProductView, CatalogStatusBoard, CatalogSummary, ProductStatus};

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::workflows::kyp::domain::{MetricSet, Product, ProductCode, ProviderCode};

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, reason: String },
    DuplicateCode(ProductCode),
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read catalog export: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogImportError::InvalidRow { line, reason } => {
                write!(f, "catalog row {} rejected: {}", line, reason)
            }
            CatalogImportError::DuplicateCode(code) => {
                write!(f, "product code {} appears more than once", code)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::InvalidRow { .. } | CatalogImportError::DuplicateCode(_) => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Company issuing products in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub code: ProviderCode,
    pub name: String,
}

impl Provider {
    /// Display form used by the provider picker, e.g. `RBC Global Asset Management [RBC]`.
    pub fn display_name(&self) -> String {
        if self.name == self.code.as_str() {
            self.name.clone()
        } else {
            format!("{} [{}]", self.name, self.code)
        }
    }
}

/// A product together with the metrics the grading engine consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product: Product,
    pub metrics: MetricSet,
}

/// Read-only product reference data, kept in import order.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<ProductCode, usize>,
    providers: BTreeMap<ProviderCode, Provider>,
}

impl ProductCatalog {
    pub fn from_entries<I>(providers: Vec<Provider>, entries: I) -> Result<Self, CatalogImportError>
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        let mut catalog = Self::default();
        for provider in providers {
            catalog.providers.insert(provider.code.clone(), provider);
        }
        for entry in entries {
            catalog.insert(entry)?;
        }
        Ok(catalog)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogImportError> {
        let mut catalog = Self::default();
        for row in parser::parse_rows(reader)? {
            catalog
                .providers
                .entry(row.provider.code.clone())
                .or_insert(row.provider);
            catalog.insert(row.entry)?;
        }
        Ok(catalog)
    }

    /// Demonstration catalog bundled with the crate.
    pub fn sample() -> Result<Self, CatalogImportError> {
        Self::from_reader(SAMPLE_CATALOG_CSV.as_bytes())
    }

    fn insert(&mut self, entry: CatalogEntry) -> Result<(), CatalogImportError> {
        if self.index.contains_key(&entry.product.code) {
            return Err(CatalogImportError::DuplicateCode(entry.product.code));
        }

        self.providers
            .entry(entry.product.provider.clone())
            .or_insert_with(|| Provider {
                code: entry.product.provider.clone(),
                name: entry.product.provider.to_string(),
            });
        self.index
            .insert(entry.product.code.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn entry(&self, code: &ProductCode) -> Option<&CatalogEntry> {
        self.index.get(code).map(|position| &self.entries[*position])
    }

    pub fn product(&self, code: &ProductCode) -> Option<&Product> {
        self.entry(code).map(|entry| &entry.product)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn providers(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }

    pub fn provider(&self, code: &ProviderCode) -> Option<&Provider> {
        self.providers.get(code)
    }

    /// Case-insensitive match on product code, product name, provider code, or provider name.
    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.entries.iter().collect();
        }

        self.entries
            .iter()
            .filter(|entry| {
                let provider_name = self
                    .providers
                    .get(&entry.product.provider)
                    .map(|provider| provider.name.to_lowercase())
                    .unwrap_or_default();
                entry.product.code.as_str().to_lowercase().contains(&needle)
                    || entry.product.name.to_lowercase().contains(&needle)
                    || entry.product.provider.as_str().to_lowercase().contains(&needle)
                    || provider_name.contains(&needle)
            })
            .collect()
    }
}
