use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{InputSlot, LocalizedText, Service, ServiceId, SlotId, DEFAULT_LOCALE};

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, reason: String },
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read catalog export: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogImportError::InvalidRow { line, reason } => {
                write!(f, "invalid catalog row on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::InvalidRow { .. } => None,
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

/// Services and slots read from a catalog export, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedCatalog {
    pub services: Vec<Service>,
    pub slots: Vec<InputSlot>,
}

impl ImportedCatalog {
    pub fn slots_for<'a>(&'a self, service_id: &'a ServiceId) -> impl Iterator<Item = &'a InputSlot> {
        self.slots
            .iter()
            .filter(move |slot| &slot.service_id == service_id)
    }
}

pub struct CatalogImporter;

impl CatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ImportedCatalog, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<ImportedCatalog, CatalogImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut catalog = ImportedCatalog::default();
        let mut service_index: HashMap<ServiceId, usize> = HashMap::new();
        let mut slot_index: HashMap<(ServiceId, SlotId), usize> = HashMap::new();

        for (index, record) in csv_reader.deserialize::<CatalogRow>().enumerate() {
            let line = index + 2;
            let row = record?;
            let locale = row.locale.as_deref().unwrap_or(DEFAULT_LOCALE).to_string();

            let service_id = ServiceId(row.service_id.clone());
            if service_id.0.is_empty() {
                return Err(CatalogImportError::InvalidRow {
                    line,
                    reason: "service id is empty".to_string(),
                });
            }

            let position = *service_index.entry(service_id.clone()).or_insert_with(|| {
                catalog.services.push(Service {
                    id: service_id.clone(),
                    title: LocalizedText::default(),
                    description: LocalizedText::default(),
                    price: 0,
                    slot_order: Vec::new(),
                });
                catalog.services.len() - 1
            });
            let service = &mut catalog.services[position];

            if let Some(title) = &row.service_title {
                service.title.insert(locale.as_str(), title.as_str());
            }
            if let Some(description) = &row.service_description {
                service.description.insert(locale.as_str(), description.as_str());
            }
            if let Some(raw_price) = &row.price {
                service.price = parse_price(raw_price).ok_or_else(|| {
                    CatalogImportError::InvalidRow {
                        line,
                        reason: format!("price '{raw_price}' is not a whole number"),
                    }
                })?;
            }

            let Some(slot_id) = row.slot_id.clone().map(SlotId) else {
                continue;
            };
            let required = match &row.required {
                Some(raw) => parse_flag(raw).ok_or_else(|| CatalogImportError::InvalidRow {
                    line,
                    reason: format!("required flag '{raw}' is not a boolean"),
                })?,
                None => false,
            };

            let key = (service_id.clone(), slot_id.clone());
            let slot_position = match slot_index.get(&key) {
                Some(existing) => *existing,
                None => {
                    service.slot_order.push(slot_id.clone());
                    catalog.slots.push(InputSlot {
                        id: slot_id,
                        service_id: service_id.clone(),
                        name: LocalizedText::default(),
                        description: LocalizedText::default(),
                        required,
                    });
                    slot_index.insert(key, catalog.slots.len() - 1);
                    catalog.slots.len() - 1
                }
            };

            let slot = &mut catalog.slots[slot_position];
            if row.required.is_some() {
                slot.required = required;
            }
            if let Some(name) = &row.slot_name {
                slot.name.insert(locale.as_str(), name.as_str());
            }
            if let Some(description) = &row.slot_description {
                slot.description.insert(locale.as_str(), description.as_str());
            }
            if slot.name.is_empty() {
                return Err(CatalogImportError::InvalidRow {
                    line,
                    reason: format!("slot '{}' has no name", slot.id),
                });
            }
        }

        Ok(catalog)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Service ID")]
    service_id: String,
    #[serde(rename = "Service Title", default, deserialize_with = "empty_string_as_none")]
    service_title: Option<String>,
    #[serde(
        rename = "Service Description",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    service_description: Option<String>,
    #[serde(rename = "Price", default, deserialize_with = "empty_string_as_none")]
    price: Option<String>,
    #[serde(rename = "Slot ID", default, deserialize_with = "empty_string_as_none")]
    slot_id: Option<String>,
    #[serde(rename = "Slot Name", default, deserialize_with = "empty_string_as_none")]
    slot_name: Option<String>,
    #[serde(
        rename = "Slot Description",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    slot_description: Option<String>,
    #[serde(rename = "Required", default, deserialize_with = "empty_string_as_none")]
    required: Option<String>,
    #[serde(rename = "Locale", default, deserialize_with = "empty_string_as_none")]
    locale: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn parse_price(raw: &str) -> Option<u64> {
    raw.trim().replace(['_', ' '], "").parse().ok()
}
