use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Locale used when a caller does not ask for one.
pub const DEFAULT_LOCALE: &str = "en";

/// Identifier wrapper for client applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for catalog services.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub String);

/// Identifier wrapper for input slots (document requirements).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

macro_rules! display_id {
    ($($name:ident),*) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

display_id!(ApplicationId, ServiceId, SlotId, ClientId, DocumentId);

/// Translations keyed by locale code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn new(locale: impl Into<String>, text: impl Into<String>) -> Self {
        Self::default().with(locale, text)
    }

    pub fn with(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(locale, text);
        self
    }

    pub fn insert(&mut self, locale: impl Into<String>, text: impl Into<String>) {
        self.0
            .insert(locale.into().trim().to_ascii_lowercase(), text.into());
    }

    /// Text for `locale`, falling back to the default locale and then any translation.
    pub fn resolve(&self, locale: &str) -> &str {
        let requested = locale.trim().to_ascii_lowercase();
        self.0
            .get(&requested)
            .or_else(|| self.0.get(DEFAULT_LOCALE))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn primary(&self) -> &str {
        self.resolve(DEFAULT_LOCALE)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Catalog offering a client can apply for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub title: LocalizedText,
    pub description: LocalizedText,
    /// Price in minor currency units.
    pub price: u64,
    pub slot_order: Vec<SlotId>,
}

/// A named document requirement belonging to one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSlot {
    pub id: SlotId,
    pub service_id: ServiceId,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub required: bool,
}

/// Staff-authored slot fields; the catalog assigns the owning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDraft {
    pub id: SlotId,
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub required: bool,
}

impl SlotDraft {
    pub fn into_slot(self, service_id: ServiceId) -> InputSlot {
        InputSlot {
            id: self.id,
            service_id,
            name: self.name,
            description: self.description,
            required: self.required,
        }
    }
}

/// Lifecycle status of a client application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A client's request instance bound to one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub client_id: ClientId,
    pub service_id: ServiceId,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored file reference bound to one application and one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: DocumentId,
    pub application_id: ApplicationId,
    pub input_slot_id: SlotId,
    pub file_reference: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Runtime pairing of a slot with its (possibly absent) uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub input_slot_id: SlotId,
    pub label: LocalizedText,
    pub description: LocalizedText,
    pub required: bool,
    pub uploaded_document: Option<UploadedDocument>,
}

impl ChecklistItem {
    pub fn from_slot(slot: &InputSlot, uploaded_document: Option<UploadedDocument>) -> Self {
        Self {
            input_slot_id: slot.id.clone(),
            label: slot.name.clone(),
            description: slot.description.clone(),
            required: slot.required,
            uploaded_document,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.uploaded_document
            .as_ref()
            .is_some_and(|document| !document.file_reference.trim().is_empty())
    }
}

/// Raw file handed to the upload gateway.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercased extension after the final dot, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.trim();
        let (stem, extension) = name.rsplit_once('.')?;
        if stem.is_empty() || extension.is_empty() {
            return None;
        }
        Some(extension.to_ascii_lowercase())
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}
