use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationDraft, DocumentSlot, FieldMap, FieldValue};

pub const PDF: &str = "application/pdf";
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS: &str = "application/vnd.ms-excel";

const MIB: u64 = 1024 * 1024;
/// Ceiling for every slot collected by the multi-step wizard.
pub const WIZARD_LIMIT_BYTES: u64 = 20 * MIB;
/// Ceiling for the simpler single-document upload flows.
pub const SINGLE_DOCUMENT_LIMIT_BYTES: u64 = 5 * MIB;

/// Where the bytes of a selected file live until submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FileSource {
    Memory(#[serde(with = "base64_bytes")] Vec<u8>),
    Disk(PathBuf),
}

/// A file chosen for a slot. The content stays unencoded until the application is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub source: FileSource,
}

impl UploadedFile {
    /// Wrap in-memory content; without an explicit MIME type it is guessed from the name.
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_type
            .map(str::to_string)
            .unwrap_or_else(|| guess_mime(&file_name));
        Self {
            size_bytes: bytes.len() as u64,
            file_name,
            mime_type,
            source: FileSource::Memory(bytes),
        }
    }

    /// Reference a file on disk; only its metadata is read now.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SlotError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|err| SlotError::Unreadable {
                file_name: file_name.clone(),
                reason: err.to_string(),
            })?;
        if !metadata.is_file() {
            return Err(SlotError::Unreadable {
                file_name,
                reason: "no es un archivo regular".to_string(),
            });
        }

        Ok(Self {
            mime_type: guess_mime(&file_name),
            size_bytes: metadata.len(),
            file_name,
            source: FileSource::Disk(path.to_path_buf()),
        })
    }

    pub async fn read(&self) -> Result<Vec<u8>, SlotError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Disk(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|err| SlotError::Unreadable {
                        file_name: self.file_name.clone(),
                        reason: err.to_string(),
                    })
            }
        }
    }
}

fn guess_mime(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Reasons a file cannot fill a slot. Messages are shown to the applicant as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("Tipo de archivo no válido. Se requiere: {}", .expected.join(", "))]
    UnsupportedType {
        slot: DocumentSlot,
        found: String,
        expected: Vec<&'static str>,
    },
    #[error("El archivo no puede superar {}MB", .limit_bytes / MIB)]
    TooLarge {
        slot: DocumentSlot,
        size_bytes: u64,
        limit_bytes: u64,
    },
    #[error("No se pudo leer el archivo {file_name}: {reason}")]
    Unreadable { file_name: String, reason: String },
    #[error("El documento {field} no contiene base64 válido")]
    InvalidEncoding { field: &'static str },
}

impl SlotError {
    /// Wire field the error belongs to, when it concerns a specific slot.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SlotError::UnsupportedType { slot, .. } | SlotError::TooLarge { slot, .. } => {
                Some(slot.field_name())
            }
            SlotError::InvalidEncoding { field } => Some(*field),
            SlotError::Unreadable { .. } => None,
        }
    }
}

/// Base64 payload and original filename, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    pub file_name: String,
    pub payload: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedDocuments {
    documents: BTreeMap<DocumentSlot, EncodedDocument>,
}

impl EncodedDocuments {
    pub fn get(&self, slot: DocumentSlot) -> Option<&EncodedDocument> {
        self.documents.get(&slot)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Merge payloads into a field map: the slot field gets the base64 text and the
    /// sibling name field gets the original filename.
    pub fn into_fields(self, fields: &mut FieldMap) {
        for (slot, document) in self.documents {
            fields.insert(
                slot.field_name().to_string(),
                FieldValue::Text(document.payload),
            );
            fields.insert(
                slot.name_field().to_string(),
                FieldValue::Text(document.file_name),
            );
        }
    }
}

/// Checks files against slot constraints and converts them to and from the wire encoding.
#[derive(Debug, Clone, Copy)]
pub struct DocumentEncoder {
    limit_bytes: u64,
}

impl Default for DocumentEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentEncoder {
    pub fn new() -> Self {
        Self {
            limit_bytes: WIZARD_LIMIT_BYTES,
        }
    }

    pub fn with_limit(limit_bytes: u64) -> Self {
        Self { limit_bytes }
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    /// Selection-time check: MIME type against the slot allow-list, then size against the ceiling.
    pub fn accept(
        &self,
        slot: DocumentSlot,
        file: UploadedFile,
    ) -> Result<UploadedFile, SlotError> {
        check(slot, &file, self.limit_bytes)?;
        Ok(file)
    }

    /// Same checks with the tighter single-document ceiling.
    pub fn accept_single(
        &self,
        slot: DocumentSlot,
        file: UploadedFile,
    ) -> Result<UploadedFile, SlotError> {
        check(slot, &file, SINGLE_DOCUMENT_LIMIT_BYTES.min(self.limit_bytes))?;
        Ok(file)
    }

    /// Read and base64-encode every attached document. File reads are async and the encoding
    /// runs on the blocking pool; dropping the returned future abandons the work.
    pub async fn encode_documents(
        &self,
        draft: &ApplicationDraft,
    ) -> Result<EncodedDocuments, SlotError> {
        let mut encoded = EncodedDocuments::default();
        for (slot, file) in draft.documents() {
            let bytes = file.read().await?;
            if bytes.len() as u64 > self.limit_bytes {
                return Err(SlotError::TooLarge {
                    slot: *slot,
                    size_bytes: bytes.len() as u64,
                    limit_bytes: self.limit_bytes,
                });
            }
            let payload = tokio::task::spawn_blocking(move || {
                base64::engine::general_purpose::STANDARD.encode(bytes)
            })
            .await
            .map_err(|err| SlotError::Unreadable {
                file_name: file.file_name.clone(),
                reason: err.to_string(),
            })?;

            tracing::debug!(slot = %slot, file_name = %file.file_name, "document encoded");
            encoded.documents.insert(
                *slot,
                EncodedDocument {
                    file_name: file.file_name.clone(),
                    payload,
                },
            );
        }
        Ok(encoded)
    }

    /// Server side: pull base64 payloads out of a submitted field map and check them like
    /// a fresh selection. Missing or blank slots are skipped.
    pub fn decode(
        &self,
        fields: &FieldMap,
    ) -> Result<BTreeMap<DocumentSlot, UploadedFile>, SlotError> {
        let mut documents = BTreeMap::new();
        for slot in DocumentSlot::ALL {
            let Some(payload) = fields
                .get(slot.field_name())
                .and_then(FieldValue::as_text)
                .map(str::trim)
                .filter(|payload| !payload.is_empty())
            else {
                continue;
            };

            let bytes = base64::engine::general_purpose::STANDARD
                .decode(payload.as_bytes())
                .map_err(|_| SlotError::InvalidEncoding {
                    field: slot.field_name(),
                })?;
            let file_name = fields
                .get(slot.name_field())
                .and_then(FieldValue::as_text)
                .map(str::to_string)
                .unwrap_or_else(|| default_file_name(slot));
            let mime_type = mime_guess::from_path(&file_name)
                .first_raw()
                .or_else(|| slot.accepted_types().first().copied())
                .unwrap_or(PDF)
                .to_string();

            let file = UploadedFile::from_bytes(file_name, Some(&mime_type), bytes);
            documents.insert(slot, self.accept(slot, file)?);
        }
        Ok(documents)
    }
}

fn check(slot: DocumentSlot, file: &UploadedFile, limit_bytes: u64) -> Result<(), SlotError> {
    let essence = file
        .mime_type
        .parse::<mime::Mime>()
        .map(|parsed| parsed.essence_str().to_ascii_lowercase())
        .unwrap_or_default();
    if !slot.accepted_types().contains(&essence.as_str()) {
        return Err(SlotError::UnsupportedType {
            slot,
            found: file.mime_type.clone(),
            expected: slot.accepted_types().to_vec(),
        });
    }
    if file.size_bytes > limit_bytes {
        return Err(SlotError::TooLarge {
            slot,
            size_bytes: file.size_bytes,
            limit_bytes,
        });
    }
    Ok(())
}

fn default_file_name(slot: DocumentSlot) -> String {
    let field = slot.field_name();
    match (field.strip_suffix("_pdf"), field.strip_suffix("_xls")) {
        (Some(stem), _) => format!("{stem}.pdf"),
        (None, Some(stem)) => format!("{stem}.xlsx"),
        (None, None) => field.to_string(),
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
