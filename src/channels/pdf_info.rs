// file: src/channels/pdf_info.rs
// description: string fields of the PDF document information dictionary (Subject, Producer)
// reference: https://docs.rs/lopdf, PDF 32000-1:2008 section 14.3.3

use crate::channels::{AttributeValue, Channel, ChannelKind, RawAttribute, ValueShape};
use crate::error::ChannelError;
use crate::scan::FileType;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoField {
    Subject,
    Producer,
}

impl InfoField {
    pub fn key(&self) -> &'static str {
        match self {
            InfoField::Subject => "Subject",
            InfoField::Producer => "Producer",
        }
    }
}

pub struct PdfInfo {
    field: InfoField,
}

impl PdfInfo {
    pub fn new(field: InfoField) -> Self {
        Self { field }
    }

    fn pdf_error(&self, path: &Path, err: impl std::fmt::Display) -> ChannelError {
        ChannelError::Pdf {
            path: path.to_path_buf(),
            message: format!("{} field: {}", self.field.key(), err),
        }
    }
}

impl Channel for PdfInfo {
    fn kind(&self) -> ChannelKind {
        match self.field {
            InfoField::Subject => ChannelKind::PdfSubject,
            InfoField::Producer => ChannelKind::PdfProducer,
        }
    }

    fn description(&self) -> &'static str {
        match self.field {
            InfoField::Subject => {
                "Writes the Zotero select link into the \"Subject\" metadata field of each PDF \
                 file. If the field already starts with a Zotero select link, only the link is \
                 updated; any other non-empty value is left untouched unless the overwrite \
                 option is given. The \"Subject\" field is not the \"Title\" field and is \
                 unused by many people, which makes it a convenient place for the link. It is \
                 visible in Preview, Acrobat, DEVONthink and other PDF viewers."
            }
            InfoField::Producer => {
                "Writes the Zotero select link into the \"Producer\" metadata field of each PDF \
                 file. If the field already starts with a Zotero select link, only the link is \
                 updated; any other non-empty value is left untouched unless the overwrite \
                 option is given. Some archivists and forensic investigators rely on the \
                 \"Producer\" field, so overwriting it may be undesirable."
            }
        }
    }

    fn shape(&self) -> ValueShape {
        ValueShape::Text
    }

    fn applies_to(&self, file_type: &FileType) -> bool {
        *file_type == FileType::Pdf
    }

    fn read(&self, path: &Path) -> Result<Option<RawAttribute>, ChannelError> {
        debug!("Reading PDF file {}", path.display());
        let document = Document::load(path).map_err(|e| self.pdf_error(path, e))?;

        let value = info_dictionary(&document)
            .and_then(|info| info.get(self.field.key().as_bytes()).ok())
            .and_then(|object| match object {
                Object::String(bytes, _) => Some(decode_text_string(bytes)),
                _ => None,
            });

        Ok(value.map(RawAttribute::Text))
    }

    fn write(&self, path: &Path, value: &AttributeValue) -> Result<(), ChannelError> {
        let AttributeValue::Text(text) = value else {
            return Err(self.pdf_error(path, "document info fields hold text only"));
        };

        let mut document = Document::load(path).map_err(|e| self.pdf_error(path, e))?;
        let info_id = ensure_info_dictionary(&mut document);
        let info = document
            .get_object_mut(info_id)
            .and_then(|object| object.as_dict_mut())
            .map_err(|e| self.pdf_error(path, e))?;
        info.set(self.field.key(), encode_text_string(text));

        debug!("Rewriting PDF file {} with new {} field", path.display(), self.field.key());
        replace_via_staging(path, |staging| {
            document
                .save(staging)
                .map(|_| ())
                .map_err(|e| self.pdf_error(path, e))
        })
    }
}

/// Writes the new file next to `path` and renames it into place. The
/// staging file never outlives a failed write.
fn replace_via_staging(
    path: &Path,
    save: impl FnOnce(&Path) -> Result<(), ChannelError>,
) -> Result<(), ChannelError> {
    let staging = staging_path(path);
    if let Err(e) = save(&staging) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    fs::rename(&staging, path).map_err(|e| {
        let _ = fs::remove_file(&staging);
        ChannelError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Returns the object id of the info dictionary, creating or hoisting one
/// into an indirect object as needed.
fn ensure_info_dictionary(document: &mut Document) -> ObjectId {
    let existing: Result<ObjectId, Dictionary> = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) if document.get_dictionary(*id).is_ok() => Ok(*id),
        Ok(Object::Dictionary(dict)) => Err(dict.clone()),
        _ => Err(Dictionary::new()),
    };

    match existing {
        Ok(id) => id,
        Err(dict) => {
            let id = document.add_object(dict);
            document.trailer.set("Info", Object::Reference(id));
            id
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".zowie-tmp");
    path.with_file_name(name)
}

/// Decodes a PDF text string: UTF-16BE with a byte order mark, otherwise
/// UTF-8 when it is valid, otherwise Latin-1 as an approximation of
/// PDFDocEncoding.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => body.iter().map(|&b| b as char).collect(),
    }
}

pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
