// file: src/channels/reconcile.rs
// description: decides how a zotero link is merged into the current value of a metadata channel
// reference: pure decision procedure shared by every channel writer

use crate::models::ZoteroLink;
use lazy_static::lazy_static;
use plist::Value;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

lazy_static! {
    /// A link token at the very start of a text value.
    static ref LEADING_LINK: Regex =
        Regex::new(r"^zotero://select\S*").expect("LEADING_LINK regex is valid");
}

/// Channel value in its native shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    List(Vec<String>),
}

/// Channel value as it was read from disk, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawAttribute {
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Text,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Skip,
    ReplaceLinkOnly(AttributeValue),
    Prepend(AttributeValue),
    Initialize(AttributeValue),
    Deny,
    Overwrite(AttributeValue),
}

impl Action {
    /// The value to commit, or `None` when nothing may be written.
    pub fn new_value(&self) -> Option<&AttributeValue> {
        match self {
            Action::Skip | Action::Deny => None,
            Action::ReplaceLinkOnly(value)
            | Action::Prepend(value)
            | Action::Initialize(value)
            | Action::Overwrite(value) => Some(value),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::Skip => "skip",
            Action::ReplaceLinkOnly(_) => "replace-link",
            Action::Prepend(_) => "prepend",
            Action::Initialize(_) => "initialize",
            Action::Deny => "deny",
            Action::Overwrite(_) => "overwrite",
        }
    }
}

/// What to do with a list attribute stored as a bare string that is not a
/// link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    #[default]
    Deny,
    Normalize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    pub overwrite: bool,
    pub malformed_policy: MalformedPolicy,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct MalformedValue(pub String);

/// Stored shape of a list attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListShape {
    List(Vec<String>),
    /// Not a property list, but readable as text.
    Scalar(String),
}

pub fn reconcile(
    shape: ValueShape,
    current: Option<&RawAttribute>,
    link: &ZoteroLink,
    options: ReconcileOptions,
) -> Result<Action, MalformedValue> {
    if options.overwrite {
        return Ok(Action::Overwrite(link_only(shape, link)));
    }

    let Some(current) = current else {
        return Ok(Action::Initialize(link_only(shape, link)));
    };

    match shape {
        ValueShape::Text => {
            let text = match current {
                RawAttribute::Text(text) => text.as_str(),
                RawAttribute::Bytes(bytes) => std::str::from_utf8(bytes)
                    .map_err(|e| MalformedValue(format!("text is not valid UTF-8: {}", e)))?,
            };
            Ok(reconcile_text(text, link))
        }
        ValueShape::List => {
            let parsed = match current {
                RawAttribute::Text(text) => ListShape::Scalar(text.clone()),
                RawAttribute::Bytes(bytes) => parse_list(bytes)?,
            };
            Ok(reconcile_list(parsed, link, options.malformed_policy))
        }
    }
}

fn link_only(shape: ValueShape, link: &ZoteroLink) -> AttributeValue {
    match shape {
        ValueShape::Text => AttributeValue::Text(link.to_string()),
        ValueShape::List => AttributeValue::List(vec![link.to_string()]),
    }
}

fn reconcile_text(text: &str, link: &ZoteroLink) -> Action {
    if text.trim().is_empty() {
        return Action::Initialize(AttributeValue::Text(link.to_string()));
    }

    match LEADING_LINK.find(text) {
        Some(token) if token.as_str() == link.as_str() => Action::Skip,
        Some(token) => {
            let mut updated = String::with_capacity(text.len() + link.as_str().len());
            updated.push_str(link.as_str());
            updated.push_str(&text[token.end()..]);
            Action::ReplaceLinkOnly(AttributeValue::Text(updated))
        }
        None => Action::Deny,
    }
}

fn reconcile_list(parsed: ListShape, link: &ZoteroLink, policy: MalformedPolicy) -> Action {
    match parsed {
        ListShape::List(items) if items.is_empty() => {
            Action::Initialize(AttributeValue::List(vec![link.to_string()]))
        }
        ListShape::List(mut items) => {
            if items[0] == link.as_str() {
                Action::Skip
            } else if ZoteroLink::is_link_like(&items[0]) {
                items[0] = link.to_string();
                Action::ReplaceLinkOnly(AttributeValue::List(items))
            } else {
                items.insert(0, link.to_string());
                Action::Prepend(AttributeValue::List(items))
            }
        }
        ListShape::Scalar(text) if text.trim().is_empty() || text == link.as_str() => {
            // Same content, wrong shape: rewrite it as a proper list.
            Action::Initialize(AttributeValue::List(vec![link.to_string()]))
        }
        ListShape::Scalar(text) if ZoteroLink::is_link_like(&text) => {
            Action::ReplaceLinkOnly(AttributeValue::List(vec![link.to_string()]))
        }
        ListShape::Scalar(text) => match policy {
            MalformedPolicy::Deny => Action::Deny,
            MalformedPolicy::Normalize => {
                Action::Prepend(AttributeValue::List(vec![link.to_string(), text]))
            }
        },
    }
}

/// Parses the stored bytes of a list attribute. Binary property lists must
/// hold an array of strings; anything else that is valid UTF-8 is treated
/// as a bare string.
pub fn parse_list(raw: &[u8]) -> Result<ListShape, MalformedValue> {
    if !raw.starts_with(b"bplist") {
        return String::from_utf8(raw.to_vec())
            .map(ListShape::Scalar)
            .map_err(|_| MalformedValue("value is neither a property list nor text".to_string()));
    }

    let value = Value::from_reader(Cursor::new(raw))
        .map_err(|e| MalformedValue(format!("unable to parse property list: {}", e)))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                other => Err(MalformedValue(format!(
                    "property list holds a non-string element: {:?}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ListShape::List),
        Value::String(text) => Ok(ListShape::Scalar(text)),
        other => Err(MalformedValue(format!(
            "property list is not an array: {:?}",
            other
        ))),
    }
}
