// file: src/channels/where_from.rs
// description: the "Where from" extended attribute, a binary property list of strings
// reference: https://docs.rs/xattr, https://docs.rs/plist

use crate::channels::{AttributeValue, Channel, ChannelKind, RawAttribute, ValueShape};
use crate::error::ChannelError;
use plist::Value;
use std::path::Path;
use tracing::debug;

pub const WHERE_FROMS_ATTRIBUTE: &str = "com.apple.metadata:kMDItemWhereFroms";

pub struct WhereFrom;

impl Channel for WhereFrom {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WhereFrom
    }

    fn description(&self) -> &'static str {
        "Writes the Zotero select link to the \"Where from\" metadata field of each file \
         (the com.apple.metadata:kMDItemWhereFroms extended attribute), which web \
         browsers use to record a download origin. The field is a list: an existing \
         Zotero select link in the first position is updated, otherwise the link is \
         prepended and the other values are kept. With the overwrite option the list is \
         replaced by the link alone. Finder only shows the new value when Spotlight \
         indexes the volume."
    }

    fn shape(&self) -> ValueShape {
        ValueShape::List
    }

    fn read(&self, path: &Path) -> Result<Option<RawAttribute>, ChannelError> {
        debug!("Reading {} of {}", WHERE_FROMS_ATTRIBUTE, path.display());
        let value = xattr::get(path, WHERE_FROMS_ATTRIBUTE).map_err(|e| ChannelError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(value.map(RawAttribute::Bytes))
    }

    fn write(&self, path: &Path, value: &AttributeValue) -> Result<(), ChannelError> {
        let AttributeValue::List(items) = value else {
            return Err(ChannelError::Malformed {
                path: path.to_path_buf(),
                attribute: WHERE_FROMS_ATTRIBUTE,
                message: "expected a list of strings".to_string(),
            });
        };

        let binary = encode_list(items).map_err(|message| ChannelError::Malformed {
            path: path.to_path_buf(),
            attribute: WHERE_FROMS_ATTRIBUTE,
            message,
        })?;

        debug!("Writing {} of {}", WHERE_FROMS_ATTRIBUTE, path.display());
        xattr::set(path, WHERE_FROMS_ATTRIBUTE, &binary).map_err(|e| ChannelError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

pub fn encode_list(items: &[String]) -> Result<Vec<u8>, String> {
    let value = Value::Array(items.iter().cloned().map(Value::String).collect());
    let mut buffer = Vec::new();
    plist::to_writer_binary(&mut buffer, &value).map_err(|e| e.to_string())?;
    Ok(buffer)
}
