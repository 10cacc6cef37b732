// file: src/channels/finder_comment.rs
// description: macOS Finder comments, read and written through Finder's AppleScript dictionary
// reference: https://developer.apple.com/library/archive/documentation/AppleScript/Conceptual/AppleScriptLangGuide

use crate::channels::{AttributeValue, Channel, ChannelKind, RawAttribute, ValueShape};
use crate::error::ChannelError;
use std::path::Path;
use std::process::Command;
use tracing::debug;

const GET_COMMENT: &[&str] = &[
    "on run argv",
    "tell application \"Finder\"",
    "set c to comment of (POSIX file (item 1 of argv) as alias)",
    "if c is missing value then return \"\"",
    "return c",
    "end tell",
    "end run",
];

// Clearing first avoids Finder keeping a stale copy of the old comment.
const SET_COMMENT: &[&str] = &[
    "on run argv",
    "tell application \"Finder\"",
    "set f to (POSIX file (item 1 of argv) as alias)",
    "set comment of f to \"\"",
    "set comment of f to (item 2 of argv) as Unicode text",
    "end tell",
    "end run",
];

pub struct FinderComment;

impl Channel for FinderComment {
    fn kind(&self) -> ChannelKind {
        ChannelKind::FinderComment
    }

    fn description(&self) -> &'static str {
        "(Default method.) Writes the Zotero select link into the Finder comments of each \
         file. If the comment already starts with a Zotero select link, only that link is \
         updated and the rest of the comment is left untouched. Otherwise the comment is \
         only written when it is empty or the overwrite option is given. Finder comments \
         are easy to get into inconsistent states, so avoid this method for comments you \
         cannot afford to lose."
    }

    fn shape(&self) -> ValueShape {
        ValueShape::Text
    }

    fn read(&self, path: &Path) -> Result<Option<RawAttribute>, ChannelError> {
        debug!("Reading Finder comments of {}", path.display());
        let comment = run_script(GET_COMMENT, path, &[])?;
        let comment = comment.strip_suffix('\n').unwrap_or(&comment);

        if comment.is_empty() {
            Ok(None)
        } else {
            Ok(Some(RawAttribute::Text(comment.to_string())))
        }
    }

    fn write(&self, path: &Path, value: &AttributeValue) -> Result<(), ChannelError> {
        let AttributeValue::Text(comment) = value else {
            return Err(ChannelError::Script {
                path: path.to_path_buf(),
                message: "Finder comments hold text only".to_string(),
            });
        };

        debug!("Setting Finder comments of {}", path.display());
        run_script(SET_COMMENT, path, &[comment.as_str()])?;
        Ok(())
    }
}

fn run_script(lines: &[&str], path: &Path, extra_args: &[&str]) -> Result<String, ChannelError> {
    let mut command = Command::new("osascript");
    for line in lines {
        command.arg("-e").arg(line);
    }
    command.arg(path).args(extra_args);

    let output = command.output().map_err(|e| ChannelError::Script {
        path: path.to_path_buf(),
        message: format!("cannot run osascript: {}", e),
    })?;

    if !output.status.success() {
        return Err(ChannelError::Script {
            path: path.to_path_buf(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
