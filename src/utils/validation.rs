// file: src/utils/validation.rs
// description: validation of credentials and command-line inputs
// reference: https://www.zotero.org/support/dev/web_api/v3/basics

use crate::error::{Result, ZowieError};
use std::path::Path;

/// Zotero keys are 24 characters; anything shorter than this is rejected.
pub const MIN_API_KEY_LENGTH: usize = 20;

pub struct Validator;

impl Validator {
    pub fn validate_api_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(ZowieError::BadArgument("API key is empty".to_string()));
        }

        if !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ZowieError::BadArgument(
                "API key must contain only letters and digits".to_string(),
            ));
        }

        if key.len() < MIN_API_KEY_LENGTH {
            return Err(ZowieError::BadArgument(format!(
                "API key is too short ({} characters, expected at least {})",
                key.len(),
                MIN_API_KEY_LENGTH
            )));
        }

        Ok(())
    }

    pub fn validate_user_id(user_id: &str) -> Result<()> {
        if user_id.is_empty() || !user_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ZowieError::BadArgument(format!(
                "User ID must be a number: \"{}\"",
                user_id
            )));
        }

        user_id
            .parse::<u64>()
            .map(|_| ())
            .map_err(|e| ZowieError::BadArgument(format!("Invalid user ID {}: {}", user_id, e)))
    }

    /// Positional arguments that start with a dash were meant as options.
    pub fn validate_not_option_like(args: &[impl AsRef<Path>]) -> Result<()> {
        let bad: Vec<String> = args
            .iter()
            .map(|a| a.as_ref().to_string_lossy().to_string())
            .filter(|a| a.starts_with('-') && a.len() > 1)
            .collect();

        if bad.is_empty() {
            Ok(())
        } else {
            Err(ZowieError::BadArgument(format!(
                "Unrecognized option(s): {}",
                bad.join(", ")
            )))
        }
    }

    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ZowieError::Validation(format!(
                "Invalid URL format: {}",
                url
            )));
        }
        Ok(())
    }
}
