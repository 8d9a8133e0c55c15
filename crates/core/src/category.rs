#![forbid(unsafe_code)]

use crate::ids::CategoryId;
use serde::Serialize;

const MAX_NAME_LEN: usize = 255;
const MAX_PREFIX_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub prefix: String,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    #[error("category name must not be empty")]
    EmptyName,
    #[error("category name is too long")]
    NameTooLong,
    #[error("category prefix is too long")]
    PrefixTooLong,
}

/// Trims and checks a category name/prefix pair.
pub fn normalize_category(name: &str, prefix: &str) -> Result<(String, String), CategoryError> {
    let name = name.trim();
    let prefix = prefix.trim();
    if name.is_empty() {
        return Err(CategoryError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CategoryError::NameTooLong);
    }
    if prefix.chars().count() > MAX_PREFIX_LEN {
        return Err(CategoryError::PrefixTooLong);
    }
    Ok((name.to_string(), prefix.to_string()))
}
