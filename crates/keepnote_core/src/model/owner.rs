//! Owner identity.
//!
//! Identities are resolved by an external authenticator; core only compares
//! them for equality and uses them as channel keys.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const OWNER_NAME_MAX_CHARS: usize = 64;

static OWNER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.@-]+$").expect("valid owner name regex"));

/// Authenticated principal that owns notes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Parses and validates an owner name.
    ///
    /// Surrounding whitespace is trimmed; the remaining name must be 1-64
    /// characters of `[A-Za-z0-9_.@-]`.
    pub fn parse(value: &str) -> Result<Self, OwnerIdError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(OwnerIdError::Empty);
        }
        let len = trimmed.chars().count();
        if len > OWNER_NAME_MAX_CHARS {
            return Err(OwnerIdError::TooLong(len));
        }
        if !OWNER_NAME_RE.is_match(trimmed) {
            return Err(OwnerIdError::InvalidCharacters(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OwnerId {
    type Error = OwnerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OwnerId> for String {
    fn from(value: OwnerId) -> Self {
        value.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner name validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerIdError {
    Empty,
    TooLong(usize),
    InvalidCharacters(String),
}

impl Display for OwnerIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "owner name must not be empty"),
            Self::TooLong(len) => write!(
                f,
                "owner name has {len} characters; at most {OWNER_NAME_MAX_CHARS} are allowed"
            ),
            Self::InvalidCharacters(value) => {
                write!(f, "owner name contains unsupported characters: `{value}`")
            }
        }
    }
}

impl Error for OwnerIdError {}
