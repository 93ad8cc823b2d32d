//! Error types for rirset.

use thiserror::Error;

use crate::delegation::AddressFamily;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RirsetError {
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Invalid {family} start address: {value}")]
    InvalidAddress {
        family: AddressFamily,
        value: String,
    },

    #[error("Invalid {family} allocation size '{value}': {reason}")]
    InvalidSize {
        family: AddressFamily,
        value: String,
        reason: String,
    },

    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("Rule-set compilation failed: {0}")]
    Compile(String),
}

pub type Result<T> = std::result::Result<T, RirsetError>;
