use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Name of the routing daemon's ROA table.
///
/// The name is spliced into every command line, so it must be a single
/// printable token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Borrows the table name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for TableName {
    type Err = TableNameError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(TableNameError::Empty);
        }
        if input
            .chars()
            .any(|character| character.is_whitespace() || character.is_control())
        {
            return Err(TableNameError::InvalidCharacter(input.to_owned()));
        }
        Ok(Self(input.to_owned()))
    }
}

/// Errors raised when validating a [`TableName`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableNameError {
    /// The configured name was empty.
    #[error("table name must not be empty")]
    Empty,
    /// The name contained whitespace or control characters.
    #[error("table name '{0}' must not contain whitespace or control characters")]
    InvalidCharacter(String),
}
