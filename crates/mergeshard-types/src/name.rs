//! Dataset base names.

use std::fmt;

use mergeshard_error::{Result, ShardError};

/// Reject names no backend can store as a table identifier.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ShardError::invalid_identifier(name, "identifier is empty"));
    }
    if name.contains('\0') {
        return Err(ShardError::invalid_identifier(
            name,
            "identifier contains a NUL byte",
        ));
    }
    Ok(())
}

/// Base name of a logical dataset (e.g. `report`).
///
/// The aggregate union table is named exactly like the base; partitions and
/// the template hang off it with a `_` separator. An empty or blank base is
/// a configuration error, not an identifier error.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BaseName(String);

impl BaseName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ShardError::configuration("dataset base name is empty"));
        }
        validate_identifier(&name)?;
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BaseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for BaseName {
    type Error = ShardError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for BaseName {
    type Error = ShardError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_name() {
        let base = BaseName::new("report").unwrap();
        assert_eq!(base.as_str(), "report");
        assert_eq!(base.to_string(), "report");
    }

    #[test]
    fn empty_base_is_configuration_error() {
        assert!(matches!(
            BaseName::new(""),
            Err(ShardError::Configuration { .. })
        ));
        assert!(matches!(
            BaseName::new("   "),
            Err(ShardError::Configuration { .. })
        ));
    }

    #[test]
    fn nul_byte_is_rejected() {
        assert!(matches!(
            BaseName::try_from("rep\0ort"),
            Err(ShardError::InvalidIdentifier { .. })
        ));
    }
}
