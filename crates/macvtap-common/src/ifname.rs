//! Linux interface name validation.

use std::fmt;
use std::str::FromStr;

use crate::error::{MacvtapError, MacvtapResult};

/// A validated Linux network interface name.
///
/// Interface names must:
/// - Be 1-15 bytes long (`IFNAMSIZ - 1`)
/// - Not be `.` or `..`
/// - Not contain `/`, `:` or whitespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceName(String);

impl InterfaceName {
    /// Maximum length of an interface name.
    pub const MAX_LENGTH: usize = 15;

    /// Create a new interface name, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`MacvtapError::InvalidInterfaceName`] if the name is not usable.
    pub fn new(name: impl Into<String>) -> MacvtapResult<Self> {
        let name = name.into();
        if let Err(reason) = Self::validate(&name) {
            return Err(MacvtapError::InvalidInterfaceName { name, reason });
        }
        Ok(Self(name))
    }

    /// Get the interface name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(name: &str) -> Result<(), &'static str> {
        if name.is_empty() {
            return Err("interface name is empty");
        }
        if name.len() > Self::MAX_LENGTH {
            return Err("interface name is longer than 15 characters");
        }
        if name == "." || name == ".." {
            return Err("interface name is . or ..");
        }
        if name.chars().any(|c| c == '/' || c == ':' || c.is_whitespace()) {
            return Err("interface name contains / or : or whitespace characters");
        }
        Ok(())
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InterfaceName {
    type Err = MacvtapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for InterfaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
