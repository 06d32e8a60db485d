//! Payloads written back to the container runtime.

use macvtap_common::MacvtapError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};

use crate::config::{CURRENT_VERSION, SUPPORTED_VERSIONS};

/// An interface created or configured by the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// Interface name inside the sandbox.
    pub name: String,
    /// Hardware address.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mac: String,
    /// Path of the network namespace holding the interface.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sandbox: String,
}

/// Successful `ADD` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CniResult {
    /// CNI version echoed from the configuration.
    pub cni_version: String,
    /// Interfaces the plugin set up.
    pub interfaces: Vec<Interface>,
}

impl CniResult {
    /// Create a result for the given version.
    #[must_use]
    pub fn new(cni_version: impl Into<String>, interfaces: Vec<Interface>) -> Self {
        Self {
            cni_version: cni_version.into(),
            interfaces,
        }
    }
}

/// `VERSION` command output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Version of this output.
    pub cni_version: String,
    /// Every CNI version the plugin accepts.
    pub supported_versions: Vec<String>,
}

impl VersionInfo {
    /// The versions this build supports.
    #[must_use]
    pub fn current() -> Self {
        Self {
            cni_version: CURRENT_VERSION.to_string(),
            supported_versions: SUPPORTED_VERSIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Error object printed on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    /// CNI version of this output.
    pub cni_version: String,
    /// CNI error code.
    pub code: u32,
    /// Short error message.
    pub msg: String,
    /// Extra detail, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
}

impl From<&MacvtapError> for ErrorResult {
    fn from(err: &MacvtapError) -> Self {
        Self {
            cni_version: CURRENT_VERSION.to_string(),
            code: err.cni_code(),
            msg: err.to_string(),
            details: err.help().map(|h| h.to_string()).unwrap_or_default(),
        }
    }
}
