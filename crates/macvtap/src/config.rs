//! Network configuration loading and validation.

use macvtap_common::{MacvtapError, MacvtapResult};
use macvtap_network::LinkManager;
use serde::Deserialize;

use crate::PLUGIN_TYPE;

/// CNI versions this plugin accepts and emits.
pub const SUPPORTED_VERSIONS: &[&str] = &["0.1.0", "0.2.0", "0.3.0", "0.3.1", "0.4.0", "1.0.0"];

/// Newest supported CNI version.
pub const CURRENT_VERSION: &str = "1.0.0";

/// Version assumed for configurations without `cniVersion`.
pub const IMPLICIT_VERSION: &str = "0.1.0";

/// Where the macvtap device comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSource {
    /// Create a new macvtap on top of this parent interface.
    Master(String),
    /// Import this existing device.
    Device(String),
}

/// Validated network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConf {
    /// CNI version of the configuration.
    pub cni_version: String,
    /// Network name.
    pub name: String,
    /// Plugin type tag.
    pub plugin_type: String,
    /// Parent interface or existing device.
    pub source: LinkSource,
    /// Macvtap mode name, empty for the default.
    pub mode: String,
    /// Requested MTU. `None` inherits the kernel's choice.
    pub mtu: Option<i64>,
}

/// Wire form of the configuration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNetConf {
    #[serde(default)]
    cni_version: String,
    name: String,
    #[serde(rename = "type")]
    plugin_type: String,
    #[serde(default)]
    master: Option<String>,
    #[serde(default, rename = "deviceID")]
    device_id: Option<String>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    mtu: Option<i64>,
}

impl NetConf {
    /// Decode a configuration payload, returning it with its CNI version.
    ///
    /// # Errors
    ///
    /// - [`MacvtapError::MalformedConfig`] if the payload does not decode or
    ///   names another plugin type
    /// - [`MacvtapError::ConfigConflict`] unless exactly one of `master` and
    ///   `deviceID` is set
    /// - [`MacvtapError::IncompatibleVersion`] for unsupported CNI versions
    pub fn load(bytes: &[u8]) -> MacvtapResult<(Self, String)> {
        let raw: RawNetConf =
            serde_json::from_slice(bytes).map_err(|e| MacvtapError::MalformedConfig {
                message: e.to_string(),
            })?;

        if raw.plugin_type != PLUGIN_TYPE {
            return Err(MacvtapError::MalformedConfig {
                message: format!(
                    "type {:?} does not match plugin type {PLUGIN_TYPE:?}",
                    raw.plugin_type
                ),
            });
        }

        let master = raw.master.filter(|m| !m.is_empty());
        let device_id = raw.device_id.filter(|d| !d.is_empty());
        let source = match (master, device_id) {
            (Some(_), Some(_)) => {
                return Err(MacvtapError::ConfigConflict {
                    message: r#""deviceID" attribute cannot be used with "master" attribute."#
                        .to_string(),
                });
            }
            (None, None) => {
                return Err(MacvtapError::ConfigConflict {
                    message: r#"Either (exclusive) "deviceID" or "master" attributes are required."#
                        .to_string(),
                });
            }
            (Some(master), None) => LinkSource::Master(master),
            (None, Some(device_id)) => LinkSource::Device(device_id),
        };

        let cni_version = if raw.cni_version.is_empty() {
            IMPLICIT_VERSION.to_string()
        } else {
            raw.cni_version
        };
        if !SUPPORTED_VERSIONS.contains(&cni_version.as_str()) {
            return Err(MacvtapError::IncompatibleVersion {
                version: cni_version,
            });
        }

        let conf = Self {
            cni_version,
            name: raw.name,
            plugin_type: raw.plugin_type,
            source,
            mode: raw.mode.unwrap_or_default(),
            mtu: raw.mtu.filter(|&mtu| mtu != 0),
        };
        let version = conf.cni_version.clone();
        Ok((conf, version))
    }

    /// Check the configuration against the host.
    ///
    /// For a `master` source the parent must exist and the MTU must lie in
    /// `[0, parent MTU]`. Imported devices get no MTU bound.
    ///
    /// # Errors
    ///
    /// Returns [`MacvtapError::ParentNotFound`] or [`MacvtapError::InvalidMtu`].
    pub async fn validate<M: LinkManager>(&self, links: &M) -> MacvtapResult<()> {
        if let LinkSource::Master(master) = &self.source {
            let parent = links.link_by_name(None, master).await.map_err(|e| {
                MacvtapError::ParentNotFound {
                    name: master.clone(),
                    reason: e.to_string(),
                }
            })?;
            check_mtu(self.mtu, parent.mtu)?;
        }
        Ok(())
    }
}

/// Check a requested MTU against the parent's.
///
/// # Errors
///
/// Returns [`MacvtapError::InvalidMtu`] if the MTU is negative or larger than
/// the parent's.
pub fn check_mtu(mtu: Option<i64>, parent_mtu: u32) -> MacvtapResult<()> {
    match mtu {
        Some(mtu) if mtu < 0 || mtu > i64::from(parent_mtu) => {
            Err(MacvtapError::InvalidMtu { mtu, parent_mtu })
        }
        _ => Ok(()),
    }
}
