//! Link management capability.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use macvtap_common::HardwareAddr;
use macvtap_common::mac::format_octets;
use thiserror::Error;

use crate::mode::MacvtapMode;

/// Prefix of temporary macvtap names.
pub const TEMPORARY_PREFIX: &str = "mvtap";

/// Errors reported by a [`LinkManager`].
#[derive(Debug, Error)]
pub enum LinkError {
    /// No link with this name exists in the addressed namespace.
    #[error("link {name:?} not found")]
    NotFound {
        /// The missing link.
        name: String,
    },

    /// The kernel rejected the request.
    #[error("{0}")]
    Kernel(#[from] io::Error),

    /// The netlink exchange itself failed.
    #[error("netlink: {0}")]
    Netlink(String),

    /// A namespace could not be opened, entered or left.
    #[error("netns {path:?}: {source}")]
    Namespace {
        /// Namespace path.
        path: PathBuf,
        /// Underlying failure.
        source: io::Error,
    },
}

impl LinkError {
    /// Whether this error means the link does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A kernel network device, as seen from its owning namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Interface name.
    pub name: String,
    /// Interface index in the owning namespace.
    pub index: u32,
    /// Index of the parent device, for derived devices.
    pub parent_index: Option<u32>,
    /// Current MTU.
    pub mtu: u32,
    /// Transmit queue length.
    pub tx_queue_len: u32,
    /// Raw link-layer address.
    pub address: Vec<u8>,
    /// Macvtap mode, when the device is a macvtap in a known mode.
    pub mode: Option<MacvtapMode>,
    /// Whether the device is administratively up.
    pub up: bool,
}

impl Link {
    /// The hardware address in colon-separated form.
    #[must_use]
    pub fn mac(&self) -> String {
        format_octets(&self.address)
    }
}

/// Parameters for a new macvtap device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacvtapRequest {
    /// Name the device is created under.
    pub name: String,
    /// Index of the parent device.
    pub parent_index: u32,
    /// Transmit queue length, inherited from the parent.
    pub tx_queue_len: u32,
    /// MTU, `None` to let the kernel inherit the parent's.
    pub mtu: Option<u32>,
    /// Macvtap mode.
    pub mode: MacvtapMode,
}

/// A network namespace a [`LinkManager`] can address.
pub trait Namespace: Send + Sync {
    /// Filesystem path the namespace was opened from.
    fn path(&self) -> &Path;
}

/// Kernel link management.
///
/// Every method taking `netns: Option<&Self::Netns>` runs inside that
/// namespace, or in the caller's own namespace when it is `None`.
#[async_trait]
pub trait LinkManager: Send + Sync {
    /// Namespace handle type.
    type Netns: Namespace;

    /// Open the namespace at `path`.
    fn open_netns(&self, path: &Path) -> Result<Self::Netns, LinkError>;

    /// Look up a link by name.
    async fn link_by_name(
        &self,
        netns: Option<&Self::Netns>,
        name: &str,
    ) -> Result<Link, LinkError>;

    /// Create a macvtap device from the caller's namespace directly inside
    /// `target`. The parent index refers to the caller's namespace.
    async fn add_macvtap(
        &self,
        request: &MacvtapRequest,
        target: &Self::Netns,
    ) -> Result<(), LinkError>;

    /// Move a link from the caller's namespace into `target`.
    async fn move_to_netns(&self, name: &str, target: &Self::Netns) -> Result<(), LinkError>;

    /// Set the MTU of a link.
    async fn set_mtu(
        &self,
        netns: Option<&Self::Netns>,
        name: &str,
        mtu: u32,
    ) -> Result<(), LinkError>;

    /// Rename a link.
    async fn rename(
        &self,
        netns: Option<&Self::Netns>,
        from: &str,
        to: &str,
    ) -> Result<(), LinkError>;

    /// Bring a link administratively up.
    async fn set_up(&self, netns: Option<&Self::Netns>, name: &str) -> Result<(), LinkError>;

    /// Set the hardware address of a link.
    async fn set_hardware_addr(
        &self,
        netns: Option<&Self::Netns>,
        name: &str,
        mac: &HardwareAddr,
    ) -> Result<(), LinkError>;

    /// Enable IPv4 proxy ARP on a link.
    async fn enable_proxy_arp(
        &self,
        netns: Option<&Self::Netns>,
        name: &str,
    ) -> Result<(), LinkError>;

    /// Delete a link by name. Fails with [`LinkError::NotFound`] if it is absent.
    async fn delete(&self, netns: Option<&Self::Netns>, name: &str) -> Result<(), LinkError>;
}

/// Generate a random interface name for a link that will be renamed later.
///
/// The name is `mvtap` followed by 8 hex characters.
#[must_use]
pub fn temporary_name() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("{TEMPORARY_PREFIX}{}", hex::encode(&uuid.as_bytes()[..4]))
}
