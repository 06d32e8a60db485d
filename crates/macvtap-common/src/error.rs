//! Error taxonomy for the macvtap plugin.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`MacvtapError`].
pub type MacvtapResult<T> = Result<T, MacvtapError>;

/// CNI error code: incompatible CNI version.
pub const CODE_INCOMPATIBLE_VERSION: u32 = 1;
/// CNI error code: invalid necessary environment variables.
pub const CODE_INVALID_ENVIRONMENT: u32 = 4;
/// CNI error code: I/O failure.
pub const CODE_IO_FAILURE: u32 = 5;
/// CNI error code: failed to decode content.
pub const CODE_DECODING_FAILURE: u32 = 6;
/// CNI error code: invalid network config.
pub const CODE_INVALID_NETWORK_CONFIG: u32 = 7;
/// CNI error code: internal plugin failure.
pub const CODE_INTERNAL: u32 = 999;

/// Errors produced while attaching or detaching a macvtap interface.
#[derive(Error, Diagnostic, Debug)]
pub enum MacvtapError {
    /// The network configuration could not be decoded.
    #[error("failed to load netconf: {message}")]
    #[diagnostic(code(macvtap::config::malformed))]
    MalformedConfig {
        /// What was wrong with the payload.
        message: String,
    },

    /// Both or neither of `master` and `deviceID` were set.
    #[error("{message}")]
    #[diagnostic(
        code(macvtap::config::conflict),
        help("Set exactly one of \"master\" or \"deviceID\"")
    )]
    ConfigConflict {
        /// Description of the conflict.
        message: String,
    },

    /// The requested MTU is outside `[0, parent MTU]`.
    #[error("invalid MTU {mtu}, must be [0, master MTU({parent_mtu})]")]
    #[diagnostic(code(macvtap::config::mtu))]
    InvalidMtu {
        /// The requested MTU.
        mtu: i64,
        /// MTU of the parent interface.
        parent_mtu: u32,
    },

    /// The communication mode is not one of bridge, private or vepa.
    #[error("unknown macvtap mode: {mode:?}")]
    #[diagnostic(
        code(macvtap::config::mode),
        help("Supported modes are \"bridge\", \"private\" and \"vepa\"")
    )]
    UnknownMode {
        /// The rejected mode.
        mode: String,
    },

    /// The CNI version in the configuration is not supported.
    #[error("incompatible CNI version {version:?}")]
    #[diagnostic(code(macvtap::config::version))]
    IncompatibleVersion {
        /// The requested version.
        version: String,
    },

    /// `CNI_ARGS` could not be decoded.
    #[error("invalid CNI_ARGS: {message}")]
    #[diagnostic(
        code(macvtap::args::invalid),
        help("Set IgnoreUnknown=1 to allow keys this plugin does not recognize")
    )]
    InvalidEnvArgs {
        /// What was wrong with the argument string.
        message: String,
    },

    /// A hardware address could not be parsed.
    #[error("invalid MAC address: {value:?}")]
    #[diagnostic(code(macvtap::args::mac))]
    InvalidMac {
        /// The rejected value.
        value: String,
    },

    /// The container interface name is not a valid Linux interface name.
    #[error("invalid interface name {name:?}: {reason}")]
    #[diagnostic(code(macvtap::args::ifname))]
    InvalidInterfaceName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A required invocation variable is missing or malformed.
    #[error("{message}")]
    #[diagnostic(code(macvtap::environment))]
    InvalidEnvironment {
        /// Description of the problem.
        message: String,
    },

    /// The parent interface does not exist.
    #[error("failed to lookup master {name:?}: {reason}")]
    #[diagnostic(code(macvtap::link::parent_not_found))]
    ParentNotFound {
        /// Parent interface name.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// The pre-existing device does not exist.
    #[error("failed to lookup device {name:?}: {reason}")]
    #[diagnostic(code(macvtap::link::device_not_found))]
    DeviceNotFound {
        /// Device name.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// The target namespace could not be opened.
    #[error("failed to open netns {path:?}: {reason}")]
    #[diagnostic(code(macvtap::netns::open))]
    NetnsOpenFailed {
        /// Namespace path.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// The kernel rejected the macvtap creation request.
    #[error("failed to create macvtap: {reason}")]
    #[diagnostic(
        code(macvtap::link::create),
        help("Check that the parent interface supports macvtap")
    )]
    LinkCreateFailed {
        /// Underlying failure.
        reason: String,
    },

    /// The existing device could not be moved into the target namespace.
    #[error("failed to move iface {name:?} to the netns {netns:?}: {reason}")]
    #[diagnostic(code(macvtap::link::netns_move))]
    NamespaceMoveFailed {
        /// Device name.
        name: String,
        /// Target namespace path.
        netns: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// The MTU could not be applied to the imported device.
    #[error("failed to set the macvtap MTU for {name:?}: {reason}")]
    #[diagnostic(code(macvtap::link::mtu))]
    MtuSetFailed {
        /// Device name.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// Proxy ARP could not be enabled on the new interface.
    #[error("failed to set proxy_arp on newly added interface {name:?}: {reason}")]
    #[diagnostic(code(macvtap::link::proxy_arp))]
    ArpProxyFailed {
        /// Interface name.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// The interface could not be renamed to its final name.
    #[error("failed to rename macvtap {from:?} to {to:?}: {reason}")]
    #[diagnostic(code(macvtap::link::rename))]
    RenameFailed {
        /// Name before the rename.
        from: String,
        /// Requested final name.
        to: String,
        /// Underlying failure.
        reason: String,
    },

    /// The interface could not be brought up.
    #[error("failed to set macvtap iface {name:?} up: {reason}")]
    #[diagnostic(code(macvtap::link::up))]
    LinkUpFailed {
        /// Interface name.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// The interface could not be re-read after configuration.
    #[error("failed to refetch macvtap {name:?}: {reason}")]
    #[diagnostic(code(macvtap::link::refresh))]
    LinkRefreshFailed {
        /// Interface name.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// An explicit hardware address could not be applied.
    #[error("failed to add hardware addr to {name:?}: {reason}")]
    #[diagnostic(code(macvtap::link::hardware_addr))]
    HardwareAddrFailed {
        /// Interface name.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// The interface could not be deleted during detach.
    #[error("failed to delete {name:?}: {reason}")]
    #[diagnostic(code(macvtap::link::delete))]
    DeleteFailed {
        /// Interface name.
        name: String,
        /// Underlying failure.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(macvtap::io))]
    Io(#[from] std::io::Error),
}

impl MacvtapError {
    /// The CNI error code reported for this error.
    #[must_use]
    pub const fn cni_code(&self) -> u32 {
        match self {
            Self::IncompatibleVersion { .. } => CODE_INCOMPATIBLE_VERSION,
            Self::InvalidEnvArgs { .. }
            | Self::InvalidMac { .. }
            | Self::InvalidInterfaceName { .. }
            | Self::InvalidEnvironment { .. } => CODE_INVALID_ENVIRONMENT,
            Self::MalformedConfig { .. } => CODE_DECODING_FAILURE,
            Self::ConfigConflict { .. } | Self::InvalidMtu { .. } | Self::UnknownMode { .. } => {
                CODE_INVALID_NETWORK_CONFIG
            }
            Self::Io(_) => CODE_IO_FAILURE,
            _ => CODE_INTERNAL,
        }
    }
}
