//! Macvtap communication modes.
//!
//! The configuration speaks in mode names; the kernel speaks in
//! `IFLA_MACVLAN_MODE` values. Only this module knows both.

use std::fmt;
use std::str::FromStr;

use macvtap_common::{MacvtapError, MacvtapResult};
use rtnetlink::packet_route::link::MacVtapMode as KernelMode;

/// Macvtap mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacvtapMode {
    /// Bridge mode (endpoints on the same parent can talk directly).
    #[default]
    Bridge,
    /// Private mode (isolated from each other).
    Private,
    /// VEPA mode (requires external switch).
    Vepa,
}

impl MacvtapMode {
    /// Resolve a mode name. The empty string selects the default.
    ///
    /// # Errors
    ///
    /// Returns [`MacvtapError::UnknownMode`] for anything else.
    pub fn from_name(name: &str) -> MacvtapResult<Self> {
        match name {
            "" | "bridge" => Ok(Self::Bridge),
            "private" => Ok(Self::Private),
            "vepa" => Ok(Self::Vepa),
            other => Err(MacvtapError::UnknownMode {
                mode: other.to_string(),
            }),
        }
    }

    /// The configuration name of this mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bridge => "bridge",
            Self::Private => "private",
            Self::Vepa => "vepa",
        }
    }

    /// The kernel representation of this mode.
    #[must_use]
    pub const fn to_kernel(self) -> KernelMode {
        match self {
            Self::Bridge => KernelMode::Bridge,
            Self::Private => KernelMode::Private,
            Self::Vepa => KernelMode::Vepa,
        }
    }

    /// Map a kernel mode back to a configuration mode.
    ///
    /// # Errors
    ///
    /// Returns [`MacvtapError::UnknownMode`] for kernel modes this plugin never
    /// configures (passthru, source).
    pub fn from_kernel(mode: KernelMode) -> MacvtapResult<Self> {
        match mode {
            KernelMode::Bridge => Ok(Self::Bridge),
            KernelMode::Private => Ok(Self::Private),
            KernelMode::Vepa => Ok(Self::Vepa),
            other => Err(MacvtapError::UnknownMode {
                mode: format!("{other:?}"),
            }),
        }
    }
}

impl fmt::Display for MacvtapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MacvtapMode {
    type Err = MacvtapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl From<MacvtapMode> for KernelMode {
    fn from(mode: MacvtapMode) -> Self {
        mode.to_kernel()
    }
}

impl TryFrom<KernelMode> for MacvtapMode {
    type Error = MacvtapError;

    fn try_from(mode: KernelMode) -> Result<Self, Self::Error> {
        Self::from_kernel(mode)
    }
}

/// Name a kernel mode, for diagnostics.
///
/// # Errors
///
/// Returns [`MacvtapError::UnknownMode`] for modes outside bridge/private/vepa.
pub fn mode_name(mode: KernelMode) -> MacvtapResult<&'static str> {
    MacvtapMode::from_kernel(mode).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        assert_eq!(MacvtapMode::from_name("").unwrap(), MacvtapMode::Bridge);
        assert_eq!(MacvtapMode::from_name("bridge").unwrap(), MacvtapMode::Bridge);
        assert_eq!(MacvtapMode::from_name("private").unwrap(), MacvtapMode::Private);
        assert_eq!(MacvtapMode::from_name("vepa").unwrap(), MacvtapMode::Vepa);
    }

    #[test]
    fn test_unknown_mode() {
        let err = MacvtapMode::from_name("passthru").unwrap_err();
        assert!(matches!(err, MacvtapError::UnknownMode { ref mode } if mode == "passthru"));
        assert!(MacvtapMode::from_name("Bridge").is_err());
    }

    #[test]
    fn test_kernel_mapping() {
        assert_eq!(MacvtapMode::from_name("").unwrap().to_kernel(), KernelMode::Bridge);
        assert_eq!(MacvtapMode::from_name("vepa").unwrap().to_kernel(), KernelMode::Vepa);
        assert_eq!(mode_name(KernelMode::Private).unwrap(), "private");
        assert!(mode_name(KernelMode::Passthrough).is_err());
    }

    #[test]
    fn test_mode_default() {
        assert_eq!(MacvtapMode::default(), MacvtapMode::Bridge);
        assert_eq!(MacvtapMode::default().to_string(), "bridge");
    }
}
