//! Per-invocation arguments from `CNI_ARGS`.
//!
//! The argument string is a `;`-separated list of `KEY=VALUE` pairs. Keys
//! this plugin does not know are rejected unless `IgnoreUnknown` is set.

use macvtap_common::{HardwareAddr, MacvtapError, MacvtapResult};

const IGNORE_UNKNOWN: &str = "IgnoreUnknown";
const MAC: &str = "MAC";

/// Recognized `CNI_ARGS` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvArgs {
    /// Tolerate keys this plugin does not recognize.
    pub ignore_unknown: bool,
    /// Explicit hardware address for the interface.
    pub mac: Option<String>,
}

impl EnvArgs {
    /// Parse an argument string. An empty string yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`MacvtapError::InvalidEnvArgs`] for pairs without `=`, bad
    /// `IgnoreUnknown` values, or unknown keys when they are not ignored.
    pub fn parse(args: &str) -> MacvtapResult<Self> {
        let mut env = Self::default();
        if args.is_empty() {
            return Ok(env);
        }

        let pairs = args
            .split(';')
            .map(|pair| {
                pair.split_once('=')
                    .ok_or_else(|| MacvtapError::InvalidEnvArgs {
                        message: format!("invalid pair {pair:?}"),
                    })
            })
            .collect::<MacvtapResult<Vec<_>>>()?;

        // IgnoreUnknown may appear after the keys it excuses.
        for (key, value) in &pairs {
            if *key == IGNORE_UNKNOWN {
                env.ignore_unknown = parse_bool(value)?;
            }
        }

        for (key, value) in pairs {
            match key {
                IGNORE_UNKNOWN => {}
                MAC => env.mac = Some(value.to_string()).filter(|v| !v.is_empty()),
                other if env.ignore_unknown => {
                    tracing::debug!(key = other, "Ignoring unknown CNI_ARGS key");
                }
                other => {
                    return Err(MacvtapError::InvalidEnvArgs {
                        message: format!("unknown args {other:?}"),
                    });
                }
            }
        }

        Ok(env)
    }

    /// The explicit hardware address, if one was given.
    ///
    /// # Errors
    ///
    /// Returns [`MacvtapError::InvalidMac`] if the value is not a MAC address.
    pub fn hardware_addr(&self) -> MacvtapResult<Option<HardwareAddr>> {
        self.mac.as_deref().map(HardwareAddr::parse).transpose()
    }
}

fn parse_bool(value: &str) -> MacvtapResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(MacvtapError::InvalidEnvArgs {
            message: format!("boolean unmarshal error: invalid input {value:?}"),
        }),
    }
}
