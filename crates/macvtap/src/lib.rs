//! # macvtap CNI plugin
//!
//! Attaches a macvtap interface to a container network namespace, either by
//! creating one on top of a parent interface (`master`) or by importing an
//! existing device (`deviceID`).
//!
//! ## Usage
//!
//! ```no_run
//! use macvtap::commands::{self, CmdArgs};
//! use macvtap_network::NetlinkManager;
//!
//! # async fn example() -> macvtap_common::MacvtapResult<()> {
//! let args = CmdArgs {
//!     container_id: "dummy".to_string(),
//!     netns: Some("/var/run/netns/sandbox".into()),
//!     if_name: "net1".to_string(),
//!     args: Some("IgnoreUnknown=1;MAC=0a:59:00:dc:6a:e0".to_string()),
//!     stdin_data: br#"{"cniVersion":"1.0.0","name":"mynet","type":"macvtap","master":"eth0"}"#
//!         .to_vec(),
//! };
//!
//! let result = commands::attach(&NetlinkManager::new(), &args).await?;
//! println!("{}", serde_json::to_string(&result).unwrap());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod args;
pub mod cli;
pub mod commands;
pub mod config;
pub mod provision;
pub mod result;
pub mod rollback;

/// Type tag this plugin answers to in network configurations.
pub const PLUGIN_TYPE: &str = "macvtap";
