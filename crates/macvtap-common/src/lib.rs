//! # macvtap-common
//!
//! Shared types for the macvtap CNI plugin.
//!
//! This crate provides functionality used by both the link layer and the
//! plugin itself:
//! - The plugin error taxonomy and its CNI error codes
//! - Validated hardware addresses
//! - Validated interface names

#![warn(missing_docs)]

pub mod error;
pub mod ifname;
pub mod mac;

pub use error::{MacvtapError, MacvtapResult};
pub use ifname::InterfaceName;
pub use mac::HardwareAddr;
