//! # macvtap-network
//!
//! Link management primitives for the macvtap CNI plugin.
//!
//! The plugin core talks to the kernel only through the [`LinkManager`]
//! trait. [`NetlinkManager`] implements it with rtnetlink and per-thread
//! network namespace switching.

#![warn(missing_docs)]

pub mod link;
pub mod mode;
pub mod netlink;
pub mod netns;
pub mod sysctl;

pub use link::{Link, LinkError, LinkManager, MacvtapRequest, Namespace, temporary_name};
pub use mode::{MacvtapMode, mode_name};
pub use netlink::NetlinkManager;
pub use netns::NetNs;
