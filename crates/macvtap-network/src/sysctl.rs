//! Kernel parameter writes under `/proc/sys`.
//!
//! `/proc/sys/net` reflects the network namespace of the thread that opens
//! it, so callers that target another namespace must write from inside it.

use std::io;
use std::path::PathBuf;

/// Path of the IPv4 `proxy_arp` switch for an interface.
#[must_use]
pub fn proxy_arp_path(interface: &str) -> PathBuf {
    PathBuf::from("/proc/sys/net/ipv4/conf")
        .join(interface)
        .join("proxy_arp")
}

/// Enable IPv4 proxy ARP on an interface in the current namespace.
pub fn enable_proxy_arp(interface: &str) -> io::Result<()> {
    write(&proxy_arp_path(interface), "1")?;
    tracing::debug!(interface, "proxy_arp enabled");
    Ok(())
}

/// Write a sysctl value, skipping the write if it is already set.
pub fn write(path: &std::path::Path, value: &str) -> io::Result<()> {
    if let Ok(current) = std::fs::read_to_string(path) {
        if current.trim() == value {
            return Ok(());
        }
    }
    std::fs::write(path, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_arp_path_keeps_dotted_names() {
        assert_eq!(
            proxy_arp_path("eth0.100"),
            PathBuf::from("/proc/sys/net/ipv4/conf/eth0.100/proxy_arp")
        );
    }

    #[test]
    fn write_skips_identical_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy_arp");
        std::fs::write(&path, "1\n").unwrap();
        write(&path, "1").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\n");

        write(&path, "0").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0");
    }
}
