//! Macvtap link provisioning.
//!
//! Two entry paths end in the same pipeline:
//!
//! - **create**: a new macvtap is made on top of `master` under a random
//!   temporary name, directly inside the target namespace
//! - **import**: the existing `deviceID` is moved into the target namespace
//!   and its MTU re-applied
//!
//! Both then enable proxy ARP, rename the link to the requested name, bring
//! it up and read it back. A failure before the rename completes deletes the
//! link again; later failures leave it in place for the caller to handle.

use macvtap_common::{HardwareAddr, MacvtapError, MacvtapResult};
use macvtap_network::{LinkManager, MacvtapMode, MacvtapRequest, Namespace, temporary_name};

use crate::config::{LinkSource, NetConf};
use crate::result::Interface;
use crate::rollback::{Rollback, Undo};

/// Provisions macvtap links into one target namespace.
pub struct Provisioner<'a, M: LinkManager> {
    links: &'a M,
    netns: &'a M::Netns,
}

impl<'a, M: LinkManager> Provisioner<'a, M> {
    /// Create a provisioner targeting `netns`.
    pub const fn new(links: &'a M, netns: &'a M::Netns) -> Self {
        Self { links, netns }
    }

    /// Create or import the link described by `conf` and name it `if_name`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step that failed.
    pub async fn provision(&self, conf: &NetConf, if_name: &str) -> MacvtapResult<Interface> {
        match &conf.source {
            LinkSource::Master(master) => self.create(master, conf, if_name).await,
            LinkSource::Device(device) => self.import(device, conf, if_name).await,
        }
    }

    /// Create a new macvtap on top of `master`.
    ///
    /// # Errors
    ///
    /// - [`MacvtapError::UnknownMode`] for an unsupported mode
    /// - [`MacvtapError::ParentNotFound`] if `master` does not exist
    /// - [`MacvtapError::LinkCreateFailed`] if the kernel refuses the device
    /// - any error of the shared pipeline
    pub async fn create(
        &self,
        master: &str,
        conf: &NetConf,
        if_name: &str,
    ) -> MacvtapResult<Interface> {
        let mode = MacvtapMode::from_name(&conf.mode)?;

        let parent = self.links.link_by_name(None, master).await.map_err(|e| {
            MacvtapError::ParentNotFound {
                name: master.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mtu = conf
            .mtu
            .map(u32::try_from)
            .transpose()
            .map_err(|_| MacvtapError::InvalidMtu {
                mtu: conf.mtu.unwrap_or_default(),
                parent_mtu: parent.mtu,
            })?;

        // The final name may already exist on the host, so the link is
        // created under a random name and renamed once inside the sandbox.
        let request = MacvtapRequest {
            name: temporary_name(),
            parent_index: parent.index,
            tx_queue_len: parent.tx_queue_len,
            mtu,
            mode,
        };

        self.links
            .add_macvtap(&request, self.netns)
            .await
            .map_err(|e| MacvtapError::LinkCreateFailed {
                reason: e.to_string(),
            })?;
        tracing::debug!(
            name = %request.name,
            master,
            %mode,
            netns = %self.netns.path().display(),
            "Created macvtap"
        );

        let mut rollback = Rollback::new();
        rollback.push(Undo::DeleteLink {
            name: request.name.clone(),
        });
        self.finish(rollback, &request.name, if_name).await
    }

    /// Move the existing `device` into the target namespace.
    ///
    /// The MTU is applied as requested, with no parent to bound it.
    ///
    /// # Errors
    ///
    /// - [`MacvtapError::DeviceNotFound`] if `device` does not exist
    /// - [`MacvtapError::NamespaceMoveFailed`] if it cannot be moved
    /// - [`MacvtapError::MtuSetFailed`] if the MTU cannot be applied
    /// - any error of the shared pipeline
    pub async fn import(
        &self,
        device: &str,
        conf: &NetConf,
        if_name: &str,
    ) -> MacvtapResult<Interface> {
        self.links
            .link_by_name(None, device)
            .await
            .map_err(|e| MacvtapError::DeviceNotFound {
                name: device.to_string(),
                reason: e.to_string(),
            })?;

        self.links
            .move_to_netns(device, self.netns)
            .await
            .map_err(|e| MacvtapError::NamespaceMoveFailed {
                name: device.to_string(),
                netns: self.netns.path().to_path_buf(),
                reason: e.to_string(),
            })?;
        tracing::debug!(device, netns = %self.netns.path().display(), "Moved device");

        let mut rollback = Rollback::new();
        rollback.push(Undo::DeleteLink {
            name: device.to_string(),
        });

        if let Some(mtu) = conf.mtu {
            let applied = match u32::try_from(mtu) {
                Ok(mtu) => self
                    .links
                    .set_mtu(Some(self.netns), device, mtu)
                    .await
                    .map_err(|e| e.to_string()),
                Err(_) => Err(format!("invalid MTU {mtu}")),
            };
            if let Err(reason) = applied {
                rollback.unwind(self.links, self.netns).await;
                return Err(MacvtapError::MtuSetFailed {
                    name: device.to_string(),
                    reason,
                });
            }
        }

        self.finish(rollback, device, if_name).await
    }

    /// Shared pipeline, run against the link now named `current` inside the
    /// target namespace.
    async fn finish(
        &self,
        rollback: Rollback,
        current: &str,
        if_name: &str,
    ) -> MacvtapResult<Interface> {
        let netns = Some(self.netns);

        if let Err(err) = self.links.enable_proxy_arp(netns, current).await {
            rollback.unwind(self.links, self.netns).await;
            return Err(MacvtapError::ArpProxyFailed {
                name: current.to_string(),
                reason: err.to_string(),
            });
        }

        if let Err(err) = self.links.rename(netns, current, if_name).await {
            rollback.unwind(self.links, self.netns).await;
            return Err(MacvtapError::RenameFailed {
                from: current.to_string(),
                to: if_name.to_string(),
                reason: err.to_string(),
            });
        }
        rollback.commit();

        self.links
            .set_up(netns, if_name)
            .await
            .map_err(|e| MacvtapError::LinkUpFailed {
                name: if_name.to_string(),
                reason: e.to_string(),
            })?;

        let link = self
            .links
            .link_by_name(netns, if_name)
            .await
            .map_err(|e| MacvtapError::LinkRefreshFailed {
                name: if_name.to_string(),
                reason: e.to_string(),
            })?;

        let mac = link.mac();
        Ok(Interface {
            name: link.name,
            mac,
            sandbox: self.netns.path().display().to_string(),
        })
    }

    /// Apply an explicit hardware address to `if_name` in the target namespace.
    ///
    /// # Errors
    ///
    /// Returns [`MacvtapError::HardwareAddrFailed`] if the address is refused.
    pub async fn set_hardware_addr(&self, if_name: &str, mac: &HardwareAddr) -> MacvtapResult<()> {
        self.links
            .set_hardware_addr(Some(self.netns), if_name, mac)
            .await
            .map_err(|e| MacvtapError::HardwareAddrFailed {
                name: if_name.to_string(),
                reason: e.to_string(),
            })
    }
}
