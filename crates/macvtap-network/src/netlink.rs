//! rtnetlink-backed [`LinkManager`].
//!
//! A netlink socket stays bound to the namespace it was created in, so a
//! session for another namespace is opened from inside that namespace and can
//! then be driven from anywhere. Each operation uses its own short-lived
//! session.

use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

use async_trait::async_trait;
use futures::TryStreamExt;
use macvtap_common::HardwareAddr;
use rtnetlink::packet_route::link::{
    InfoData, InfoMacVtap, LinkAttribute, LinkFlags, LinkInfo, LinkMessage,
};
use rtnetlink::{Handle, LinkMacVtap, LinkMessageBuilder, LinkUnspec, new_connection};
use tokio::task::JoinHandle;

use crate::link::{Link, LinkError, LinkManager, MacvtapRequest, Namespace};
use crate::mode::{MacvtapMode, mode_name};
use crate::netns::NetNs;
use crate::sysctl;

/// Link management over rtnetlink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetlinkManager;

impl NetlinkManager {
    /// Create a new manager.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Run `f` inside `netns`, or in place when no namespace is given.
    fn in_netns<T>(
        netns: Option<&NetNs>,
        f: impl FnOnce() -> io::Result<T>,
    ) -> Result<T, LinkError> {
        match netns {
            None => Ok(f()?),
            Some(netns) => {
                let result = netns.run(f).map_err(|source| LinkError::Namespace {
                    path: netns.path().to_path_buf(),
                    source,
                })?;
                Ok(result?)
            }
        }
    }

    fn session(netns: Option<&NetNs>) -> Result<Session, LinkError> {
        Self::in_netns(netns, Session::connect)
    }

    /// Resolve `name` and apply a set request built by `build`.
    async fn set(
        netns: Option<&NetNs>,
        name: &str,
        build: impl FnOnce(LinkMessageBuilder<LinkUnspec>) -> LinkMessageBuilder<LinkUnspec> + Send,
    ) -> Result<(), LinkError> {
        let session = Self::session(netns)?;
        let index = session.get(name).await?.header.index;
        let message = build(LinkUnspec::new_with_index(index)).build();
        session.handle.link().set(message).execute().await?;
        Ok(())
    }
}

#[async_trait]
impl LinkManager for NetlinkManager {
    type Netns = NetNs;

    fn open_netns(&self, path: &Path) -> Result<NetNs, LinkError> {
        NetNs::open(path).map_err(|source| LinkError::Namespace {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn link_by_name(&self, netns: Option<&NetNs>, name: &str) -> Result<Link, LinkError> {
        let session = Self::session(netns)?;
        let message = session.get(name).await?;
        Ok(link_from_message(&message))
    }

    async fn add_macvtap(&self, request: &MacvtapRequest, target: &NetNs) -> Result<(), LinkError> {
        let mode = request.mode.to_kernel();
        tracing::debug!(
            name = %request.name,
            parent_index = request.parent_index,
            mode = mode_name(mode).unwrap_or("unknown"),
            netns = %target.path().display(),
            "Creating macvtap"
        );

        let session = Self::session(None)?;
        let mut builder = LinkMacVtap::new(&request.name, request.parent_index, mode)
            .setns_by_fd(target.as_raw_fd())
            .append_extra_attribute(LinkAttribute::TxQueueLen(request.tx_queue_len));
        if let Some(mtu) = request.mtu {
            builder = builder.mtu(mtu);
        }

        session.handle.link().add(builder.build()).execute().await?;
        Ok(())
    }

    async fn move_to_netns(&self, name: &str, target: &NetNs) -> Result<(), LinkError> {
        tracing::debug!(name, netns = %target.path().display(), "Moving link to netns");
        let fd = target.as_raw_fd();
        Self::set(None, name, move |link| link.setns_by_fd(fd)).await
    }

    async fn set_mtu(&self, netns: Option<&NetNs>, name: &str, mtu: u32) -> Result<(), LinkError> {
        tracing::debug!(name, mtu, "Setting MTU");
        Self::set(netns, name, move |link| link.mtu(mtu)).await
    }

    async fn rename(&self, netns: Option<&NetNs>, from: &str, to: &str) -> Result<(), LinkError> {
        tracing::debug!(from, to, "Renaming link");
        let to = to.to_string();
        Self::set(netns, from, move |link| link.name(to)).await
    }

    async fn set_up(&self, netns: Option<&NetNs>, name: &str) -> Result<(), LinkError> {
        tracing::debug!(name, "Bringing link up");
        Self::set(netns, name, |link| link.up()).await
    }

    async fn set_hardware_addr(
        &self,
        netns: Option<&NetNs>,
        name: &str,
        mac: &HardwareAddr,
    ) -> Result<(), LinkError> {
        tracing::debug!(name, %mac, "Setting hardware address");
        let address = mac.octets().to_vec();
        Self::set(netns, name, move |link| link.address(address)).await
    }

    async fn enable_proxy_arp(&self, netns: Option<&NetNs>, name: &str) -> Result<(), LinkError> {
        Self::in_netns(netns, || sysctl::enable_proxy_arp(name))
    }

    async fn delete(&self, netns: Option<&NetNs>, name: &str) -> Result<(), LinkError> {
        tracing::debug!(name, "Deleting link");
        let session = Self::session(netns)?;
        let index = session.get(name).await?.header.index;
        session.handle.link().del(index).execute().await?;
        Ok(())
    }
}

/// A netlink connection and the task driving it.
struct Session {
    handle: Handle,
    connection: JoinHandle<()>,
}

impl Session {
    /// Open a connection in the calling thread's current namespace.
    fn connect() -> io::Result<Self> {
        let (connection, handle, _) = new_connection()?;
        let connection = tokio::spawn(connection);
        Ok(Self { handle, connection })
    }

    async fn get(&self, name: &str) -> Result<LinkMessage, LinkError> {
        let not_found = || LinkError::NotFound {
            name: name.to_string(),
        };

        let mut links = self.handle.link().get().match_name(name.to_string()).execute();
        match links.try_next().await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => Err(not_found()),
            Err(err) => match LinkError::from(err) {
                LinkError::Kernel(err) if err.raw_os_error() == Some(libc::ENODEV) => {
                    Err(not_found())
                }
                other => Err(other),
            },
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

impl From<rtnetlink::Error> for LinkError {
    fn from(err: rtnetlink::Error) -> Self {
        match err {
            rtnetlink::Error::NetlinkError(message) => match message.code {
                Some(code) => Self::Kernel(io::Error::from_raw_os_error(-code.get())),
                None => Self::Netlink(message.to_string()),
            },
            other => Self::Netlink(other.to_string()),
        }
    }
}

fn link_from_message(message: &LinkMessage) -> Link {
    let mut link = Link {
        name: String::new(),
        index: message.header.index,
        parent_index: None,
        mtu: 0,
        tx_queue_len: 0,
        address: Vec::new(),
        mode: None,
        up: message.header.flags.contains(LinkFlags::Up),
    };

    for attribute in &message.attributes {
        match attribute {
            LinkAttribute::IfName(name) => link.name.clone_from(name),
            LinkAttribute::Mtu(mtu) => link.mtu = *mtu,
            LinkAttribute::TxQueueLen(len) => link.tx_queue_len = *len,
            LinkAttribute::Address(address) => link.address.clone_from(address),
            LinkAttribute::Link(parent) => link.parent_index = Some(*parent),
            LinkAttribute::LinkInfo(infos) => link.mode = macvtap_mode(infos),
            _ => {}
        }
    }

    link
}

fn macvtap_mode(infos: &[LinkInfo]) -> Option<MacvtapMode> {
    infos.iter().find_map(|info| match info {
        LinkInfo::Data(InfoData::MacVtap(data)) => data.iter().find_map(|item| match item {
            InfoMacVtap::Mode(mode) => MacvtapMode::from_kernel(*mode).ok(),
            _ => None,
        }),
        _ => None,
    })
}
