//! In-memory link manager for exercising the plugin without privileges.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use macvtap_common::HardwareAddr;
use macvtap_network::{Link, LinkError, LinkManager, MacvtapRequest, Namespace};
use parking_lot::Mutex;

/// Parent interface every fixture starts with.
pub const MASTER_NAME: &str = "eth0";
/// Sandbox namespace every fixture starts with.
pub const SANDBOX: &str = "/var/run/netns/sandbox";
/// Address used by the explicit-MAC tests.
pub const MAC_ADDRESS: &str = "0a:59:00:dc:6a:e0";

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Create,
    Move,
    Mtu,
    ProxyArp,
    Rename,
    Up,
    HardwareAddr,
    Delete,
}

/// Namespace handle of the fake.
#[derive(Debug, Clone)]
pub struct FakeNetns {
    path: PathBuf,
}

impl Namespace for FakeNetns {
    fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone)]
struct FakeLink {
    link: Link,
    proxy_arp: bool,
}

#[derive(Debug, Default)]
struct State {
    /// Links per namespace; `None` is the caller's namespace.
    namespaces: HashMap<Option<PathBuf>, Vec<FakeLink>>,
    next_index: u32,
    faults: HashSet<Fault>,
    deleted: Vec<String>,
}

impl State {
    fn links(&mut self, netns: Option<&Path>) -> Result<&mut Vec<FakeLink>, LinkError> {
        let key = netns.map(Path::to_path_buf);
        self.namespaces
            .get_mut(&key)
            .ok_or_else(|| LinkError::Namespace {
                path: key.unwrap_or_default(),
                source: io::ErrorKind::NotFound.into(),
            })
    }

    fn find(&mut self, netns: Option<&Path>, name: &str) -> Result<&mut FakeLink, LinkError> {
        self.links(netns)?
            .iter_mut()
            .find(|l| l.link.name == name)
            .ok_or_else(|| LinkError::NotFound {
                name: name.to_string(),
            })
    }

    fn check(&self, fault: Fault) -> Result<(), LinkError> {
        if self.faults.contains(&fault) {
            return Err(LinkError::Kernel(io::Error::other(format!(
                "injected {fault:?} failure"
            ))));
        }
        Ok(())
    }

    fn allocate_index(&mut self) -> u32 {
        self.next_index += 1;
        self.next_index
    }
}

/// Fake kernel with a host namespace and any number of sandboxes.
#[derive(Debug)]
pub struct FakeLinks {
    state: Mutex<State>,
}

impl Default for FakeLinks {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLinks {
    /// Empty host namespace.
    pub fn new() -> Self {
        let mut state = State::default();
        state.namespaces.insert(None, Vec::new());
        Self {
            state: Mutex::new(state),
        }
    }

    /// Host with `eth0` (MTU 1500) and one sandbox namespace.
    pub fn with_master() -> (Self, FakeNetns) {
        let links = Self::new();
        links.add_link(None, MASTER_NAME, 1500);
        let netns = links.add_netns(SANDBOX);
        (links, netns)
    }

    /// Register a namespace.
    pub fn add_netns(&self, path: &str) -> FakeNetns {
        let path = PathBuf::from(path);
        self.state
            .lock()
            .namespaces
            .insert(Some(path.clone()), Vec::new());
        FakeNetns { path }
    }

    /// Add a plain link and return its index.
    pub fn add_link(&self, netns: Option<&Path>, name: &str, mtu: u32) -> u32 {
        let mut state = self.state.lock();
        let index = state.allocate_index();
        let link = Link {
            name: name.to_string(),
            index,
            parent_index: None,
            mtu,
            tx_queue_len: 1000,
            address: mac_for(index),
            mode: None,
            up: false,
        };
        state
            .links(netns)
            .expect("namespace exists")
            .push(FakeLink {
                link,
                proxy_arp: false,
            });
        index
    }

    /// Snapshot of a link.
    pub fn link(&self, netns: Option<&Path>, name: &str) -> Option<Link> {
        self.state
            .lock()
            .find(netns, name)
            .ok()
            .map(|l| l.link.clone())
    }

    /// Whether proxy ARP is enabled on a link.
    pub fn proxy_arp(&self, netns: Option<&Path>, name: &str) -> bool {
        self.state
            .lock()
            .find(netns, name)
            .is_ok_and(|l| l.proxy_arp)
    }

    /// Names of all links in a namespace.
    pub fn names(&self, netns: Option<&Path>) -> Vec<String> {
        self.state
            .lock()
            .links(netns)
            .map(|links| links.iter().map(|l| l.link.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Make an operation fail from now on.
    pub fn fail(&self, fault: Fault) {
        self.state.lock().faults.insert(fault);
    }

    /// Names passed to successful deletes, in order.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }
}

fn mac_for(index: u32) -> Vec<u8> {
    let [a, b, c, d] = index.to_be_bytes();
    vec![0x0a, 0x58, a, b, c, d]
}

fn key(netns: Option<&FakeNetns>) -> Option<&Path> {
    netns.map(|n| n.path.as_path())
}

#[async_trait]
impl LinkManager for FakeLinks {
    type Netns = FakeNetns;

    fn open_netns(&self, path: &Path) -> Result<FakeNetns, LinkError> {
        let mut state = self.state.lock();
        state.links(Some(path))?;
        Ok(FakeNetns {
            path: path.to_path_buf(),
        })
    }

    async fn link_by_name(
        &self,
        netns: Option<&FakeNetns>,
        name: &str,
    ) -> Result<Link, LinkError> {
        let mut state = self.state.lock();
        state.find(key(netns), name).map(|l| l.link.clone())
    }

    async fn add_macvtap(
        &self,
        request: &MacvtapRequest,
        target: &FakeNetns,
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.check(Fault::Create)?;

        let parent_mtu = state
            .links(None)?
            .iter()
            .find(|l| l.link.index == request.parent_index)
            .map(|l| l.link.mtu)
            .ok_or_else(|| LinkError::Kernel(io::Error::other("no such parent")))?;

        if state.find(Some(target.path.as_path()), &request.name).is_ok() {
            return Err(LinkError::Kernel(io::ErrorKind::AlreadyExists.into()));
        }

        let index = state.allocate_index();
        let link = Link {
            name: request.name.clone(),
            index,
            parent_index: Some(request.parent_index),
            mtu: request.mtu.unwrap_or(parent_mtu),
            tx_queue_len: request.tx_queue_len,
            address: mac_for(index),
            mode: Some(request.mode),
            up: false,
        };
        state.links(Some(target.path.as_path()))?.push(FakeLink {
            link,
            proxy_arp: false,
        });
        Ok(())
    }

    async fn move_to_netns(&self, name: &str, target: &FakeNetns) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.check(Fault::Move)?;
        state.links(Some(target.path.as_path()))?;

        let host = state.links(None)?;
        let position = host
            .iter()
            .position(|l| l.link.name == name)
            .ok_or_else(|| LinkError::NotFound {
                name: name.to_string(),
            })?;
        let link = host.remove(position);
        state.links(Some(target.path.as_path()))?.push(link);
        Ok(())
    }

    async fn set_mtu(
        &self,
        netns: Option<&FakeNetns>,
        name: &str,
        mtu: u32,
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.check(Fault::Mtu)?;
        state.find(key(netns), name)?.link.mtu = mtu;
        Ok(())
    }

    async fn rename(
        &self,
        netns: Option<&FakeNetns>,
        from: &str,
        to: &str,
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.check(Fault::Rename)?;
        if from != to && state.find(key(netns), to).is_ok() {
            return Err(LinkError::Kernel(io::ErrorKind::AlreadyExists.into()));
        }
        state.find(key(netns), from)?.link.name = to.to_string();
        Ok(())
    }

    async fn set_up(&self, netns: Option<&FakeNetns>, name: &str) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.check(Fault::Up)?;
        state.find(key(netns), name)?.link.up = true;
        Ok(())
    }

    async fn set_hardware_addr(
        &self,
        netns: Option<&FakeNetns>,
        name: &str,
        mac: &HardwareAddr,
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.check(Fault::HardwareAddr)?;
        state.find(key(netns), name)?.link.address = mac.octets().to_vec();
        Ok(())
    }

    async fn enable_proxy_arp(
        &self,
        netns: Option<&FakeNetns>,
        name: &str,
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.check(Fault::ProxyArp)?;
        state.find(key(netns), name)?.proxy_arp = true;
        Ok(())
    }

    async fn delete(&self, netns: Option<&FakeNetns>, name: &str) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.check(Fault::Delete)?;
        let links = state.links(key(netns))?;
        let position = links
            .iter()
            .position(|l| l.link.name == name)
            .ok_or_else(|| LinkError::NotFound {
                name: name.to_string(),
            })?;
        links.remove(position);
        state.deleted.push(name.to_string());
        Ok(())
    }
}
