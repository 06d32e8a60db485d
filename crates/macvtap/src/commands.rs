//! Lifecycle command handlers.

use std::path::PathBuf;

use macvtap_common::{InterfaceName, MacvtapError, MacvtapResult};
use macvtap_network::LinkManager;

use crate::args::EnvArgs;
use crate::config::NetConf;
use crate::provision::Provisioner;
use crate::result::CniResult;
use crate::rollback::{Rollback, Undo};

/// Arguments of one plugin invocation.
#[derive(Debug, Clone, Default)]
pub struct CmdArgs {
    /// Container ID.
    pub container_id: String,
    /// Path of the container network namespace.
    pub netns: Option<PathBuf>,
    /// Interface name inside the container.
    pub if_name: String,
    /// Raw `CNI_ARGS` string.
    pub args: Option<String>,
    /// Network configuration payload.
    pub stdin_data: Vec<u8>,
}

impl CmdArgs {
    fn open_netns<M: LinkManager>(&self, links: &M) -> MacvtapResult<Option<M::Netns>> {
        self.netns
            .as_deref()
            .map(|path| {
                links
                    .open_netns(path)
                    .map_err(|e| MacvtapError::NetnsOpenFailed {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })
            })
            .transpose()
    }
}

/// Attach a macvtap interface to the sandbox.
///
/// An explicit `MAC` from `CNI_ARGS` is reported in canonical form, lower case
/// and colon separated, whatever notation it was supplied in.
///
/// # Errors
///
/// Any configuration, argument or link error. When the error occurs after the
/// interface was named, the interface is deleted again first.
pub async fn attach<M: LinkManager>(links: &M, args: &CmdArgs) -> MacvtapResult<CniResult> {
    let if_name = InterfaceName::new(args.if_name.as_str())?;
    let (conf, cni_version) = NetConf::load(&args.stdin_data)?;
    conf.validate(links).await?;

    let env = EnvArgs::parse(args.args.as_deref().unwrap_or_default())?;
    let mac = env.hardware_addr()?;

    let netns = args
        .open_netns(links)?
        .ok_or_else(|| MacvtapError::InvalidEnvironment {
            message: "CNI_NETNS env variable missing".to_string(),
        })?;

    let provisioner = Provisioner::new(links, &netns);
    let mut interface = provisioner.provision(&conf, if_name.as_str()).await?;

    if let Some(mac) = mac {
        let mut cleanup = Rollback::new();
        cleanup.push(Undo::DeleteLink {
            name: if_name.to_string(),
        });
        if let Err(err) = provisioner.set_hardware_addr(if_name.as_str(), &mac).await {
            cleanup.unwind(links, &netns).await;
            return Err(err);
        }
        cleanup.commit();
        interface.mac = mac.to_string();
    }

    tracing::info!(
        container_id = %args.container_id,
        interface = %interface.name,
        mac = %interface.mac,
        sandbox = %interface.sandbox,
        "Attached macvtap"
    );
    Ok(CniResult::new(cni_version, vec![interface]))
}

/// Detach the sandbox interface. Safe to repeat.
///
/// # Errors
///
/// Returns [`MacvtapError::DeleteFailed`] for deletion failures other than the
/// interface already being gone.
pub async fn detach<M: LinkManager>(links: &M, args: &CmdArgs) -> MacvtapResult<()> {
    let Some(netns) = args.open_netns(links)? else {
        tracing::debug!(container_id = %args.container_id, "No netns, nothing to detach");
        return Ok(());
    };
    let if_name = InterfaceName::new(args.if_name.as_str())?;

    match links.delete(Some(&netns), if_name.as_str()).await {
        Ok(()) => {
            tracing::info!(container_id = %args.container_id, interface = %if_name, "Detached macvtap");
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            tracing::debug!(interface = %if_name, "Interface already removed");
            Ok(())
        }
        Err(err) => Err(MacvtapError::DeleteFailed {
            name: if_name.to_string(),
            reason: err.to_string(),
        }),
    }
}

/// Health check. Performs no verification.
///
/// # Errors
///
/// Never fails.
#[allow(clippy::unnecessary_wraps)]
pub fn check(args: &CmdArgs) -> MacvtapResult<()> {
    tracing::debug!(container_id = %args.container_id, "CHECK is a no-op");
    Ok(())
}
