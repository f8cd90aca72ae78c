//! restfs binary.
//!
//! Mounts a REST API as a filesystem.
//!
//! Usage:
//!   # Kubernetes, credentials from KUBE_APISERVER / KUBE_TOKEN
//!   restfs kube /mnt/k8s
//!
//!   # Terraform Enterprise, log to a file
//!   restfs tfe /mnt/tfe --log-file ~/tfefs.log
//!
//! Unmount with `fusermount -u <mountpoint>`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};

use restfs_kernel::{BridgeConfig, BridgeKind, RestBackend, VfsOps};
use restfs_mount::{MountFlags, RestFuse, logging};

/// Mount a REST API as a filesystem.
#[derive(Parser, Debug)]
#[command(name = "restfs")]
#[command(about = "Mount Kubernetes or Terraform Enterprise as a filesystem")]
struct Args {
    /// Let other users access the mount (needs user_allow_other in fuse.conf)
    #[arg(long)]
    allow_other: bool,

    /// Unmount automatically when the process exits
    #[arg(long)]
    auto_unmount: bool,

    #[command(subcommand)]
    bridge: BridgeCommand,
}

#[derive(Subcommand, Debug)]
enum BridgeCommand {
    /// Kubernetes API server
    Kube(MountArgs),
    /// Terraform Enterprise / Terraform Cloud
    Tfe(MountArgs),
}

impl BridgeCommand {
    fn split(self) -> (BridgeKind, MountArgs) {
        match self {
            BridgeCommand::Kube(args) => (BridgeKind::Kube, args),
            BridgeCommand::Tfe(args) => (BridgeKind::Tfe, args),
        }
    }
}

#[derive(ClapArgs, Debug)]
struct MountArgs {
    /// Directory to mount on
    mountpoint: PathBuf,

    /// API base URL (overrides the environment)
    #[arg(long)]
    base_url: Option<String>,

    /// Log file (overrides the environment; stderr when unset)
    #[arg(long)]
    log_file: Option<String>,

    /// Issue at most one request at a time
    #[arg(long)]
    serialize_requests: bool,

    /// Route kube deletes by resource kind instead of the default prefix
    #[arg(long)]
    kind_aware_delete: bool,
}

impl MountArgs {
    fn apply(&self, mut config: BridgeConfig) -> BridgeConfig {
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url);
        }
        if let Some(path) = &self.log_file {
            config = config.with_log_file(path);
        }
        let serialize_requests = self.serialize_requests || config.serialize_requests;
        let kind_aware_delete = self.kind_aware_delete || config.kind_aware_delete;
        config
            .with_serialize_requests(serialize_requests)
            .with_kind_aware_delete(kind_aware_delete)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let flags = MountFlags {
        allow_other: args.allow_other,
        auto_unmount: args.auto_unmount,
    };
    let (kind, mount_args) = args.bridge.split();
    let config = mount_args.apply(BridgeConfig::from_env(kind));

    let _guard = logging::init(config.log_file.as_deref())?;

    // SAFETY: geteuid cannot fail.
    if unsafe { libc::geteuid() } == 0 {
        tracing::warn!("running as root; every user of the mount acts with these credentials");
    }

    tracing::info!(bridge = %kind, base_url = %config.base_url, "starting");
    tracing::debug!(?config, "configuration");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("restfs-io")
        .build()
        .context("building tokio runtime")?;

    let backend: Arc<dyn VfsOps> =
        Arc::new(RestBackend::from_config(&config).context("configuring backend")?);

    let fs = RestFuse::new(backend, runtime.handle().clone());
    fs.mount(&mount_args.mountpoint, &kind.to_string(), flags)
        .with_context(|| format!("mounting {}", mount_args.mountpoint.display()))?;

    tracing::info!("unmounted");
    Ok(())
}
