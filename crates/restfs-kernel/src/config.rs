//! Bridge configuration.
//!
//! Everything is read once at startup, from the environment first and then
//! from CLI overrides, and is immutable afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::bridge::{Bridge, KubeBridge, TfeBridge};
use crate::constants::{KUBE_DEFAULT_ADDR, KUBE_TIMEOUT, TFE_DEFAULT_ADDR, TFE_TIMEOUT};
use crate::gateway::{Gateway, ReqwestTransport, TransportBuildError};

/// Which remote API a mount bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BridgeKind {
    /// Kubernetes API server.
    Kube,
    /// Terraform Enterprise / Terraform Cloud.
    Tfe,
}

/// Environment variable names for one bridge.
struct EnvNames {
    addr: &'static str,
    token: &'static str,
    /// Log file variables, first set wins.
    log: &'static [&'static str],
    ca_file: &'static str,
}

const CA_BUNDLE_ENV: &str = "CURL_CA_BUNDLE";

impl BridgeKind {
    fn env(self) -> EnvNames {
        match self {
            BridgeKind::Kube => EnvNames {
                addr: "KUBE_APISERVER",
                token: "KUBE_TOKEN",
                log: &["K8SFS_LOG", "KUBEFS_LOG"],
                ca_file: "k8s.pem",
            },
            BridgeKind::Tfe => EnvNames {
                addr: "TFE_ADDR",
                token: "TFE_TOKEN",
                log: &["TFEFS_LOG"],
                ca_file: "tfefs.pem",
            },
        }
    }

    /// Address used when none is configured.
    pub fn default_addr(self) -> &'static str {
        match self {
            BridgeKind::Kube => KUBE_DEFAULT_ADDR,
            BridgeKind::Tfe => TFE_DEFAULT_ADDR,
        }
    }

    /// Fixed request timeout.
    pub fn timeout(self) -> Duration {
        match self {
            BridgeKind::Kube => KUBE_TIMEOUT,
            BridgeKind::Tfe => TFE_TIMEOUT,
        }
    }

    /// `~/<name>.pem`, if it exists under `home`.
    pub fn home_ca_bundle(self, home: Option<&Path>) -> Option<PathBuf> {
        let candidate = home?.join(self.env().ca_file);
        candidate.is_file().then_some(candidate)
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL {0:?}: expected http:// or https://")]
    InvalidBaseUrl(String),

    #[error("invalid classification pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Transport(#[from] TransportBuildError),
}

/// Settings for one mount.
#[derive(Clone)]
pub struct BridgeConfig {
    pub kind: BridgeKind,
    /// API base address, without a trailing separator.
    pub base_url: String,
    /// Bearer token.
    pub token: Option<String>,
    /// Extra trust anchor (PEM).
    pub ca_bundle: Option<PathBuf>,
    /// Log destination; stderr when unset.
    pub log_file: Option<PathBuf>,
    pub timeout: Duration,
    /// Allow only one HTTP call in flight.
    pub serialize_requests: bool,
    /// Route deletes by resource kind (kube only).
    pub kind_aware_delete: bool,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_bundle", &self.ca_bundle)
            .field("log_file", &self.log_file)
            .field("timeout", &self.timeout)
            .field("serialize_requests", &self.serialize_requests)
            .field("kind_aware_delete", &self.kind_aware_delete)
            .finish()
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

impl BridgeConfig {
    /// Defaults for `kind`, with no token or trust anchor.
    pub fn new(kind: BridgeKind) -> Self {
        Self {
            kind,
            base_url: kind.default_addr().to_string(),
            token: None,
            ca_bundle: None,
            log_file: None,
            timeout: kind.timeout(),
            serialize_requests: false,
            kind_aware_delete: false,
        }
    }

    /// Read the process environment.
    pub fn from_env(kind: BridgeKind) -> Self {
        Self::from_lookup(kind, |name| std::env::var(name).ok(), dirs::home_dir().as_deref())
    }

    /// Resolve settings through `lookup` (an environment stand-in), falling
    /// back to `~/<bridge>.pem` under `home` for the trust anchor.
    pub fn from_lookup<F>(kind: BridgeKind, lookup: F, home: Option<&Path>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let names = kind.env();
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let mut config = Self::new(kind);
        if let Some(addr) = get(names.addr) {
            config = config.with_base_url(addr);
        }
        config.token = get(names.token);
        config.log_file = names.log.iter().find_map(|name| get(*name)).map(|p| expand(&p));
        config.ca_bundle = get(CA_BUNDLE_ENV)
            .map(|p| expand(&p))
            .or_else(|| kind.home_ca_bundle(home));
        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_ca_bundle(mut self, path: impl AsRef<str>) -> Self {
        self.ca_bundle = Some(expand(path.as_ref()));
        self
    }

    pub fn with_log_file(mut self, path: impl AsRef<str>) -> Self {
        self.log_file = Some(expand(path.as_ref()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_serialize_requests(mut self, enabled: bool) -> Self {
        self.serialize_requests = enabled;
        self
    }

    pub fn with_kind_aware_delete(mut self, enabled: bool) -> Self {
        self.kind_aware_delete = enabled;
        self
    }

    /// Check the settings that can be checked without I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.starts_with("http://") || self.base_url.starts_with("https://") {
            Ok(())
        } else {
            Err(ConfigError::InvalidBaseUrl(self.base_url.clone()))
        }
    }

    /// The bridge this configuration selects.
    pub fn build_bridge(&self) -> Result<Arc<dyn Bridge>, ConfigError> {
        let bridge: Arc<dyn Bridge> = match self.kind {
            BridgeKind::Kube => {
                Arc::new(KubeBridge::new().with_kind_aware_delete(self.kind_aware_delete))
            }
            BridgeKind::Tfe => {
                if self.kind_aware_delete {
                    tracing::warn!("kind-aware delete only applies to the kube bridge");
                }
                Arc::new(TfeBridge::new()?)
            }
        };
        Ok(bridge)
    }

    /// A gateway over the production transport.
    pub fn build_gateway(&self) -> Result<Gateway, ConfigError> {
        self.validate()?;
        let transport = ReqwestTransport::new(self.timeout, self.ca_bundle.as_deref())?;
        Ok(Gateway::new(self.base_url.clone(), Arc::new(transport))
            .with_token(self.token.clone())
            .serialized(self.serialize_requests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(BridgeKind::Kube.to_string(), "kube");
        assert_eq!(BridgeKind::from_str("tfe").unwrap(), BridgeKind::Tfe);
        assert!(BridgeKind::from_str("vault").is_err());
    }

    #[test]
    fn test_defaults() {
        let kube = BridgeConfig::from_lookup(BridgeKind::Kube, lookup(&[]), None);
        assert_eq!(kube.base_url, "http://localhost:8080");
        assert_eq!(kube.timeout, Duration::from_secs(1));
        assert!(kube.token.is_none());
        assert!(kube.ca_bundle.is_none());

        let tfe = BridgeConfig::from_lookup(BridgeKind::Tfe, lookup(&[]), None);
        assert_eq!(tfe.base_url, "https://app.terraform.io");
        assert_eq!(tfe.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_env_values() {
        let config = BridgeConfig::from_lookup(
            BridgeKind::Tfe,
            lookup(&[
                ("TFE_ADDR", "https://tfe.internal/"),
                ("TFE_TOKEN", "t0k"),
                ("TFEFS_LOG", "/var/log/tfefs.log"),
                ("CURL_CA_BUNDLE", "/etc/ssl/tfe.pem"),
                ("KUBE_TOKEN", "ignored"),
            ]),
            None,
        );
        assert_eq!(config.base_url, "https://tfe.internal");
        assert_eq!(config.token.as_deref(), Some("t0k"));
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/tfefs.log")));
        assert_eq!(config.ca_bundle, Some(PathBuf::from("/etc/ssl/tfe.pem")));
    }

    #[test]
    fn test_kube_log_aliases() {
        let config = BridgeConfig::from_lookup(
            BridgeKind::Kube,
            lookup(&[("KUBEFS_LOG", "/var/log/kubefs.log")]),
            None,
        );
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/kubefs.log")));

        let config = BridgeConfig::from_lookup(
            BridgeKind::Kube,
            lookup(&[
                ("KUBEFS_LOG", "/var/log/kubefs.log"),
                ("K8SFS_LOG", "/var/log/k8sfs.log"),
            ]),
            None,
        );
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/k8sfs.log")));
    }

    #[test]
    fn test_empty_env_values_are_unset() {
        let config =
            BridgeConfig::from_lookup(BridgeKind::Kube, lookup(&[("KUBE_TOKEN", "")]), None);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_home_ca_bundle_fallback() {
        let home = tempfile::tempdir().unwrap();
        let config = BridgeConfig::from_lookup(BridgeKind::Kube, lookup(&[]), Some(home.path()));
        assert!(config.ca_bundle.is_none());

        let pem = home.path().join("k8s.pem");
        std::fs::write(&pem, "-----BEGIN CERTIFICATE-----\n").unwrap();
        let config = BridgeConfig::from_lookup(BridgeKind::Kube, lookup(&[]), Some(home.path()));
        assert_eq!(config.ca_bundle, Some(pem));

        // tfe looks for its own file.
        let config = BridgeConfig::from_lookup(BridgeKind::Tfe, lookup(&[]), Some(home.path()));
        assert!(config.ca_bundle.is_none());
    }

    #[test]
    fn test_validate() {
        assert!(BridgeConfig::new(BridgeKind::Kube).validate().is_ok());
        let bad = BridgeConfig::new(BridgeKind::Kube).with_base_url("localhost:8080");
        assert!(matches!(bad.validate(), Err(ConfigError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = BridgeConfig::new(BridgeKind::Tfe).with_token("s3cret");
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn test_build_bridge() {
        let kube = BridgeConfig::new(BridgeKind::Kube).build_bridge().unwrap();
        assert_eq!(kube.name(), "kube");
        let tfe = BridgeConfig::new(BridgeKind::Tfe).build_bridge().unwrap();
        assert_eq!(tfe.name(), "tfe");
    }
}
