//! Tracing setup.
//!
//! Logs go to stderr unless a log file is configured. `RUST_LOG` overrides
//! the default `info` level either way.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the mount.
pub fn init(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let Some(log_file) = log_file else {
        tracing_subscriber::registry()
            .with(filter())
            .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
            .try_init()
            .context("installing stderr subscriber")?;
        return Ok(None);
    };

    let (dir, name) = split_log_path(log_file)?;
    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()
        .context("installing file subscriber")?;
    Ok(Some(guard))
}

/// Split a log file path into its directory and file name.
fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
    let name = path
        .file_name()
        .with_context(|| format!("log file has no name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    Ok((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("/var/log/k8sfs.log")).unwrap();
        assert_eq!(dir, Path::new("/var/log"));
        assert_eq!(name, "k8sfs.log");

        let (dir, name) = split_log_path(Path::new("tfefs.log")).unwrap();
        assert_eq!(dir, Path::new("."));
        assert_eq!(name, "tfefs.log");

        assert!(split_log_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_split_log_path_in_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restfs.log");
        let (parent, name) = split_log_path(&path).unwrap();
        assert_eq!(parent, dir.path());
        assert_eq!(name, "restfs.log");
    }
}
