//! Plain-filesystem platform used by the standalone binary.
//!
//! On hosts without a sandbox the change-directory primitive is the process
//! working directory, access grants are no-ops, and security tokens are
//! UTF-8 encoded paths: a token stays valid exactly as long as the path it
//! names still exists. There is no cloud provider; placeholders never
//! materialize.

use super::{
    CloudError, CloudFiles, ResolvedGrant, ScopeError, SecurityScope, SystemLocations, SystemShell,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct LocalPlatform;

impl LocalPlatform {
    pub fn new() -> Self {
        Self
    }

    /// Encode a token the way this platform resolves them.
    pub fn token_for_path(path: &Path) -> Vec<u8> {
        path.to_string_lossy().into_owned().into_bytes()
    }

    pub fn system_locations() -> SystemLocations {
        SystemLocations {
            home: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            group: None,
            cloud: None,
        }
    }
}

impl SystemShell for LocalPlatform {
    fn change_dir(&self, args: &[&str]) {
        let Some(path) = args.get(1) else { return };
        if let Err(err) = std::env::set_current_dir(path) {
            tracing::debug!("cd {path} failed: {err}");
        }
    }

    fn current_dir(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_readable(&self, path: &Path) -> bool {
        if path.is_dir() {
            std::fs::read_dir(path).is_ok()
        } else {
            std::fs::File::open(path).is_ok()
        }
    }

    fn read_dir(&self, path: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(path) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn run_and_wait(&self, command: &str) {
        tracing::info!("run_and_wait: {command}");
        let status = std::process::Command::new("sh").arg("-c").arg(command).status();
        if let Err(err) = status {
            tracing::warn!("could not run {command:?}: {err}");
        }
    }
}

impl SecurityScope for LocalPlatform {
    fn resolve_token(&self, token: &[u8]) -> Result<ResolvedGrant, ScopeError> {
        let path = std::str::from_utf8(token)
            .map_err(|err| ScopeError::Unresolvable(err.to_string()))?;
        let path = PathBuf::from(path);
        let is_stale = !path.exists();
        Ok(ResolvedGrant { path, is_stale })
    }

    fn begin_access(&self, _path: &Path) -> bool {
        true
    }

    fn end_access(&self, _path: &Path) {}
}

impl CloudFiles for LocalPlatform {
    fn start_download(&self, path: &Path) -> Result<(), CloudError> {
        Err(CloudError::Unavailable(format!(
            "no cloud provider for {}",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn tokens_resolve_while_the_path_exists() {
        let temp = TempDir::new().unwrap();
        let platform = LocalPlatform::new();

        let token = LocalPlatform::token_for_path(temp.path());
        let grant = platform.resolve_token(&token).unwrap();
        assert!(!grant.is_stale);
        assert_eq!(grant.path, temp.path());
    }

    #[test]
    fn tokens_for_removed_paths_are_stale() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("gone");
        let platform = LocalPlatform::new();

        let grant = platform
            .resolve_token(&LocalPlatform::token_for_path(&gone))
            .unwrap();
        assert!(grant.is_stale);
    }

    #[test]
    fn garbage_tokens_do_not_resolve() {
        let platform = LocalPlatform::new();
        assert!(platform.resolve_token(&[0xff, 0xfe, 0x80]).is_err());
    }

    #[test]
    fn readability_probe_matches_filesystem() {
        let temp = TempDir::new().unwrap();
        let platform = LocalPlatform::new();
        let file = temp.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(platform.is_readable(temp.path()));
        assert!(platform.is_readable(&file));
        assert!(!platform.is_readable(&temp.path().join("missing")));
    }
}
