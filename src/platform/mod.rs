//! Host collaborator traits.
//!
//! The command layer never talks to the operating system directly; everything
//! environment-specific goes through the traits in this module. The split
//! follows the host APIs it abstracts: the change-directory primitive and
//! filesystem probes ([`SystemShell`]), the revocable security-scoped access
//! API ([`SecurityScope`]), and the cloud file provider ([`CloudFiles`]).
//! Implementations must be safe to share between windows.

pub mod fake;
pub mod local;

pub use fake::FakePlatform;
pub use local::LocalPlatform;

use std::path::{Path, PathBuf};

/// A decoded security token: the path the grant covers and whether the
/// issuing authority already considers the token out of date. A stale grant
/// must not be used; the token should be pruned and re-created.
#[derive(Debug, Clone)]
pub struct ResolvedGrant {
    pub path: PathBuf,
    pub is_stale: bool,
}

#[derive(Debug)]
pub enum ScopeError {
    /// The token blob could not be decoded into a grant at all.
    Unresolvable(String),
}

impl std::fmt::Display for ScopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeError::Unresolvable(msg) => write!(f, "unresolvable security token: {msg}"),
        }
    }
}

impl std::error::Error for ScopeError {}

#[derive(Debug)]
pub enum CloudError {
    /// No provider for the path, or the provider refused the request.
    Unavailable(String),
}

impl std::fmt::Display for CloudError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudError::Unavailable(msg) => write!(f, "cloud download unavailable: {msg}"),
        }
    }
}

impl std::error::Error for CloudError {}

/// The underlying shell primitives: a change-directory call plus the
/// filesystem probes the navigation fallback needs.
pub trait SystemShell: Send + Sync {
    /// Invoke the change-directory primitive with argv-style arguments
    /// (`["cd", path]`). The primitive mutates the working directory and
    /// swallows its own errors; callers decide success by comparing
    /// [`current_dir`](Self::current_dir) against the request afterwards.
    fn change_dir(&self, args: &[&str]);

    fn current_dir(&self) -> PathBuf;

    fn exists(&self, path: &Path) -> bool;

    /// False for missing paths and for regular files.
    fn is_directory(&self, path: &Path) -> bool;

    /// Whether the entry can actually be read under the current set of
    /// active access grants.
    fn is_readable(&self, path: &Path) -> bool;

    /// Directory children, empty when the directory cannot be listed.
    fn read_dir(&self, path: &Path) -> Vec<PathBuf>;

    /// Run a host command line to completion (hands a file to the external
    /// editor).
    fn run_and_wait(&self, command: &str);
}

/// The security-scoped resource API: opaque revocable tokens granting access
/// to a filesystem subtree.
pub trait SecurityScope: Send + Sync {
    /// Decode a token into a grant. Staleness is reported, never cached;
    /// the authority can revoke between any two calls.
    fn resolve_token(&self, token: &[u8]) -> Result<ResolvedGrant, ScopeError>;

    /// Begin honoring the grant for `path`; true when the host accepted the
    /// access session.
    fn begin_access(&self, path: &Path) -> bool;

    /// End a previously begun access session.
    fn end_access(&self, path: &Path);
}

/// The cloud file provider: placeholders that materialize on demand.
pub trait CloudFiles: Send + Sync {
    /// Ask the provider to start materializing `path`. Completion is
    /// observed by polling for existence, not reported by this call.
    fn start_download(&self, path: &Path) -> Result<(), CloudError>;
}

/// Container locations the reserved bookmark names are computed from.
#[derive(Debug, Clone)]
pub struct SystemLocations {
    /// The app container root: the parent of the Documents directory.
    pub home: PathBuf,
    /// The shared app-group container, when the host has one.
    pub group: Option<PathBuf>,
    /// The cloud (ubiquity) container root, when signed in.
    pub cloud: Option<PathBuf>,
}

impl SystemLocations {
    pub fn documents(&self) -> PathBuf {
        self.home.join("Documents")
    }

    /// The user-visible cloud documents directory.
    pub fn cloud_documents(&self) -> Option<PathBuf> {
        self.cloud.as_ref().map(|root| root.join("Documents"))
    }
}
