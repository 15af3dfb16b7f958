//! Security token resolution and activation.
//!
//! Tokens are opaque blobs whose validity can only be discovered by trying
//! to use them, and the issuing authority can revoke one between any two
//! checks, so nothing here caches staleness.

use crate::platform::{ResolvedGrant, SecurityScope, SystemShell};
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// The token no longer resolves to a usable grant. Covers both an
    /// explicit stale flag and a failed resolution call.
    Stale,
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::Stale => write!(f, "stale security token"),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Decode `token` into the path its grant covers.
pub fn resolve(scope: &dyn SecurityScope, token: &[u8]) -> Result<PathBuf, ResolveError> {
    match scope.resolve_token(token) {
        Ok(ResolvedGrant { path, is_stale: false }) => Ok(path),
        Ok(ResolvedGrant { is_stale: true, .. }) => Err(ResolveError::Stale),
        Err(err) => {
            tracing::debug!("token resolution failed: {err}");
            Err(ResolveError::Stale)
        }
    }
}

/// Begin a security-scoped access session for `path` and verify the path is
/// actually readable under it. When the readability check fails the session
/// is ended again before returning, so a useless grant is never left active.
pub fn activate(scope: &dyn SecurityScope, shell: &dyn SystemShell, path: &Path) -> bool {
    if !scope.begin_access(path) {
        return false;
    }
    if shell.is_readable(path) {
        true
    } else {
        scope.end_access(path);
        false
    }
}
