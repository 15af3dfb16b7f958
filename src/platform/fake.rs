//! Scripted platform for tests.
//!
//! Provides a deterministic in-memory stand-in for the host: a filesystem
//! tree with gated subtrees (only reachable while an access session is
//! active), scripted token resolutions, cloud placeholders that materialize
//! on request or never, and recorded editor invocations. All knobs take
//! `&self`; state lives behind a mutex so the fake satisfies the same
//! `Send + Sync` bounds as the real platform.

use super::{
    CloudError, CloudFiles, ResolvedGrant, ScopeError, SecurityScope, SystemShell,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// What a scripted token resolves to.
#[derive(Debug, Clone)]
pub enum TokenScript {
    Grant { path: PathBuf, stale: bool },
    /// The resolution call itself errors.
    Broken,
}

#[derive(Default)]
struct FakeState {
    cwd: PathBuf,
    dirs: HashSet<PathBuf>,
    files: HashSet<PathBuf>,
    /// Subtree roots that are invisible without an active access session.
    gated: Vec<PathBuf>,
    /// Paths `begin_access` will accept.
    grantable: HashSet<PathBuf>,
    active: Vec<PathBuf>,
    ended: Vec<PathBuf>,
    tokens: HashMap<Vec<u8>, TokenScript>,
    /// Placeholder -> whether a started download ever materializes.
    cloud: HashMap<PathBuf, bool>,
    /// Targets the change-directory primitive refuses even when visible.
    cd_refused: HashSet<PathBuf>,
    commands: Vec<String>,
}

#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a directory and all of its ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        let mut current = Some(path.as_ref().to_path_buf());
        while let Some(dir) = current {
            current = dir.parent().map(Path::to_path_buf);
            state.dirs.insert(dir);
        }
    }

    /// Registers a file; its parent chain becomes directories.
    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.state.lock().unwrap().files.insert(path);
    }

    pub fn set_cwd(&self, path: impl AsRef<Path>) {
        self.state.lock().unwrap().cwd = path.as_ref().to_path_buf();
    }

    /// Everything under `root` becomes invisible until an access session
    /// covering it is active.
    pub fn gate_subtree(&self, root: impl AsRef<Path>) {
        self.state.lock().unwrap().gated.push(root.as_ref().to_path_buf());
    }

    /// Makes `begin_access` accept `path`.
    pub fn allow_access(&self, path: impl AsRef<Path>) {
        self.state
            .lock()
            .unwrap()
            .grantable
            .insert(path.as_ref().to_path_buf());
    }

    pub fn script_token(&self, token: impl Into<Vec<u8>>, script: TokenScript) {
        self.state.lock().unwrap().tokens.insert(token.into(), script);
    }

    /// Registers a cloud placeholder. The target does not exist until
    /// `start_download` is called; it appears only if `materializes`.
    pub fn add_cloud_placeholder(&self, path: impl AsRef<Path>, materializes: bool) {
        self.state
            .lock()
            .unwrap()
            .cloud
            .insert(path.as_ref().to_path_buf(), materializes);
    }

    /// Makes the change-directory primitive fail for `path` even though the
    /// directory is otherwise visible (the primitive can fail on its own,
    /// e.g. over an unreadable intermediate component).
    pub fn refuse_change_dir(&self, path: impl AsRef<Path>) {
        self.state
            .lock()
            .unwrap()
            .cd_refused
            .insert(path.as_ref().to_path_buf());
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn active_grants(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().active.clone()
    }

    pub fn ended_grants(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().ended.clone()
    }
}

impl FakeState {
    /// A path inside a gated subtree is only visible while an active access
    /// session covers it.
    fn covered(&self, path: &Path) -> bool {
        let gated = self.gated.iter().any(|root| path.starts_with(root));
        if !gated {
            return true;
        }
        self.active.iter().any(|grant| path.starts_with(grant))
    }

    fn visible(&self, path: &Path) -> bool {
        (self.dirs.contains(path) || self.files.contains(path)) && self.covered(path)
    }
}

impl SystemShell for FakePlatform {
    fn change_dir(&self, args: &[&str]) {
        let Some(path) = args.get(1) else { return };
        let path = Path::new(path);
        let mut state = self.state.lock().unwrap();
        if state.dirs.contains(path) && state.covered(path) && !state.cd_refused.contains(path) {
            state.cwd = path.to_path_buf();
        }
    }

    fn current_dir(&self) -> PathBuf {
        self.state.lock().unwrap().cwd.clone()
    }

    fn exists(&self, path: &Path) -> bool {
        self.state.lock().unwrap().visible(path)
    }

    fn is_directory(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.dirs.contains(path) && state.covered(path)
    }

    fn is_readable(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        // Placeholder metadata is readable before the content materializes.
        state.visible(path) || (state.cloud.contains_key(path) && state.covered(path))
    }

    fn read_dir(&self, path: &Path) -> Vec<PathBuf> {
        let state = self.state.lock().unwrap();
        if !state.visible(path) {
            return Vec::new();
        }
        state
            .dirs
            .iter()
            .chain(state.files.iter())
            .filter(|entry| entry.parent() == Some(path))
            .cloned()
            .collect()
    }

    fn run_and_wait(&self, command: &str) {
        self.state.lock().unwrap().commands.push(command.to_string());
    }
}

impl SecurityScope for FakePlatform {
    fn resolve_token(&self, token: &[u8]) -> Result<ResolvedGrant, ScopeError> {
        let state = self.state.lock().unwrap();
        match state.tokens.get(token) {
            Some(TokenScript::Grant { path, stale }) => Ok(ResolvedGrant {
                path: path.clone(),
                is_stale: *stale,
            }),
            Some(TokenScript::Broken) => {
                Err(ScopeError::Unresolvable("scripted failure".to_string()))
            }
            None => Err(ScopeError::Unresolvable("unknown token".to_string())),
        }
    }

    fn begin_access(&self, path: &Path) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.grantable.contains(path) {
            state.active.push(path.to_path_buf());
            true
        } else {
            false
        }
    }

    fn end_access(&self, path: &Path) {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.active.iter().position(|p| p == path) {
            state.active.remove(pos);
        }
        state.ended.push(path.to_path_buf());
    }
}

impl CloudFiles for FakePlatform {
    fn start_download(&self, path: &Path) -> Result<(), CloudError> {
        let mut state = self.state.lock().unwrap();
        match state.cloud.get(path).copied() {
            Some(true) => {
                state.files.insert(path.to_path_buf());
                Ok(())
            }
            Some(false) => Ok(()),
            None => Err(CloudError::Unavailable(format!(
                "no placeholder at {}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gated_paths_are_invisible_until_access_begins() {
        let fake = FakePlatform::new();
        fake.add_dir("/var/mobile/shared/repo");
        fake.gate_subtree("/var/mobile/shared");
        fake.allow_access("/var/mobile/shared");

        let repo = Path::new("/var/mobile/shared/repo");
        assert!(!fake.exists(repo));

        assert!(fake.begin_access(Path::new("/var/mobile/shared")));
        assert!(fake.exists(repo));
        assert!(fake.is_directory(repo));

        fake.end_access(Path::new("/var/mobile/shared"));
        assert!(!fake.exists(repo));
    }

    #[test]
    fn change_dir_only_enters_visible_directories() {
        let fake = FakePlatform::new();
        fake.add_dir("/var/mobile/Documents");
        fake.set_cwd("/var/mobile");

        fake.change_dir(&["cd", "/var/mobile/Documents"]);
        assert_eq!(fake.current_dir(), Path::new("/var/mobile/Documents"));

        fake.change_dir(&["cd", "/var/mobile/missing"]);
        assert_eq!(fake.current_dir(), Path::new("/var/mobile/Documents"));
    }

    #[test]
    fn placeholders_materialize_only_when_scripted_to() {
        let fake = FakePlatform::new();
        fake.add_cloud_placeholder("/cloud/doc.txt", true);
        fake.add_cloud_placeholder("/cloud/never.txt", false);

        fake.start_download(Path::new("/cloud/doc.txt")).unwrap();
        assert!(fake.state.lock().unwrap().files.contains(Path::new("/cloud/doc.txt")));

        fake.start_download(Path::new("/cloud/never.txt")).unwrap();
        assert!(!fake.state.lock().unwrap().files.contains(Path::new("/cloud/never.txt")));

        assert!(fake.start_download(Path::new("/cloud/unknown")).is_err());
    }
}
