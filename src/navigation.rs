//! Directory-change orchestration.
//!
//! The sandbox issues access grants per subtree, scoped to whichever
//! directory the user originally authorized, never to arbitrary descendant
//! paths, and there is no API to ask "which grant, if any, covers path X".
//! So when a plain `cd` fails, the only option is to walk the target's
//! ancestry upward, probing each level for a stored token until one resolves,
//! activates and covers the target, or the walk runs out of plausible
//! ancestors.
//!
//! Intermediate failures along the walk are routine and stay in the trace
//! log; only the final outcome is reported to the user.

use crate::bookmarks::BookmarkStore;
use crate::cloud;
use crate::paths;
use crate::platform::{CloudFiles, SecurityScope, SystemShell};
use crate::scope;
use crate::store::KeyValueStore;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Component count of the shortest path a grant can legitimately cover
/// (`/var/mobile/Containers/Data/Application/<UUID>/Documents` and its
/// peers). The ancestor walk stops once a candidate gets this short;
/// anything above it could never have been granted, so probing further
/// would only walk into system directories.
pub const SANDBOX_ROOT_COMPONENTS: usize = 7;

pub struct Navigator<'a> {
    shell: &'a dyn SystemShell,
    scope: &'a dyn SecurityScope,
    cloud: &'a dyn CloudFiles,
    store: &'a dyn KeyValueStore,
    download_budget: Duration,
}

impl<'a> Navigator<'a> {
    pub fn new(
        shell: &'a dyn SystemShell,
        scope: &'a dyn SecurityScope,
        cloud: &'a dyn CloudFiles,
        store: &'a dyn KeyValueStore,
    ) -> Self {
        Self {
            shell,
            scope,
            cloud,
            store,
            download_budget: cloud::DOWNLOAD_WAIT,
        }
    }

    /// Shorter materialization waits for tests.
    pub fn with_download_budget(mut self, budget: Duration) -> Self {
        self.download_budget = budget;
        self
    }

    fn landed_on(&self, requested: &str) -> bool {
        let cwd = self.shell.current_dir();
        paths::same_location(requested, &cwd.to_string_lossy())
    }

    /// Change the working directory to `path`, falling back to the bookmark
    /// walk when the direct attempt fails. Returns false when `path` is a
    /// regular file or could not be reached at all.
    ///
    /// Quirk preserved on purpose: when a grant activates but the retried
    /// `cd` still does not land on a target that *is* a directory, the walk
    /// reports the failure on `stderr` yet returns true. See DESIGN.md.
    pub fn change_directory(&self, path: &str, stderr: &mut impl Write) -> bool {
        tracing::debug!("change_directory: {path}");
        self.shell.change_dir(&["cd", path]);
        if self.landed_on(path) {
            return true;
        }

        // The direct attempt failed. Walk the ancestry looking for a stored
        // grant that covers the target.
        let marks = BookmarkStore::new(self.store);
        let tokens = marks.tokens();
        let mut stale_candidates: Vec<String> = Vec::new();
        let mut candidate = PathBuf::from(path);

        while paths::component_count(&candidate) > SANDBOX_ROOT_COMPONENTS {
            let mut key = candidate.to_string_lossy().into_owned();
            let mut token = tokens.get(&key);
            if token.is_none() {
                // Grants may have been stored under the other spelling.
                if let Some(toggled) = paths::toggle_private_prefix(&key) {
                    if let Some(found) = tokens.get(&toggled) {
                        key = toggled;
                        token = Some(found);
                    }
                }
            }
            // The next round tries the parent whatever happens below.
            candidate = match candidate.parent() {
                Some(parent) => parent.to_path_buf(),
                None => break,
            };
            let Some(token) = token else { continue };

            let granted = match scope::resolve(self.scope, token) {
                Ok(granted) => granted,
                Err(_) => {
                    tracing::warn!("stale security token for {key}");
                    stale_candidates.push(key);
                    // Another ancestor's token might still work.
                    continue;
                }
            };
            if !scope::activate(self.scope, self.shell, &granted) {
                tracing::warn!("could not activate access grant for {}", granted.display());
                continue;
            }
            if !cloud::download_remote_file(self.shell, self.cloud, &granted, self.download_budget)
            {
                self.scope.end_access(&granted);
                tracing::warn!("could not materialize {}", granted.display());
                continue;
            }

            // A covering grant is live: retry the ORIGINAL target, not the
            // ancestor the grant was found at.
            self.shell.change_dir(&["cd", path]);
            return if self.landed_on(path) {
                self.shell.is_directory(Path::new(path))
            } else if self.shell.is_directory(Path::new(path)) {
                let _ = writeln!(stderr, "Could not change directory to {path}");
                true
            } else {
                false
            };
        }

        // Exhausted: every ancestor down to the sandbox floor was tried.
        if !stale_candidates.is_empty() {
            marks.remove_stale_paths(&stale_candidates);
        }
        self.shell.is_directory(Path::new(path)) && self.landed_on(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{fake::TokenScript, FakePlatform};
    use crate::store::MemoryStore;
    use serde_json::json;

    const DOCS: &str = "/private/var/mobile/Containers/Data/Application/ABCD/Documents";

    fn store_with_token(path: &str, token: &[u8]) -> MemoryStore {
        let store = MemoryStore::new();
        BookmarkStore::new(&store).set_token(path, token.to_vec());
        store
    }

    fn sink() -> Vec<u8> {
        Vec::new()
    }

    #[test]
    fn direct_attempt_short_circuits() {
        let fake = FakePlatform::new();
        fake.add_dir("/var/mobile/Documents");
        let store = MemoryStore::new();
        let nav = Navigator::new(&fake, &fake, &fake, &store);

        let mut err = sink();
        assert!(nav.change_directory("/var/mobile/Documents", &mut err));
        assert_eq!(fake.current_dir(), Path::new("/var/mobile/Documents"));
    }

    #[test]
    fn the_private_alias_counts_as_landing() {
        let fake = FakePlatform::new();
        fake.add_dir("/private/var/mobile/Documents");
        let store = MemoryStore::new();
        let nav = Navigator::new(&fake, &fake, &fake, &store);

        // cd lands on the /private spelling while the request used /var
        let mut err = sink();
        fake.set_cwd("/private/var/mobile/Documents");
        assert!(nav.change_directory("/var/mobile/Documents", &mut err));
    }

    #[test]
    fn ancestor_grant_reaches_the_original_target() {
        let fake = FakePlatform::new();
        let proj = format!("{DOCS}/proj");
        fake.add_dir(&proj);
        fake.gate_subtree(DOCS);
        fake.allow_access(DOCS);
        fake.script_token(
            b"docs".to_vec(),
            TokenScript::Grant { path: DOCS.into(), stale: false },
        );
        let store = store_with_token(DOCS, b"docs");

        let nav = Navigator::new(&fake, &fake, &fake, &store)
            .with_download_budget(Duration::from_millis(10));
        let mut err = sink();
        assert!(nav.change_directory(&proj, &mut err));
        assert_eq!(fake.current_dir(), Path::new(&proj));
        assert!(err.is_empty());
    }

    #[test]
    fn toggled_spelling_finds_the_stored_grant() {
        let fake = FakePlatform::new();
        let proj = format!("{DOCS}/proj");
        fake.add_dir(&proj);
        fake.gate_subtree(DOCS);
        fake.allow_access(DOCS);
        fake.script_token(
            b"docs".to_vec(),
            TokenScript::Grant { path: DOCS.into(), stale: false },
        );
        // token stored under /var, request comes in as /private/var
        let var_docs = DOCS.strip_prefix("/private").unwrap();
        let store = store_with_token(var_docs, b"docs");

        let nav = Navigator::new(&fake, &fake, &fake, &store)
            .with_download_budget(Duration::from_millis(10));
        let mut err = sink();
        assert!(nav.change_directory(&proj, &mut err));
        assert_eq!(fake.current_dir(), Path::new(&proj));
    }

    #[test]
    fn stale_grants_are_skipped_and_pruned_on_exhaustion() {
        let fake = FakePlatform::new();
        let proj = format!("{DOCS}/proj");
        fake.add_dir(&proj);
        fake.gate_subtree(DOCS);
        fake.script_token(
            b"old".to_vec(),
            TokenScript::Grant { path: DOCS.into(), stale: true },
        );
        let store = store_with_token(DOCS, b"old");
        store.set(crate::bookmarks::NAMES_KEY, json!({ "docs": DOCS }));

        let nav = Navigator::new(&fake, &fake, &fake, &store)
            .with_download_budget(Duration::from_millis(10));
        let mut err = sink();
        assert!(!nav.change_directory(&proj, &mut err));

        // the stale pair is gone from both mappings
        let marks = BookmarkStore::new(&store);
        assert!(marks.tokens().is_empty());
        assert!(marks.names().is_empty());
    }

    #[test]
    fn activation_failure_moves_on_to_higher_ancestors() {
        let fake = FakePlatform::new();
        let container = "/private/var/mobile/Containers/Data/Application/ABCD";
        let proj = format!("{DOCS}/proj");
        fake.add_dir(&proj);
        fake.gate_subtree(container);
        // the Documents grant is refused, the container-level one works
        fake.allow_access(container);
        fake.script_token(
            b"docs".to_vec(),
            TokenScript::Grant { path: DOCS.into(), stale: false },
        );
        fake.script_token(
            b"container".to_vec(),
            TokenScript::Grant { path: container.into(), stale: false },
        );
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);
        marks.set_token(DOCS, b"docs".to_vec());
        marks.set_token(container, b"container".to_vec());

        let nav = Navigator::new(&fake, &fake, &fake, &store)
            .with_download_budget(Duration::from_millis(10));
        let mut err = sink();
        assert!(nav.change_directory(&proj, &mut err));
        assert_eq!(fake.current_dir(), Path::new(&proj));
    }

    #[test]
    fn failed_materialization_deactivates_the_grant() {
        let fake = FakePlatform::new();
        let proj = format!("{DOCS}/proj");
        // The granted path is a cloud placeholder that never materializes:
        // resolution and activation succeed, the download times out.
        fake.add_dir(DOCS);
        fake.gate_subtree(DOCS);
        fake.allow_access(&proj);
        fake.add_cloud_placeholder(&proj, false);
        fake.script_token(
            b"proj".to_vec(),
            TokenScript::Grant { path: proj.clone().into(), stale: false },
        );
        let store = store_with_token(&proj, b"proj");

        let nav = Navigator::new(&fake, &fake, &fake, &store)
            .with_download_budget(Duration::from_millis(10));
        let mut err = sink();
        assert!(!nav.change_directory(&proj, &mut err));
        assert!(fake.ended_grants().iter().any(|p| p == Path::new(&proj)));
        assert!(fake.active_grants().is_empty());
    }

    #[test]
    fn soft_failure_reports_but_returns_success() {
        let fake = FakePlatform::new();
        let proj = format!("{DOCS}/proj");
        fake.add_dir(&proj);
        // the grant is fine, but the cd primitive itself refuses the target
        fake.refuse_change_dir(&proj);
        fake.allow_access(DOCS);
        fake.script_token(
            b"docs".to_vec(),
            TokenScript::Grant { path: DOCS.into(), stale: false },
        );
        let store = store_with_token(DOCS, b"docs");

        let nav = Navigator::new(&fake, &fake, &fake, &store)
            .with_download_budget(Duration::from_millis(10));
        let mut err = sink();
        let outcome = nav.change_directory(&proj, &mut err);
        assert!(outcome);
        let message = String::from_utf8(err).unwrap();
        assert!(message.contains("Could not change directory"));
    }

    #[test]
    fn walk_never_descends_below_the_sandbox_floor() {
        let fake = FakePlatform::new();
        let deep = "/private/var/mobile/a/b/c/d/e/f";
        fake.add_dir(deep);
        fake.gate_subtree("/private/var/mobile/a");
        fake.allow_access("/private/var/mobile");
        // a grant this close to the root would cover everything if the walk
        // were unbounded; the component floor keeps it out of reach
        fake.script_token(
            b"root".to_vec(),
            TokenScript::Grant { path: "/private/var/mobile".into(), stale: false },
        );
        let store = store_with_token("/private/var/mobile", b"root");

        let nav = Navigator::new(&fake, &fake, &fake, &store)
            .with_download_budget(Duration::from_millis(10));
        let mut err = sink();
        assert!(!nav.change_directory(deep, &mut err));
        assert!(fake.active_grants().is_empty());
    }
}
