//! Bookmark bookkeeping over the defaults store.
//!
//! Two persisted mappings back the bookmark commands:
//!
//! - `bookmarkNames`: user-chosen name -> filesystem path. Several names may
//!   point at the same location; each name has exactly one path.
//! - `fileBookmarks`: filesystem path -> opaque security token granting
//!   sandboxed access to that subtree. Paths the host can reach natively
//!   have no entry here.
//!
//! Tokens go stale when the granting authority revokes them; stale entries
//! are pruned from both mappings together so neither side is orphaned. The
//! backing store offers no cross-key transaction: a mutation that only
//! touched one mapping writes only that mapping, and the small inconsistency
//! window between paired writes is accepted.

use crate::paths;
use crate::platform::{SecurityScope, SystemLocations, SystemShell};
use crate::scope;
use crate::store::KeyValueStore;
use serde_json::Value;
use std::collections::HashMap;

pub const NAMES_KEY: &str = "bookmarkNames";
pub const TOKENS_KEY: &str = "fileBookmarks";

/// Names managed by the host. Recomputed from container locations at
/// startup and reinstated by `delete_all`; user deletions never wipe them.
pub const RESERVED_NAMES: [&str; 5] = ["home", "shortcuts", "group", "cloud", "iCloud"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkStatus {
    Found,
    NotFound,
    /// The name existed but its token no longer resolved; the entry has been
    /// pruned from both mappings as a side effect of listing.
    Stale,
}

#[derive(Debug, Clone)]
pub struct ListedMark {
    pub name: String,
    pub path: Option<String>,
    pub status: MarkStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(String),
    /// The location is already bookmarked under this name.
    AlreadyBookmarked(String),
}

/// View over the two persisted mappings. Holds no state of its own: every
/// operation is a fresh round trip against the store, so concurrently
/// running windows observe each other's writes.
pub struct BookmarkStore<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> BookmarkStore<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    pub fn names(&self) -> HashMap<String, String> {
        match self.store.get(NAMES_KEY) {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(name, value)| match value {
                    Value::String(path) => Some((name, path)),
                    _ => None,
                })
                .collect(),
            _ => HashMap::new(),
        }
    }

    pub fn tokens(&self) -> HashMap<String, Vec<u8>> {
        match self.store.get(TOKENS_KEY) {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(path, value)| {
                    serde_json::from_value::<Vec<u8>>(value)
                        .ok()
                        .map(|token| (path, token))
                })
                .collect(),
            _ => HashMap::new(),
        }
    }

    fn write_names(&self, names: &HashMap<String, String>) {
        match serde_json::to_value(names) {
            Ok(value) => self.store.set(NAMES_KEY, value),
            Err(err) => tracing::error!("could not encode bookmark names: {err}"),
        }
    }

    fn write_tokens(&self, tokens: &HashMap<String, Vec<u8>>) {
        match serde_json::to_value(tokens) {
            Ok(value) => self.store.set(TOKENS_KEY, value),
            Err(err) => tracing::error!("could not encode file bookmarks: {err}"),
        }
    }

    pub fn path_for(&self, name: &str) -> Option<String> {
        self.names().get(name).cloned()
    }

    pub fn token_for(&self, path: &str) -> Option<Vec<u8>> {
        self.tokens().get(path).cloned()
    }

    /// Stores the security token for a path. Hosts call this when the user
    /// authorizes a new folder through the system picker.
    pub fn set_token(&self, path: &str, token: Vec<u8>) {
        let mut tokens = self.tokens();
        tokens.insert(path.to_string(), token);
        self.write_tokens(&tokens);
    }

    /// Stores a name for `path`, defaulting to the last path component.
    ///
    /// A name that already points at the same location (under the
    /// `/private` equivalence) is reused as-is. A name that points
    /// elsewhere gets a `_1`, `_2`, ... suffix until a free or
    /// same-location name is found, so no existing bookmark is ever
    /// silently overwritten.
    pub fn add(&self, path: &str, requested: Option<&str>) -> AddOutcome {
        let mut names = self.names();
        let base = requested.unwrap_or_else(|| paths::last_component(path));
        let mut candidate = base.to_string();
        let mut counter = 0;
        while let Some(existing) = names.get(&candidate) {
            if paths::same_location(existing, path) {
                return AddOutcome::AlreadyBookmarked(candidate);
            }
            tracing::debug!("bookmark name {candidate} already taken");
            counter += 1;
            candidate = format!("{base}_{counter}");
        }
        names.insert(candidate.clone(), path.to_string());
        self.write_names(&names);
        AddOutcome::Added(candidate)
    }

    /// Renames a bookmark. An existing `new` name is silently overwritten
    /// (longstanding behavior some scripts rely on); a missing `old` name
    /// reports failure and changes nothing.
    pub fn rename(&self, old: &str, new: &str) -> bool {
        let mut names = self.names();
        let Some(path) = names.remove(old) else {
            return false;
        };
        names.insert(new.to_string(), path);
        self.write_names(&names);
        true
    }

    /// Removes one name; true if it existed. The token mapping is left
    /// alone; other names (or a future re-bookmark) may still want the
    /// grant.
    pub fn delete(&self, name: &str) -> bool {
        let mut names = self.names();
        if names.remove(name).is_none() {
            return false;
        }
        self.write_names(&names);
        true
    }

    /// Drops every user bookmark and reinstates the reserved names from
    /// freshly computed container locations. Tokens survive: grants for
    /// still-covered subtrees remain useful to the navigation fallback.
    pub fn delete_all(&self, locations: &SystemLocations) {
        let mut names = HashMap::new();
        insert_reserved(&mut names, locations);
        self.write_names(&names);
    }

    /// Recomputes the reserved names from container locations and upserts
    /// any that drifted. Writes only when something changed.
    pub fn reconcile_system_names(&self, locations: &SystemLocations) {
        let mut names = self.names();
        let before = names.clone();
        insert_reserved(&mut names, locations);
        if names != before {
            self.write_names(&names);
        }
    }

    /// Lists bookmarks with their status.
    ///
    /// With no filter, every name is returned in lexicographic order;
    /// otherwise exactly the requested names in the order given. Entries
    /// whose token no longer resolves are reported stale and pruned from
    /// both mappings before returning.
    pub fn list(&self, scope: &dyn SecurityScope, filter: Option<&[String]>) -> Vec<ListedMark> {
        let names = self.names();
        let tokens = self.tokens();
        let mut kept_names = names.clone();
        let mut kept_tokens = tokens.clone();
        let mut pruned = false;

        let requested: Vec<String> = match filter {
            Some(filter) => filter.to_vec(),
            None => {
                let mut all: Vec<String> = names.keys().cloned().collect();
                all.sort();
                all
            }
        };

        let mut out = Vec::with_capacity(requested.len());
        for name in requested {
            let Some(path) = names.get(&name) else {
                out.push(ListedMark { name, path: None, status: MarkStatus::NotFound });
                continue;
            };
            let status = match tokens.get(path) {
                // Native path, no grant needed.
                None => MarkStatus::Found,
                Some(token) => match scope::resolve(scope, token) {
                    Ok(_) => MarkStatus::Found,
                    Err(_) => {
                        tracing::info!("pruning stale bookmark {name}");
                        kept_tokens.remove(path);
                        kept_names.remove(&name);
                        pruned = true;
                        MarkStatus::Stale
                    }
                },
            };
            out.push(ListedMark { name, path: Some(path.clone()), status });
        }

        if pruned {
            self.write_tokens(&kept_tokens);
            self.write_names(&kept_names);
        }
        out
    }

    /// Startup sweep: resolve every stored token, probe activation for
    /// entries that are not readable outright, and drop pairs that fail,
    /// then reconcile the reserved names. Successful probes leave their
    /// access session active for the rest of the process lifetime.
    pub fn startup_check(
        &self,
        scope_api: &dyn SecurityScope,
        shell: &dyn SystemShell,
        locations: &SystemLocations,
    ) {
        self.prune_invalid(scope_api, shell);
        self.reconcile_system_names(locations);
    }

    pub fn prune_invalid(&self, scope_api: &dyn SecurityScope, shell: &dyn SystemShell) {
        let names = self.names();
        let tokens = self.tokens();
        let mut kept_names = names.clone();
        let mut kept_tokens = tokens.clone();
        let mut pruned = false;

        for (name, path) in &names {
            let Some(token) = tokens.get(path) else { continue };
            let stale = match scope::resolve(scope_api, token) {
                Ok(granted) => {
                    !shell.is_readable(&granted) && !scope::activate(scope_api, shell, &granted)
                }
                Err(_) => true,
            };
            if stale {
                tracing::info!("dropping invalid bookmark {name} -> {path}");
                kept_tokens.remove(path);
                kept_names.remove(name);
                pruned = true;
            }
        }

        if pruned {
            self.write_tokens(&kept_tokens);
            self.write_names(&kept_names);
        }
    }

    /// Removes a single name without touching tokens (a jump target that
    /// turned out to be neither directory nor file).
    pub fn remove_name(&self, name: &str) -> bool {
        self.delete(name)
    }

    /// Prunes the given token paths and every name that references one of
    /// them (under the `/private` equivalence), keeping the two mappings in
    /// step.
    pub fn remove_stale_paths(&self, stale: &[String]) {
        if stale.is_empty() {
            return;
        }
        let mut tokens = self.tokens();
        for path in stale {
            tokens.remove(path);
        }
        let mut names = self.names();
        names.retain(|_, path| !stale.iter().any(|pruned| paths::same_location(pruned, path)));
        self.write_tokens(&tokens);
        self.write_names(&names);
    }
}

fn insert_reserved(names: &mut HashMap<String, String>, locations: &SystemLocations) {
    names.insert("home".to_string(), locations.home.to_string_lossy().into_owned());
    if let Some(group) = &locations.group {
        let group = group.to_string_lossy().into_owned();
        names.insert("shortcuts".to_string(), group.clone());
        names.insert("group".to_string(), group);
    }
    if let Some(cloud_documents) = locations.cloud_documents() {
        let cloud_documents = cloud_documents.to_string_lossy().into_owned();
        names.insert("cloud".to_string(), cloud_documents.clone());
        names.insert("iCloud".to_string(), cloud_documents);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{fake::TokenScript, FakePlatform};
    use crate::store::MemoryStore;
    use std::path::PathBuf;

    fn locations() -> SystemLocations {
        SystemLocations {
            home: PathBuf::from("/var/mobile/Containers/Data/Application/ABCD"),
            group: Some(PathBuf::from("/var/mobile/Containers/Shared/AppGroup/EF01")),
            cloud: Some(PathBuf::from("/var/mobile/Library/Mobile Documents/iCloud~host")),
        }
    }

    #[test]
    fn add_defaults_to_the_last_path_component() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);

        let outcome = marks.add("/var/mobile/Documents/proj", None);
        assert_eq!(outcome, AddOutcome::Added("proj".to_string()));
        assert_eq!(
            marks.path_for("proj").as_deref(),
            Some("/var/mobile/Documents/proj")
        );
    }

    #[test]
    fn re_adding_the_same_location_is_reported_not_duplicated() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);

        marks.add("/var/mobile/Documents/proj", Some("work"));
        let outcome = marks.add("/var/mobile/Documents/proj", Some("work"));
        assert_eq!(outcome, AddOutcome::AlreadyBookmarked("work".to_string()));
        assert_eq!(marks.names().len(), 1);
    }

    #[test]
    fn the_private_spelling_counts_as_the_same_location() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);

        marks.add("/var/mobile/Documents/proj", Some("work"));
        let outcome = marks.add("/private/var/mobile/Documents/proj", Some("work"));
        assert_eq!(outcome, AddOutcome::AlreadyBookmarked("work".to_string()));
    }

    #[test]
    fn colliding_names_get_numeric_suffixes() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);

        marks.add("/var/a/proj", Some("proj"));
        assert_eq!(
            marks.add("/var/b/proj", Some("proj")),
            AddOutcome::Added("proj_1".to_string())
        );
        assert_eq!(
            marks.add("/var/c/proj", Some("proj")),
            AddOutcome::Added("proj_2".to_string())
        );
        assert_eq!(marks.path_for("proj_1").as_deref(), Some("/var/b/proj"));
        assert_eq!(marks.path_for("proj_2").as_deref(), Some("/var/c/proj"));
    }

    #[test]
    fn rename_moves_the_path_and_overwrites_silently() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);

        marks.add("/var/a", Some("one"));
        marks.add("/var/b", Some("two"));

        assert!(marks.rename("one", "two"));
        assert_eq!(marks.path_for("one"), None);
        assert_eq!(marks.path_for("two").as_deref(), Some("/var/a"));
        assert!(!marks.rename("missing", "anything"));
    }

    #[test]
    fn delete_all_keeps_exactly_the_reserved_names() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);
        let locations = locations();

        marks.add("/var/a", Some("one"));
        marks.add("/var/b", Some("two"));
        marks.delete_all(&locations);

        let names = marks.names();
        assert_eq!(names.len(), RESERVED_NAMES.len());
        for reserved in RESERVED_NAMES {
            assert!(names.contains_key(reserved), "missing {reserved}");
        }
        assert_eq!(
            names.get("home").map(String::as_str),
            Some("/var/mobile/Containers/Data/Application/ABCD")
        );
        assert_eq!(names.get("shortcuts"), names.get("group"));
        assert_eq!(names.get("cloud"), names.get("iCloud"));
    }

    #[test]
    fn reconcile_upserts_drifted_reserved_names() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);
        let locations = locations();

        marks.add("/stale/home/path", Some("home"));
        marks.add("/var/a", Some("mine"));
        marks.reconcile_system_names(&locations);

        assert_eq!(
            marks.path_for("home").as_deref(),
            Some("/var/mobile/Containers/Data/Application/ABCD")
        );
        // user names survive reconciliation
        assert_eq!(marks.path_for("mine").as_deref(), Some("/var/a"));
    }

    #[test]
    fn listing_all_is_sorted_and_prunes_stale_entries() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);
        let fake = FakePlatform::new();
        fake.script_token(
            b"ok".to_vec(),
            TokenScript::Grant { path: "/var/good".into(), stale: false },
        );
        fake.script_token(
            b"dead".to_vec(),
            TokenScript::Grant { path: "/var/bad".into(), stale: true },
        );

        marks.add("/var/good", Some("beta"));
        marks.add("/var/bad", Some("alpha"));
        marks.add("/var/native", Some("gamma"));
        let mut tokens = HashMap::new();
        tokens.insert("/var/good".to_string(), b"ok".to_vec());
        tokens.insert("/var/bad".to_string(), b"dead".to_vec());
        marks.write_tokens(&tokens);

        let listed = marks.list(&fake, None);
        let names: Vec<&str> = listed.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
        assert_eq!(listed[0].status, MarkStatus::Stale);
        assert_eq!(listed[1].status, MarkStatus::Found);
        assert_eq!(listed[2].status, MarkStatus::Found);

        // pruned from both mappings
        assert_eq!(marks.path_for("alpha"), None);
        assert_eq!(marks.token_for("/var/bad"), None);
        assert!(marks.token_for("/var/good").is_some());
    }

    #[test]
    fn listing_explicit_names_reports_missing_ones_in_order() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);
        let fake = FakePlatform::new();

        marks.add("/var/a", Some("real"));
        let filter = vec!["ghost".to_string(), "real".to_string()];
        let listed = marks.list(&fake, Some(&filter));

        assert_eq!(listed[0].status, MarkStatus::NotFound);
        assert_eq!(listed[0].name, "ghost");
        assert_eq!(listed[1].status, MarkStatus::Found);
    }

    #[test]
    fn stale_path_pruning_clears_both_mappings() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);

        // name stored under the /private spelling, token under /var
        marks.add("/private/var/shared/repo", Some("repo"));
        let mut tokens = HashMap::new();
        tokens.insert("/var/shared/repo".to_string(), b"t".to_vec());
        marks.write_tokens(&tokens);

        marks.remove_stale_paths(&["/var/shared/repo".to_string()]);
        assert_eq!(marks.path_for("repo"), None);
        assert_eq!(marks.token_for("/var/shared/repo"), None);
    }

    #[test]
    fn startup_sweep_drops_unresolvable_pairs() {
        let store = MemoryStore::new();
        let marks = BookmarkStore::new(&store);
        let fake = FakePlatform::new();
        fake.add_dir("/var/good");
        fake.script_token(
            b"ok".to_vec(),
            TokenScript::Grant { path: "/var/good".into(), stale: false },
        );
        fake.script_token(b"dead".to_vec(), TokenScript::Broken);

        marks.add("/var/good", Some("good"));
        marks.add("/var/bad", Some("bad"));
        let mut tokens = HashMap::new();
        tokens.insert("/var/good".to_string(), b"ok".to_vec());
        tokens.insert("/var/bad".to_string(), b"dead".to_vec());
        marks.write_tokens(&tokens);

        marks.startup_check(&fake, &fake, &locations());

        assert!(marks.path_for("good").is_some());
        assert_eq!(marks.path_for("bad"), None);
        assert_eq!(marks.token_for("/var/bad"), None);
        // reserved names arrived with the same sweep
        assert!(marks.path_for("home").is_some());
    }
}
