//! Cloud placeholder materialization.
//!
//! Files kept in a cloud container may exist only as placeholders until the
//! provider downloads their contents. Materialization is requested through
//! [`CloudFiles`] and observed by polling for existence: a bounded,
//! synchronous busy-wait with an explicit deadline. A `false` result means
//! "not available within the budget", not permanent absence; callers may
//! retry later.

use crate::platform::{CloudFiles, SystemShell};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a materialization is awaited before giving up.
pub const DOWNLOAD_WAIT: Duration = Duration::from_secs(5);

/// Placeholder names look like `.name.icloud` next to where `name` will
/// materialize.
pub const PLACEHOLDER_SUFFIX: &str = ".icloud";

/// The path a placeholder materializes to, or `None` when the name does not
/// follow the placeholder convention.
pub fn materialized_path(placeholder: &Path) -> Option<PathBuf> {
    let name = placeholder.file_name()?.to_str()?;
    let name = name.strip_prefix('.')?;
    let name = name.strip_suffix(PLACEHOLDER_SUFFIX).unwrap_or(name);
    Some(placeholder.with_file_name(name))
}

/// Poll until `path` exists or the budget runs out.
pub fn wait_for(shell: &dyn SystemShell, path: &Path, budget: Duration) -> bool {
    let deadline = Instant::now() + budget;
    while !shell.exists(path) {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::yield_now();
    }
    true
}

/// Make sure `path` is locally available, downloading it when it is still a
/// cloud placeholder. Directories additionally get their placeholder
/// children downloaded, so a freshly granted subtree is usable at once.
pub fn download_remote_file(
    shell: &dyn SystemShell,
    cloud: &dyn CloudFiles,
    path: &Path,
    budget: Duration,
) -> bool {
    if shell.exists(path) {
        if shell.is_directory(path) {
            download_folder_contents(shell, cloud, path, budget);
        }
        return true;
    }
    tracing::info!("requesting cloud materialization of {}", path.display());
    if let Err(err) = cloud.start_download(path) {
        tracing::warn!("could not start download of {}: {err}", path.display());
        return false;
    }
    if !wait_for(shell, path, budget) {
        tracing::warn!("download of {} did not finish in time", path.display());
        return false;
    }
    if shell.is_directory(path) {
        download_folder_contents(shell, cloud, path, budget);
    }
    true
}

/// Download every placeholder directly inside `dir`.
pub fn download_folder_contents(
    shell: &dyn SystemShell,
    cloud: &dyn CloudFiles,
    dir: &Path,
    budget: Duration,
) {
    for entry in shell.read_dir(dir) {
        let is_placeholder = entry
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(PLACEHOLDER_SUFFIX));
        if is_placeholder {
            download_placeholder(shell, cloud, &entry, budget);
        }
    }
}

/// Download a single `.name.icloud` placeholder; true once the materialized
/// file exists.
pub fn download_placeholder(
    shell: &dyn SystemShell,
    cloud: &dyn CloudFiles,
    placeholder: &Path,
    budget: Duration,
) -> bool {
    let Some(target) = materialized_path(placeholder) else {
        tracing::warn!("{} is not a cloud placeholder", placeholder.display());
        return false;
    };
    tracing::info!("downloading {} from the cloud", target.display());
    if let Err(err) = cloud.start_download(&target) {
        tracing::warn!("could not download {}: {err}", target.display());
        return false;
    }
    wait_for(shell, &target, budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::FakePlatform;

    const FAST: Duration = Duration::from_millis(20);

    #[test]
    fn placeholder_names_map_to_their_targets() {
        assert_eq!(
            materialized_path(Path::new("/cloud/.notes.txt.icloud")),
            Some(PathBuf::from("/cloud/notes.txt"))
        );
        // no leading dot: not a placeholder
        assert_eq!(materialized_path(Path::new("/cloud/notes.txt")), None);
    }

    #[test]
    fn existing_paths_need_no_download() {
        let fake = FakePlatform::new();
        fake.add_file("/cloud/doc.txt");
        assert!(download_remote_file(
            &fake,
            &fake,
            Path::new("/cloud/doc.txt"),
            FAST
        ));
    }

    #[test]
    fn scripted_downloads_materialize_within_budget() {
        let fake = FakePlatform::new();
        fake.add_cloud_placeholder("/cloud/doc.txt", true);
        assert!(download_remote_file(
            &fake,
            &fake,
            Path::new("/cloud/doc.txt"),
            FAST
        ));
    }

    #[test]
    fn missing_downloads_time_out() {
        let fake = FakePlatform::new();
        fake.add_cloud_placeholder("/cloud/slow.txt", false);
        let started = Instant::now();
        assert!(!download_remote_file(
            &fake,
            &fake,
            Path::new("/cloud/slow.txt"),
            FAST
        ));
        assert!(started.elapsed() >= FAST);
    }

    #[test]
    fn directory_contents_are_swept_for_placeholders() {
        let fake = FakePlatform::new();
        fake.add_dir("/cloud/docs");
        fake.add_file("/cloud/docs/.a.txt.icloud");
        fake.add_file("/cloud/docs/plain.txt");
        fake.add_cloud_placeholder("/cloud/docs/a.txt", true);

        assert!(download_remote_file(
            &fake,
            &fake,
            Path::new("/cloud/docs"),
            FAST
        ));
        assert!(fake.exists(Path::new("/cloud/docs/a.txt")));
    }
}
