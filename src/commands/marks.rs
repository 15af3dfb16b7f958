//! The bookmark command family: `bookmark`, `showmarks`, `renamemark`,
//! `deletemark` and `jump`.

use super::CommandContext;
use crate::bookmarks::{AddOutcome, BookmarkStore, MarkStatus};
use crate::navigation::Navigator;
use crate::platform::SystemShell;
use crate::store::KeyValueStore;
use std::io::Write;
use std::path::Path;

const EDITOR_KEY: &str = "editor";
const DEFAULT_EDITOR: &str = "vim";

/// `bookmark [name]`: bookmark the current directory.
pub fn bookmark(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    let command_name = argv.first().map(String::as_str).unwrap_or("bookmark");
    let usage = format!("Usage: {command_name} [name]\n");
    if argv.len() > 2 {
        let _ = write!(ctx.session().stderr, "{usage}");
        return 0;
    }
    if let Some(first) = argv.get(1) {
        if first.starts_with("-h") {
            let _ = write!(ctx.session().stderr, "{usage}");
            return 0;
        }
    }

    let current = ctx.shell.current_dir();
    let path = current.to_string_lossy().into_owned();
    let outcome = BookmarkStore::new(ctx.store).add(&path, argv.get(1).map(String::as_str));

    let session = ctx.session();
    match outcome {
        AddOutcome::Added(name) => {
            let _ = writeln!(session.stderr, "Bookmarked as {name}.");
        }
        AddOutcome::AlreadyBookmarked(name) => {
            let _ = writeln!(session.stderr, "Already bookmarked as {name}.");
        }
    }
    0
}

/// `showmarks [name...]`: list bookmarks, pruning stale ones as it goes.
pub fn showmarks(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    let command_name = argv.first().map(String::as_str).unwrap_or("showmarks");
    let usage = format!(
        "Usage: {command_name} (show all bookmarks)\n{command_name} shortName (show bookmark for shortName)\n"
    );
    let marks = BookmarkStore::new(ctx.store);

    if argv.len() == 1 {
        // Stale entries are pruned by the listing itself; users just see
        // them disappear.
        let listed = marks.list(ctx.scope, None);
        let session = ctx.session();
        for mark in listed {
            if mark.status == MarkStatus::Found {
                let path = mark.path.unwrap_or_default();
                let _ = writeln!(session.stdout, "{}: {path}", mark.name);
            }
        }
        return 0;
    }

    let requested: Vec<String> = argv[1..].to_vec();
    let listed = marks.list(ctx.scope, Some(&requested));
    let session = ctx.session();
    for (index, mark) in listed.iter().enumerate() {
        match mark.status {
            MarkStatus::Found => {
                let path = mark.path.clone().unwrap_or_default();
                let _ = writeln!(session.stdout, "{}: {path}", mark.name);
            }
            MarkStatus::NotFound => {
                let _ = writeln!(session.stderr, "{}: not found", mark.name);
                if index == 0 {
                    let _ = write!(session.stderr, "{usage}");
                }
            }
            MarkStatus::Stale => {
                let _ = writeln!(session.stderr, "{}: not found (directory removed)", mark.name);
            }
        }
    }
    0
}

/// `renamemark old new`: rename a bookmark. An existing new name is
/// overwritten without warning.
pub fn renamemark(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    let command_name = argv.first().map(String::as_str).unwrap_or("renamemark");
    let usage = format!("Usage: {command_name} oldName newName\n");
    if argv.len() != 3 {
        let _ = write!(ctx.session().stderr, "{usage}");
        return 0;
    }
    if !BookmarkStore::new(ctx.store).rename(&argv[1], &argv[2]) {
        let _ = writeln!(ctx.session().stderr, "{command_name}: {} not found", argv[1]);
    }
    0
}

/// `deletemark name... | --all`: delete bookmarks. `--all` wipes user
/// bookmarks and reinstates the reserved system names.
pub fn deletemark(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    let command_name = argv.first().map(String::as_str).unwrap_or("deletemark");
    let usage =
        format!("Usage: {command_name} name [name1 name2 name3...] or {command_name} --all\n");
    if argv.len() < 2 {
        let _ = write!(ctx.session().stderr, "{usage}");
        return 0;
    }
    if argv[1].starts_with("-h") {
        let _ = write!(ctx.session().stderr, "{usage}");
        return 0;
    }

    let marks = BookmarkStore::new(ctx.store);
    if argv[1] == "--all" {
        marks.delete_all(ctx.locations);
        return 0;
    }
    for (index, name) in argv[1..].iter().enumerate() {
        if !marks.delete(name) {
            let session = ctx.session();
            let _ = writeln!(session.stderr, "{command_name}: {name} not found");
            if index == 0 {
                let _ = write!(session.stderr, "{usage}");
            }
        }
    }
    0
}

/// `jump name`: change directory to a bookmark, falling back through the
/// security-scope walk; a bookmark for a regular file opens the configured
/// editor instead.
pub fn jump(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    let command_name = argv.first().map(String::as_str).unwrap_or("jump");
    let usage = format!("Usage: {command_name} bookmarkName\n");
    if argv.len() != 2 {
        let _ = write!(ctx.session().stderr, "{usage}");
        return 0;
    }
    let name = &argv[1];
    if name.starts_with("-h") {
        let _ = write!(ctx.session().stderr, "{usage}");
        return 0;
    }

    let marks = BookmarkStore::new(ctx.store);
    let Some(path) = marks.path_for(name) else {
        let _ = writeln!(ctx.session().stderr, "jump: {name} not found.");
        return 1;
    };

    let navigator = Navigator::new(ctx.shell, ctx.scope, ctx.cloud, ctx.store);
    let entered = navigator.change_directory(&path, &mut ctx.session().stderr);
    if entered {
        return 0;
    }

    let target = Path::new(&path);
    if ctx.shell.exists(target) && !ctx.shell.is_directory(target) {
        let editor = ctx
            .store
            .get_string(EDITOR_KEY)
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
        let escaped = path.replace(' ', "\\ ");
        ctx.shell.run_and_wait(&format!("{editor} {escaped}"));
    } else {
        // Neither directory nor file: the bookmark points nowhere anymore.
        let _ = writeln!(
            ctx.session().stderr,
            "jump: bookmark for {name} is no longer valid."
        );
        marks.remove_name(name);
    }
    0
}
