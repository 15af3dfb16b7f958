//! Session glue: `history`, `clear`, `help`, the TeX install prompts and
//! the toolbar visibility toggles.

use super::CommandContext;
use crate::platform::SystemShell;
use crate::store::KeyValueStore;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;

pub const TEX_ENABLED_KEY: &str = "TeXEnabled";
pub const TEX_OPENTYPE_KEY: &str = "TeXOpenType";
pub const SHOW_TOOLBAR_KEY: &str = "show_toolbar";

const HELP_TEXT: &str = "\
shellmarks adds bookmark-aware navigation to a sandboxed terminal.

Directories that belong to other apps or file providers are only reachable
through previously granted access tokens; bookmarks remember those grants
and cd falls back to them automatically.

- customize appearance with config
- The reserved bookmarks home, shortcuts, group, cloud and iCloud always
  point at the current container locations
- downloadFile and downloadFolder force cloud placeholders to download
";

/// `history`: print this window's command history.
pub fn history(ctx: &mut CommandContext, _argv: &[String]) -> i32 {
    let session = ctx.session();
    for line in &session.history {
        let _ = writeln!(session.stdout, "{line}");
    }
    0
}

/// `clear`: wipe the screen and scrollback.
pub fn clear(ctx: &mut CommandContext, _argv: &[String]) -> i32 {
    let session = ctx.session();
    let _ = write!(session.stdout, "\x1b[2J\x1b[3J\x1b[H");
    let _ = session.stdout.flush();
    0
}

// Hosts register both bookmark syntax styles on by default; an explicit
// false in the store hides the matching hint.
fn style_enabled(ctx: &CommandContext, key: &str) -> bool {
    match ctx.store.get(key) {
        Some(Value::Bool(enabled)) => enabled,
        _ => true,
    }
}

/// `help [-l]`: overview text, or the full command list.
pub fn help(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    if argv.len() == 1 {
        let tex_enabled = ctx.store.get_bool(TEX_ENABLED_KEY);
        let zshmarks = style_enabled(ctx, "zshmarks");
        let bashmarks = style_enabled(ctx, "bashmarks");

        let session = ctx.session();
        let _ = write!(session.stdout, "{HELP_TEXT}");
        if !tex_enabled {
            let _ = write!(
                session.stdout,
                "\nTo install TeX, just type tex or luatex and follow the instructions.\n"
            );
        }
        if zshmarks && bashmarks {
            let _ = write!(session.stdout, "\n- bookmark the current directory with \"bookmark <name>\" or \"s <name>\", and access it later with \"jump <name>\" or \"g <name>\".\n- showmarks, l or p: show current list of bookmarks\n- renamemark or r, deletemark or d: change list of bookmarks\n");
        } else if zshmarks {
            let _ = write!(session.stdout, "\n- bookmark the current directory with \"bookmark <name>\" and access it later with \"jump <name>\".\n- showmarks: show current list of bookmarks\n- renamemark, deletemark: change list of bookmarks\n");
        } else if bashmarks {
            let _ = write!(session.stdout, "\n- s <name>: bookmark the current directory, g <name>: access it later.\n- l or p: show current list of bookmarks\n- r <name1> <name2>: rename a bookmark.\n- d <name>: delete a bookmark\n");
        }
        let _ = write!(session.stdout, "\nFor a full list of commands, type help -l\n");
        return 0;
    }

    if argv[1] == "-l" {
        let mut commands: Vec<String> = super::command_names().map(str::to_string).collect();
        // Also scan PATH for executables; files in the app bundle have no
        // exec bit, so presence is the only signal.
        if let Ok(path_var) = std::env::var("PATH") {
            for directory in path_var.split(':') {
                if directory.is_empty() {
                    continue;
                }
                for entry in ctx.shell.read_dir(Path::new(directory)) {
                    if ctx.shell.is_directory(&entry) {
                        continue;
                    }
                    if let Some(name) = entry.file_name().and_then(|n| n.to_str()) {
                        commands.push(name.to_string());
                    }
                }
            }
        }
        commands.sort();
        commands.dedup();
        let session = ctx.session();
        for command in commands {
            let _ = writeln!(session.stdout, "{command}");
        }
        return 0;
    }

    let _ = write!(ctx.session().stdout, "Usage: help [-l]\n");
    0
}

/// `tex`: offer to enable the TeX distribution.
pub fn tex(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    let command_name = argv.first().map(String::as_str).unwrap_or("tex");
    if ctx.store.get_bool(TEX_ENABLED_KEY) {
        let _ = writeln!(ctx.session().stderr, "The TeX distribution is already enabled.");
        return 0;
    }
    let accepted = {
        let session = ctx.session();
        let _ = write!(
            session.stderr,
            "{command_name} requires the TeX distribution, which is not currently installed.\nDo you want to download and install it? (1.3 GB) (y/N)"
        );
        let _ = session.stderr.flush();
        session.confirmed()
    };
    if accepted {
        let session = ctx.session();
        let _ = writeln!(session.stderr, "Downloading the TeX distribution, this may take some time...");
        let _ = writeln!(session.stderr, "(you can remove it later using Settings)");
        ctx.store.set(TEX_ENABLED_KEY, json!(true));
    }
    0
}

/// `luatex`: offer to enable the LuaTeX extension (and TeX itself when it
/// is not installed yet).
pub fn luatex(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    let command_name = argv.first().map(String::as_str).unwrap_or("luatex");
    let tex_enabled = ctx.store.get_bool(TEX_ENABLED_KEY);
    let accepted = {
        let session = ctx.session();
        if tex_enabled {
            let _ = write!(
                session.stderr,
                "{command_name} requires the LuaTeX extension on top of the TeX distribution\nDo you want to download and install them? (0.3 GB) (y/N)"
            );
        } else {
            let _ = write!(
                session.stderr,
                "{command_name} requires the TeX distribution, which is not currently installed, along with the LuaTeX extension.\nDo you want to download and install them? (1.8 GB) (y/N)"
            );
        }
        let _ = session.stderr.flush();
        session.confirmed()
    };
    if accepted {
        {
            let session = ctx.session();
            if tex_enabled {
                let _ = writeln!(session.stderr, "Downloading the LuaTeX extension, this may take some time...");
            } else {
                let _ = writeln!(session.stderr, "Downloading the TeX distribution with LuaTeX extension, this may take some time...");
            }
            let _ = writeln!(session.stderr, "(you can remove them later using Settings)");
        }
        if !tex_enabled {
            ctx.store.set(TEX_ENABLED_KEY, json!(true));
        }
        ctx.store.set(TEX_OPENTYPE_KEY, json!(true));
    }
    0
}

/// `showToolbar`: show the toolbar above the keyboard.
pub fn show_toolbar(ctx: &mut CommandContext, _argv: &[String]) -> i32 {
    ctx.store.set(SHOW_TOOLBAR_KEY, json!(true));
    let _ = writeln!(
        ctx.session().stdout,
        "showToolbar will become effective after the next refocus event."
    );
    0
}

/// `hideToolbar`: hide the toolbar above the keyboard.
pub fn hide_toolbar(ctx: &mut CommandContext, _argv: &[String]) -> i32 {
    ctx.store.set(SHOW_TOOLBAR_KEY, json!(false));
    let _ = writeln!(
        ctx.session().stdout,
        "hideToolbar will become effective after the next refocus event."
    );
    0
}
