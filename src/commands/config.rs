//! The `config` command: terminal appearance from the command line.
//!
//! Values resolve in three steps: a literal value, `default` (whatever the
//! store holds, falling back to factory), or `factory`. `-p` persists, `-g`
//! extends to every open window, `-d`/`-r` revert. Single-dash combinations
//! of the flag letters (`-dgp`, `-pg`, ...) are accepted.

use super::CommandContext;
use crate::appearance::{
    self, Appearance, AppearanceUpdate, Color, CursorShape, FACTORY_CURSOR_SHAPE,
    FACTORY_FONT_NAME, FACTORY_FONT_SIZE,
};
use crate::platform::SystemShell;
use crate::store::KeyValueStore;
use serde_json::json;
use std::io::Write;

const TOOLBAR_FILE: &str = ".toolbarDefinition";

const DEFAULT_TOOLBAR: &str = "\
# Toolbar definition. One button per line:
#   systemName:<symbol name> insertString:<text sent to the terminal>
# Lines starting with # are ignored. Changes take effect at restart.
systemName:arrow.up.doc.on.clipboard systemAction:paste
systemName:arrow.right.to.line.alt insertString:\\u{0009}
systemName:escape insertString:\\u{001b}
systemName:arrowtriangle.up.fill insertString:\\u{1b}[A
systemName:arrowtriangle.down.fill insertString:\\u{1b}[B
";

const SHORT_USAGE: &str = "usage: config [-s font size][-n font name][-b background color][-f foreground color][-c cursor color][-dgpr]\n";

fn long_usage() -> String {
    format!(
        r##"usage: config [-s font size][-n font name][-b background color][-f foreground color][-c cursor color][-g][-p][-d][-r]
For all parameters: "default" to get the value currently stored, "factory" to get the factory defaults ({FACTORY_FONT_NAME}, {FACTORY_FONT_SIZE} pts, colors from the system theme).
Colors can be defined by names, RGB triplets "red green blue" or HexStrings "#00FF00"
-s | --size: set font size
-n | --name: set font name
-b | --background: set background color
-f | --foreground: set foreground color
-c | --cursor: set cursor and highlight color
-k | --cursorShape: set cursor shape (beam, block or underline)
-t | --toolbar: create a configuration file to change the toolbar
-g | --global: extend settings to all windows currently open
-p | --permanent: store settings as default values
-d | --default: reset all settings to default values
-r | --reset: reset all settings to factory default
--show: show current settings
Sample uses:
config -p: make settings for current window the default for future windows.
config -dgp: revert all open and future windows to stored default.
config -b 0 0 0 -f #00ff00: get a green-on-black VT100 look.
"##
    )
}

pub fn config(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    if argv.len() == 1 {
        let _ = write!(ctx.session().stdout, "{SHORT_USAGE}");
        return 0;
    }

    let mut update = AppearanceUpdate::default();
    let mut skip_next = 0usize;
    let mut make_permanent = false;
    let mut make_global = false;
    let mut revert_to_default = false;
    let mut revert_to_factory = false;
    // did this command line try to set values, even unsuccessfully?
    let mut arguments_set = false;

    let mut i = 1;
    while i < argv.len() {
        if skip_next > 0 {
            skip_next -= 1;
            i += 1;
            continue;
        }
        let arg = argv[i].clone();
        if !arg.starts_with('-') {
            i += 1;
            continue;
        }
        match arg.as_str() {
            "-h" | "--help" => {
                let _ = write!(ctx.session().stdout, "{}", long_usage());
                return 0;
            }
            "-s" | "--size" => {
                arguments_set = true;
                match argv.get(i + 1) {
                    Some(value) if !value.starts_with('-') => {
                        if let Ok(size) = value.parse::<f32>() {
                            update.font_size = Some(size);
                            skip_next = 1;
                        } else if value == "default" {
                            update.font_size = ctx
                                .store
                                .get_f32(appearance::FONT_SIZE_KEY)
                                .or(Some(FACTORY_FONT_SIZE));
                        } else if value == "factory" {
                            update.font_size = Some(FACTORY_FONT_SIZE);
                        } else {
                            let _ = writeln!(
                                ctx.session().stderr,
                                "Could not read argument for size: {value}"
                            );
                        }
                    }
                    Some(_) => {
                        let _ = writeln!(ctx.session().stderr, "Size not defined.");
                    }
                    None => {
                        let _ = writeln!(ctx.session().stderr, "No parameter for size.");
                        return 0;
                    }
                }
            }
            "-n" | "--name" => {
                arguments_set = true;
                let mut name = "picker".to_string();
                if let Some(value) = argv.get(i + 1) {
                    if !value.starts_with('-') {
                        name = value.clone();
                        skip_next = 1;
                    }
                }
                if name == "picker" {
                    // the system font picker belongs to the host UI
                    let _ = writeln!(
                        ctx.session().stderr,
                        "The font picker is not available here; pass a font name."
                    );
                } else if name == "default" {
                    update.font_name = ctx
                        .store
                        .get_string(appearance::FONT_NAME_KEY)
                        .or_else(|| Some(FACTORY_FONT_NAME.to_string()));
                } else if name == "factory" {
                    update.font_name = Some(FACTORY_FONT_NAME.to_string());
                } else {
                    update.font_name = Some(name);
                }
            }
            "-b" | "--background" => {
                arguments_set = true;
                if let Some((color, consumed)) =
                    color_argument(ctx, argv, i, "Background", appearance::BACKGROUND_KEY)
                {
                    update.background = Some(color);
                    skip_next = consumed;
                }
            }
            "-f" | "--foreground" => {
                arguments_set = true;
                if let Some((color, consumed)) =
                    color_argument(ctx, argv, i, "Foreground", appearance::FOREGROUND_KEY)
                {
                    update.foreground = Some(color);
                    skip_next = consumed;
                }
            }
            "-c" | "--cursor" => {
                arguments_set = true;
                if let Some((color, consumed)) =
                    color_argument(ctx, argv, i, "Cursor", appearance::CURSOR_COLOR_KEY)
                {
                    update.cursor_color = Some(color);
                    skip_next = consumed;
                }
            }
            "-k" | "--cursorShape" => {
                arguments_set = true;
                let mut name = String::new();
                if let Some(value) = argv.get(i + 1) {
                    if !value.starts_with('-') {
                        name = value.clone();
                        skip_next = 1;
                    } else {
                        let _ = writeln!(ctx.session().stderr, "Cursor shape not defined.");
                        i += 1;
                        continue;
                    }
                }
                if name.is_empty() {
                    let _ = writeln!(ctx.session().stderr, "No parameter for cursor shape.");
                } else if name == "default" {
                    update.cursor_shape = ctx
                        .store
                        .get_string(appearance::CURSOR_SHAPE_KEY)
                        .as_deref()
                        .and_then(CursorShape::parse)
                        .or(Some(FACTORY_CURSOR_SHAPE));
                } else if name == "factory" {
                    update.cursor_shape = Some(FACTORY_CURSOR_SHAPE);
                } else if let Some(shape) = CursorShape::parse(&name) {
                    update.cursor_shape = Some(shape);
                } else {
                    let _ = writeln!(
                        ctx.session().stderr,
                        "Did not understand cursor shape: {} (possible names are beam, block and underline)",
                        name.to_uppercase()
                    );
                }
            }
            "-t" | "--toolbar" => {
                install_toolbar(ctx);
            }
            "--show" => {
                show_settings(ctx);
            }
            "--default" => revert_to_default = true,
            "--permanent" => make_permanent = true,
            "--global" => make_global = true,
            "--reset" => revert_to_factory = true,
            other => {
                // -g, -p, -gp, -dgpr ... are all valid combinations
                let letters = &other[1..];
                if !letters.is_empty() && letters.chars().all(|c| "rgpd".contains(c)) {
                    if letters.contains('g') {
                        make_global = true;
                    }
                    if letters.contains('p') {
                        make_permanent = true;
                    }
                    if letters.contains('d') {
                        revert_to_default = true;
                    }
                    if letters.contains('r') {
                        revert_to_factory = true;
                    }
                } else {
                    let session = ctx.session();
                    let _ = writeln!(session.stderr, "Could not understand argument: {other}");
                    let _ = write!(session.stderr, "{SHORT_USAGE}");
                    return 0;
                }
            }
        }
        i += 1;
    }

    if revert_to_factory {
        ctx.session().appearance = Appearance::factory();
    } else if revert_to_default {
        let stored = Appearance::stored(ctx.store);
        ctx.session().appearance = stored;
    } else {
        ctx.session().appearance.apply(&update);
    }

    if make_global {
        if arguments_set {
            for window in ctx.windows.iter_mut() {
                window.appearance.apply(&update);
            }
        } else {
            // bare -g: extend the current window's settings to all others
            let current_index = ctx.current;
            let current = ctx.windows[current_index].appearance.clone();
            for (index, window) in ctx.windows.iter_mut().enumerate() {
                if index != current_index {
                    window.appearance = current.clone();
                }
            }
        }
    }

    if make_permanent {
        if arguments_set {
            persist_update(ctx.store, &update);
        } else {
            // bare -p: make the current window's settings the defaults
            let appearance = ctx.windows[ctx.current].appearance.clone();
            persist_appearance(ctx.store, &appearance);
        }
    }
    0
}

/// Parses the value of a color option: `default`, `factory`, a color name,
/// a hex string, or a three-word RGB triplet. Returns the setting (`None` =
/// host theme color) and how many extra argv words were consumed; `None`
/// when the value was missing or unreadable (already reported).
fn color_argument(
    ctx: &mut CommandContext,
    argv: &[String],
    index: usize,
    label: &str,
    store_key: &str,
) -> Option<(Option<Color>, usize)> {
    let name = match argv.get(index + 1) {
        Some(value) if !value.starts_with('-') => value.clone(),
        Some(_) => {
            let _ = writeln!(ctx.session().stderr, "{label} color not defined.");
            return None;
        }
        None => {
            let _ = writeln!(
                ctx.session().stderr,
                "No parameter for {} color.",
                label.to_lowercase()
            );
            return None;
        }
    };
    if name == "default" {
        let stored = ctx.store.get_string(store_key).as_deref().and_then(Color::from_hex);
        return Some((stored, 1));
    }
    if name == "factory" {
        return Some((None, 1));
    }
    if let Some(color) = Color::from_name(&name) {
        return Some((Some(color), 1));
    }
    if let Some(color) = Color::from_hex(&name) {
        return Some((Some(color), 1));
    }
    if let Some(color) = Color::from_components(argv, index) {
        return Some((Some(color), 3));
    }
    let _ = writeln!(
        ctx.session().stderr,
        "Could not retrieve {} color.",
        label.to_lowercase()
    );
    None
}

/// Persist only the fields this command line mentioned. Colors reset to the
/// host theme are not stored; absent keys already mean "system".
fn persist_update(store: &dyn KeyValueStore, update: &AppearanceUpdate) {
    if let Some(size) = update.font_size {
        store.set(appearance::FONT_SIZE_KEY, json!(size));
    }
    if let Some(name) = &update.font_name {
        store.set(appearance::FONT_NAME_KEY, json!(name));
    }
    if let Some(Some(color)) = update.background {
        store.set(appearance::BACKGROUND_KEY, json!(color.to_hex_string()));
    }
    if let Some(Some(color)) = update.foreground {
        store.set(appearance::FOREGROUND_KEY, json!(color.to_hex_string()));
    }
    if let Some(Some(color)) = update.cursor_color {
        store.set(appearance::CURSOR_COLOR_KEY, json!(color.to_hex_string()));
    }
    if let Some(shape) = update.cursor_shape {
        store.set(appearance::CURSOR_SHAPE_KEY, json!(shape.as_str()));
    }
}

/// Persist a whole appearance: unset fields clear their stored keys so
/// future windows fall back to the host defaults.
fn persist_appearance(store: &dyn KeyValueStore, appearance: &Appearance) {
    match appearance.font_size {
        Some(size) => store.set(appearance::FONT_SIZE_KEY, json!(size)),
        None => store.remove(appearance::FONT_SIZE_KEY),
    }
    match &appearance.font_name {
        Some(name) => store.set(appearance::FONT_NAME_KEY, json!(name)),
        None => store.remove(appearance::FONT_NAME_KEY),
    }
    match appearance.background {
        Some(color) => store.set(appearance::BACKGROUND_KEY, json!(color.to_hex_string())),
        None => store.remove(appearance::BACKGROUND_KEY),
    }
    match appearance.foreground {
        Some(color) => store.set(appearance::FOREGROUND_KEY, json!(color.to_hex_string())),
        None => store.remove(appearance::FOREGROUND_KEY),
    }
    match appearance.cursor_color {
        Some(color) => store.set(appearance::CURSOR_COLOR_KEY, json!(color.to_hex_string())),
        None => store.remove(appearance::CURSOR_COLOR_KEY),
    }
    match appearance.cursor_shape {
        Some(shape) => store.set(appearance::CURSOR_SHAPE_KEY, json!(shape.as_str())),
        None => store.remove(appearance::CURSOR_SHAPE_KEY),
    }
}

fn show_settings(ctx: &mut CommandContext) {
    let session = ctx.session();
    let appearance = session.appearance.clone();
    let color_or_system =
        |color: Option<Color>| color.map(|c| c.to_hex_string()).unwrap_or_else(|| "system".to_string());
    let _ = writeln!(
        session.stdout,
        "font: {} at {} pt",
        appearance.font_name.as_deref().unwrap_or(FACTORY_FONT_NAME),
        appearance.font_size.unwrap_or(FACTORY_FONT_SIZE)
    );
    let _ = writeln!(session.stdout, "background: {}", color_or_system(appearance.background));
    let _ = writeln!(session.stdout, "foreground: {}", color_or_system(appearance.foreground));
    let _ = writeln!(session.stdout, "cursor: {}", color_or_system(appearance.cursor_color));
    let _ = writeln!(
        session.stdout,
        "cursor shape: {}",
        appearance.cursor_shape.unwrap_or(FACTORY_CURSOR_SHAPE).as_str()
    );
}

fn install_toolbar(ctx: &mut CommandContext) {
    let target = ctx.locations.documents().join(TOOLBAR_FILE);
    if ctx.shell.exists(&target) {
        let session = ctx.session();
        let _ = write!(
            session.stderr,
            "The configuration file {TOOLBAR_FILE} already exists. Do you want to overwrite it? (y/N)"
        );
        let _ = session.stderr.flush();
        if !session.confirmed() {
            return;
        }
    }
    let written = target
        .parent()
        .map(std::fs::create_dir_all)
        .unwrap_or(Ok(()))
        .and_then(|_| std::fs::write(&target, DEFAULT_TOOLBAR));
    match written {
        Ok(()) => {
            let _ = writeln!(
                ctx.session().stdout,
                "I have created a toolbar configuration file: ~/Documents/{TOOLBAR_FILE}\nYou can now edit it to add or remove buttons to the toolbar.\nChanges will take effect when the app restarts."
            );
        }
        Err(err) => {
            tracing::warn!("toolbar install failed: {err}");
            let _ = writeln!(
                ctx.session().stderr,
                "An error occured when copying the toolbar configuration file."
            );
        }
    }
}
