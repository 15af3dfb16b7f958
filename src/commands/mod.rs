//! Shell built-in command handlers.
//!
//! Handlers follow the host's calling convention: argv in (element 0 is the
//! command name, used verbatim in usage strings), exit code out, messages on
//! the session streams. Failures never escape a handler; everything is
//! converted to a message and a code at this boundary. Every handler takes
//! the [`CommandContext`] explicitly; there is no ambient "current window"
//! lookup.

pub mod cloud;
pub mod config;
pub mod marks;
pub mod misc;

use crate::platform::{CloudFiles, SecurityScope, SystemLocations, SystemShell};
use crate::session::Session;
use crate::store::KeyValueStore;

pub struct CommandContext<'a> {
    /// Every open window; commands like `config -g` touch all of them.
    pub windows: &'a mut Vec<Session>,
    /// Index of the window the command was typed in.
    pub current: usize,
    pub store: &'a dyn KeyValueStore,
    pub shell: &'a dyn SystemShell,
    pub scope: &'a dyn SecurityScope,
    pub cloud: &'a dyn CloudFiles,
    pub locations: &'a SystemLocations,
}

impl<'a> CommandContext<'a> {
    pub fn session(&mut self) -> &mut Session {
        &mut self.windows[self.current]
    }
}

pub type Handler = fn(&mut CommandContext, &[String]) -> i32;

/// Canonical name, single-letter aliases, handler. The aliases are the
/// bashmarks-style spellings long-time users expect.
const COMMANDS: &[(&str, &[&str], Handler)] = &[
    ("bookmark", &["s"], marks::bookmark),
    ("jump", &["g"], marks::jump),
    ("showmarks", &["l", "p"], marks::showmarks),
    ("renamemark", &["r"], marks::renamemark),
    ("deletemark", &["d"], marks::deletemark),
    ("history", &[], misc::history),
    ("clear", &[], misc::clear),
    ("help", &[], misc::help),
    ("config", &[], config::config),
    ("tex", &[], misc::tex),
    ("luatex", &[], misc::luatex),
    ("showToolbar", &[], misc::show_toolbar),
    ("hideToolbar", &[], misc::hide_toolbar),
    ("downloadFile", &[], cloud::download_file),
    ("downloadFolder", &[], cloud::download_folder),
];

pub fn lookup(name: &str) -> Option<Handler> {
    COMMANDS
        .iter()
        .find(|(canonical, aliases, _)| *canonical == name || aliases.contains(&name))
        .map(|(_, _, handler)| *handler)
}

/// Canonical command names, for `help -l`.
pub fn command_names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|(name, _, _)| *name)
}

/// Runs `argv` through the matching handler; `None` for unknown commands.
pub fn dispatch(ctx: &mut CommandContext, argv: &[String]) -> Option<i32> {
    let handler = lookup(argv.first()?)?;
    Some(handler(ctx, argv))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_their_commands() {
        assert!(lookup("bookmark").is_some());
        assert!(lookup("s").is_some());
        assert!(lookup("g").is_some());
        assert!(lookup("l").is_some());
        assert!(lookup("p").is_some());
        assert!(lookup("r").is_some());
        assert!(lookup("d").is_some());
        assert!(lookup("nonesuch").is_none());
    }

    #[test]
    fn canonical_names_are_unique() {
        let mut names: Vec<&str> = command_names().collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
    }
}
