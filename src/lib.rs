//! Sandbox-aware shell built-ins for terminal emulator hosts.
//!
//! Terminal apps in sandboxed environments can only reach most directories
//! through revocable, OS-issued access tokens scoped to whichever subtree
//! the user once authorized. This crate provides the command layer that
//! makes a POSIX-looking shell livable on top of that: named bookmarks with
//! persistent token storage, a `cd` fallback that walks a target's ancestry
//! probing stored grants ([`navigation`]), lazy materialization of cloud
//! placeholders ([`cloud`]), and the surrounding glue commands (`showmarks`,
//! `config`, `help`, ...).
//!
//! Hosts wire up the collaborator traits in [`platform`] and a
//! [`store::KeyValueStore`], then feed argv-style command lines through
//! [`commands::dispatch`]. Each shell window gets its own [`session::Session`]
//! (streams, history, appearance); all windows share the persisted store.

pub mod appearance;
pub mod bookmarks;
pub mod cloud;
pub mod commands;
pub mod navigation;
pub mod paths;
pub mod platform;
pub mod scope;
pub mod session;
pub mod store;

pub use commands::{dispatch, CommandContext};
pub use session::Session;
