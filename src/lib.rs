// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! # Repoquill
//!
//! Switch the ArcoLinux family package repositories on and off in pacman's
//! configuration file, together with the keyring and mirrorlist packages
//! those repositories depend on.
//!
//! The library splits into a small set of pieces: [`stanza`] owns the
//! line-oriented editing of repository stanzas, [`profile`] describes what
//! to edit and where, [`pacman`] talks to the package manager, and [`repos`]
//! ties the three together into the operations the command line exposes.

pub mod pacman;
pub mod path;
pub mod profile;
pub mod repos;
pub mod stanza;

pub use pacman::{PackageInventory, Pacman};
pub use path::default_profile_path;
pub use profile::{detect_distro, Profile};
pub use repos::{RepoAction, RepoManager, RepoOutcome, RepoStatus};
pub use stanza::{Stanza, StanzaDrafter, StanzaEdit};
