// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::{Path, PathBuf};

/// Determine default absolute path to profile file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/repoquill/profile.toml` as
/// the default absolute path for the profile. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_profile_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("repoquill").join("profile.toml"))
        .ok_or(NoWayHome)
}

/// Create parent directory of target path if missing.
///
/// # Errors
///
/// - Return [`PathError::CreateParentDir`] if directory creation fails.
pub fn ensure_parent_dir(path: impl AsRef<Path>) -> Result<(), PathError> {
    if let Some(parent) = path.as_ref().parent() {
        mkdirp::mkdirp(parent).map_err(|err| PathError::CreateParentDir {
            source: err,
            dir_path: parent.to_path_buf(),
        })?;
    }

    Ok(())
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Parent directory cannot be created.
    #[error("failed to create directory at {:?}", dir_path.display())]
    CreateParentDir {
        #[source]
        source: std::io::Error,
        dir_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
