// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Pacman interaction.
//!
//! Utilities to query and manipulate the package inventory through the
//! pacman binary. Every call here blocks on an external process; callers
//! that only need to know whether a package is installed should depend on
//! the [`PackageInventory`] seam instead of [`Pacman`] directly, so tests
//! can substitute a canned inventory.

use std::{
    ffi::OsStr,
    fs::read_to_string,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{info, instrument, warn};

/// Package inventory query.
///
/// Answers whether a package is currently installed on the system. May
/// invoke an external process, and is allowed to be slow.
pub trait PackageInventory {
    /// Check if target package is installed.
    fn is_installed(&self, package: &str) -> bool;
}

/// Package inventory and manipulation through the pacman binary.
#[derive(Debug, Default, Clone)]
pub struct Pacman;

impl Pacman {
    /// Construct new pacman handle.
    pub fn new() -> Self {
        Self
    }

    /// Install target package.
    ///
    /// Skips the system call when the package is already installed, because
    /// pacman would treat a reinstall as an upgrade request.
    ///
    /// # Errors
    ///
    /// - Return [`PacmanError::Syscall`] if pacman cannot be invoked, or
    ///   exits with failure.
    #[instrument(skip(self), level = "debug")]
    pub fn install_package(&self, package: &str) -> Result<()> {
        if self.is_installed(package) {
            info!("package {package} is already installed, nothing to do");
            return Ok(());
        }

        let output = syscall_non_interactive(
            "pacman",
            ["-S", package, "--noconfirm", "--needed"],
        )?;
        info!("package {package} is now installed");
        if !output.is_empty() {
            info!("{output}");
        }

        Ok(())
    }

    /// Install every package listed in target file.
    ///
    /// The file lists one package name per line. Lines containing a `#` are
    /// treated as comments and skipped, as are blank lines. Installation is
    /// best-effort per package; a package that fails to install is logged
    /// and does not stop the rest of the listing.
    ///
    /// # Errors
    ///
    /// - Return [`PacmanError::ReadPackageList`] if the listing file cannot
    ///   be read.
    #[instrument(skip(self, path), level = "debug")]
    pub fn install_package_list(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = read_to_string(path.as_ref()).map_err(|err| {
            PacmanError::ReadPackageList {
                source: err,
                list_path: path.as_ref().to_path_buf(),
            }
        })?;

        for package in parse_package_list(content.as_str()) {
            if let Err(error) = self.install_package(package) {
                warn!("skipping package {package}: {error}");
            }
        }

        Ok(())
    }

    /// Install local package archives found in target directory.
    ///
    /// Used for the keyring and mirrorlist packages bundled alongside the
    /// tool, which must be installable before their repositories resolve.
    ///
    /// # Errors
    ///
    /// - Return [`PacmanError::ReadPackageDir`] if the directory cannot be
    ///   listed.
    /// - Return [`PacmanError::Syscall`] if pacman cannot be invoked, or
    ///   exits with failure.
    #[instrument(skip(self, dir), level = "debug")]
    pub fn install_local_archives(&self, dir: impl AsRef<Path>) -> Result<()> {
        let entries = std::fs::read_dir(dir.as_ref()).map_err(|err| {
            PacmanError::ReadPackageDir {
                source: err,
                dir_path: dir.as_ref().to_path_buf(),
            }
        })?;

        let mut archives = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| PacmanError::ReadPackageDir {
                source: err,
                dir_path: dir.as_ref().to_path_buf(),
            })?;
            archives.push(entry.path());
        }

        if archives.is_empty() {
            warn!("no package archives found in {:?}", dir.as_ref().display());
            return Ok(());
        }

        let mut args: Vec<std::ffi::OsString> = vec!["-U".into()];
        args.extend(archives.iter().map(|path| path.clone().into_os_string()));
        args.push("--noconfirm".into());
        let output = syscall_non_interactive("pacman", args)?;
        info!("installed {} local archive(s)", archives.len());
        if !output.is_empty() {
            info!("{output}");
        }

        Ok(())
    }

    /// Remove target package without dependency checks.
    ///
    /// Mirrors `pacman -Rdd`, which the keyring and mirrorlist teardown
    /// needs because the repositories being switched off still depend on
    /// them. No-op when the package is not installed.
    ///
    /// # Errors
    ///
    /// - Return [`PacmanError::Syscall`] if pacman cannot be invoked, or
    ///   exits with failure.
    #[instrument(skip(self), level = "debug")]
    pub fn remove_package(&self, package: &str) -> Result<()> {
        if !self.is_installed(package) {
            info!("package {package} is not installed, nothing to do");
            return Ok(());
        }

        let output = syscall_non_interactive("pacman", ["-Rdd", package, "--noconfirm"])?;
        info!("package {package} is now removed");
        if !output.is_empty() {
            info!("{output}");
        }

        Ok(())
    }

    /// Refresh pacman's sync databases.
    ///
    /// # Errors
    ///
    /// - Return [`PacmanError::Syscall`] if pacman cannot be invoked, or
    ///   exits with failure.
    #[instrument(skip(self), level = "debug")]
    pub fn refresh_databases(&self) -> Result<()> {
        let output = syscall_non_interactive("pacman", ["-Sy"])?;
        if !output.is_empty() {
            info!("{output}");
        }

        Ok(())
    }
}

impl PackageInventory for Pacman {
    /// Check if target package is installed.
    ///
    /// Queries the local database through `pacman -Qi`. A failing query
    /// means the package is not installed; pacman exits non-zero for
    /// unknown packages.
    fn is_installed(&self, package: &str) -> bool {
        syscall_non_interactive("pacman", ["-Qi", package]).is_ok()
    }
}

/// Parse a package listing into package names.
///
/// One package per line. Blank lines and lines containing a `#` are skipped.
pub fn parse_package_list(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains('#'))
}

pub(crate) fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref()).args(args).output()?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(PacmanError::Syscall(std::io::Error::other(format!(
            "command {:?} failed:\n{message}",
            cmd.as_ref()
        ))));
    }

    Ok(message)
}

/// Pacman interaction error types.
#[derive(Debug, thiserror::Error)]
pub enum PacmanError {
    /// Package listing file cannot be read.
    #[error("failed to read package listing at {:?}", list_path.display())]
    ReadPackageList {
        #[source]
        source: std::io::Error,
        list_path: PathBuf,
    },

    /// Local package archive directory cannot be listed.
    #[error("failed to list package archives in {:?}", dir_path.display())]
    ReadPackageDir {
        #[source]
        source: std::io::Error,
        dir_path: PathBuf,
    },

    /// System call to pacman fails.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = PacmanError> = std::result::Result<T, E>;
