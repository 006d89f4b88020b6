// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository switching logic.
//!
//! Binds a [`Profile`] to the stanza drafter and the package inventory, and
//! exposes the operations the command line surface calls into: report
//! stanza presence, switch the repositories on or off, guard against
//! dangling stanzas, and manage the configuration backup.
//!
//! # Outcome Reporting
//!
//! Every mutating operation reports what actually happened to each stanza
//! instead of assuming success. The original tooling this replaces notified
//! the user of success no matter what the edit did; here the caller gets a
//! [`RepoOutcome`] per stanza and a structured error when the file itself
//! cannot be read or written, and decides for itself what to surface.

use crate::{
    pacman::PackageInventory,
    profile::Profile,
    stanza::{StanzaDrafter, StanzaError},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::PathBuf,
};
use tracing::{info, instrument, warn};

/// Repository stanza switcher.
///
/// Owns the configuration document for the duration of each operation. Each
/// operation is one whole-file read-modify-write cycle against the profile's
/// configuration path.
#[derive(Debug)]
pub struct RepoManager<I>
where
    I: PackageInventory,
{
    profile: Profile,
    drafter: StanzaDrafter,
    inventory: I,
}

impl<I> RepoManager<I>
where
    I: PackageInventory,
{
    /// Construct new repository manager from target profile.
    pub fn new(profile: Profile, inventory: I) -> Self {
        let drafter = StanzaDrafter::new(&profile.config_path);

        Self {
            profile,
            drafter,
            inventory,
        }
    }

    /// Profile this manager operates on.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Report presence of each configured stanza.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Stanza`] if configuration file cannot be read.
    pub fn status(&self) -> Result<Vec<RepoStatus>> {
        let lines = self.drafter.current_lines()?;

        Ok(self
            .profile
            .stanzas
            .iter()
            .map(|stanza| RepoStatus {
                name: stanza.header.clone(),
                present: lines.iter().any(|line| line.contains(stanza.token())),
            })
            .collect())
    }

    /// Switch the configured repository stanzas on.
    ///
    /// Inserts every stanza that is not already present, in definition
    /// order. When the profile carries an anchor token that matches a line,
    /// blocks land immediately before that line; otherwise they are appended
    /// at the end. Calling this twice is a no-op the second time.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Stanza`] if configuration file cannot be read
    ///   or written.
    #[instrument(skip(self), level = "debug")]
    pub fn install_repos(&self) -> Result<Vec<RepoOutcome>> {
        info!(
            "adding repository stanzas to {:?}",
            self.profile.config_path.display()
        );

        let mut outcomes = Vec::new();
        let anchor = self.profile.anchor_token.clone();
        let stanzas = self.profile.stanzas.clone();
        self.drafter.edit(|document| {
            for stanza in &stanzas {
                let action = if document.contains(stanza.token()) {
                    RepoAction::AlreadyPresent
                } else {
                    document.insert_stanza(stanza, anchor.as_deref());
                    RepoAction::Installed
                };
                outcomes.push(RepoOutcome {
                    name: stanza.header.clone(),
                    action,
                });
            }
        })?;

        Ok(outcomes)
    }

    /// Switch the configured repository stanzas off.
    ///
    /// Removes every stanza that is present. Absent stanzas are reported as
    /// such and left alone, so the operation is idempotent.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Stanza`] if configuration file cannot be read
    ///   or written.
    #[instrument(skip(self), level = "debug")]
    pub fn remove_repos(&self) -> Result<Vec<RepoOutcome>> {
        info!(
            "removing repository stanzas from {:?}",
            self.profile.config_path.display()
        );

        let mut outcomes = Vec::new();
        let stanzas = self.profile.stanzas.clone();
        self.drafter.edit(|document| {
            for stanza in &stanzas {
                let action = if document.contains(stanza.token()) {
                    document.remove_stanza(stanza);
                    RepoAction::Removed
                } else {
                    RepoAction::Absent
                };
                outcomes.push(RepoOutcome {
                    name: stanza.header.clone(),
                    action,
                });
            }
        })?;

        Ok(outcomes)
    }

    /// Guard against stanzas that reference unavailable mirrors.
    ///
    /// When the profile's marker package is not installed, the stanzas point
    /// pacman at mirrors it cannot resolve, so all configured stanzas are
    /// removed. Reports whether the guard fired.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Stanza`] if configuration file cannot be read
    ///   or written.
    #[instrument(skip(self), level = "debug")]
    pub fn safeguard(&self) -> Result<bool> {
        if self.inventory.is_installed(&self.profile.safeguard_package) {
            return Ok(false);
        }

        warn!(
            "package {} is not installed, removing its repository stanzas",
            self.profile.safeguard_package
        );
        self.remove_repos()?;

        Ok(true)
    }

    /// Keep a pristine backup of the configuration file.
    ///
    /// Copies the configuration file next to itself with a `.bak` suffix.
    /// Never overwrites an existing backup, so the first backup taken stays
    /// the pristine one. Reports whether a new backup was written.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Backup`] if the copy fails.
    pub fn backup(&self) -> Result<bool> {
        let backup_path = self.profile.backup_path();
        if backup_path.exists() {
            return Ok(false);
        }

        fs::copy(&self.profile.config_path, &backup_path).map_err(|err| RepoError::Backup {
            source: err,
            backup_path: backup_path.clone(),
        })?;
        info!("backed up configuration to {:?}", backup_path.display());

        Ok(true)
    }

    /// Restore the configuration file from its backup, then run the guard.
    ///
    /// The restored file may predate the repositories being switched on, so
    /// the safeguard runs right after to strip stanzas whose marker package
    /// is gone.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::MissingBackup`] if no backup exists to restore
    ///   from.
    /// - Return [`RepoError::Backup`] if the copy fails.
    /// - Return [`RepoError::Stanza`] if the safeguard cannot edit the
    ///   restored file.
    #[instrument(skip(self), level = "debug")]
    pub fn reset(&self) -> Result<bool> {
        let backup_path = self.profile.backup_path();
        if !backup_path.exists() {
            return Err(RepoError::MissingBackup { backup_path });
        }

        fs::copy(&backup_path, &self.profile.config_path).map_err(|err| RepoError::Backup {
            source: err,
            backup_path: backup_path.clone(),
        })?;
        info!(
            "restored {:?} from {:?}",
            self.profile.config_path.display(),
            backup_path.display()
        );

        self.safeguard()
    }
}

/// Presence report for one configured stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    /// Stanza header line.
    pub name: String,

    /// Whether the stanza is present in the configuration file.
    pub present: bool,
}

/// What one mutating operation did to one configured stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOutcome {
    /// Stanza header line.
    pub name: String,

    /// Action taken for the stanza.
    pub action: RepoAction,
}

/// Action taken for a single stanza.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoAction {
    /// Stanza block was inserted.
    Installed,

    /// Stanza block was already in place; nothing to do.
    AlreadyPresent,

    /// Stanza block was spliced out.
    Removed,

    /// Stanza block was not there to begin with; nothing to do.
    Absent,
}

impl Display for RepoAction {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::Installed => "installed",
            Self::AlreadyPresent => "already present",
            Self::Removed => "removed",
            Self::Absent => "absent",
        };

        write!(fmt, "{label}")
    }
}

/// Repository switching error types.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Stanza edit fails.
    #[error(transparent)]
    Stanza(#[from] StanzaError),

    /// Backup copy fails.
    #[error("failed to copy configuration backup at {:?}", backup_path.display())]
    Backup {
        #[source]
        source: std::io::Error,
        backup_path: PathBuf,
    },

    /// No backup exists to restore from.
    #[error("no configuration backup found at {:?}", backup_path.display())]
    MissingBackup { backup_path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = RepoError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::arcolinux_stanzas;

    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::path::PathBuf;

    /// Inventory with a canned answer.
    struct CannedInventory {
        installed: bool,
    }

    impl PackageInventory for CannedInventory {
        fn is_installed(&self, _package: &str) -> bool {
            self.installed
        }
    }

    const PRISTINE: &str = indoc! {r#"
        [core]
        Include = /etc/pacman.d/mirrorlist

        [extra]
        Include = /etc/pacman.d/mirrorlist
    "#};

    fn fixture_manager(installed: bool) -> RepoManager<CannedInventory> {
        std::fs::write("pacman.conf", PRISTINE).unwrap();
        let profile = Profile {
            config_path: PathBuf::from("pacman.conf"),
            anchor_token: None,
            safeguard_package: "arcolinux-mirrorlist-git".into(),
            stanzas: arcolinux_stanzas(),
        };

        RepoManager::new(profile, CannedInventory { installed })
    }

    #[sealed_test]
    fn install_repos_reports_and_is_idempotent() -> anyhow::Result<()> {
        let manager = fixture_manager(true);

        let first = manager.install_repos()?;
        assert!(first.iter().all(|o| o.action == RepoAction::Installed));

        let after_first = std::fs::read_to_string("pacman.conf")?;
        let second = manager.install_repos()?;
        assert!(second.iter().all(|o| o.action == RepoAction::AlreadyPresent));
        let after_second = std::fs::read_to_string("pacman.conf")?;
        assert_eq!(after_first, after_second);

        for status in manager.status()? {
            assert!(status.present, "{} should be present", status.name);
        }

        Ok(())
    }

    #[sealed_test]
    fn remove_repos_round_trips_to_pristine() -> anyhow::Result<()> {
        let manager = fixture_manager(true);

        manager.install_repos()?;
        let outcomes = manager.remove_repos()?;
        assert!(outcomes.iter().all(|o| o.action == RepoAction::Removed));

        let content = std::fs::read_to_string("pacman.conf")?;
        assert_eq!(content, PRISTINE);

        let again = manager.remove_repos()?;
        assert!(again.iter().all(|o| o.action == RepoAction::Absent));

        Ok(())
    }

    #[sealed_test]
    fn safeguard_fires_only_when_marker_package_missing() -> anyhow::Result<()> {
        let manager = fixture_manager(true);
        manager.install_repos()?;

        assert!(!manager.safeguard()?);
        for status in manager.status()? {
            assert!(status.present);
        }

        let manager = RepoManager::new(
            manager.profile().clone(),
            CannedInventory { installed: false },
        );
        assert!(manager.safeguard()?);
        let content = std::fs::read_to_string("pacman.conf")?;
        assert_eq!(content, PRISTINE);

        Ok(())
    }

    #[sealed_test]
    fn backup_and_reset_restore_pristine_configuration() -> anyhow::Result<()> {
        let manager = fixture_manager(true);

        assert!(manager.backup()?);
        manager.install_repos()?;
        // Second backup must not clobber the pristine copy.
        assert!(!manager.backup()?);

        manager.reset()?;
        let content = std::fs::read_to_string("pacman.conf")?;
        assert_eq!(content, PRISTINE);

        Ok(())
    }

    #[sealed_test]
    fn reset_without_backup_is_an_error() {
        let manager = fixture_manager(true);

        let result = manager.reset();

        assert!(matches!(result, Err(RepoError::MissingBackup { .. })));
    }

    #[sealed_test]
    fn anchored_profile_inserts_before_anchor_line() -> anyhow::Result<()> {
        let stock = indoc! {r#"
            [core]
            Include = /etc/pacman.d/mirrorlist

            #[testing]
            #Include = /etc/pacman.d/mirrorlist
        "#};
        std::fs::write("pacman.conf", stock)?;
        let profile = Profile {
            config_path: PathBuf::from("pacman.conf"),
            anchor_token: Some("#[testing]".into()),
            safeguard_package: "arcolinux-mirrorlist-git".into(),
            stanzas: arcolinux_stanzas(),
        };
        let manager = RepoManager::new(profile, CannedInventory { installed: true });

        manager.install_repos()?;

        let lines = manager.status()?;
        assert!(lines.iter().all(|status| status.present));
        let content = std::fs::read_to_string("pacman.conf")?;
        let anchor_at = content.find("#[testing]").unwrap();
        let xlarge_at = content.find("[arcolinux_repo_xlarge]").unwrap();
        assert!(xlarge_at < anchor_at, "stanzas should sit before the anchor");

        Ok(())
    }
}
