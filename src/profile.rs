// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Profile layout.
//!
//! Specify the layout for the profile that repoquill uses to know which
//! configuration file to edit, and which repository stanzas to manage in it.
//! File I/O is left to the caller to figure out.
//!
//! The original GUI tooling this replaces kept all of this as module level
//! globals resolved at import time. Here the whole lot is an explicit
//! [`Profile`] value constructed once and handed to whoever needs it, so
//! tests can point it at temporary files instead of the real system paths.

use crate::stanza::Stanza;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Distro identity of the ArcoLinux family member that carries the anchored
/// repository layout in its stock configuration file.
pub const ANCHORED_DISTRO: &str = "arcolinux";

/// Marker package whose absence means the repository stanzas reference
/// mirrors that pacman can no longer resolve.
pub const SAFEGUARD_PACKAGE: &str = "arcolinux-mirrorlist-git";

const MIRRORLIST: &str = "/etc/pacman.d/arcolinux-mirrorlist";

/// Profile layout.
///
/// A profile bundles everything one repository switching session needs: the
/// configuration file to edit, the stanza definitions to manage, the
/// optional anchor line to insert before, and the marker package the
/// safeguard checks for.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Path to the pacman configuration file under management.
    pub config_path: PathBuf,

    /// Line token to insert stanzas in front of, when present in the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_token: Option<String>,

    /// Package whose absence triggers the safeguard.
    pub safeguard_package: String,

    /// Stanza definitions to manage, in insertion order.
    #[serde(rename = "stanza")]
    pub stanzas: Vec<Stanza>,
}

impl Profile {
    /// Construct built-in profile for target distro identity.
    ///
    /// Manages the four ArcoLinux repository stanzas in `/etc/pacman.conf`.
    /// Only the `arcolinux` distro itself gets the anchor token, because its
    /// stock configuration file carries the commented `#[testing]` section
    /// that the repositories must sit in front of. Every other family member
    /// gets plain appending.
    pub fn for_distro(distro: Option<&str>) -> Self {
        let anchor_token = match distro {
            Some(ANCHORED_DISTRO) => Some(String::from("#[testing]")),
            _ => None,
        };

        Self {
            config_path: PathBuf::from("/etc/pacman.conf"),
            anchor_token,
            safeguard_package: String::from(SAFEGUARD_PACKAGE),
            stanzas: arcolinux_stanzas(),
        }
    }

    /// Path to backup copy of the configuration file under management.
    pub fn backup_path(&self) -> PathBuf {
        let mut path = self.config_path.clone().into_os_string();
        path.push(".bak");
        PathBuf::from(path)
    }
}

impl FromStr for Profile {
    type Err = ProfileError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut profile: Profile = toml::de::from_str(data).map_err(ProfileError::Deserialize)?;

        // INVARIANT: Perform shell expansion on config path field.
        profile.config_path = PathBuf::from(
            shellexpand::full(profile.config_path.to_string_lossy().as_ref())
                .map_err(ProfileError::ShellExpansion)?
                .into_owned(),
        );

        Ok(profile)
    }
}

impl Display for Profile {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ProfileError::Serialize)?
                .as_str(),
        )
    }
}

/// The four ArcoLinux repository stanzas, in insertion order.
///
/// The testing repository ships commented out, and the xlarge repository is
/// the short two-line variant without a signature level directive.
pub fn arcolinux_stanzas() -> Vec<Stanza> {
    vec![
        Stanza::new(
            "#[arcolinux_repo_testing]",
            [
                "#SigLevel = Optional TrustedOnly".to_string(),
                format!("#Include = {MIRRORLIST}"),
            ],
        ),
        Stanza::new(
            "[arcolinux_repo]",
            [
                "SigLevel = Optional TrustedOnly".to_string(),
                format!("Include = {MIRRORLIST}"),
            ],
        ),
        Stanza::new(
            "[arcolinux_repo_3party]",
            [
                "SigLevel = Optional TrustedOnly".to_string(),
                format!("Include = {MIRRORLIST}"),
            ],
        ),
        Stanza::new("[arcolinux_repo_xlarge]", [format!("Include = {MIRRORLIST}")]),
    ]
}

/// Determine distro identity of the running system.
///
/// Reads the `ID` field out of `/etc/os-release`. Returns [`None`] when the
/// file is missing or carries no `ID` field, in which case callers should
/// fall back to the non-anchored profile.
pub fn detect_distro() -> Option<String> {
    read_to_string("/etc/os-release")
        .ok()
        .and_then(|content| parse_os_release_id(content.as_str()))
}

/// Parse the `ID` field out of os-release content.
pub fn parse_os_release_id(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.strip_prefix("ID=")
            .map(|id| id.trim().trim_matches('"').to_owned())
            .filter(|id| !id.is_empty())
    })
}

/// Load profile from target path, or fall back to the built-in profile.
///
/// A missing profile file is not an error; most installs never write one and
/// run off the built-in layout for the detected distro.
///
/// # Errors
///
/// - Return [`ProfileError::Read`] if an existing profile file cannot be
///   read.
/// - Return [`ProfileError::Deserialize`] if profile file contains invalid
///   TOML.
pub fn load_or_default(path: impl AsRef<Path>, distro: Option<&str>) -> Result<Profile> {
    if !path.as_ref().exists() {
        return Ok(Profile::for_distro(distro));
    }

    read_to_string(path.as_ref())
        .map_err(|err| ProfileError::Read {
            source: err,
            profile_path: path.as_ref().to_path_buf(),
        })?
        .parse()
}

/// Profile error types.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Failed to read profile file.
    #[error("failed to read profile at {:?}", profile_path.display())]
    Read {
        #[source]
        source: std::io::Error,
        profile_path: PathBuf,
    },

    /// Failed to deserialize profile.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize profile.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on profile.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ProfileError> for FmtError {
    fn from(_: ProfileError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ProfileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    #[sealed_test(env = [("TARGET", "/tmp/fixture")])]
    fn deserialize_profile() -> anyhow::Result<()> {
        let result: Profile = r##"
            config_path = "$TARGET/pacman.conf"
            anchor_token = "#[testing]"
            safeguard_package = "arcolinux-mirrorlist-git"

            [[stanza]]
            header = "[arcolinux_repo]"
            body = [
                "SigLevel = Optional TrustedOnly",
                "Include = /etc/pacman.d/arcolinux-mirrorlist",
            ]
        "##
        .parse()?;

        let expect = Profile {
            config_path: PathBuf::from("/tmp/fixture/pacman.conf"),
            anchor_token: Some("#[testing]".into()),
            safeguard_package: "arcolinux-mirrorlist-git".into(),
            stanzas: vec![Stanza::new(
                "[arcolinux_repo]",
                [
                    "SigLevel = Optional TrustedOnly",
                    "Include = /etc/pacman.d/arcolinux-mirrorlist",
                ],
            )],
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn serialize_profile() {
        let result = Profile {
            config_path: PathBuf::from("/etc/pacman.conf"),
            anchor_token: None,
            safeguard_package: "arcolinux-mirrorlist-git".into(),
            stanzas: vec![Stanza::new("[arcolinux_repo_xlarge]", ["Include = blah"])],
        }
        .to_string();

        let expect = indoc! {r#"
            config_path = "/etc/pacman.conf"
            safeguard_package = "arcolinux-mirrorlist-git"

            [[stanza]]
            header = "[arcolinux_repo_xlarge]"
            body = [
                "Include = blah",
            ]
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn built_in_profile_anchors_on_arcolinux_only() {
        let anchored = Profile::for_distro(Some("arcolinux"));
        let plain = Profile::for_distro(Some("endeavouros"));
        let unknown = Profile::for_distro(None);

        assert_eq!(anchored.anchor_token.as_deref(), Some("#[testing]"));
        assert_eq!(plain.anchor_token, None);
        assert_eq!(unknown.anchor_token, None);
        assert_eq!(anchored.stanzas.len(), 4);
    }

    #[test]
    fn built_in_stanza_lengths_match_their_definitions() {
        let stanzas = arcolinux_stanzas();

        assert_eq!(stanzas[0].body.len(), 2);
        assert_eq!(stanzas[1].body.len(), 2);
        assert_eq!(stanzas[2].body.len(), 2);
        // The xlarge variant is the short one.
        assert_eq!(stanzas[3].body.len(), 1);
    }

    #[test]
    fn backup_path_appends_bak_suffix() {
        let profile = Profile::for_distro(None);
        assert_eq!(profile.backup_path(), PathBuf::from("/etc/pacman.conf.bak"));
    }

    #[test_case("ID=arcolinux\n", Some("arcolinux"); "plain id")]
    #[test_case("NAME=\"Arch Linux\"\nID=arch\nID_LIKE=archlinux\n", Some("arch"); "id among other fields")]
    #[test_case("ID=\"endeavouros\"\n", Some("endeavouros"); "quoted id")]
    #[test_case("NAME=blah\n", None; "missing id")]
    #[test_case("ID=\n", None; "empty id")]
    #[test]
    fn parse_os_release_id_cases(content: &str, expect: Option<&str>) {
        pretty_assertions::assert_eq!(parse_os_release_id(content).as_deref(), expect);
    }

    #[sealed_test]
    fn load_or_default_falls_back_when_profile_missing() -> anyhow::Result<()> {
        let profile = load_or_default("missing-profile.toml", Some("arcolinux"))?;
        assert_eq!(profile, Profile::for_distro(Some("arcolinux")));
        Ok(())
    }
}
