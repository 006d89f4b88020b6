// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use repoquill::{
    default_profile_path, detect_distro,
    path::ensure_parent_dir,
    profile::load_or_default,
    Pacman, Profile, RepoAction, RepoManager, RepoOutcome,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use inquire::Confirm;
use std::{
    fs,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Keyring package paired with the repository stanzas.
const KEYRING_PACKAGE: &str = "arcolinux-keyring";

/// Mirrorlist package paired with the repository stanzas.
const MIRRORLIST_PACKAGE: &str = "arcolinux-mirrorlist-git";

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  repoquill [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to profile file to use instead of the default one.
    #[arg(short, long, value_name = "path", global = true)]
    profile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let profile_path = match self.profile {
            Some(path) => path,
            None => default_profile_path()?,
        };
        let profile = load_profile(&profile_path)?;
        match self.command {
            Command::Status => run_status(profile),
            Command::Install(opts) => run_install(profile, opts),
            Command::Remove(opts) => run_remove(profile, opts),
            Command::Safeguard => run_safeguard(profile),
            Command::Reset(opts) => run_reset(profile, opts),
            Command::InstallList(opts) => run_install_list(opts),
            Command::Init(opts) => run_init(profile, profile_path, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Report which repository stanzas are present.
    Status,

    /// Switch the repositories on.
    #[command(override_usage = "repoquill install [options]")]
    Install(InstallOptions),

    /// Switch the repositories off.
    #[command(override_usage = "repoquill remove [options]")]
    Remove(RemoveOptions),

    /// Remove stanzas whose marker package is gone.
    Safeguard,

    /// Restore the configuration file from its backup.
    #[command(override_usage = "repoquill reset [options]")]
    Reset(ResetOptions),

    /// Install packages listed in a file.
    #[command(override_usage = "repoquill install-list <file>")]
    InstallList(InstallListOptions),

    /// Write the built-in profile to the profile path.
    Init(InitOptions),
}

#[derive(Parser, Clone, Debug)]
struct InstallOptions {
    /// Directories of local package archives to install first.
    #[arg(short, long, value_name = "dir")]
    pub archives: Vec<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
struct RemoveOptions {
    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Leave the keyring and mirrorlist packages installed.
    #[arg(short, long)]
    pub keep_packages: bool,
}

#[derive(Parser, Clone, Debug)]
struct ResetOptions {
    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Clone, Debug)]
struct InstallListOptions {
    #[arg(value_name = "file")]
    pub path: PathBuf,
}

#[derive(Parser, Clone, Debug)]
struct InitOptions {
    /// Overwrite an existing profile file.
    #[arg(short, long)]
    pub force: bool,
}

fn main() {
    let layer = fmt::layer().compact();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry().with(layer).with(filter).init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_profile(path: &Path) -> Result<Profile> {
    let distro = detect_distro();
    if let Some(distro) = &distro {
        info!("detected distro {distro}");
    }

    Ok(load_or_default(path, distro.as_deref())?)
}

fn run_status(profile: Profile) -> Result<()> {
    let manager = RepoManager::new(profile, Pacman::new());
    for status in manager.status()? {
        let state = if status.present { "present" } else { "absent" };
        println!("{:<30} {state}", status.name);
    }

    Ok(())
}

fn run_install(profile: Profile, opts: InstallOptions) -> Result<()> {
    let pacman = Pacman::new();
    for dir in &opts.archives {
        pacman.install_local_archives(dir)?;
    }

    let manager = RepoManager::new(profile, pacman.clone());
    if manager.backup()? {
        info!("kept a pristine backup of the configuration file");
    }

    let outcomes = manager.install_repos()?;
    let changed = outcomes
        .iter()
        .any(|outcome| outcome.action == RepoAction::Installed);
    report_outcomes(outcomes);
    if changed {
        pacman.refresh_databases()?;
    }

    Ok(())
}

fn run_remove(profile: Profile, opts: RemoveOptions) -> Result<()> {
    if !opts.yes && !confirm("Remove the repository stanzas and their packages?")? {
        warn!("removal aborted");
        return Ok(());
    }

    let pacman = Pacman::new();
    if !opts.keep_packages {
        pacman.remove_package(KEYRING_PACKAGE)?;
        pacman.remove_package(MIRRORLIST_PACKAGE)?;
    }

    let manager = RepoManager::new(profile, pacman);
    report_outcomes(manager.remove_repos()?);

    Ok(())
}

fn run_safeguard(profile: Profile) -> Result<()> {
    let manager = RepoManager::new(profile, Pacman::new());
    if manager.safeguard()? {
        info!("stanzas referencing unavailable mirrors were removed");
    } else {
        info!("marker package is installed, nothing to do");
    }

    Ok(())
}

fn run_reset(profile: Profile, opts: ResetOptions) -> Result<()> {
    if !opts.yes && !confirm("Overwrite the configuration file with its backup?")? {
        warn!("reset aborted");
        return Ok(());
    }

    let manager = RepoManager::new(profile, Pacman::new());
    let guarded = manager.reset()?;
    info!("configuration file restored from backup");
    if guarded {
        info!("stanzas referencing unavailable mirrors were removed");
    }

    Ok(())
}

fn run_install_list(opts: InstallListOptions) -> Result<()> {
    Pacman::new().install_package_list(&opts.path)?;

    Ok(())
}

fn run_init(profile: Profile, path: PathBuf, opts: InitOptions) -> Result<()> {
    if path.exists() && !opts.force {
        warn!("profile already exists at {:?}, pass --force to overwrite", path.display());
        return Ok(());
    }

    ensure_parent_dir(&path)?;
    fs::write(&path, profile.to_string())?;
    info!("profile written to {:?}", path.display());

    Ok(())
}

fn confirm(message: &str) -> Result<bool> {
    Ok(Confirm::new(message).with_default(false).prompt()?)
}

fn report_outcomes(outcomes: Vec<RepoOutcome>) {
    for outcome in outcomes {
        info!("{:<30} {}", outcome.name, outcome.action);
    }
}
