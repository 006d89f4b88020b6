// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository stanza handling.
//!
//! Utilities to manage the repository stanzas that pacman reads from its
//! configuration file.
//!
//! # Stanza Layout
//!
//! Pacman interprets its configuration file on a per line basis. A repository
//! is declared through a __stanza__: a bracketed header line naming the
//! repository, followed by a short fixed run of directive lines, e.g.:
//!
//! ```text
//! [arcolinux_repo]
//! SigLevel = Optional TrustedOnly
//! Include = /etc/pacman.d/arcolinux-mirrorlist
//! ```
//!
//! The header line doubles as the stanza's identity. A stanza is either fully
//! present as one contiguous block, or fully absent. The length of a stanza
//! is a property of its definition, never discovered from file content.
//!
//! # Edit Discipline
//!
//! All edits follow a whole-file read, in-memory splice, whole-file overwrite
//! cycle. The document lives only for the duration of one edit and is not
//! cached between edits. There is no locking and no atomic rename; the
//! surrounding tool runs single-user and single-session, so the last writer
//! wins.
//!
//! # See Also
//!
//! - [Man page pacman.conf](https://man.archlinux.org/man/pacman.conf.5)

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

/// A named, fixed-text repository stanza.
///
/// The header line is the unique token that identifies the stanza inside a
/// configuration file. The body holds the directive lines that follow the
/// header when the stanza is present.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Stanza {
    /// Bracketed header line, e.g. `[arcolinux_repo]`.
    pub header: String,

    /// Directive lines following the header.
    pub body: Vec<String>,
}

impl Stanza {
    /// Construct new stanza definition.
    pub fn new(
        header: impl Into<String>,
        body: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            header: header.into(),
            body: body.into_iter().map(Into::into).collect(),
        }
    }

    /// Unique token that identifies this stanza in a document.
    pub fn token(&self) -> &str {
        self.header.as_str()
    }

    /// Full block of lines this stanza occupies when present.
    pub fn block(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(1 + self.body.len());
        lines.push(self.header.clone());
        lines.extend(self.body.iter().cloned());
        lines
    }
}

/// Stanza document editor.
///
/// # Invariant
///
/// - Stanza insertion never duplicates an already present stanza.
/// - Stanza removal leaves no line of the removed block behind, including
///   the blank separator line around it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StanzaEdit {
    lines: Vec<String>,
    changed: bool,
}

impl StanzaEdit {
    /// Construct new empty stanza document editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of first line containing `token` as a substring.
    ///
    /// First match wins when multiple lines contain the token. Returns
    /// [`None`] when no line matches, so a hit on line zero is never
    /// mistaken for a miss.
    pub fn find_position(&self, token: impl AsRef<str>) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.contains(token.as_ref()))
    }

    /// Check if any line contains `token` as a substring.
    pub fn contains(&self, token: impl AsRef<str>) -> bool {
        self.find_position(token).is_some()
    }

    /// Current document lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Insert a stanza block into the document.
    ///
    /// No-op when the stanza's header token is already present. When an
    /// anchor token is given and matches a line, the block is spliced in
    /// immediately before that line, followed by one blank separator line.
    /// Otherwise the block is appended at the end, preceded by one blank
    /// separator line. Inserting several stanzas before the same anchor in
    /// sequence preserves their insertion order.
    pub fn insert_stanza(&mut self, stanza: &Stanza, anchor: Option<&str>) {
        if self.contains(stanza.token()) {
            return;
        }

        let anchor_pos = anchor.and_then(|token| self.find_position(token));
        match anchor_pos {
            Some(pos) => {
                let mut block = stanza.block();
                block.push(String::new());
                self.lines.splice(pos..pos, block);
            }
            None => {
                self.lines.push(String::new());
                self.lines.extend(stanza.block());
            }
        }

        self.changed = true;
    }

    /// Insert a listing of stanza blocks into the document.
    pub fn insert_stanzas<'s>(
        &mut self,
        stanzas: impl IntoIterator<Item = &'s Stanza>,
        anchor: Option<&str>,
    ) {
        for stanza in stanzas {
            self.insert_stanza(stanza, anchor);
        }
    }

    /// Remove a stanza block from the document.
    ///
    /// No-op when the stanza's header token is absent. Splices out the header
    /// line plus the stanza's body lines, clamped to the end of the document
    /// so a truncated block never panics. One adjacent blank separator line
    /// is swallowed along with the block: the following line when it is
    /// blank, otherwise the preceding line when the block sat at the end of
    /// the document.
    pub fn remove_stanza(&mut self, stanza: &Stanza) {
        let Some(pos) = self.find_position(stanza.token()) else {
            return;
        };

        let end = usize::min(pos + 1 + stanza.body.len(), self.lines.len());
        self.lines.drain(pos..end);

        if self.lines.get(pos).is_some_and(|line| line.trim().is_empty()) {
            self.lines.remove(pos);
        } else if pos == self.lines.len()
            && pos > 0
            && self.lines[pos - 1].trim().is_empty()
        {
            self.lines.remove(pos - 1);
        }

        self.changed = true;
    }

    /// Remove a listing of stanza blocks from the document.
    ///
    /// Positions are recomputed fresh for each stanza, so earlier removals
    /// shifting the document never invalidate later ones.
    pub fn remove_stanzas<'s>(&mut self, stanzas: impl IntoIterator<Item = &'s Stanza>) {
        for stanza in stanzas {
            self.remove_stanza(stanza);
        }
    }
}

impl Display for StanzaEdit {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        if self.lines.is_empty() {
            return write!(fmt, "");
        }

        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }

        write!(fmt, "{out}")
    }
}

impl From<String> for StanzaEdit {
    fn from(content: String) -> Self {
        StanzaEdit::from(content.as_str())
    }
}

impl From<&str> for StanzaEdit {
    fn from(content: &str) -> Self {
        let lines = content.lines().map(str::to_owned).collect::<Vec<_>>();

        Self {
            lines,
            changed: false,
        }
    }
}

/// Manage stanzas in a pacman configuration file.
///
/// Provides methods to read the configuration document, and edit its stanzas
/// through a whole-file read-modify-write cycle.
#[derive(Clone, Debug)]
pub struct StanzaDrafter {
    conf_path: PathBuf,
}

impl StanzaDrafter {
    /// Construct new stanza drafter for target configuration file.
    ///
    /// Does not check that the file exists. A missing file surfaces as
    /// [`StanzaError::ReadConfFile`] on first use, because a pacman setup
    /// without its configuration file is broken beyond this tool's reach.
    pub fn new(conf_path: impl Into<PathBuf>) -> Self {
        Self {
            conf_path: conf_path.into(),
        }
    }

    /// Path to the configuration file under edit.
    pub fn conf_path(&self) -> &Path {
        self.conf_path.as_path()
    }

    /// Edit stanza document.
    ///
    /// Read current document into [`StanzaEdit`] instance, and directly edit
    /// it before writing the results back into the configuration file. The
    /// file is only rewritten when the editor actually changed something.
    ///
    /// # Errors
    ///
    /// - Return [`StanzaError::ReadConfFile`] if configuration file cannot
    ///   be read.
    /// - Return [`StanzaError::WriteConfFile`] if document cannot be written
    ///   back to configuration file.
    pub fn edit<E>(&self, editor: E) -> Result<()>
    where
        E: FnOnce(&mut StanzaEdit),
    {
        let content =
            read_to_string(&self.conf_path).map_err(|err| StanzaError::ReadConfFile {
                source: err,
                conf_path: self.conf_path.clone(),
            })?;

        let mut document = StanzaEdit::from(content);
        editor(&mut document);

        if !document.changed {
            return Ok(());
        }

        write(&self.conf_path, document.to_string().as_bytes()).map_err(|err| {
            StanzaError::WriteConfFile {
                source: err,
                conf_path: self.conf_path.clone(),
            }
        })?;

        Ok(())
    }

    /// Check if any line of the configuration file contains `token`.
    ///
    /// # Errors
    ///
    /// - Return [`StanzaError::ReadConfFile`] if configuration file cannot
    ///   be read.
    pub fn contains(&self, token: impl AsRef<str>) -> Result<bool> {
        Ok(self.current_lines()?.iter().any(|line| line.contains(token.as_ref())))
    }

    /// List current document lines.
    ///
    /// # Errors
    ///
    /// - Return [`StanzaError::ReadConfFile`] if configuration file cannot
    ///   be read.
    pub fn current_lines(&self) -> Result<Vec<String>> {
        read_to_string(&self.conf_path)
            .map_err(|err| StanzaError::ReadConfFile {
                source: err,
                conf_path: self.conf_path.clone(),
            })
            .map(|content| content.lines().map(str::to_owned).collect::<Vec<_>>())
    }
}

/// Stanza management error types.
#[derive(Debug, thiserror::Error)]
pub enum StanzaError {
    /// Configuration file cannot be read from.
    #[error("failed to read configuration file at {:?}", conf_path.display())]
    ReadConfFile {
        #[source]
        source: std::io::Error,
        conf_path: PathBuf,
    },

    /// Configuration file cannot be written to.
    #[error("failed to write configuration file at {:?}", conf_path.display())]
    WriteConfFile {
        #[source]
        source: std::io::Error,
        conf_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = StanzaError> = std::result::Result<T, E>;
