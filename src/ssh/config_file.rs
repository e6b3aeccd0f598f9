//! Line-oriented editor for SSH client configuration files.
//!
//! The file is modeled as a sequence of sections: an optional preamble plus
//! one section per `Host` stanza. Sections this tool does not touch are kept
//! verbatim, so rewriting a file without changes reproduces it byte for
//! byte.

use std::path::Path;

use crate::ssh::HostEntry;
use crate::{Ec2ToolsError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    /// Patterns from the `Host` line; empty for the preamble
    host_patterns: Vec<String>,
    /// Raw lines including the `Host` line itself
    lines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshConfigFile {
    sections: Vec<Section>,
}

impl SshConfigFile {
    pub fn parse(content: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        let mut current = Section {
            host_patterns: Vec::new(),
            lines: Vec::new(),
        };

        for line in content.lines() {
            if let Some(patterns) = host_patterns(line) {
                if !current.lines.is_empty() {
                    sections.push(current);
                }
                current = Section {
                    host_patterns: patterns,
                    lines: vec![line.to_string()],
                };
            } else {
                current.lines.push(line.to_string());
            }
        }

        if !current.lines.is_empty() {
            sections.push(current);
        }

        Self { sections }
    }

    /// Read a config file. A missing file is a hard error, not an empty
    /// config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Ec2ToolsError::SshConfigNotFound(path.to_path_buf()));
        }
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn contains_host(&self, alias: &str) -> bool {
        self.sections
            .iter()
            .any(|s| s.host_patterns.iter().any(|p| p == alias))
    }

    /// Remove every stanza whose `Host` line lists the alias. Returns true
    /// when something was removed.
    pub fn remove_host(&mut self, alias: &str) -> bool {
        let before = self.sections.len();
        self.sections
            .retain(|s| !s.host_patterns.iter().any(|p| p == alias));
        self.sections.len() != before
    }

    /// Append a stanza for the entry. Callers remove any existing stanza for
    /// the alias first; this keeps at most one entry per alias.
    pub fn add_host(&mut self, entry: &HostEntry) {
        // One separating blank line, added at most once so repeated
        // remove/add cycles stay byte-stable.
        if let Some(last) = self.sections.last_mut() {
            if last.lines.last().is_some_and(|l| !l.trim().is_empty()) {
                last.lines.push(String::new());
            }
        }

        let mut lines = vec![format!("Host {}", entry.alias)];
        lines.push(format!("  HostName {}", entry.hostname));
        if let Some(user) = &entry.user {
            lines.push(format!("  User {}", user));
        }
        if let Some(identity_file) = &entry.identity_file {
            lines.push(format!("  IdentityFile {}", identity_file.display()));
        }

        self.sections.push(Section {
            host_patterns: vec![entry.alias.clone()],
            lines,
        });
    }

    pub fn render(&self) -> String {
        let lines: Vec<&str> = self
            .sections
            .iter()
            .flat_map(|s| s.lines.iter().map(String::as_str))
            .collect();

        if lines.is_empty() {
            String::new()
        } else {
            let mut out = lines.join("\n");
            out.push('\n');
            out
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

/// Patterns of a `Host` line, or None for any other line.
fn host_patterns(line: &str) -> Option<Vec<String>> {
    let mut tokens = line.split_whitespace();
    let keyword = tokens.next()?;
    if !keyword.eq_ignore_ascii_case("host") {
        return None;
    }
    Some(tokens.map(String::from).collect())
}
