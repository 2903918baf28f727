//! SQL exercise library: one XML file per command.
//!
//! ```xml
//! <command>
//!   <title>Top sales</title>
//!   <description>First ten rows of sales</description>
//!   <full>SELECT TOP 10 * FROM sales</full>
//!   <parts>
//!     <part><text>SELECT TOP 10 *</text><desc>projection</desc></part>
//!     <part text="FROM sales" description="source"/>
//!   </parts>
//! </command>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use quiz_core::model::{CommandCategory, CommandError, CommandPart, SqlCommand};
use roxmltree::{Document, Node};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommandLoadError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: invalid XML: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("{path}: {source}")]
    Command {
        path: PathBuf,
        #[source]
        source: CommandError,
    },
}

/// Every `*.xml` under `dir`, recursively, sorted by path.
///
/// A missing directory yields no commands. Files that fail to load are logged
/// and skipped.
#[must_use]
pub fn load_commands(dir: &Path) -> Vec<SqlCommand> {
    if !dir.is_dir() {
        info!("command directory {} does not exist; nothing to load", dir.display());
        return Vec::new();
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry under {}: {e}", dir.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        })
        .collect();
    paths.sort();

    let commands: Vec<SqlCommand> = paths
        .iter()
        .filter_map(|path| match load_command(path) {
            Ok(command) => Some(command),
            Err(e) => {
                warn!("skipping command file: {e}");
                None
            }
        })
        .collect();
    info!("loaded {} SQL commands from {}", commands.len(), dir.display());
    commands
}

/// Load one command file. The id is the file stem; the category comes from the
/// parent folder when it is a known library, otherwise from the command text.
///
/// # Errors
///
/// Returns `CommandLoadError` when the file cannot be read, is not XML, or has
/// neither a target command nor parts.
pub fn load_command(path: &Path) -> Result<SqlCommand, CommandLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| CommandLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_command(path, &raw)
}

/// # Errors
///
/// See [`load_command`].
pub fn parse_command(path: &Path, raw: &str) -> Result<SqlCommand, CommandLoadError> {
    let doc = Document::parse(raw).map_err(|source| CommandLoadError::Xml {
        path: path.to_path_buf(),
        source,
    })?;
    let root = doc.root_element();

    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let parts = root
        .descendants()
        .filter(|n| n.has_tag_name("part"))
        .map(|part| CommandPart {
            text: child_text(part, "text")
                .or_else(|| part.attribute("text").map(str::trim))
                .unwrap_or_default()
                .to_owned(),
            desc: child_text(part, "desc")
                .or_else(|| part.attribute("description").map(str::trim))
                .unwrap_or_default()
                .to_owned(),
        })
        .collect();

    let category = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| CommandCategory::from_folder(&name.to_string_lossy()));

    SqlCommand::new(
        id,
        child_text(root, "title").unwrap_or_default(),
        child_text(root, "description").unwrap_or_default(),
        child_text(root, "full").unwrap_or_default(),
        parts,
        category,
    )
    .map_err(|source| CommandLoadError::Command {
        path: path.to_path_buf(),
        source,
    })
}

/// Trimmed text of the first direct child named `name`, if non-empty.
fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
