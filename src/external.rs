//! Editing text in an external program.

use log::{debug, warn};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::ZoneRecord;
use crate::reconcile::{self, Reconciliation};
use crate::util::expand_tabs;

/// Configuration key holding a custom editor command line.
pub const EDITOR_KEY: &str = "external_editor";

/// Program used to edit temporary text files.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExternalEditor {
    /// `edit text/plain:<file>` from the mailcap system.
    #[default]
    RunMailcap,
    /// A custom command; the file name is appended to `args`.
    Custom { program: String, args: Vec<String> },
}

impl ExternalEditor {
    /// Parse a whitespace-separated command line. An empty line selects
    /// run-mailcap.
    pub fn from_command_line(line: &str) -> Self {
        let mut words = line.split_whitespace().map(str::to_string);
        match words.next() {
            Some(program) => ExternalEditor::Custom {
                program,
                args: words.collect(),
            },
            None => ExternalEditor::RunMailcap,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_command_line(config.read(EDITOR_KEY).unwrap_or(""))
    }

    fn command(&self, file: &Path) -> Command {
        match self {
            ExternalEditor::RunMailcap => {
                let mut command = Command::new("edit");
                command.arg(format!("text/plain:{}", file.display()));
                command
            }
            ExternalEditor::Custom { program, args } => {
                let mut command = Command::new(program);
                command.args(args).arg(file);
                command
            }
        }
    }

    /// Run the editor on `file` and wait for it to exit.
    pub fn edit(&self, file: &Path) -> Result<()> {
        let file = if file.is_absolute() {
            file.to_path_buf()
        } else {
            std::env::current_dir()?.join(file)
        };
        let mut command = self.command(&file);
        debug!("running editor {:?}", command);
        let status = command
            .status()
            .map_err(|e| Error::Editor(format!("cannot run {:?}: {}", command.get_program(), e)))?;
        if !status.success() {
            warn!("editor exited with {}", status);
            return Err(Error::Editor(format!("editor exited with {}", status)));
        }
        Ok(())
    }
}

/// Write `initial` to a temporary file, let the user edit it and return the
/// new contents. The file is removed afterwards.
pub fn edit_text(editor: &ExternalEditor, initial: &str) -> Result<String> {
    let mut file = tempfile::Builder::new()
        .prefix("redjvu.")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(initial.as_bytes())?;
    file.flush()?;
    editor.edit(file.path())?;
    // Editors may replace the file instead of rewriting it, so read by path.
    let edited = fs::read_to_string(file.path())?;
    Ok(edited)
}

/// Edit the hidden text of a page and map the result back onto its zones.
/// Character-level zones are rejected before the editor starts.
pub fn edit_zone_text(editor: &ExternalEditor, record: &ZoneRecord) -> Result<Reconciliation> {
    let text = reconcile::export_text(record)?;
    let edited = edit_text(editor, &text)?;
    Ok(reconcile::import_text(record, &edited)?)
}

/// Edit an outline in its indented plain-text form; returns the edited lines
/// with tabs expanded and trailing whitespace removed.
pub fn edit_outline_text(editor: &ExternalEditor, plaintext: &str) -> Result<Vec<String>> {
    let edited = edit_text(editor, plaintext)?;
    Ok(edited
        .lines()
        .map(|line| expand_tabs(line, 8).trim_end().to_string())
        .collect())
}
