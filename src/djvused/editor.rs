//! Batched djvused command scripts.

use log::{debug, trace};
use std::collections::BTreeMap;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::thread;

use super::tool::ToolHandle;
use crate::error::{Error, Result};
use crate::model::PageId;
use crate::sexpr::Expr;

/// Accumulates djvused commands for one document and runs them in a single
/// process on [`commit`](StreamEditor::commit).
#[derive(Debug, Clone)]
pub struct StreamEditor {
    tool: ToolHandle,
    file: PathBuf,
    autosave: bool,
    commands: Vec<String>,
}

impl StreamEditor {
    pub fn new(tool: ToolHandle, file: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            file: file.into(),
            autosave: false,
            commands: Vec::new(),
        }
    }

    /// Pass `-s` so djvused saves the document after the script.
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Fresh editor for the same file and settings, with no commands.
    pub fn fresh(&self) -> Self {
        Self {
            tool: self.tool.clone(),
            file: self.file.clone(),
            autosave: self.autosave,
            commands: Vec::new(),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Script lines queued so far.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn push(&mut self, command: impl Into<String>) {
        self.commands.push(command.into());
    }

    pub fn select_all(&mut self) {
        self.push("select");
    }

    /// Select a page, or create-and-select the shared annotation chunk.
    pub fn select(&mut self, id: PageId) {
        match id.page_number() {
            Some(n) => self.push(format!("select {}", n)),
            None => self.create_shared_annotations(),
        }
    }

    pub fn select_shared_annotations(&mut self) {
        self.push("select-shared-ant");
    }

    pub fn create_shared_annotations(&mut self) {
        self.push("create-shared-ant");
    }

    pub fn set_annotations(&mut self, annotations: &[Expr]) {
        self.push("set-ant");
        for annotation in annotations {
            self.push(annotation.to_string());
        }
        self.push(".");
    }

    pub fn remove_annotations(&mut self) {
        self.push("remove-ant");
    }

    pub fn print_annotations(&mut self) {
        self.push("print-ant");
    }

    pub fn set_metadata(&mut self, metadata: &BTreeMap<String, String>) {
        self.push("set-meta");
        for (key, value) in metadata {
            self.push(format!(
                "{}\t{}",
                Expr::symbol(key.clone()),
                Expr::string(value.clone())
            ));
        }
        self.push(".");
    }

    pub fn remove_metadata(&mut self) {
        self.push("remove-meta");
    }

    pub fn print_metadata(&mut self) {
        self.push("print-meta");
    }

    /// Replace the hidden text; `None` removes it.
    pub fn set_text(&mut self, text: Option<&Expr>) {
        match text {
            Some(text) => {
                self.push("set-txt");
                self.push(text.to_string());
                self.push(".");
            }
            None => self.remove_text(),
        }
    }

    pub fn remove_text(&mut self) {
        self.push("remove-txt");
    }

    pub fn print_text(&mut self) {
        self.push("print-txt");
    }

    pub fn print_pure_text(&mut self) {
        self.push("print-pure-txt");
    }

    /// Replace the outline; `None` removes it.
    pub fn set_outline(&mut self, outline: Option<&Expr>) {
        self.push("set-outline");
        self.push(outline.map(Expr::to_string).unwrap_or_default());
        self.push(".");
    }

    pub fn print_outline(&mut self) {
        self.push("print-outline");
    }

    pub fn count_pages(&mut self) {
        self.push("n");
    }

    pub fn set_thumbnails(&mut self, size: u32) {
        self.push(format!("set-thumbnails {}", size));
    }

    pub fn remove_thumbnails(&mut self) {
        self.push("remove-thumbnails");
    }

    pub fn set_page_title(&mut self, title: &str) {
        self.push(format!("set-page-title {}", Expr::string(title)));
    }

    pub fn save_page(&mut self, file: &Path, include: bool) {
        let command = if include { "save-page-with" } else { "save-page" };
        self.push(format!("{} {}", command, file.display()));
    }

    pub fn save_as_bundled(&mut self, file: &Path) {
        self.push(format!("save-bundled {}", file.display()));
    }

    pub fn save_as_indirect(&mut self, file: &Path) {
        self.push(format!("save-indirect {}", file.display()));
    }

    pub fn save(&mut self) {
        self.push("save");
    }

    /// Run the queued script and return what djvused printed.
    ///
    /// The queue is emptied whether or not the run succeeds. A non-zero exit
    /// status becomes [`Error::Djvused`] with the first stderr line.
    pub fn commit(&mut self) -> Result<String> {
        let commands = std::mem::take(&mut self.commands);
        let mut command = self.tool.command();
        if self.autosave {
            command.arg("-s");
        }
        command
            .arg(&self.file)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!(
            "running {} on {} ({} commands)",
            self.tool.program().display(),
            self.file.display(),
            commands.len()
        );
        let mut child = command.spawn()?;

        // Both pipes are drained while stdin is written so that a chatty
        // djvused cannot block on a full pipe.
        let stdout = child.stdout.take().map(|out| thread::spawn(move || read_all(out)));
        let stderr = child.stderr.take().map(|err| thread::spawn(move || read_all(err)));

        let written = match child.stdin.take() {
            Some(stdin) => write_script(stdin, &commands),
            None => Ok(()),
        };
        let status = child.wait()?;
        let stdout = join(stdout)?;
        let stderr = join(stderr)?;

        if !status.success() {
            let message = first_error_line(&stderr)
                .unwrap_or_else(|| format!("exited with {}", status));
            debug!("djvused failed: {}", message);
            return Err(Error::Djvused(message));
        }
        written?;
        trace!("djvused printed {} bytes", stdout.len());
        Ok(stdout)
    }
}

fn write_script(stdin: impl Write, commands: &[String]) -> io::Result<()> {
    let mut writer = BufWriter::new(stdin);
    for command in commands {
        writer.write_all(command.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

fn read_all(mut pipe: impl Read) -> io::Result<String> {
    let mut buffer = Vec::new();
    pipe.read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn join(reader: Option<thread::JoinHandle<io::Result<String>>>) -> Result<String> {
    match reader {
        Some(handle) => Ok(handle.join().map_err(|_| Error::WorkerLost)??),
        None => Ok(String::new()),
    }
}

/// djvused prefixes its diagnostics with `*** `.
fn first_error_line(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .map(|line| line.trim_start_matches(|c: char| c == '*' || c == ' ').trim_end())
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> StreamEditor {
        StreamEditor::new(ToolHandle::unchecked("djvused"), "book.djvu")
    }

    #[test]
    fn test_script_lines() {
        let mut ed = editor();
        ed.select(PageId::Page(2));
        ed.set_text(None);
        ed.set_outline(None);
        ed.set_page_title("Title");
        ed.save_page(Path::new("out.djvu"), true);
        assert_eq!(
            ed.commands(),
            [
                "select 3",
                "remove-txt",
                "set-outline",
                "",
                ".",
                "set-page-title \"Title\"",
                "save-page-with out.djvu"
            ]
        );
    }

    #[test]
    fn test_set_annotations() {
        let mut ed = editor();
        ed.select(PageId::Shared);
        ed.set_annotations(&[Expr::tagged("background", [Expr::symbol("#FFFFFF")])]);
        assert_eq!(
            ed.commands(),
            ["create-shared-ant", "set-ant", "(background #FFFFFF)", "."]
        );
    }

    #[test]
    fn test_metadata_lines_are_escaped() {
        let mut ed = editor();
        let mut meta = BTreeMap::new();
        meta.insert("odd key".to_string(), "line\nbreak".to_string());
        ed.set_metadata(&meta);
        assert_eq!(ed.commands()[1], "|odd key|\t\"line\\nbreak\"");
    }

    #[test]
    fn test_first_error_line() {
        assert_eq!(
            first_error_line("*** Cannot open file\n*** more\n"),
            Some("Cannot open file".to_string())
        );
        assert_eq!(first_error_line(""), None);
    }

    #[test]
    fn test_failed_spawn_still_clears_queue() {
        let mut ed = StreamEditor::new(
            ToolHandle::unchecked("/nonexistent/redjvu/djvused"),
            "book.djvu",
        );
        ed.count_pages();
        assert!(matches!(ed.commit(), Err(Error::Io(_))));
        assert!(ed.is_empty());
    }
}
