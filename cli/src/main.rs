//! redjvu CLI - edit the hidden text, outline and metadata of DjVu files

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use redjvu::model::ZoneType;
use redjvu::{
    reconcile, Config, ExternalEditor, Job, PageId, PageSelection, Reconciliation, Session,
    SessionOptions, ToolHandle, CONFIG_RESOURCE,
};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "redjvu")]
#[command(author = "redjvu contributors")]
#[command(version)]
#[command(about = "Edit hidden text, outlines and metadata of DjVu documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Keep malformed map-areas as opaque annotations instead of failing
    #[arg(long, global = true)]
    lenient: bool,

    /// Path to the djvused executable
    #[arg(long, global = true, value_name = "PATH", env = "REDJVU_DJVUSED")]
    djvused: Option<PathBuf>,

    /// Run djvused without -s so the file is left unchanged
    #[arg(long, global = true)]
    no_autosave: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that djvused is installed and usable
    Check,

    /// Show document information
    Info {
        /// Input DjVu file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the outline in its indented plain-text form
    OutlineExport {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Replace the outline with an indented plain-text outline
    OutlineImport {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Plain-text outline (default: stdin)
        #[arg(value_name = "OUTLINE")]
        outline: Option<PathBuf>,
    },

    /// Print the hidden text of pages, one text line per line
    TextExport {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(short, long)]
        pages: Option<String>,
    },

    /// Map edited plain text back onto the word zones of a page
    TextImport {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// 1-based page number
        #[arg(short, long)]
        page: usize,

        /// Edited text (default: stdin)
        #[arg(value_name = "TEXT")]
        text: Option<PathBuf>,
    },

    /// Remove fine-grained text zones
    Strip {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Finest zone level to remove
        #[arg(short, long, value_enum, default_value = "character")]
        level: StripLevel,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(short, long)]
        pages: Option<String>,
    },

    /// Edit the hidden text of a page in an external editor
    EditText {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// 1-based page number
        #[arg(short, long)]
        page: usize,

        /// Editor command line (default: the configured editor)
        #[arg(long)]
        editor: Option<String>,
    },

    /// Edit the outline in an external editor
    EditOutline {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Editor command line (default: the configured editor)
        #[arg(long)]
        editor: Option<String>,
    },

    /// Store the default external editor in the settings file
    SetEditor {
        /// Editor command line; empty to use run-mailcap
        #[arg(value_name = "COMMAND")]
        command: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum StripLevel {
    /// Characters only
    Character,
    /// Words and characters
    Word,
    /// Lines, words and characters
    Line,
    /// Everything below paragraphs
    Paragraph,
    /// Everything below regions
    Region,
    /// Everything below columns
    Column,
}

impl From<StripLevel> for ZoneType {
    fn from(level: StripLevel) -> Self {
        match level {
            StripLevel::Character => ZoneType::Character,
            StripLevel::Word => ZoneType::Word,
            StripLevel::Line => ZoneType::Line,
            StripLevel::Paragraph => ZoneType::Paragraph,
            StripLevel::Region => ZoneType::Region,
            StripLevel::Column => ZoneType::Column,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Check => cmd_check(&cli),
        Commands::Info { input, json } => cmd_info(&cli, input, *json),
        Commands::OutlineExport { input, output } => {
            cmd_outline_export(&cli, input, output.as_deref())
        }
        Commands::OutlineImport { input, outline } => {
            cmd_outline_import(&cli, input, outline.as_deref())
        }
        Commands::TextExport {
            input,
            output,
            pages,
        } => cmd_text_export(&cli, input, output.as_deref(), pages.as_deref()),
        Commands::TextImport { input, page, text } => {
            cmd_text_import(&cli, input, *page, text.as_deref())
        }
        Commands::Strip {
            input,
            level,
            pages,
        } => cmd_strip(&cli, input, *level, pages.as_deref()),
        Commands::EditText {
            input,
            page,
            editor,
        } => cmd_edit_text(&cli, input, *page, editor.as_deref()),
        Commands::EditOutline { input, editor } => {
            cmd_edit_outline(&cli, input, editor.as_deref())
        }
        Commands::SetEditor { command } => cmd_set_editor(command),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn locate_tool(cli: &Cli) -> CliResult<ToolHandle> {
    let tool = match &cli.djvused {
        Some(path) => ToolHandle::checked(path)?,
        None => ToolHandle::locate()?,
    };
    Ok(tool)
}

fn resolve_editor(command_line: Option<&str>) -> CliResult<ExternalEditor> {
    match command_line {
        Some(line) => Ok(ExternalEditor::from_command_line(line)),
        None => {
            let config = Config::load(CONFIG_RESOURCE)?;
            Ok(ExternalEditor::from_config(&config))
        }
    }
}

fn open_session(cli: &Cli, input: &Path, editor: ExternalEditor) -> CliResult<Session> {
    if !input.is_file() {
        return Err(format!("{} is not a file", input.display()).into());
    }
    let tool = locate_tool(cli)?;
    let mut options = SessionOptions::new()
        .with_autosave(!cli.no_autosave)
        .with_editor(editor);
    if cli.lenient {
        options = options.lenient();
    }
    Ok(Session::open(input, tool, options))
}

fn parse_pages(pages: Option<&str>) -> CliResult<PageSelection> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?),
        None => Ok(PageSelection::All),
    }
}

/// Convert a 1-based page number from the command line.
fn page_index(page: usize) -> CliResult<usize> {
    page.checked_sub(1)
        .ok_or_else(|| "page numbers start at 1".into())
}

fn read_input(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn write_output(output: Option<&Path>, contents: &str) -> CliResult {
    match output {
        Some(path) => {
            fs::write(path, contents)?;
            println!("{} {}", "Saved to".green(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Run a job while a spinner is shown.
fn wait_with_spinner<T: Send + 'static>(mut job: Job<T>, message: &str) -> CliResult<T> {
    let pb = spinner(message);
    loop {
        if let Some(value) = job.wait_timeout(Duration::from_millis(50))? {
            pb.finish_and_clear();
            return Ok(value);
        }
    }
}

fn save(session: &mut Session) -> CliResult {
    match session.save_in_background()? {
        Some(job) => {
            let outcome = wait_with_spinner(job, "Saving...")?;
            session.finish_save(outcome)?;
            println!("{} {}", "Saved".green().bold(), session.path().display());
        }
        None => println!("{}", "Nothing to save".yellow()),
    }
    Ok(())
}

fn cmd_check(cli: &Cli) -> CliResult {
    let tool = locate_tool(cli)?;
    println!("{} {}", "djvused is usable:".green(), tool.program().display());
    Ok(())
}

fn cmd_info(cli: &Cli, input: &Path, json: bool) -> CliResult {
    let mut session = open_session(cli, input, ExternalEditor::default())?;
    let page_count = session.page_count()?;
    let metadata = session.metadata(PageId::Shared)?.data().clone();
    let shared_annotations = session.annotations(PageId::Shared)?.entries().len();
    let bookmarks = session.outline()?.records();
    let bookmark_count = count_bookmarks(&bookmarks);

    if json {
        let value = serde_json::json!({
            "file": input.display().to_string(),
            "pages": page_count,
            "metadata": metadata,
            "shared_annotations": shared_annotations,
            "bookmarks": bookmarks,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Pages".bold(), page_count);
    println!("{}: {}", "Bookmarks".bold(), bookmark_count);
    println!("{}: {}", "Shared annotations".bold(), shared_annotations);

    if !metadata.is_empty() {
        println!();
        println!("{}", "Metadata".cyan().bold());
        println!("{}", "─".repeat(40).dimmed());
        for (key, value) in &metadata {
            println!("{}: {}", key.bold(), value);
        }
    }
    Ok(())
}

fn count_bookmarks(bookmarks: &[redjvu::BookmarkRecord]) -> usize {
    bookmarks
        .iter()
        .map(|b| 1 + count_bookmarks(&b.children))
        .sum()
}

fn cmd_outline_export(cli: &Cli, input: &Path, output: Option<&Path>) -> CliResult {
    let mut session = open_session(cli, input, ExternalEditor::default())?;
    let mut buffer = Vec::new();
    session.outline()?.export_as_plaintext(&mut buffer)?;
    write_output(output, &String::from_utf8_lossy(&buffer))
}

fn cmd_outline_import(cli: &Cli, input: &Path, outline: Option<&Path>) -> CliResult {
    let plaintext = read_input(outline)?;
    let mut session = open_session(cli, input, ExternalEditor::default())?;
    let lines: Vec<String> = plaintext
        .lines()
        .map(|line| redjvu::util::expand_tabs(line, 8).trim_end().to_string())
        .collect();
    session.outline()?.import_plaintext(lines);
    save(&mut session)
}

fn cmd_text_export(
    cli: &Cli,
    input: &Path,
    output: Option<&Path>,
    pages: Option<&str>,
) -> CliResult {
    let selection = parse_pages(pages)?;
    let mut session = open_session(cli, input, ExternalEditor::default())?;
    let count = session.page_count()?;
    let indices = selection.indices(count);
    let headers = indices.len() > 1;

    let mut text = String::new();
    for page in indices {
        let Some(record) = session.text(page)?.record() else {
            debug!("page {} has no text layer", page + 1);
            continue;
        };
        if headers {
            text.push_str(&format!("# page {}\n", page + 1));
        }
        text.push_str(&reconcile::export_text(&record)?);
    }
    write_output(output, &text)
}

fn cmd_text_import(cli: &Cli, input: &Path, page: usize, text: Option<&Path>) -> CliResult {
    let page = page_index(page)?;
    let edited = read_input(text)?;
    let mut session = open_session(cli, input, ExternalEditor::default())?;
    let record = session
        .text(page)?
        .record()
        .ok_or(redjvu::Error::NoTextLayer)?;
    match reconcile::import_text(&record, &edited)? {
        Reconciliation::Reconciled(record) => {
            session.text(page)?.set_record(Some(record));
            save(&mut session)
        }
        Reconciliation::NothingChanged => {
            println!("{}", "Nothing changed".yellow());
            Ok(())
        }
    }
}

fn cmd_strip(cli: &Cli, input: &Path, level: StripLevel, pages: Option<&str>) -> CliResult {
    let selection = parse_pages(pages)?;
    let mut session = open_session(cli, input, ExternalEditor::default())?;
    let max = ZoneType::from(level);
    let stripped = session.strip_text(&selection, max)?;
    println!(
        "{} {} zones on {} pages",
        "Stripped".green(),
        max,
        stripped
    );
    save(&mut session)
}

fn cmd_edit_text(cli: &Cli, input: &Path, page: usize, editor: Option<&str>) -> CliResult {
    let page = page_index(page)?;
    let editor = resolve_editor(editor)?;
    let mut session = open_session(cli, input, editor)?;
    let job = session.edit_text_externally(page)?;
    let outcome = job.wait()?;
    match session.apply_text_edit(page, outcome) {
        Ok(true) => save(&mut session),
        Ok(false) => {
            println!("{}", "Nothing changed".yellow());
            Ok(())
        }
        Err(e) if e.is_reconcile() => {
            println!("{}: {}", "Text was not changed".yellow().bold(), e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_edit_outline(cli: &Cli, input: &Path, editor: Option<&str>) -> CliResult {
    let editor = resolve_editor(editor)?;
    let mut session = open_session(cli, input, editor)?;
    let job = session.edit_outline_externally()?;
    let outcome = job.wait()?;
    session.apply_outline_edit(outcome)?;
    save(&mut session)
}

fn cmd_set_editor(command: &str) -> CliResult {
    let mut config = Config::load(CONFIG_RESOURCE)?;
    config.set(redjvu::external::EDITOR_KEY, command.trim());
    config.flush()?;
    println!("{} {}", "Saved to".green(), config.path().display());
    Ok(())
}
