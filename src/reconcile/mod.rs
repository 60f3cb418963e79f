//! Plain-text editing of the hidden text layer.
//!
//! A zone tree is linearised into one line per text unit: a line zone
//! (its leaves joined by single spaces) or a leaf standing outside any line.
//! After the lines are edited, [`import_text`] maps them back onto the tree.
//! Every line must stay a line; changes inside a line are distributed over
//! its word zones with an edit script, so untouched words keep their
//! rectangles.
//!
//! ```
//! use redjvu::model::{Rect, ZoneRecord, ZoneType};
//! use redjvu::reconcile::{export_lines, import_text, Reconciliation};
//!
//! let line = ZoneRecord::inner(ZoneType::Line, Rect::new(0, 0, 62, 10), vec![
//!     ZoneRecord::leaf(ZoneType::Word, Rect::new(0, 0, 30, 10), "foo"),
//!     ZoneRecord::leaf(ZoneType::Word, Rect::new(32, 0, 30, 10), "bar"),
//! ]);
//! let page = ZoneRecord::inner(ZoneType::Page, Rect::new(0, 0, 100, 50), vec![line]);
//! assert_eq!(export_lines(&page).unwrap(), vec!["foo bar"]);
//!
//! let Reconciliation::Reconciled(edited) = import_text(&page, "foo barbaz\n").unwrap() else {
//!     panic!("text was changed");
//! };
//! assert_eq!(edited.leaves()[1].rect, Rect::new(32, 0, 60, 10));
//! ```

mod levenshtein;
mod mangle;

pub use levenshtein::{distance, edit_script, EditOp};

use thiserror::Error;

use crate::model::{ZoneContent, ZoneRecord, ZoneType};

/// Why edited text cannot be mapped back onto the zones.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Character zones are too fine to edit as text.
    #[error("Cannot edit text with character zones")]
    CharacterZoneFound,

    /// Lines were added or removed.
    #[error("Number of lines changed (expected {expected}, found {found})")]
    LengthChanged { expected: usize, found: usize },
}

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The text changed; this is the rewritten tree.
    Reconciled(ZoneRecord),
    /// The text was saved unchanged.
    NothingChanged,
}

fn check_editable(record: &ZoneRecord) -> Result<(), ReconcileError> {
    if record.contains_kind(ZoneType::Character) {
        Err(ReconcileError::CharacterZoneFound)
    } else {
        Ok(())
    }
}

fn collect_units(record: &ZoneRecord, out: &mut Vec<String>) {
    match &record.content {
        ZoneContent::Text(text) => out.push(text.clone()),
        ZoneContent::Children(_) if record.kind == ZoneType::Line => out.push(line_text(record)),
        ZoneContent::Children(children) => {
            for child in children {
                collect_units(child, out);
            }
        }
    }
}

fn line_text(line: &ZoneRecord) -> String {
    line.leaves()
        .iter()
        .filter_map(|leaf| leaf.text())
        .collect::<Vec<_>>()
        .join(" ")
}

fn units(record: &ZoneRecord) -> Vec<String> {
    let mut out = Vec::new();
    collect_units(record, &mut out);
    out
}

/// Text units of the tree in document order. A unit may itself contain
/// newlines when a leaf spans several lines.
pub fn export_units(record: &ZoneRecord) -> Result<Vec<String>, ReconcileError> {
    check_editable(record)?;
    Ok(units(record))
}

/// The tree as plain-text lines, one or more per unit.
pub fn export_lines(record: &ZoneRecord) -> Result<Vec<String>, ReconcileError> {
    Ok(export_units(record)?
        .iter()
        .flat_map(|unit| unit.split('\n').map(str::to_string).collect::<Vec<_>>())
        .collect())
}

/// The tree as a newline-terminated text file.
pub fn export_text(record: &ZoneRecord) -> Result<String, ReconcileError> {
    let mut text = String::new();
    for line in export_lines(record)? {
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

/// Map edited lines back onto the tree.
pub fn import_lines<S: AsRef<str>>(
    record: &ZoneRecord,
    lines: &[S],
) -> Result<Reconciliation, ReconcileError> {
    check_editable(record)?;
    let units = units(record);
    let expected: usize = units.iter().map(|u| u.split('\n').count()).sum();
    if lines.len() != expected {
        return Err(ReconcileError::LengthChanged {
            expected,
            found: lines.len(),
        });
    }

    let mut lines = lines.iter().map(|l| l.as_ref().trim_end_matches('\r'));
    let mut edits = Vec::with_capacity(units.len());
    let mut changed = false;
    for unit in &units {
        let count = unit.split('\n').count();
        let new = lines.by_ref().take(count).collect::<Vec<_>>().join("\n");
        if new == *unit {
            edits.push(None);
        } else {
            changed = true;
            edits.push(Some(new));
        }
    }
    if !changed {
        return Ok(Reconciliation::NothingChanged);
    }

    let mut rewritten = record.clone();
    apply_edits(&mut rewritten, &mut edits.into_iter());
    Ok(Reconciliation::Reconciled(rewritten))
}

/// Map an edited text file back onto the tree.
pub fn import_text(record: &ZoneRecord, text: &str) -> Result<Reconciliation, ReconcileError> {
    let lines: Vec<&str> = text.lines().collect();
    import_lines(record, &lines)
}

fn apply_edits(record: &mut ZoneRecord, edits: &mut impl Iterator<Item = Option<String>>) {
    if record.is_leaf() {
        if let Some(new) = edits.next().flatten() {
            record.content = ZoneContent::Text(new);
        }
        return;
    }
    if record.kind == ZoneType::Line {
        if let Some(new) = edits.next().flatten() {
            let old = line_text(record);
            let leaves = mangle::mangle(&old, &new, &record.leaves());
            record.content = ZoneContent::Children(leaves);
        }
        return;
    }
    if let ZoneContent::Children(children) = &mut record.content {
        for child in children {
            apply_edits(child, edits);
        }
    }
}
