//! Mapping an edited line back onto its word zones.

use std::collections::HashSet;

use super::levenshtein::edit_script;
use crate::model::{Rect, ZoneRecord, ZoneType};

/// Geometry of the leaf zone currently being rewritten.
#[derive(Debug, Clone, Copy)]
struct Head {
    kind: ZoneType,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    /// Number of old characters covered by the rectangle.
    len: usize,
}

impl Head {
    fn from_leaf(leaf: &ZoneRecord) -> Self {
        Self {
            kind: leaf.kind,
            x0: leaf.rect.x,
            y0: leaf.rect.y,
            x1: leaf.rect.x1(),
            y1: leaf.rect.y1(),
            len: leaf.text().map_or(0, |t| t.chars().count()),
        }
    }

    fn absorb(&mut self, next: &Head, extra: usize) {
        self.x0 = self.x0.min(next.x0);
        self.y0 = self.y0.min(next.y0);
        self.x1 = self.x1.max(next.x1);
        self.y1 = self.y1.max(next.y1);
        self.len += next.len + extra;
    }
}

struct Mangler<'a, I: Iterator<Item = &'a ZoneRecord>> {
    old: Vec<char>,
    boundaries: HashSet<usize>,
    leaves: I,
    head: Head,
    word: String,
    out: Vec<ZoneRecord>,
}

impl<'a, I: Iterator<Item = &'a ZoneRecord>> Mangler<'a, I> {
    /// Copy the unchanged old character at `index`.
    fn keep(&mut self, index: usize) {
        if self.boundaries.contains(&index) {
            self.flush();
            if let Some(next) = self.leaves.next() {
                self.head = Head::from_leaf(next);
            }
        } else if let Some(&c) = self.old.get(index) {
            self.word.push(c);
        }
    }

    /// A space appeared inside the current leaf: emit the text so far as its
    /// own zone, sized as if the leaf's characters had uniform width.
    fn split(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let new_len = self.word.chars().count();
        let mut old_len = self.head.len;
        if new_len >= old_len {
            old_len = (2 * new_len).max(1);
        }
        let width = (self.head.x1 - self.head.x0) as f64;
        let split_x = self.head.x0 + (width * new_len as f64 / old_len as f64) as i64;
        let word = std::mem::take(&mut self.word);
        self.out.push(ZoneRecord::leaf(
            self.head.kind,
            Rect::from_corners(self.head.x0, self.head.y0, split_x, self.head.y1),
            word,
        ));
        self.head.x0 = split_x;
        self.head.len = old_len - new_len;
    }

    /// The space between two leaves was removed or replaced: the next leaf
    /// joins the current one.
    fn merge(&mut self, new: Option<char>) {
        if let Some(next) = self.leaves.next() {
            let next = Head::from_leaf(next);
            self.head.absorb(&next, usize::from(new.is_some()));
        }
        if let Some(c) = new {
            self.word.push(c);
        }
    }

    /// Emit the current leaf. A changed character count rescales the width.
    fn flush(&mut self) {
        let word = std::mem::take(&mut self.word);
        let len = word.chars().count();
        let mut x1 = self.head.x1;
        if self.head.len > 0 && len != self.head.len {
            let width = (self.head.x1 - self.head.x0) as f64 * len as f64 / self.head.len as f64;
            x1 = self.head.x0 + (width.round() as i64).max(1);
        }
        self.out.push(ZoneRecord::leaf(
            self.head.kind,
            Rect::from_corners(self.head.x0, self.head.y0, x1, self.head.y1),
            word,
        ));
    }
}

/// Rewrite the leaves of one line so their texts, joined with single spaces,
/// read `new`. `old` must be the current join of `leaves`.
///
/// Leaves untouched by the edit come back with identical rectangles.
pub(crate) fn mangle(old: &str, new: &str, leaves: &[&ZoneRecord]) -> Vec<ZoneRecord> {
    let Some((first, rest)) = leaves.split_first() else {
        return Vec::new();
    };
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let mut boundaries = HashSet::new();
    let mut position = 0;
    for leaf in &leaves[..leaves.len() - 1] {
        position += leaf.text().map_or(0, |t| t.chars().count());
        boundaries.insert(position);
        position += 1;
    }

    let ops = edit_script(&old_chars, &new_chars);
    let mut mangler = Mangler {
        old: old_chars,
        boundaries,
        leaves: rest.iter().copied(),
        head: Head::from_leaf(first),
        word: String::new(),
        out: Vec::with_capacity(leaves.len()),
    };

    let mut j = 0;
    for op in ops {
        while op.index > j {
            mangler.keep(j);
            j += 1;
        }
        let at_boundary = op.old.is_some() && mangler.boundaries.contains(&j);
        match (op.old, op.new) {
            (_, Some(' ')) if !at_boundary => mangler.split(),
            (_, new) if at_boundary => mangler.merge(new),
            (_, Some(c)) => mangler.word.push(c),
            (_, None) => {}
        }
        if op.old.is_some() {
            j += 1;
        }
    }
    while j < mangler.old.len() {
        mangler.keep(j);
        j += 1;
    }
    mangler.flush();
    mangler.out
}
