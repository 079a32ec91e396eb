//! Source listings downloaded from the debuggee.

use std::collections::HashMap;
use std::sync::Arc;

/// A source file split into lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceListing {
    lines: Vec<String>,
}

impl SourceListing {
    /// Split `text` into lines. `\n`, `\r\n`, and a lone `\r` all end a line;
    /// a terminator at the very end does not start an extra empty line.
    pub fn new(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    chars.next_if_eq(&'\n');
                    lines.push(std::mem::take(&mut current));
                }
                '\n' => lines.push(std::mem::take(&mut current)),
                c => current.push(c),
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        Self { lines }
    }

    /// The text of a 1-based line.
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = (number as usize).checked_sub(1)?;
        self.lines.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Numbered lines within `radius` of `center`, clamped to the file.
    pub fn window(&self, center: u32, radius: u32) -> Vec<(u32, &str)> {
        let first = center.saturating_sub(radius).max(1);
        let last = center
            .saturating_add(radius)
            .min(self.lines.len() as u32);
        (first..=last)
            .filter_map(|n| self.line(n).map(|text| (n, text)))
            .collect()
    }
}

/// Listings by file name. Entries are added once and never evicted for the
/// life of a session.
#[derive(Debug, Clone, Default)]
pub struct SourceCache {
    files: HashMap<String, Arc<SourceListing>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file: &str) -> Option<Arc<SourceListing>> {
        self.files.get(file).cloned()
    }

    pub fn contains(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }

    /// Store a listing and return the cached copy. An existing entry for the
    /// same file is kept.
    pub fn insert(&mut self, file: impl Into<String>, listing: SourceListing) -> Arc<SourceListing> {
        self.files
            .entry(file.into())
            .or_insert_with(|| Arc::new(listing))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
