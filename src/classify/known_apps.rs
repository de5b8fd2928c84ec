//! Known-application reference table.
//!
//! Static ordered mapping from an application-name substring to a traffic
//! category. Lookup scans entries in table-definition order and the first
//! case-insensitive substring match of the sample name wins. This is pure
//! reference data, editable through the config file, never derived from
//! samples.

use serde::{Deserialize, Serialize};

/// Category assigned when no table entry matches.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// One table entry: name substring -> category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownApp {
    pub pattern: String,
    pub category: String,
}

impl KnownApp {
    pub fn new(pattern: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            category: category.into(),
        }
    }
}

/// Ordered known-app table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownAppTable {
    entries: Vec<KnownApp>,
}

impl Default for KnownAppTable {
    fn default() -> Self {
        Self {
            entries: vec![
                KnownApp::new("Zoom", "Video Conferencing"),
                KnownApp::new("Skype", "Video Conferencing"),
                KnownApp::new("Netflix", "Video Streaming"),
                KnownApp::new("YouTube", "Video Streaming"),
                KnownApp::new("Spotify", "Audio Streaming"),
                KnownApp::new("Apple Music", "Audio Streaming"),
                KnownApp::new("Chrome", "Web Browsing"),
                KnownApp::new("Firefox", "Web Browsing"),
                KnownApp::new("WhatsApp", "Messaging"),
                KnownApp::new("Telegram", "Messaging"),
            ],
        }
    }
}

impl KnownAppTable {
    pub fn new(entries: Vec<KnownApp>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[KnownApp] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a sample name to a category. First matching entry wins, in
    /// table order; no match resolves to [`UNKNOWN_CATEGORY`].
    pub fn lookup(&self, sample_name: &str) -> &str {
        let name = sample_name.to_lowercase();
        self.entries
            .iter()
            .find(|entry| name.contains(&entry.pattern.to_lowercase()))
            .map(|entry| entry.category.as_str())
            .unwrap_or(UNKNOWN_CATEGORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_case_insensitive() {
        let table = KnownAppTable::default();
        assert_eq!(table.lookup("Zoom_call_1"), "Video Conferencing");
        assert_eq!(table.lookup("zoom-meeting"), "Video Conferencing");
        assert_eq!(table.lookup("NETFLIX_evening"), "Video Streaming");
    }

    #[test]
    fn test_lookup_no_match() {
        let table = KnownAppTable::default();
        assert_eq!(table.lookup("mystery_capture"), UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_first_entry_wins() {
        let table = KnownAppTable::new(vec![
            KnownApp::new("app", "First"),
            KnownApp::new("application", "Second"),
        ]);
        // Both patterns are substrings; table order decides
        assert_eq!(table.lookup("application_trace"), "First");
    }

    #[test]
    fn test_empty_table() {
        let table = KnownAppTable::new(vec![]);
        assert!(table.is_empty());
        assert_eq!(table.lookup("Zoom"), UNKNOWN_CATEGORY);
    }
}
