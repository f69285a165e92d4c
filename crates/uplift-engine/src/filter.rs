//! File-name filter applied by watch handles.

use glob::{MatchOptions, Pattern, PatternError};
use std::path::Path;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Glob over the bare file name, e.g. `*.csv`.
#[derive(Debug, Clone)]
pub struct FileFilter {
    pattern: Pattern,
}

impl FileFilter {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::new(pattern)?,
        })
    }

    /// `"*" + extension`, so `.csv` becomes `*.csv` and `.*` any dotted name.
    pub fn from_extension(extension: &str) -> Result<Self, PatternError> {
        Self::new(&format!("*{}", extension.trim()))
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| self.pattern.matches_with(name, MATCH_OPTIONS))
            .unwrap_or(false)
    }
}

impl PartialEq for FileFilter {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        let f = FileFilter::from_extension(".csv").unwrap();
        assert_eq!(f.as_str(), "*.csv");
        assert!(f.matches(Path::new("/drop/a.csv")));
        assert!(f.matches(Path::new("/drop/REPORT.CSV")));
        assert!(!f.matches(Path::new("/drop/a.csv.tmp")));
        assert!(!f.matches(Path::new("/drop/a.txt")));
    }

    #[test]
    fn test_default_extension_matches_dotted_names() {
        let f = FileFilter::from_extension(".*").unwrap();
        assert!(f.matches(Path::new("a.bin")));
        assert!(f.matches(Path::new(".hidden")));
        assert!(!f.matches(Path::new("Makefile")));
    }

    #[test]
    fn test_empty_extension_matches_everything() {
        let f = FileFilter::from_extension("").unwrap();
        assert!(f.matches(Path::new("Makefile")));
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        assert!(FileFilter::from_extension("[").is_err());
    }
}
