use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, ThemisError};
use crate::model::Entry;
use crate::reader::FileReader;

const ENTRY_EXTENSION: &str = ".md";

static ENTRY_STEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("entry stem pattern is valid")
});

/// 日期过滤条件：文件名日期（按 UTC 零点计）不早于 `since` 的日记才被收录。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFilter {
    pub since: DateTime<Utc>,
}

impl DateFilter {
    pub fn since(since: DateTime<Utc>) -> Self {
        Self { since }
    }

    /// Accepts every entry name.
    pub fn any() -> Self {
        Self {
            since: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Cutoff `days` × 24h before `now`, saturating at the earliest representable instant.
    pub fn last_days(now: DateTime<Utc>, days: u32) -> Self {
        let since = now
            .checked_sub_signed(TimeDelta::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { since }
    }

    pub fn accepts(&self, date: NaiveDate) -> bool {
        date.and_time(NaiveTime::MIN).and_utc() >= self.since
    }
}

/// 日记扫描器：递归遍历日记根目录，按文件名日期收集条目。
#[derive(Clone)]
pub struct EntryScanner {
    root: PathBuf,
    exclude: GlobSet,
    reader: FileReader,
}

impl EntryScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude: GlobSet::empty(),
            reader: FileReader::new(),
        }
    }

    pub fn with_excludes(root: impl Into<PathBuf>, exclude_globs: &[String]) -> Result<Self> {
        let mut scanner = Self::new(root);
        scanner.exclude = build_globset(exclude_globs)?;
        Ok(scanner)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the vault and returns matching entries in traversal order.
    ///
    /// Only an unusable root fails the scan. Anything that goes wrong below
    /// the root is logged and that entry is skipped.
    pub fn scan(&self, filter: &DateFilter) -> Result<Vec<Entry>> {
        let meta = std::fs::metadata(&self.root).map_err(|e| self.unavailable(e.to_string()))?;
        if !meta.is_dir() {
            return Err(self.unavailable("not a directory".to_string()));
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(e.path()));

        for item in walker {
            let dir_entry = match item {
                Ok(d) => d,
                Err(e) if e.depth() == 0 => return Err(self.unavailable(e.to_string())),
                Err(e) => {
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    warn!("error accessing {}: {}", path, e);
                    continue;
                }
            };

            if dir_entry.file_type().is_dir() {
                continue;
            }

            let Some(name) = dir_entry.file_name().to_str() else {
                continue;
            };
            let Some(stem) = name.strip_suffix(ENTRY_EXTENSION) else {
                continue;
            };
            let Some(date) = parse_entry_date(stem) else {
                continue;
            };
            if !filter.accepts(date) {
                continue;
            }

            let path = dir_entry.path();
            let content = match self.reader.read_text(path) {
                Ok(c) => c,
                Err(e) => {
                    warn!("error reading {}: {}", path.display(), e);
                    continue;
                }
            };

            entries.push(Entry {
                date: stem.to_string(),
                path: path.to_string_lossy().to_string(),
                content,
            });
        }

        debug!(root = %self.root.display(), matched = entries.len(), "vault scan finished");
        Ok(entries)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        if self.exclude.is_match(path) {
            return true;
        }
        path.strip_prefix(&self.root)
            .map(|rel| self.exclude.is_match(rel))
            .unwrap_or(false)
    }

    fn unavailable(&self, reason: String) -> ThemisError {
        ThemisError::VaultUnavailable {
            path: self.root.clone(),
            reason,
        }
    }
}

/// 严格解析 `YYYY-MM-DD`，格式不符或日期无效时返回 `None`。
pub fn parse_entry_date(stem: &str) -> Option<NaiveDate> {
    if !ENTRY_STEM.is_match(stem) {
        return None;
    }
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|e| ThemisError::ConfigError(e.to_string()))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ThemisError::ConfigError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parse_entry_date_is_strict() {
        assert_eq!(parse_entry_date("2024-06-15"), Some(date("2024-06-15")));
        assert_eq!(parse_entry_date("2024-02-29"), Some(date("2024-02-29")));
        assert_eq!(parse_entry_date("2024-13-40"), None);
        assert_eq!(parse_entry_date("2023-02-29"), None);
        assert_eq!(parse_entry_date("2024-6-15"), None);
        assert_eq!(parse_entry_date("2024-06-15 draft"), None);
        assert_eq!(parse_entry_date("notanentry"), None);
        assert_eq!(parse_entry_date(""), None);
    }

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn date_filter_compares_against_an_instant() {
        let filter = DateFilter::last_days(instant("2024-06-15T10:00:00Z"), 7);
        assert_eq!(filter.since, instant("2024-06-08T10:00:00Z"));
        assert!(!filter.accepts(date("2024-06-08")));
        assert!(filter.accepts(date("2024-06-09")));
        assert!(filter.accepts(date("2024-07-01")));

        // today's midnight is already behind "now"
        let none_today = DateFilter::last_days(instant("2024-06-15T10:00:00Z"), 0);
        assert!(!none_today.accepts(date("2024-06-15")));
        assert!(none_today.accepts(date("2024-06-16")));
    }

    #[test]
    fn date_filter_includes_exact_cutoff() {
        let filter = DateFilter::last_days(instant("2024-06-15T00:00:00Z"), 7);
        assert!(filter.accepts(date("2024-06-08")));
        assert!(!filter.accepts(date("2024-06-07")));
    }

    #[test]
    fn huge_day_count_still_accepts_old_entries() {
        let filter = DateFilter::last_days(instant("2024-06-15T10:00:00Z"), u32::MAX);
        assert!(filter.accepts(date("0001-01-01")));
        assert!(DateFilter::any().accepts(NaiveDate::MIN));
    }

    #[test]
    fn exclude_globs_prune_subtrees() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let trash = root.join(".trash");
        std::fs::create_dir_all(&trash).unwrap();
        std::fs::write(root.join("2024-01-01.md"), "keep").unwrap();
        std::fs::write(trash.join("2024-01-02.md"), "drop").unwrap();

        let excludes = ["**/.trash/**".to_string(), ".trash".to_string()];
        let scanner = EntryScanner::with_excludes(root, &excludes).unwrap();
        let entries = scanner.scan(&DateFilter::any()).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "keep");
    }

    #[test]
    fn invalid_exclude_glob_is_config_error() {
        let err = EntryScanner::with_excludes("/tmp", &["a[".to_string()]).err().unwrap();
        assert!(matches!(err, ThemisError::ConfigError(_)));
    }

    #[test]
    fn root_that_is_a_file_is_unavailable() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("2024-01-01.md");
        std::fs::write(&file, "x").unwrap();

        let err = EntryScanner::new(&file).scan(&DateFilter::any()).unwrap_err();
        assert!(matches!(err, ThemisError::VaultUnavailable { .. }));
    }
}
