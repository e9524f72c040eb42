use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::model::{EntriesResponse, Entry, EntryOrder};
use crate::scanner::{DateFilter, EntryScanner};

/// Diary: turns a day count into a cutoff, scans the vault and shapes the response.
#[derive(Clone)]
pub struct Diary {
    scanner: EntryScanner,
    order: EntryOrder,
}

impl Diary {
    pub fn new(scanner: EntryScanner, order: EntryOrder) -> Self {
        Self { scanner, order }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_root(config, config.resolve_vault_root())
    }

    /// Builds the diary over an already resolved vault root.
    pub fn with_root(config: &Config, root: PathBuf) -> Result<Self> {
        let scanner = EntryScanner::with_excludes(root, &config.vault.exclude_globs)?;
        Ok(Self::new(scanner, config.vault.order))
    }

    pub fn scanner(&self) -> &EntryScanner {
        &self.scanner
    }

    /// 获取最近 `days` 天的日记，参考时刻在调用开始时取一次。
    pub fn recent_entries(&self, days: u32) -> Result<EntriesResponse> {
        self.recent_entries_as_of(Utc::now(), days)
    }

    pub fn recent_entries_as_of(&self, now: DateTime<Utc>, days: u32) -> Result<EntriesResponse> {
        let filter = DateFilter::last_days(now, days);
        let mut entries = self.scanner.scan(&filter)?;
        order_entries(&mut entries, self.order);

        info!(days, since = %filter.since, count = entries.len(), "getRecentEntries");
        Ok(EntriesResponse::new(entries))
    }
}

fn order_entries(entries: &mut [Entry], order: EntryOrder) {
    match order {
        // Stems are strict `YYYY-MM-DD`, so string order is date order.
        EntryOrder::NewestFirst => entries.sort_by(|a, b| b.date.cmp(&a.date)),
        EntryOrder::Traversal => {}
    }
}
