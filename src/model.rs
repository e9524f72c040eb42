use serde::{Deserialize, Serialize};

/// 一篇日记：日期取自文件名，内容为文件全文。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// `YYYY-MM-DD`, exactly as it appears in the file name.
    pub date: String,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEntriesRequest {
    pub days: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntriesResponse {
    pub entries: Vec<Entry>,
    pub count: usize,
}

impl EntriesResponse {
    pub fn new(entries: Vec<Entry>) -> Self {
        let count = entries.len();
        Self { entries, count }
    }
}

/// How the matched entries are ordered in the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrder {
    /// Date descending; entries sharing a date keep traversal order.
    #[default]
    NewestFirst,
    /// Whatever order the directory walk produced.
    Traversal,
}
