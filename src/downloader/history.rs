use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::Mutex;

/// 一条完成记录
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub file_name: String,
    pub path: PathBuf,
    pub completed_at: DateTime<Local>,
}

impl HistoryEntry {
    pub fn new(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            file_name,
            path: path.to_path_buf(),
            completed_at: Local::now(),
        }
    }
}

/// 进程内的下载历史，按完成顺序追加，不做持久化
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, path: &Path) -> HistoryEntry {
        let entry = HistoryEntry::new(path);
        self.entries.lock().await.push(entry.clone());
        entry
    }

    pub async fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
