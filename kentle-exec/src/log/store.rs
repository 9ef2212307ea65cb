use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::log::{LogChannelId, LogLevel};

/// Per-channel line limit; older lines are dropped first.
pub const DEFAULT_MAX_LINES: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LogLine {
    /// Global append order across all channels.
    pub seq: u64,
    pub logged_at: DateTime<Utc>,
    pub level: LogLevel,
    pub channel: LogChannelId,
    pub text: String,
}

#[derive(Default)]
struct Buffers {
    next_seq: u64,
    channels: HashMap<LogChannelId, VecDeque<LogLine>>,
}

/// Append-only buffer of engine log lines, keyed by log channel.
pub struct LogStore {
    buffers: Mutex<Buffers>,
    max_lines: usize,
}

static GLOBAL: OnceLock<Arc<LogStore>> = OnceLock::new();

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore {
    pub fn new() -> Self {
        Self::with_max_lines(DEFAULT_MAX_LINES)
    }

    pub fn with_max_lines(max_lines: usize) -> Self {
        Self {
            buffers: Mutex::new(Buffers::default()),
            max_lines: max_lines.max(1),
        }
    }

    /// The process-wide store.
    pub fn global() -> Arc<LogStore> {
        GLOBAL.get_or_init(|| Arc::new(LogStore::new())).clone()
    }

    pub async fn append(&self, channel: LogChannelId, level: LogLevel, text: impl Into<String>) {
        let mut buffers = self.buffers.lock().await;
        let seq = buffers.next_seq;
        buffers.next_seq += 1;

        let lines = buffers.channels.entry(channel).or_default();
        if lines.len() == self.max_lines {
            lines.pop_front();
        }
        lines.push_back(LogLine {
            seq,
            logged_at: Utc::now(),
            level,
            channel,
            text: text.into(),
        });
    }

    pub async fn lines(&self, channel: LogChannelId) -> Vec<LogLine> {
        let buffers = self.buffers.lock().await;
        buffers
            .channels
            .get(&channel)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Text logged on `channel`, one line per entry. With `include_general`,
    /// lines of the general channel are interleaved in append order.
    pub async fn buffer(&self, channel: LogChannelId, include_general: bool) -> String {
        let buffers = self.buffers.lock().await;
        let mut lines: Vec<&LogLine> = buffers
            .channels
            .get(&channel)
            .into_iter()
            .flatten()
            .collect();
        if include_general && !channel.is_general() {
            if let Some(general) = buffers.channels.get(&LogChannelId::GENERAL) {
                lines.extend(general.iter());
                lines.sort_by_key(|l| l.seq);
            }
        }

        let mut out = String::new();
        for line in lines {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }

    pub async fn line_count(&self, channel: LogChannelId) -> usize {
        self.buffers
            .lock()
            .await
            .channels
            .get(&channel)
            .map_or(0, VecDeque::len)
    }

    /// Forgets everything logged on `channel`.
    pub async fn discard(&self, channel: LogChannelId) {
        self.buffers.lock().await.channels.remove(&channel);
    }
}

/// Handle an engine uses to log on behalf of one job.
#[derive(Clone)]
pub struct LogWriter {
    store: Arc<LogStore>,
    channel: LogChannelId,
    level: LogLevel,
}

impl LogWriter {
    pub fn new(store: Arc<LogStore>, channel: LogChannelId, level: LogLevel) -> Self {
        Self {
            store,
            channel,
            level,
        }
    }

    pub fn general(store: Arc<LogStore>) -> Self {
        Self::new(store, LogChannelId::GENERAL, LogLevel::Basic)
    }

    pub fn channel(&self) -> LogChannelId {
        self.channel
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Appends `text` unless `level` is noisier than the channel's level.
    pub async fn log(&self, level: LogLevel, text: impl Into<String>) {
        if self.level.admits(level) {
            self.store.append(self.channel, level, text).await;
        }
    }

    pub async fn error(&self, text: impl Into<String>) {
        self.log(LogLevel::Error, text).await;
    }

    pub async fn minimal(&self, text: impl Into<String>) {
        self.log(LogLevel::Minimal, text).await;
    }

    pub async fn basic(&self, text: impl Into<String>) {
        self.log(LogLevel::Basic, text).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffer_keeps_channels_apart() {
        let store = LogStore::new();
        let a = LogChannelId::new();
        let b = LogChannelId::new();
        store.append(a, LogLevel::Minimal, "a1").await;
        store.append(b, LogLevel::Minimal, "b1").await;
        store.append(a, LogLevel::Minimal, "a2").await;

        assert_eq!(store.buffer(a, false).await, "a1\na2\n");
        assert_eq!(store.buffer(b, false).await, "b1\n");
        assert_eq!(store.buffer(LogChannelId::new(), false).await, "");
    }

    #[tokio::test]
    async fn general_lines_are_interleaved_in_order() {
        let store = LogStore::new();
        let job = LogChannelId::new();
        store.append(LogChannelId::GENERAL, LogLevel::Basic, "boot").await;
        store.append(job, LogLevel::Minimal, "run").await;
        store.append(LogChannelId::GENERAL, LogLevel::Basic, "later").await;

        assert_eq!(store.buffer(job, true).await, "boot\nrun\nlater\n");
        assert_eq!(store.buffer(job, false).await, "run\n");
    }

    #[tokio::test]
    async fn oldest_lines_are_dropped_at_capacity() {
        let store = LogStore::with_max_lines(2);
        let ch = LogChannelId::new();
        for i in 0..3 {
            store.append(ch, LogLevel::Minimal, format!("line {i}")).await;
        }
        assert_eq!(store.buffer(ch, false).await, "line 1\nline 2\n");
        assert_eq!(store.line_count(ch).await, 2);
    }

    #[tokio::test]
    async fn writer_filters_by_level() {
        let store = Arc::new(LogStore::new());
        let writer = LogWriter::new(store.clone(), LogChannelId::new(), LogLevel::Minimal);
        writer.error("boom").await;
        writer.minimal("kept").await;
        writer.basic("dropped").await;

        let lines = store.lines(writer.channel()).await;
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["boom", "kept"]);
    }

    #[tokio::test]
    async fn discard_forgets_a_channel() {
        let store = LogStore::new();
        let ch = LogChannelId::new();
        store.append(ch, LogLevel::Minimal, "x").await;
        store.discard(ch).await;
        assert_eq!(store.line_count(ch).await, 0);
    }

    #[test]
    fn global_store_is_shared() {
        assert!(Arc::ptr_eq(&LogStore::global(), &LogStore::global()));
    }
}
