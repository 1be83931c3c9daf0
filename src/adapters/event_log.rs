//! In-RAM event ring for analytics export.
//!
//! Keeps the most recent [`LOG_CAPACITY`] events as flat records. The
//! analytics uplink pulls them as a `postcard` blob.

use heapless::HistoryBuffer;
use serde::{Deserialize, Serialize};

use crate::app::events::{BridgeEvent, EventStamp, LogEventKind};
use crate::app::ports::EventSink;
use crate::ir::command::Command;

pub const LOG_CAPACITY: usize = 128;

/// One flattened event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub uptime_ms: u32,
    pub date_key: u32,
    pub seconds_of_day: u32,
    pub kind: LogEventKind,
    pub command: Command,
    pub success: bool,
    pub detail: u8,
}

impl LogEntry {
    pub fn new(stamp: &EventStamp, event: &BridgeEvent) -> Self {
        Self {
            uptime_ms: stamp.uptime_ms,
            date_key: stamp.date_key,
            seconds_of_day: stamp.seconds_of_day,
            kind: event.kind(),
            command: event.command(),
            success: event.success(),
            detail: event.detail(),
        }
    }
}

/// Ring of the latest events; the oldest is overwritten when full.
pub struct EventLog {
    entries: HistoryBuffer<LogEntry, LOG_CAPACITY>,
    total: u32,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub const fn new() -> Self {
        Self {
            entries: HistoryBuffer::new(),
            total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Events recorded since boot, including ones already overwritten.
    pub fn total_recorded(&self) -> u32 {
        self.total
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.recent()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.oldest_ordered()
    }

    pub fn count_kind(&self, kind: LogEventKind) -> usize {
        self.iter().filter(|e| e.kind == kind).count()
    }

    /// Serialise the retained entries, oldest first.
    pub fn export(&self) -> Result<Vec<u8>, postcard::Error> {
        let entries: Vec<LogEntry> = self.iter().copied().collect();
        postcard::to_allocvec(&entries)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, stamp: &EventStamp, event: &BridgeEvent) {
        self.entries.write(LogEntry::new(stamp, event));
        self.total = self.total.wrapping_add(1);
    }
}
