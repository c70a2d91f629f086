//! Bounded in-memory job log, read by status queries.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use super::{LogEvent, Logger};

#[derive(Debug, Default)]
struct Buffer {
    events: VecDeque<LogEvent>,
    evicted: u64,
}

/// Append-only log buffer for a single run.
///
/// When `capacity` is reached the oldest event is evicted; `capacity == 0`
/// keeps everything.
#[derive(Debug)]
pub struct MemoryLogger {
    buffer: Mutex<Buffer>,
    capacity: usize,
}

impl MemoryLogger {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(Buffer::default()),
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    fn lock(&self) -> MutexGuard<'_, Buffer> {
        // A panicking writer cannot leave a VecDeque half-updated.
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the retained events, oldest first.
    pub fn events(&self) -> Vec<LogEvent> {
        self.lock().events.iter().cloned().collect()
    }

    /// Number of events dropped to stay within capacity.
    pub fn evicted(&self) -> u64 {
        self.lock().evicted
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// Retained events rendered one per line.
    pub fn render(&self) -> String {
        let buffer = self.lock();
        let mut out = String::new();
        for event in &buffer.events {
            out.push_str(&event.to_string());
            out.push('\n');
        }
        out
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: LogEvent) {
        let mut buffer = self.lock();
        if self.capacity > 0 && buffer.events.len() >= self.capacity {
            buffer.events.pop_front();
            buffer.evicted += 1;
        }
        buffer.events.push_back(event);
    }
}
