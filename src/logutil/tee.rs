//! Fan-out logger writing every record to two sinks.

use std::sync::Arc;

use super::{LogEvent, Logger};

/// Writes each record to `first` then `second`.
///
/// The sinks are independent: neither can reject a record, and a bounded
/// memory sink evicting old records has no effect on the durable one. Put
/// the durable sink first so it has the record even if the other misbehaves.
#[derive(Clone)]
pub struct TeeLogger {
    first: Arc<dyn Logger>,
    second: Arc<dyn Logger>,
}

impl TeeLogger {
    pub fn new(first: Arc<dyn Logger>, second: Arc<dyn Logger>) -> Self {
        Self { first, second }
    }
}

impl Logger for TeeLogger {
    fn log(&self, event: LogEvent) {
        self.first.log(event.clone());
        self.second.log(event);
    }
}
