use chrono::NaiveTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogKind {
    #[default]
    Info,
    Success,
    Error,
}

impl LogKind {
    /// Maps the backend's `type` field; unknown values read as info.
    pub fn from_wire(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("success") {
            LogKind::Success
        } else if raw.eq_ignore_ascii_case("error") {
            LogKind::Error
        } else {
            LogKind::Info
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub kind: LogKind,
    pub timestamp: NaiveTime,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, kind: LogKind, timestamp: NaiveTime) -> Self {
        Self {
            message: message.into(),
            kind,
            timestamp,
        }
    }

    pub fn info(message: impl Into<String>, timestamp: NaiveTime) -> Self {
        Self::new(message, LogKind::Info, timestamp)
    }

    pub fn success(message: impl Into<String>, timestamp: NaiveTime) -> Self {
        Self::new(message, LogKind::Success, timestamp)
    }

    pub fn error(message: impl Into<String>, timestamp: NaiveTime) -> Self {
        Self::new(message, LogKind::Error, timestamp)
    }
}

/// Ordered operator log for the current task run.
///
/// Entries only ever get appended. An entry whose message repeats the message
/// of the current last entry is dropped; the same message after a different
/// one is kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogAggregator {
    entries: Vec<LogEntry>,
}

impl LogAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry unless it repeats the last message. Returns whether it was kept.
    pub fn append(&mut self, entry: LogEntry) -> bool {
        if self
            .entries
            .last()
            .is_some_and(|last| last.message == entry.message)
        {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Merges a batch in order, returning how many entries were kept.
    pub fn append_all<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = LogEntry>,
    {
        let mut kept = 0;
        for entry in entries {
            if self.append(entry) {
                kept += 1;
            }
        }
        kept
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(sec: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, sec).unwrap()
    }

    fn messages(log: &LogAggregator) -> Vec<&str> {
        log.entries().iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn consecutive_repeat_is_dropped() {
        let mut log = LogAggregator::new();
        assert!(log.append(LogEntry::info("Scraping page 1", at(0))));
        assert!(!log.append(LogEntry::success("Scraping page 1", at(1))));
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().kind, LogKind::Info);
    }

    #[test]
    fn repeat_after_a_different_message_is_kept() {
        let mut log = LogAggregator::new();
        let kept = log.append_all(vec![
            LogEntry::info("a", at(0)),
            LogEntry::info("b", at(1)),
            LogEntry::info("a", at(2)),
        ]);
        assert_eq!(kept, 3);
        assert_eq!(messages(&log), vec!["a", "b", "a"]);
    }

    #[test]
    fn batch_dedups_against_existing_tail() {
        let mut log = LogAggregator::new();
        log.append(LogEntry::info("Starting task...", at(0)));
        let kept = log.append_all(vec![
            LogEntry::info("Starting task...", at(1)),
            LogEntry::info("Searching for: laptop", at(1)),
            LogEntry::info("Searching for: laptop", at(2)),
        ]);
        assert_eq!(kept, 1);
        assert_eq!(messages(&log), vec!["Starting task...", "Searching for: laptop"]);
    }

    #[test]
    fn clear_empties() {
        let mut log = LogAggregator::new();
        log.append(LogEntry::error("boom", at(0)));
        log.clear();
        assert!(log.is_empty());
        assert!(log.append(LogEntry::error("boom", at(1))));
    }

    #[test]
    fn wire_kinds() {
        assert_eq!(LogKind::from_wire("success"), LogKind::Success);
        assert_eq!(LogKind::from_wire("ERROR"), LogKind::Error);
        assert_eq!(LogKind::from_wire("warning"), LogKind::Info);
    }
}
