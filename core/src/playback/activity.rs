use std::collections::VecDeque;

use chrono::Local;

/// Bounded recent-activity log shown to the operator
#[derive(Debug, Clone)]
pub struct ActivityLog {
    capacity: usize,
    entries: VecDeque<String>,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Append a timestamped entry, evicting the oldest when full
    pub fn push(&mut self, message: impl AsRef<str>) {
        let timestamp = Local::now().format("%H:%M:%S");
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries
            .push_back(format!("{}: {}", timestamp, message.as_ref()));
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_latest_entries() {
        let mut log = ActivityLog::new(3);
        for i in 0..5 {
            log.push(format!("entry {i}"));
        }
        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].ends_with("entry 2"));
        assert!(entries[2].ends_with("entry 4"));
    }
}
