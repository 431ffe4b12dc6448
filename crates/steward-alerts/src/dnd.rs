use chrono::{DateTime, Local, Timelike};

/// Quiet-hours window, local time, wrapping past midnight — spec.md §4.11
/// default is 23:00-07:00.
#[derive(Debug, Clone, Copy)]
pub struct DndWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for DndWindow {
    fn default() -> Self {
        Self { start_hour: 23, end_hour: 7 }
    }
}

impl DndWindow {
    pub fn contains(&self, at: DateTime<Local>) -> bool {
        let hour = at.hour();
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn wraps_past_midnight() {
        let w = DndWindow::default();
        assert!(w.contains(at(23)));
        assert!(w.contains(at(2)));
        assert!(w.contains(at(6)));
        assert!(!w.contains(at(7)));
        assert!(!w.contains(at(12)));
        assert!(!w.contains(at(22)));
    }
}
