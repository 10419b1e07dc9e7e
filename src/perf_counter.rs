use std::time::{Duration, Instant};

/// Boards between two progress reports
pub const REPORT_INTERVAL: u128 = 1 << 24;

const SUFFIXES: [&str; 6] = ["", "k", "M", "G", "T", "P"];

/// Counts tested boards and measures throughput.
///
/// Rejected subtrees are added in bulk, so the count grows far faster than
/// the number of visited nodes. It saturates at `u128::MAX`.
#[derive(Debug, Clone)]
pub struct PerfCounter {
    boards: u128,
    started: Instant,
    next_report: u128,
}

impl PerfCounter {
    pub fn new() -> Self {
        PerfCounter {
            boards: 0,
            started: Instant::now(),
            next_report: REPORT_INTERVAL,
        }
    }

    pub fn boards(&self) -> u128 {
        self.boards
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[inline]
    pub fn add(&mut self, boards: u128) {
        self.boards = self.boards.saturating_add(boards);
    }

    /// Boards per second since construction
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.boards as f64 / secs
    }

    pub fn format_rate(&self, unit: &str) -> String {
        format_scaled(self.rate(), unit)
    }

    /// True once per [`REPORT_INTERVAL`] boards
    pub fn crossed_report_mark(&mut self) -> bool {
        if self.boards < self.next_report {
            return false;
        }

        let intervals = self.boards / REPORT_INTERVAL;
        self.next_report = intervals.saturating_add(1).saturating_mul(REPORT_INTERVAL);
        true
    }
}

impl Default for PerfCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// `1234567.0, "boards"` becomes `"1.23 Mboards/s"`
pub fn format_scaled(mut value: f64, unit: &str) -> String {
    let mut suffix = 0;
    while value >= 1000.0 && suffix + 1 < SUFFIXES.len() {
        value /= 1000.0;
        suffix += 1;
    }
    format!("{value:.2} {}{unit}/s", SUFFIXES[suffix])
}
