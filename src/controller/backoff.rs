//! # Fibonacci Backoff
//!
//! Retry delays that grow along the Fibonacci sequence between a minimum and
//! a maximum, in seconds: with min 5 the delays are 5, 5, 10, 15, 25, ...

#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    max_secs: u64,
    previous: u64,
    current: u64,
}

impl FibonacciBackoff {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let min_secs = min_secs.max(1);
        let max_secs = max_secs.max(min_secs);
        Self {
            max_secs,
            previous: 0,
            current: min_secs,
        }
    }

    /// Next delay in seconds, capped at the maximum
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let delay = self.current.min(self.max_secs);
        let next = self.previous.saturating_add(self.current);
        self.previous = self.current;
        self.current = next;
        delay
    }
}
