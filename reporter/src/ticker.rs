use std::time::Duration;

use async_trait::async_trait;

/// Paces the report loop.
#[async_trait]
pub trait Ticker: Send {
    /// Waits until the next iteration is due.
    ///
    /// Returns `false` when the loop should stop.
    async fn tick(&mut self) -> bool;
}

/// Fixed-delay ticker: the first tick is immediate, every later tick sleeps
/// for the interval. Never stops.
#[derive(Debug, Clone)]
pub struct IntervalTicker {
    interval: Duration,
    started: bool,
}

impl IntervalTicker {
    /// Creates a ticker sleeping `interval` between iterations.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            started: false,
        }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        if self.started {
            tokio::time::sleep(self.interval).await;
        } else {
            self.started = true;
        }
        true
    }
}

/// Ticker that allows a fixed number of iterations without waiting.
#[derive(Debug, Clone)]
pub struct CountedTicker {
    remaining: usize,
}

impl CountedTicker {
    /// Creates a ticker allowing `iterations` iterations.
    #[must_use]
    pub const fn new(iterations: usize) -> Self {
        Self {
            remaining: iterations,
        }
    }
}

#[async_trait]
impl Ticker for CountedTicker {
    async fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        tokio::task::yield_now().await;
        true
    }
}
