use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Time source used to measure physical reads.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that advances by a fixed step on every reading. Makes read timings
/// deterministic.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    step: Duration,
    ticks: AtomicU64,
}

impl ManualClock {
    pub fn with_step(step: Duration) -> Self {
        Self {
            base: Instant::now(),
            step,
            ticks: AtomicU64::new(0),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.base + self.step * tick as u32
    }
}

/// One physical read from a data file.
#[derive(Debug, Clone)]
pub struct ReadProfile<'a> {
    pub path: &'a Path,
    pub bytes_requested: usize,
    pub bytes_read: usize,
    pub elapsed: Duration,
}

pub trait ReadObserver: Send + Sync + Debug {
    fn on_read(&self, profile: &ReadProfile<'_>);
}

/// Clock and optional observer handed down to every file a reader opens.
#[derive(Debug, Clone)]
pub struct ReadInstrumentation {
    clock: Arc<dyn Clock>,
    observer: Option<Arc<dyn ReadObserver>>,
}

impl Default for ReadInstrumentation {
    fn default() -> Self {
        Self {
            clock: Arc::new(MonotonicClock),
            observer: None,
        }
    }
}

impl ReadInstrumentation {
    pub fn new(clock: Arc<dyn Clock>, observer: Option<Arc<dyn ReadObserver>>) -> Self {
        Self { clock, observer }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs `read` and reports it to the observer, if any.
    pub fn timed<F>(&self, path: &Path, bytes_requested: usize, read: F) -> std::io::Result<usize>
    where
        F: FnOnce() -> std::io::Result<usize>,
    {
        let Some(observer) = &self.observer else {
            return read();
        };
        let start = self.clock.now();
        let bytes_read = read()?;
        let elapsed = self.clock.now().saturating_duration_since(start);
        observer.on_read(&ReadProfile {
            path,
            bytes_requested,
            bytes_read,
            elapsed,
        });
        Ok(bytes_read)
    }
}
