//! Execution environment shared by every database opened with it
//!
//! Holds the two background thread pools the engine schedules work on and a
//! switch that makes every engine-side write fail, used to exercise the
//! paranoid-checks path without a faulty disk.
//!
//! ```text
//! Env
//!  ├─→ LOW  pool: compactions
//!  └─→ HIGH pool: memtable flushes (when max_background_flushes > 0)
//! ```
//!
//! Pool sizes stay mutable for the lifetime of the databases that use the
//! `Env`; a resize takes effect on the next scheduled job.

use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use parking_lot::Mutex;

use crate::util::{Result, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    High,
}

impl Priority {
    fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::High => "high",
        }
    }
}

/// A resizable pool backed by rayon
///
/// rayon pools have a fixed size, so a resize drops the current pool and the
/// next `schedule` builds one with the new size. Jobs already spawned on the
/// old pool still run to completion.
struct BackgroundPool {
    priority: Priority,
    threads: AtomicUsize,
    pool: Mutex<Option<Arc<rayon::ThreadPool>>>,
}

impl BackgroundPool {
    fn new(priority: Priority, threads: usize) -> Self {
        BackgroundPool {
            priority,
            threads: AtomicUsize::new(threads),
            pool: Mutex::new(None),
        }
    }

    fn set_threads(&self, threads: usize) {
        let previous = self.threads.swap(threads, Ordering::SeqCst);
        if previous != threads {
            *self.pool.lock() = None;
            log::debug!(
                "{} priority pool resized from {previous} to {threads} threads",
                self.priority.as_str()
            );
        }
    }

    fn threads(&self) -> usize {
        self.threads.load(Ordering::SeqCst)
    }

    fn get_or_build(&self) -> Result<Arc<rayon::ThreadPool>> {
        let mut guard = self.pool.lock();
        if let Some(pool) = guard.as_ref() {
            return Ok(Arc::clone(pool));
        }

        // a pool with zero threads would never run anything
        let threads = self.threads().max(1);
        let name = self.priority.as_str();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("rucksdb-{name}-{i}"))
            .build()
            .map_err(|e| Status::io_error(format!("Failed to start {name} pool: {e}")))?;
        let pool = Arc::new(pool);
        *guard = Some(Arc::clone(&pool));
        Ok(pool)
    }

    fn schedule<F>(&self, job: F) -> Result<()>
    where F: FnOnce() + Send + 'static {
        self.get_or_build()?.spawn(job);
        Ok(())
    }
}

pub struct Env {
    low: BackgroundPool,
    high: BackgroundPool,
    filesystem_active: AtomicBool,
}

impl Env {
    /// A private environment, one LOW and one HIGH thread.
    pub fn new() -> Arc<Env> {
        Arc::new(Env {
            low: BackgroundPool::new(Priority::Low, 1),
            high: BackgroundPool::new(Priority::High, 1),
            filesystem_active: AtomicBool::new(true),
        })
    }

    /// The process-wide environment used by `DBOptions::default()`.
    pub fn default_env() -> Arc<Env> {
        static DEFAULT: OnceLock<Arc<Env>> = OnceLock::new();
        Arc::clone(DEFAULT.get_or_init(Env::new))
    }

    pub fn set_background_threads(&self, threads: usize, priority: Priority) {
        self.pool(priority).set_threads(threads);
    }

    pub fn background_threads(&self, priority: Priority) -> usize {
        self.pool(priority).threads()
    }

    pub fn schedule<F>(&self, priority: Priority, job: F) -> Result<()>
    where F: FnOnce() + Send + 'static {
        self.pool(priority).schedule(job)
    }

    /// While inactive, WAL, table and manifest writes made by the engine fail
    /// with an I/O error.
    pub fn set_filesystem_active(&self, active: bool) {
        self.filesystem_active.store(active, Ordering::SeqCst);
    }

    pub fn filesystem_active(&self) -> bool {
        self.filesystem_active.load(Ordering::SeqCst)
    }

    pub(crate) fn check_writable(&self) -> Result<()> {
        if self.filesystem_active() {
            Ok(())
        } else {
            Err(Status::io_error("filesystem is inactive"))
        }
    }

    fn pool(&self, priority: Priority) -> &BackgroundPool {
        match priority {
            Priority::Low => &self.low,
            Priority::High => &self.high,
        }
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("low_threads", &self.low.threads())
            .field("high_threads", &self.high.threads())
            .field("filesystem_active", &self.filesystem_active())
            .finish()
    }
}
