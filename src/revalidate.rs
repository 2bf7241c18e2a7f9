use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Paths tracked before the oldest record is evicted.
pub const DEFAULT_TRACKED_PATHS: usize = 1024;

/// Marks rendered output for a path as stale after a mutation.
pub trait Revalidate: Send + Sync {
    fn revalidate_path(&self, path: &str);
}

/// Records the last time each path was invalidated, keeping at most
/// `capacity` paths. Oldest first; re-marking a path moves it to the back.
#[derive(Debug)]
pub struct PathRevalidator {
    capacity: usize,
    stale: Mutex<VecDeque<(String, DateTime<Utc>)>>,
}

impl Default for PathRevalidator {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRACKED_PATHS)
    }
}

impl PathRevalidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            stale: Mutex::new(VecDeque::new()),
        }
    }

    pub fn last_revalidated(&self, path: &str) -> Option<DateTime<Utc>> {
        let stale = self.stale.lock().ok()?;
        stale.iter().find(|(p, _)| p == path).map(|(_, at)| *at)
    }

    pub fn tracked(&self) -> usize {
        self.stale.lock().map(|stale| stale.len()).unwrap_or(0)
    }

    /// Drain the stale set, oldest first.
    pub fn take_stale(&self) -> Vec<String> {
        let Ok(mut stale) = self.stale.lock() else {
            return Vec::new();
        };
        stale.drain(..).map(|(path, _)| path).collect()
    }
}

impl Revalidate for PathRevalidator {
    fn revalidate_path(&self, path: &str) {
        if path.is_empty() {
            return;
        }
        tracing::debug!(path, "Revalidating path");
        let Ok(mut stale) = self.stale.lock() else {
            return;
        };
        stale.retain(|(p, _)| p != path);
        stale.push_back((path.to_string(), Utc::now()));
        while stale.len() > self.capacity {
            if let Some((evicted, _)) = stale.pop_front() {
                tracing::debug!(path = %evicted, "Dropping oldest revalidation record");
            }
        }
    }
}

pub type DynRevalidate = Arc<dyn Revalidate>;
