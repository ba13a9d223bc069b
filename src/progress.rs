use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::RwLock,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{error, warn};
use serde::{Deserialize, Serialize};

/// Cumulative successes required before a gesture counts as mastered.
pub const MASTERY_THRESHOLD: u32 = 5;

/// Per-gesture mastery record. Counts only ever go up; `mastered` is
/// recomputed on every attempt and requires the most recent attempt to be a
/// success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryEntry {
    pub gesture_id: String,
    pub attempts: u32,
    pub successes: u32,
    pub last_practiced: DateTime<Utc>,
    pub mastered: bool,
}

impl MasteryEntry {
    fn new(gesture_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            gesture_id: gesture_id.to_string(),
            attempts: 0,
            successes: 0,
            last_practiced: now,
            mastered: false,
        }
    }
}

/// The whole mastery ledger, persisted as one JSON document.
///
/// Invariant: `total_attempts` equals the sum of per-entry attempts; `streak`
/// is global across gestures, reset by any failed attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressLedger {
    pub gestures: HashMap<String, MasteryEntry>,
    pub total_attempts: u32,
    pub total_successes: u32,
    pub streak: u32,
    pub last_active: Option<DateTime<Utc>>,
}

/// Maintains the ledger in memory and mirrors every mutation to disk.
///
/// Single logical writer per instance. The in-memory state stays
/// authoritative for the session even when a persist attempt fails, so one
/// storage hiccup never loses a recorded attempt.
pub struct ProgressTracker {
    path: PathBuf,
    data: RwLock<ProgressLedger>,
}

impl ProgressTracker {
    /// Load the ledger from `path`, falling back to the zero ledger when the
    /// file is missing or unreadable. Never fails startup over bad storage.
    pub fn new(path: PathBuf) -> Self {
        let data = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                    warn!(
                        "progress ledger at {} is corrupt ({err}); starting from zero",
                        path.display()
                    );
                    ProgressLedger::default()
                }),
                Err(err) => {
                    warn!(
                        "failed to read progress ledger at {} ({err}); starting from zero",
                        path.display()
                    );
                    ProgressLedger::default()
                }
            }
        } else {
            ProgressLedger::default()
        };

        Self {
            path,
            data: RwLock::new(data),
        }
    }

    /// Record one attempt for `gesture_id`, updating the per-gesture entry
    /// and the global aggregates under a single write lock. Returns the
    /// updated entry.
    pub fn record_attempt(&self, gesture_id: &str, success: bool) -> MasteryEntry {
        let now = Utc::now();
        let mut guard = self.data.write().unwrap();

        let entry = guard
            .gestures
            .entry(gesture_id.to_string())
            .or_insert_with(|| MasteryEntry::new(gesture_id, now));

        entry.attempts += 1;
        if success {
            entry.successes += 1;
        }
        entry.last_practiced = now;
        entry.mastered = success && entry.successes >= MASTERY_THRESHOLD;
        let snapshot = entry.clone();

        guard.total_attempts += 1;
        if success {
            guard.total_successes += 1;
            guard.streak += 1;
        } else {
            guard.streak = 0;
        }
        guard.last_active = Some(now);

        if let Err(err) = self.persist(&guard) {
            error!("failed to persist progress ledger: {err:#}");
        }

        snapshot
    }

    /// Clear the entire ledger back to the zero state. Irreversible; callers
    /// are expected to confirm with the user first.
    pub fn reset_all(&self) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        *guard = ProgressLedger::default();
        self.persist(&guard)
    }

    pub fn get(&self, gesture_id: &str) -> Option<MasteryEntry> {
        self.data.read().unwrap().gestures.get(gesture_id).cloned()
    }

    /// Overall success percentage, rounded; 0 when nothing was attempted.
    pub fn success_rate(&self) -> u32 {
        let guard = self.data.read().unwrap();
        if guard.total_attempts == 0 {
            return 0;
        }
        ((guard.total_successes as f64 / guard.total_attempts as f64) * 100.0).round() as u32
    }

    pub fn mastered_count(&self) -> usize {
        self.data
            .read()
            .unwrap()
            .gestures
            .values()
            .filter(|entry| entry.mastered)
            .count()
    }

    pub fn snapshot(&self) -> ProgressLedger {
        self.data.read().unwrap().clone()
    }

    fn persist(&self, data: &ProgressLedger) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write progress ledger to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_tracker() -> (ProgressTracker, PathBuf) {
        let path = std::env::temp_dir().join(format!("auslan-progress-{}.json", Uuid::new_v4()));
        (ProgressTracker::new(path.clone()), path)
    }

    #[test]
    fn five_consecutive_successes_master_a_gesture() {
        let (tracker, path) = temp_tracker();
        for _ in 0..4 {
            let entry = tracker.record_attempt("hello", true);
            assert!(!entry.mastered);
        }
        let entry = tracker.record_attempt("hello", true);
        assert!(entry.mastered);
        assert_eq!(entry.attempts, 5);
        assert_eq!(entry.successes, 5);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn failure_after_threshold_clears_mastered_until_next_success() {
        let (tracker, path) = temp_tracker();
        for _ in 0..5 {
            tracker.record_attempt("water", true);
        }
        assert!(tracker.get("water").unwrap().mastered);

        let entry = tracker.record_attempt("water", false);
        assert!(!entry.mastered);

        let entry = tracker.record_attempt("water", true);
        assert!(entry.mastered);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn aggregates_track_every_attempt_and_streak_resets_on_failure() {
        let (tracker, path) = temp_tracker();
        tracker.record_attempt("a", true);
        tracker.record_attempt("b", true);
        tracker.record_attempt("a", false);
        tracker.record_attempt("c", true);
        tracker.record_attempt("c", true);

        let ledger = tracker.snapshot();
        assert_eq!(ledger.total_attempts, 5);
        assert_eq!(ledger.total_successes, 4);
        assert_eq!(ledger.streak, 2);
        assert_eq!(tracker.success_rate(), 80);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn success_rate_is_zero_without_attempts() {
        let (tracker, path) = temp_tracker();
        assert_eq!(tracker.success_rate(), 0);
        assert_eq!(tracker.mastered_count(), 0);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn ledger_survives_reload() {
        let path = std::env::temp_dir().join(format!("auslan-progress-{}.json", Uuid::new_v4()));
        {
            let tracker = ProgressTracker::new(path.clone());
            tracker.record_attempt("hello", true);
            tracker.record_attempt("hello", false);
        }
        let tracker = ProgressTracker::new(path.clone());
        let entry = tracker.get("hello").unwrap();
        assert_eq!(entry.attempts, 2);
        assert_eq!(entry.successes, 1);
        assert_eq!(tracker.snapshot().streak, 0);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn corrupt_ledger_falls_back_to_zero_state() {
        let path = std::env::temp_dir().join(format!("auslan-progress-{}.json", Uuid::new_v4()));
        fs::write(&path, "garbage {{{{").unwrap();
        let tracker = ProgressTracker::new(path.clone());
        assert_eq!(tracker.snapshot().total_attempts, 0);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn reset_all_clears_everything() {
        let (tracker, path) = temp_tracker();
        for _ in 0..5 {
            tracker.record_attempt("hello", true);
        }
        tracker.reset_all().unwrap();
        assert!(tracker.get("hello").is_none());
        assert_eq!(tracker.snapshot().total_attempts, 0);
        assert_eq!(tracker.mastered_count(), 0);
        let _ = fs::remove_file(path);
    }
}
