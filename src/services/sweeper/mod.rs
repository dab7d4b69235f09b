//! Auto-completion sweep: pending events whose end has passed become completed.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local};

use crate::models::event::{EventStatus, ScheduleEvent};
use crate::services::store::ScheduleStore;
use crate::services::sync::ScheduleSync;

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepResult {
    /// The sweep did not run this tick
    pub skipped: bool,
    pub due_ids: Vec<i64>,
    pub completed: usize,
    pub error: Option<String>,
    pub next_due_in: Option<StdDuration>,
}

impl SweepResult {
    pub fn attempted_count(&self) -> usize {
        self.due_ids.len()
    }
}

/// Decides when to sweep and runs the batch update.
///
/// Runs on the first tick, whenever the visible set changes, and otherwise
/// once per `interval`. A failed sweep is not retried early.
pub struct AutoCompletionSweeper {
    interval: Duration,
    last_run: Option<DateTime<Local>>,
    last_fingerprint: Option<u64>,
}

impl Default for AutoCompletionSweeper {
    fn default() -> Self {
        Self::new(StdDuration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS))
    }
}

impl AutoCompletionSweeper {
    pub fn new(interval: StdDuration) -> Self {
        let interval = Duration::from_std(interval).unwrap_or_else(|_| Duration::seconds(60));
        Self {
            interval: interval.max(Duration::seconds(1)),
            last_run: None,
            last_fingerprint: None,
        }
    }

    /// Pending events whose end lies strictly before `now`.
    pub fn due_ids<'e>(
        events: impl IntoIterator<Item = &'e ScheduleEvent>,
        now: DateTime<Local>,
    ) -> Vec<i64> {
        events
            .into_iter()
            .filter(|event| event.status == EventStatus::Pending && event.is_elapsed(now))
            .filter_map(|event| event.id)
            .collect()
    }

    pub fn should_run(&self, now: DateTime<Local>, fingerprint: u64) -> bool {
        match (self.last_run, self.last_fingerprint) {
            (Some(last_run), Some(last_fingerprint)) => {
                fingerprint != last_fingerprint || now - last_run >= self.interval
            }
            _ => true,
        }
    }

    fn next_due_in(&self, now: DateTime<Local>) -> Option<StdDuration> {
        let next = self.last_run? + self.interval;
        Some((next - now).to_std().unwrap_or(StdDuration::ZERO))
    }

    pub fn tick<S: ScheduleStore + ?Sized>(&mut self, sync: &mut ScheduleSync<'_, S>) -> SweepResult {
        self.tick_at(sync, Local::now())
    }

    pub fn tick_at<S: ScheduleStore + ?Sized>(
        &mut self,
        sync: &mut ScheduleSync<'_, S>,
        now: DateTime<Local>,
    ) -> SweepResult {
        if !self.should_run(now, sync.cache().fingerprint()) {
            return SweepResult {
                skipped: true,
                next_due_in: self.next_due_in(now),
                ..SweepResult::default()
            };
        }

        self.last_run = Some(now);
        let mut result = SweepResult {
            due_ids: Self::due_ids(sync.cache().visible_events(), now),
            ..SweepResult::default()
        };

        if !result.due_ids.is_empty() {
            match sync.update_status_batch(
                &result.due_ids,
                EventStatus::Pending,
                EventStatus::Completed,
            ) {
                Ok(completed) => {
                    log::info!(
                        "Auto-completed {} of {} elapsed appointments",
                        completed,
                        result.due_ids.len()
                    );
                    result.completed = completed;
                }
                Err(err) => {
                    log::error!("Auto-completion sweep failed: {:#}", err);
                    result.error = Some(format!("{:#}", err));
                }
            }
        }

        // Taken after the refetch so our own write does not retrigger a sweep
        self.last_fingerprint = Some(sync.cache().fingerprint());
        result.next_due_in = self.next_due_in(now);
        result
    }
}
