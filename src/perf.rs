//! Performance Spans
//!
//! Each tracked task is a `tracing` span plus a wall-clock timing kept for
//! the host to report.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::span::EnteredSpan;
use tracing::{debug, info_span};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTiming {
    pub name: String,
    pub label: String,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub name: String,
    pub count: usize,
    pub total_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Default)]
pub struct PerformanceTracker {
    timings: Mutex<Vec<TaskTiming>>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_task(&self, name: &str, label: impl Into<String>) -> TrackedTask<'_> {
        let label = label.into();
        let span = info_span!("task", task = name, label = %label).entered();
        TrackedTask {
            tracker: self,
            name: name.to_string(),
            label,
            started: Instant::now(),
            _span: span,
        }
    }

    /// Completed tasks in completion order
    pub fn timings(&self) -> Vec<TaskTiming> {
        self.timings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn summary(&self) -> Vec<TaskSummary> {
        let mut by_name: BTreeMap<String, TaskSummary> = BTreeMap::new();
        for timing in self.timings() {
            let entry = by_name
                .entry(timing.name.clone())
                .or_insert_with(|| TaskSummary {
                    name: timing.name.clone(),
                    count: 0,
                    total_ms: 0.0,
                    max_ms: 0.0,
                });
            entry.count += 1;
            entry.total_ms += timing.duration_ms;
            entry.max_ms = entry.max_ms.max(timing.duration_ms);
        }
        by_name.into_values().collect()
    }

    fn record(&self, timing: TaskTiming) {
        self.timings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(timing);
    }
}

/// Open task; only recorded when [`TrackedTask::end`] is called
pub struct TrackedTask<'a> {
    tracker: &'a PerformanceTracker,
    name: String,
    label: String,
    started: Instant,
    _span: EnteredSpan,
}

impl TrackedTask<'_> {
    pub fn end(self) {
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        debug!(duration_ms, "task finished");
        self.tracker.record(TaskTiming {
            name: self.name,
            label: self.label,
            duration_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_ended_tasks_are_recorded() {
        let tracker = PerformanceTracker::new();
        tracker.track_task("Image render", "Item 1").end();
        drop(tracker.track_task("Image render", "Item 2"));

        let timings = tracker.timings();
        assert_eq!(timings.len(), 1);
        assert_eq!(timings[0].label, "Item 1");
    }

    #[test]
    fn test_summary_groups_by_name() {
        let tracker = PerformanceTracker::new();
        tracker.track_task("Image render", "Item 1").end();
        tracker.track_task("Image render", "Item 2").end();
        tracker.track_task("Export", "images").end();

        let summary = tracker.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].name, "Export");
        assert_eq!(summary[1].count, 2);
        assert!(summary[1].max_ms <= summary[1].total_ms);
    }
}
