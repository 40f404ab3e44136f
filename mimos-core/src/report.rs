//! Replay report generation
//!
//! Data structures and aggregate statistics for scenario replay execution.
//! The [`ReplayReport`] accumulator ingests one [`ActionResult`] per action
//! plus any global errors, and is finalized exactly once into a [`Report`].

use crate::error::Result;
use crate::scenario::Scenario;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Status of a single replayed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Failed,
    Skipped,
    Timeout,
}

/// Timing and retry metrics for one action's attempt sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// When the first attempt started
    pub started_at: DateTime<Utc>,

    /// When the final attempt concluded
    pub ended_at: DateTime<Utc>,

    /// Wall-clock duration across all attempts, in milliseconds
    pub duration_ms: f64,

    /// Attempts beyond the first on success; the full attempt budget on
    /// exhaustion
    pub retry_count: u32,

    /// Whether a timeout occurred (reserved for report consumers; the
    /// engine never sets it)
    pub timeout_occurred: bool,

    /// Whether screenshots were captured for this action
    pub screenshot_captured: bool,
}

/// Result of replaying one recorded action.
///
/// Created exactly once per action, after all retries conclude, and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Position of the action within the scenario
    pub action_index: usize,

    /// Symbolic tool name that was dispatched
    pub tool_name: String,

    /// Copy of the recorded parameters, kept for audit
    pub parameters: Map<String, Value>,

    /// Outcome of the attempt sequence
    pub status: ActionStatus,

    /// Opaque value returned by the device capability, if any
    pub result: Option<Value>,

    /// Last error message, if the action did not succeed
    pub error: Option<String>,

    /// Timing metrics, absent only when execution never started
    pub metrics: Option<ExecutionMetrics>,

    /// Screenshot file paths, when evidence capture was enabled and succeeded
    pub screenshot_before: Option<String>,
    pub screenshot_after: Option<String>,
    pub screenshot_diff: Option<String>,
}

impl ActionResult {
    /// Flatten into the per-action entry shape used in serialized reports.
    fn to_entry(&self) -> ActionReportEntry {
        ActionReportEntry {
            action_index: self.action_index,
            tool_name: self.tool_name.clone(),
            parameters: self.parameters.clone(),
            status: self.status,
            result: self.result.as_ref().map(stringify),
            error: self.error.clone(),
            duration_ms: self.metrics.as_ref().map(|m| round2(m.duration_ms)),
            retry_count: self.metrics.as_ref().map(|m| m.retry_count).unwrap_or(0),
            screenshot_before: self.screenshot_before.clone(),
            screenshot_after: self.screenshot_after.clone(),
            screenshot_diff: self.screenshot_diff.clone(),
        }
    }
}

/// Per-action entry in the serialized report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReportEntry {
    pub action_index: usize,
    pub tool_name: String,
    pub parameters: Map<String, Value>,
    pub status: ActionStatus,
    /// Stringified device result
    pub result: Option<String>,
    pub error: Option<String>,
    pub duration_ms: Option<f64>,
    pub retry_count: u32,
    pub screenshot_before: Option<String>,
    pub screenshot_after: Option<String>,
    pub screenshot_diff: Option<String>,
}

/// Compact scenario summary carried in the report header
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub session_name: Option<String>,
    pub device_id: Option<String>,
    pub recorded_at: Option<String>,
    pub total_actions: usize,
}

/// Aggregate execution statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub duration_seconds: f64,
    pub total_actions: usize,
    pub successful_actions: usize,
    pub failed_actions: usize,
    pub skipped_actions: usize,
    pub success_rate: f64,
    pub total_retries: u64,
    pub avg_action_duration_ms: f64,
}

/// Final replay report.
///
/// `success` is true iff no action failed and no global error was
/// recorded; a scenario with zero actions and no errors is successful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub success: bool,
    pub scenario: ScenarioSummary,
    pub execution: ExecutionSummary,
    pub action_results: Vec<ActionReportEntry>,
    pub errors: Vec<String>,
    /// Failed entries only, so consumers can inspect failures without
    /// re-scanning the full list
    pub failed_actions: Vec<ActionReportEntry>,
}

impl Report {
    /// Write the report to a file as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Accumulates action results and global errors for one replay invocation.
///
/// Owned exclusively by the orchestrator for the lifetime of one replay;
/// [`ReplayReport::generate`] consumes the accumulator, so it cannot be
/// reused afterwards.
#[derive(Debug, Default)]
pub struct ReplayReport {
    scenario: ScenarioSummary,
    results: Vec<ActionResult>,
    global_errors: Vec<String>,
}

impl ReplayReport {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the compact scenario summary for the report header.
    pub fn set_scenario_metadata(&mut self, scenario: &Scenario) {
        self.scenario = ScenarioSummary {
            session_name: Some(scenario.session_name.clone()),
            device_id: scenario.device_id.clone(),
            recorded_at: scenario.recorded_at.clone(),
            total_actions: scenario.actions.len(),
        };
    }

    /// Append one action's result. Results keep their insertion order.
    pub fn add_action_result(&mut self, result: ActionResult) {
        self.results.push(result);
    }

    /// Record an error not attributable to a single action.
    pub fn add_global_error(&mut self, error: impl Into<String>) {
        self.global_errors.push(error.into());
    }

    /// Finalize the accumulator into a report.
    pub fn generate(self, duration_seconds: f64) -> Report {
        let total = self.results.len();
        let successful = self.count_status(ActionStatus::Success);
        let failed = self.count_status(ActionStatus::Failed);
        let skipped = self.count_status(ActionStatus::Skipped);

        let success_rate = if total > 0 {
            successful as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let durations: Vec<f64> = self
            .results
            .iter()
            .filter_map(|r| r.metrics.as_ref())
            .map(|m| m.duration_ms)
            .collect();
        let avg_duration = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };

        let total_retries: u64 = self
            .results
            .iter()
            .filter_map(|r| r.metrics.as_ref())
            .map(|m| u64::from(m.retry_count))
            .sum();

        let action_results: Vec<ActionReportEntry> =
            self.results.iter().map(ActionResult::to_entry).collect();
        let failed_actions: Vec<ActionReportEntry> = self
            .results
            .iter()
            .filter(|r| r.status == ActionStatus::Failed)
            .map(ActionResult::to_entry)
            .collect();

        Report {
            success: failed == 0 && self.global_errors.is_empty(),
            scenario: self.scenario,
            execution: ExecutionSummary {
                duration_seconds: round2(duration_seconds),
                total_actions: total,
                successful_actions: successful,
                failed_actions: failed,
                skipped_actions: skipped,
                success_rate: round2(success_rate),
                total_retries,
                avg_action_duration_ms: round2(avg_duration),
            },
            action_results,
            errors: self.global_errors,
            failed_actions,
        }
    }

    fn count_status(&self, status: ActionStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metrics(duration_ms: f64, retry_count: u32) -> ExecutionMetrics {
        let started_at = Utc::now();
        ExecutionMetrics {
            started_at,
            ended_at: started_at,
            duration_ms,
            retry_count,
            timeout_occurred: false,
            screenshot_captured: false,
        }
    }

    fn result(index: usize, status: ActionStatus, m: Option<ExecutionMetrics>) -> ActionResult {
        ActionResult {
            action_index: index,
            tool_name: "click".to_string(),
            parameters: Map::new(),
            status,
            result: Some(json!(true)),
            error: match status {
                ActionStatus::Failed => Some("element not found".to_string()),
                _ => None,
            },
            metrics: m,
            screenshot_before: None,
            screenshot_after: None,
            screenshot_diff: None,
        }
    }

    #[test]
    fn test_empty_report_is_successful() {
        let report = ReplayReport::new().generate(0.0);
        assert!(report.success);
        assert_eq!(report.execution.total_actions, 0);
        assert_eq!(report.execution.success_rate, 0.0);
        assert_eq!(report.execution.avg_action_duration_ms, 0.0);
        assert!(report.action_results.is_empty());
        assert!(report.failed_actions.is_empty());
    }

    #[test]
    fn test_all_successful() {
        let mut report = ReplayReport::new();
        report.add_action_result(result(0, ActionStatus::Success, Some(metrics(100.0, 0))));
        report.add_action_result(result(1, ActionStatus::Success, Some(metrics(200.0, 1))));

        let report = report.generate(1.5);
        assert!(report.success);
        assert_eq!(report.execution.total_actions, 2);
        assert_eq!(report.execution.successful_actions, 2);
        assert_eq!(report.execution.failed_actions, 0);
        assert_eq!(report.execution.success_rate, 100.0);
        assert_eq!(report.execution.total_retries, 1);
        assert_eq!(report.execution.avg_action_duration_ms, 150.0);
        assert_eq!(report.execution.duration_seconds, 1.5);
    }

    #[test]
    fn test_mixed_outcomes() {
        let mut report = ReplayReport::new();
        report.add_action_result(result(0, ActionStatus::Success, Some(metrics(100.0, 0))));
        report.add_action_result(result(1, ActionStatus::Failed, Some(metrics(900.0, 3))));
        report.add_action_result(result(2, ActionStatus::Skipped, None));

        let report = report.generate(2.0);
        assert!(!report.success);
        assert_eq!(report.execution.total_actions, 3);
        assert_eq!(report.execution.successful_actions, 1);
        assert_eq!(report.execution.failed_actions, 1);
        assert_eq!(report.execution.skipped_actions, 1);
        assert_eq!(report.execution.success_rate, 33.33);
        assert_eq!(report.execution.total_retries, 3);
        // Average is over metric-bearing results only
        assert_eq!(report.execution.avg_action_duration_ms, 500.0);

        assert_eq!(report.failed_actions.len(), 1);
        assert_eq!(report.failed_actions[0].action_index, 1);
        assert_eq!(
            report.failed_actions[0].error.as_deref(),
            Some("element not found")
        );
    }

    #[test]
    fn test_global_error_forces_failure() {
        let mut report = ReplayReport::new();
        report.add_action_result(result(0, ActionStatus::Success, Some(metrics(100.0, 0))));
        report.add_global_error("Replay error: device disconnected");

        let report = report.generate(0.5);
        assert!(!report.success);
        assert_eq!(report.execution.failed_actions, 0);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_scenario_summary() {
        let scenario = Scenario::from_value(json!({
            "session_name": "summary_test",
            "device_id": "emulator-5554",
            "timestamp": "2025-10-01T12:00:00",
            "actions": [
                {"tool": "click", "params": {}, "delay_before_ms": 0}
            ]
        }))
        .unwrap();

        let mut report = ReplayReport::new();
        report.set_scenario_metadata(&scenario);
        let report = report.generate(0.0);

        assert_eq!(report.scenario.session_name.as_deref(), Some("summary_test"));
        assert_eq!(report.scenario.device_id.as_deref(), Some("emulator-5554"));
        assert_eq!(
            report.scenario.recorded_at.as_deref(),
            Some("2025-10-01T12:00:00")
        );
        assert_eq!(report.scenario.total_actions, 1);
    }

    #[test]
    fn test_entry_serialization_shape() {
        let entry = result(0, ActionStatus::Success, Some(metrics(123.456, 2))).to_entry();
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["duration_ms"], 123.46);
        assert_eq!(json["retry_count"], 2);
        assert_eq!(json["result"], "true");
        assert!(json["screenshot_before"].is_null());
    }

    #[test]
    fn test_entry_without_metrics() {
        let entry = result(0, ActionStatus::Skipped, None).to_entry();
        assert_eq!(entry.duration_ms, None);
        assert_eq!(entry.retry_count, 0);
    }

    #[test]
    fn test_string_results_not_double_quoted() {
        let mut r = result(0, ActionStatus::Success, None);
        r.result = Some(json!("com.example.app"));
        assert_eq!(r.to_entry().result.as_deref(), Some("com.example.app"));
    }

    #[test]
    fn test_rounding() {
        let mut report = ReplayReport::new();
        report.add_action_result(result(0, ActionStatus::Success, Some(metrics(100.456, 0))));

        let report = report.generate(1.23456);
        assert_eq!(report.execution.duration_seconds, 1.23);
        assert_eq!(report.execution.avg_action_duration_ms, 100.46);
    }

    #[test]
    fn test_save_round_trip() {
        let mut report = ReplayReport::new();
        report.add_action_result(result(0, ActionStatus::Success, Some(metrics(100.0, 0))));
        let report = report.generate(1.0);

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        report.save(&path).unwrap();

        let loaded: Report =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(loaded.success);
        assert_eq!(loaded.execution.total_actions, 1);
        assert_eq!(loaded.action_results.len(), 1);
    }
}
