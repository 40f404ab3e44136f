//! Replay orchestration
//!
//! The top-level coordinator: loads a scenario, prepares the device,
//! walks the action sequence through the dispatch registry inside an
//! execution context, applies recorded inter-action timing, and
//! finalizes a structured report.
//!
//! [`ReplayEngine::replay`] never fails for scenario or device problems;
//! every failure mode surfaces through the report's `success` flag,
//! `errors` list, and per-action statuses, so automated consumers can
//! always parse a report instead of catching errors.

use crate::config::ReplayConfig;
use crate::context::ExecutionContext;
use crate::device::{DeviceDriver, Params};
use crate::dispatch::ActionDispatcher;
use crate::report::{ActionStatus, Report, ReplayReport};
use crate::scenario::{Action, Scenario};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Settle pause after the pre-replay screen-on request
const SCREEN_SETTLE: Duration = Duration::from_secs(1);

/// Orchestrates the replay of one recorded scenario at a time.
///
/// Each engine owns its own dispatcher; a fresh execution context and
/// report are created per [`ReplayEngine::replay`] call, so nothing is
/// shared between invocations. Running multiple devices concurrently
/// means one engine per device.
pub struct ReplayEngine {
    driver: Arc<dyn DeviceDriver>,
    device_id: Option<String>,
    config: ReplayConfig,
    dispatcher: ActionDispatcher,
    screenshot_dir: Option<PathBuf>,
}

impl ReplayEngine {
    /// Create an engine against a device-automation collaborator.
    pub fn new(driver: Arc<dyn DeviceDriver>, config: ReplayConfig) -> Self {
        let dispatcher = ActionDispatcher::new(Arc::clone(&driver));
        Self {
            driver,
            device_id: None,
            config,
            dispatcher,
            screenshot_dir: None,
        }
    }

    /// Builder: target a specific device.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Builder: write screenshot evidence somewhere other than the
    /// default relative directory.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    /// The dispatch registry this engine replays through.
    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// Replay a recorded scenario file and return the execution report.
    ///
    /// Scenario-load failures are recorded as global errors and still
    /// produce a report with empty statistics; the call itself does not
    /// fail.
    pub async fn replay(&self, scenario_path: impl AsRef<Path>) -> Report {
        let started = Instant::now();
        let mut report = ReplayReport::new();

        let mut context = ExecutionContext::new(
            Arc::clone(&self.driver),
            self.device_id.clone(),
            self.config.clone(),
        );
        if let Some(dir) = &self.screenshot_dir {
            context = context.with_screenshot_dir(dir.clone());
        }

        match Scenario::load(scenario_path) {
            Ok(scenario) => {
                info!(
                    session = %scenario.session_name,
                    actions = scenario.actions.len(),
                    "starting replay"
                );
                report.set_scenario_metadata(&scenario);
                self.run_actions(&scenario, &context, &mut report).await;
            }
            Err(err) => {
                warn!(error = %err, "scenario load failed");
                report.add_global_error(format!("Replay error: {err}"));
            }
        }

        report.generate(started.elapsed().as_secs_f64())
    }

    /// Walk the action sequence, appending one result per executed action.
    async fn run_actions(
        &self,
        scenario: &Scenario,
        context: &ExecutionContext,
        report: &mut ReplayReport,
    ) {
        if self.config.wait_for_screen_on {
            self.ensure_device_ready().await;
        }

        for (index, action) in scenario.actions.iter().enumerate() {
            let result = context
                .execute_with_retry(&action.tool, &action.params, index, &self.dispatcher)
                .await;
            let stop = self.config.stop_on_error && result.status != ActionStatus::Success;
            report.add_action_result(result);

            if stop {
                warn!(action = index, "stopping replay after non-successful action");
                break;
            }

            // The recorded gap belongs to the action about to run, so the
            // sleep happens between actions and never after the last one.
            if index + 1 < scenario.actions.len() {
                self.apply_delay(&scenario.actions[index + 1]).await;
            }
        }
    }

    /// Best-effort screen-on plus a short settle pause. Never fatal.
    async fn ensure_device_ready(&self) {
        let Some(device_id) = &self.device_id else {
            return;
        };

        let mut params = Params::new();
        params.insert("device_id".to_string(), Value::String(device_id.clone()));

        match self.dispatcher.dispatch("screen_on", &params).await {
            Ok(_) => tokio::time::sleep(SCREEN_SETTLE).await,
            Err(err) => warn!(error = %err, "could not ensure device ready"),
        }
    }

    /// Sleep the recorded gap before the next action, scaled inversely by
    /// the speed multiplier.
    async fn apply_delay(&self, next: &Action) {
        if next.delay_before_ms == 0 {
            return;
        }

        let scaled = next.delay_before_ms as f64 / 1000.0 / self.config.speed_multiplier;
        if scaled > 0.0 {
            debug!(delay_s = scaled, "applying inter-action delay");
            tokio::time::sleep(Duration::from_secs_f64(scaled)).await;
        }
    }
}
