//! Execution context with retry, backoff, and evidence capture
//!
//! Wraps a single dispatch call with bounded retries, exponential
//! backoff, and optional before/after/on-error screenshots. One call to
//! [`ExecutionContext::execute_with_retry`] produces exactly one
//! [`ActionResult`]; declared action failures come back as `FAILED`
//! results, never as errors.

use crate::config::ReplayConfig;
use crate::device::{DeviceDriver, Params};
use crate::dispatch::ActionDispatcher;
use crate::report::{ActionResult, ActionStatus, ExecutionMetrics};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Relative directory screenshot evidence is written to
pub const SCREENSHOT_DIR: &str = "replay_screenshots";

/// Screenshot stage within an action's lifecycle
#[derive(Debug, Clone, Copy)]
enum ScreenshotStage {
    Before,
    After,
    Error,
}

impl ScreenshotStage {
    fn as_str(self) -> &'static str {
        match self {
            ScreenshotStage::Before => "before",
            ScreenshotStage::After => "after",
            ScreenshotStage::Error => "error",
        }
    }
}

/// Wraps dispatch calls with resilience and evidence capture.
pub struct ExecutionContext {
    driver: Arc<dyn DeviceDriver>,
    device_id: Option<String>,
    config: ReplayConfig,
    screenshot_dir: PathBuf,
}

impl ExecutionContext {
    /// Create a context for one replay invocation.
    pub fn new(
        driver: Arc<dyn DeviceDriver>,
        device_id: Option<String>,
        config: ReplayConfig,
    ) -> Self {
        Self {
            driver,
            device_id,
            config,
            screenshot_dir: PathBuf::from(SCREENSHOT_DIR),
        }
    }

    /// Builder: write screenshot evidence somewhere other than the default
    /// relative directory.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    /// Execute one action through the dispatcher, retrying per the config.
    ///
    /// On success the result carries `retry_count` equal to the zero-based
    /// index of the attempt that succeeded; on exhaustion it carries the
    /// full attempt budget. Backoff between attempts is
    /// `retry_delay_ms * 2^attempt`, and no sleep follows the final failed
    /// attempt.
    pub async fn execute_with_retry(
        &self,
        tool_name: &str,
        parameters: &Params,
        action_index: usize,
        dispatcher: &ActionDispatcher,
    ) -> ActionResult {
        let mut screenshot_before = None;
        let mut screenshot_after = None;
        let mut last_error: Option<String> = None;

        if self.config.capture_screenshots {
            screenshot_before = self
                .capture_screenshot(action_index, ScreenshotStage::Before)
                .await;
        }

        let started_at = Utc::now();

        for attempt in 0..self.config.retry_attempts {
            match dispatcher.dispatch(tool_name, parameters).await {
                Ok(value) => {
                    let ended_at = Utc::now();
                    if self.config.capture_screenshots {
                        screenshot_after = self
                            .capture_screenshot(action_index, ScreenshotStage::After)
                            .await;
                    }
                    return ActionResult {
                        action_index,
                        tool_name: tool_name.to_string(),
                        parameters: parameters.clone(),
                        status: ActionStatus::Success,
                        result: Some(value),
                        error: None,
                        metrics: Some(self.metrics(started_at, ended_at, attempt, true)),
                        screenshot_before,
                        screenshot_after,
                        screenshot_diff: None,
                    };
                }
                Err(err) => {
                    let fatal = err.is_unknown_tool();
                    last_error = Some(err.to_string());

                    if fatal {
                        // Retrying an unregistered tool cannot succeed.
                        debug!(tool = tool_name, "unknown tool, skipping retries");
                        break;
                    }
                    if attempt + 1 < self.config.retry_attempts {
                        let delay = self.backoff_delay(attempt);
                        debug!(
                            tool = tool_name,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "action failed, backing off before retry"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let ended_at = Utc::now();
        if self.config.screenshot_on_error {
            screenshot_after = self
                .capture_screenshot(action_index, ScreenshotStage::Error)
                .await;
        }

        ActionResult {
            action_index,
            tool_name: tool_name.to_string(),
            parameters: parameters.clone(),
            status: ActionStatus::Failed,
            result: None,
            error: last_error,
            metrics: Some(self.metrics(
                started_at,
                ended_at,
                self.config.retry_attempts,
                false,
            )),
            screenshot_before,
            screenshot_after,
            screenshot_diff: None,
        }
    }

    fn metrics(
        &self,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        retry_count: u32,
        succeeded: bool,
    ) -> ExecutionMetrics {
        ExecutionMetrics {
            started_at,
            ended_at,
            duration_ms: (ended_at - started_at).as_seconds_f64() * 1000.0,
            retry_count,
            timeout_occurred: false,
            screenshot_captured: succeeded && self.config.capture_screenshots,
        }
    }

    /// Backoff before the retry that follows the given zero-based attempt.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let millis = self.config.retry_delay_ms as f64 * 2f64.powi(attempt as i32);
        Duration::from_millis(millis as u64)
    }

    /// Capture one evidence screenshot. Failure is never fatal to the
    /// surrounding action; the corresponding path simply stays unset.
    async fn capture_screenshot(
        &self,
        action_index: usize,
        stage: ScreenshotStage,
    ) -> Option<String> {
        if let Err(err) = std::fs::create_dir_all(&self.screenshot_dir) {
            warn!(error = %err, "could not create screenshot directory");
            return None;
        }

        let path = self
            .screenshot_dir
            .join(format!("action_{:03}_{}.png", action_index, stage.as_str()));

        match self
            .driver
            .screenshot(&path, self.device_id.as_deref())
            .await
        {
            Ok(true) => Some(path.to_string_lossy().into_owned()),
            Ok(false) => {
                warn!(path = %path.display(), "screenshot capture reported failure");
                None
            }
            Err(err) => {
                warn!(error = %err, "screenshot capture failed");
                None
            }
        }
    }
}
