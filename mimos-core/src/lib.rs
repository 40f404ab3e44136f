//! # Mimos - Scenario Replay for Android UI Automation
//!
//! Mimos (Μῖμος, "the imitator") re-executes recorded Android UI
//! interaction sequences against a live device with:
//! - Bounded retries with exponential backoff
//! - Timing fidelity via speed-scaled inter-action delays
//! - Screenshot evidence capture (before/after/on-error)
//! - Structured pass/fail reporting with aggregate statistics
//! - Two-schema scenario compatibility (legacy and versioned formats)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mimos_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run(driver: Arc<dyn DeviceDriver>) {
//! let engine = ReplayEngine::new(driver, ReplayConfig::default())
//!     .with_device_id("emulator-5554");
//!
//! let report = engine.replay("scenarios/login/scenario.json").await;
//! assert!(report.success);
//! # }
//! ```
//!
//! ## Architecture
//!
//! Data flows strictly downward: the engine loads a scenario once, walks
//! each action through the dispatch registry inside an execution context
//! (retries, backoff, screenshots), and appends every outcome to a report
//! that is finalized exactly once. The device itself sits behind the
//! [`device::DeviceDriver`] trait; the engine never talks to hardware
//! directly, which keeps the whole pipeline testable with scripted
//! drivers.
//!
//! Execution is strictly sequential: one scenario, one device, one action
//! in flight at a time. Replaying several devices concurrently means one
//! [`engine::ReplayEngine`] per device; none of the types here are meant
//! to be shared across replays.

pub mod config;
pub mod context;
pub mod device;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod report;
pub mod scenario;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ReplayConfig;
    pub use crate::context::{ExecutionContext, SCREENSHOT_DIR};
    pub use crate::device::{DeviceDriver, DeviceError, Params};
    pub use crate::dispatch::{
        ActionDispatcher, DispatchError, TOOL_TABLE, ToolCategory, ToolSpec,
    };
    pub use crate::engine::ReplayEngine;
    pub use crate::error::{MimosError, Result};
    pub use crate::report::{
        ActionReportEntry, ActionResult, ActionStatus, ExecutionMetrics, ExecutionSummary, Report,
        ReplayReport, ScenarioSummary,
    };
    pub use crate::scenario::{Action, Scenario};
}
