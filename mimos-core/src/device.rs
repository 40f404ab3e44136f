//! Device-automation collaborator boundary
//!
//! The replay engine never talks to a device directly. It consumes a
//! [`DeviceDriver`]: one callable keyed by tool name, plus a separate
//! screenshot capability. Production implementations wrap an
//! adb/uiautomator bridge; tests provide scripted drivers.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;

/// Parameter map for a device tool invocation
pub type Params = Map<String, Value>;

/// Error raised by a device-automation capability
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeviceError {
    /// Supplied parameters do not match the tool's expected arguments
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The device operation itself failed
    #[error("{0}")]
    Execution(String),
}

/// The device-automation collaborator consumed by the replay engine.
///
/// Implementations are expected to be synchronous from the engine's point
/// of view: `perform` blocks until the device has carried out (or rejected)
/// the operation. The engine awaits one call at a time.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Perform the named device operation with the given parameters.
    ///
    /// Returns an opaque result value on success. The engine records the
    /// value in the replay report but never inspects it.
    async fn perform(&self, tool: &str, params: &Params) -> Result<Value, DeviceError>;

    /// Capture a screenshot to `path`, optionally against a specific device.
    ///
    /// Returns whether the capture succeeded.
    async fn screenshot(
        &self,
        path: &Path,
        device_id: Option<&str>,
    ) -> Result<bool, DeviceError>;
}
