//! Action dispatch registry
//!
//! Maps recorded tool names to device-automation capabilities. The
//! supported tool surface is a static table rather than something built
//! by reflection, so it is enumerable and testable without a live device,
//! and new tools or parameter renames are additive data changes.

use crate::device::{DeviceDriver, DeviceError, Params};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Functional grouping for registered tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCategory {
    /// Selector-addressed element operations (text, resource id, xpath)
    ElementInteraction,
    /// Raw-coordinate taps and swipes
    CoordinateInteraction,
    /// Text entry
    TextEntry,
    /// Scrolling and flinging
    Scrolling,
    /// App install/start/stop/clear
    AppLifecycle,
    /// Screen, key, and orientation control
    ScreenControl,
    /// Multi-touch gestures
    Gesture,
    /// Clipboard and file transfer
    FileTransfer,
    /// Notification shade and popup handling
    Notification,
    /// Waiting on activity transitions
    ActivityWait,
    /// Diagnostics and automation maintenance
    Diagnostic,
    /// UI-event watchers
    Watcher,
}

/// Declared entry in the tool registry
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    /// Symbolic name recorded in scenarios
    pub name: &'static str,

    /// Functional category
    pub category: ToolCategory,

    /// Declared parameter names, in call order
    pub params: &'static [&'static str],

    /// Recorded-name to expected-name parameter renames
    pub renames: &'static [(&'static str, &'static str)],
}

impl ToolSpec {
    /// Render the declared signature, e.g. `click(selector, selector_type, timeout, device_id)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(", "))
    }
}

/// Recorded screenshots used `filepath` before the capability settled on
/// `filename`; old recordings still carry the former.
const SCREENSHOT_RENAMES: &[(&str, &str)] = &[("filepath", "filename")];

macro_rules! tool {
    ($name:literal, $category:ident, [$($param:literal),*]) => {
        ToolSpec {
            name: $name,
            category: ToolCategory::$category,
            params: &[$($param),*],
            renames: &[],
        }
    };
    ($name:literal, $category:ident, [$($param:literal),*], $renames:expr) => {
        ToolSpec {
            name: $name,
            category: ToolCategory::$category,
            params: &[$($param),*],
            renames: $renames,
        }
    };
}

/// Every tool the engine can replay.
pub const TOOL_TABLE: &[ToolSpec] = &[
    // Element interaction
    tool!("click", ElementInteraction, ["selector", "selector_type", "timeout", "device_id"]),
    tool!("long_click", ElementInteraction, ["selector", "selector_type", "duration", "device_id"]),
    tool!("double_click", ElementInteraction, ["selector", "selector_type", "timeout", "device_id"]),
    tool!("wait_for_element", ElementInteraction, ["selector", "selector_type", "timeout", "device_id"]),
    tool!("drag", ElementInteraction, ["selector", "selector_type", "to_x", "to_y", "device_id"]),
    tool!("click_xpath", ElementInteraction, ["xpath", "timeout", "device_id"]),
    tool!("long_click_xpath", ElementInteraction, ["xpath", "duration", "device_id"]),
    tool!("wait_xpath", ElementInteraction, ["xpath", "timeout", "device_id"]),
    // Coordinate interaction
    tool!("click_at", CoordinateInteraction, ["x", "y", "device_id"]),
    tool!("double_click_at", CoordinateInteraction, ["x", "y", "device_id"]),
    tool!("swipe", CoordinateInteraction, ["start_x", "start_y", "end_x", "end_y", "duration", "device_id"]),
    // Text entry
    tool!("send_text", TextEntry, ["text", "clear", "device_id"]),
    tool!("send_text_xpath", TextEntry, ["xpath", "text", "clear", "device_id"]),
    // Scrolling
    tool!("scroll_to", Scrolling, ["selector", "selector_type", "device_id"]),
    tool!("scroll_forward", Scrolling, ["steps", "device_id"]),
    tool!("scroll_backward", Scrolling, ["steps", "device_id"]),
    tool!("scroll_to_beginning", Scrolling, ["device_id"]),
    tool!("scroll_to_end", Scrolling, ["device_id"]),
    tool!("fling_forward", Scrolling, ["device_id"]),
    tool!("fling_backward", Scrolling, ["device_id"]),
    // App lifecycle
    tool!("start_app", AppLifecycle, ["package_name", "device_id", "wait"]),
    tool!("stop_app", AppLifecycle, ["package_name", "device_id"]),
    tool!("stop_all_apps", AppLifecycle, ["device_id"]),
    tool!("install_app", AppLifecycle, ["apk_path", "device_id"]),
    tool!("uninstall_app", AppLifecycle, ["package_name", "device_id"]),
    tool!("clear_app_data", AppLifecycle, ["package_name", "device_id"]),
    // Screen control
    tool!("press_key", ScreenControl, ["key", "device_id"]),
    tool!("screen_on", ScreenControl, ["device_id"]),
    tool!("screen_off", ScreenControl, ["device_id"]),
    tool!("unlock_screen", ScreenControl, ["device_id"]),
    tool!("set_orientation", ScreenControl, ["orientation", "device_id"]),
    tool!("freeze_rotation", ScreenControl, ["freeze", "device_id"]),
    tool!("screenshot", ScreenControl, ["filename", "device_id"], SCREENSHOT_RENAMES),
    // Gestures
    tool!("pinch_in", Gesture, ["percent", "steps", "device_id"]),
    tool!("pinch_out", Gesture, ["percent", "steps", "device_id"]),
    // Clipboard and file transfer
    tool!("set_clipboard", FileTransfer, ["text", "device_id"]),
    tool!("pull_file", FileTransfer, ["device_path", "local_path", "device_id"]),
    tool!("push_file", FileTransfer, ["local_path", "device_path", "device_id"]),
    // Notifications and popups
    tool!("open_notification", Notification, ["device_id"]),
    tool!("open_quick_settings", Notification, ["device_id"]),
    tool!("disable_popups", Notification, ["enable", "device_id"]),
    // Activity waiting
    tool!("wait_activity", ActivityWait, ["activity", "timeout", "device_id"]),
    // Diagnostics and maintenance
    tool!("healthcheck", Diagnostic, ["device_id"]),
    tool!("reset_uiautomator", Diagnostic, ["device_id"]),
    tool!("send_action", Diagnostic, ["action", "device_id"]),
    // Watchers
    tool!("watcher_start", Watcher, ["name", "device_id"]),
    tool!("watcher_stop", Watcher, ["name", "device_id"]),
    tool!("watcher_remove", Watcher, ["name", "device_id"]),
];

/// Error raised when dispatch fails before or during a capability call
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Tool name is not in the registry
    #[error("Tool '{tool}' not found in registry. Supported tools: {}", .supported.join(", "))]
    UnknownTool {
        /// The unrecognized name
        tool: String,
        /// All registered tool names, sorted
        supported: Vec<String>,
    },

    /// The capability rejected the supplied parameters
    #[error(
        "Parameter error for {tool}: {message}\nExpected signature: {signature}\nProvided parameters: {provided}"
    )]
    ParameterMismatch {
        tool: String,
        message: String,
        signature: String,
        provided: String,
    },

    /// The capability itself failed
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl DispatchError {
    /// Whether this failure cannot succeed on retry.
    pub fn is_unknown_tool(&self) -> bool {
        matches!(self, DispatchError::UnknownTool { .. })
    }
}

/// Maps recorded action tool names to device capabilities.
///
/// Built once per replay against a device-automation collaborator.
pub struct ActionDispatcher {
    driver: Arc<dyn DeviceDriver>,
    registry: HashMap<&'static str, &'static ToolSpec>,
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("tool_count", &self.registry.len())
            .finish()
    }
}

impl ActionDispatcher {
    /// Build the registry against a device-automation collaborator.
    pub fn new(driver: Arc<dyn DeviceDriver>) -> Self {
        let registry = TOOL_TABLE.iter().map(|spec| (spec.name, spec)).collect();
        Self { driver, registry }
    }

    /// Execute a tool with the given recorded parameters.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownTool`] if the name is not registered;
    /// [`DispatchError::ParameterMismatch`] when the capability rejects the
    /// parameters (the declared signature and the supplied parameters are
    /// included for diagnosability); any other capability failure
    /// propagates with its message intact.
    pub async fn dispatch(
        &self,
        tool_name: &str,
        parameters: &Params,
    ) -> Result<Value, DispatchError> {
        let spec = self
            .registry
            .get(tool_name)
            .copied()
            .ok_or_else(|| DispatchError::UnknownTool {
                tool: tool_name.to_string(),
                supported: self
                    .supported_tools()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            })?;

        let reconciled = reconcile_parameters(spec, parameters);

        match self.driver.perform(spec.name, &reconciled).await {
            Ok(value) => Ok(value),
            Err(DeviceError::InvalidParameters(message)) => {
                Err(DispatchError::ParameterMismatch {
                    tool: spec.name.to_string(),
                    message,
                    signature: spec.signature(),
                    provided: Value::Object(reconciled).to_string(),
                })
            }
            Err(err) => Err(DispatchError::Device(err)),
        }
    }

    /// All registered tool names, sorted.
    pub fn supported_tools(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.registry.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Check whether a tool is supported for replay.
    pub fn is_supported(&self, tool_name: &str) -> bool {
        self.registry.contains_key(tool_name)
    }

    /// Declared parameter signature for a tool, if registered.
    pub fn tool_signature(&self, tool_name: &str) -> Option<String> {
        self.registry.get(tool_name).map(|spec| spec.signature())
    }
}

/// Apply a tool's rename rules to a copy of the recorded parameters.
///
/// The caller's map is never mutated, and a rename only applies when the
/// expected key is not already present.
fn reconcile_parameters(spec: &ToolSpec, parameters: &Params) -> Params {
    let mut reconciled = parameters.clone();
    for (recorded, expected) in spec.renames {
        if reconciled.contains_key(*recorded) && !reconciled.contains_key(*expected) {
            if let Some(value) = reconciled.remove(*recorded) {
                reconciled.insert((*expected).to_string(), value);
            }
        }
    }
    reconciled
}
