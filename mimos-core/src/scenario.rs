//! Scenario loading and normalization
//!
//! Recorded sessions exist on disk in two historical shapes: a legacy
//! flat format keyed by `session_name` / `device_id`, and a versioned
//! format carrying a `schema_version` and a `metadata` block. The loader
//! accepts both and normalizes them into one canonical [`Scenario`], so
//! the rest of the engine never has to care which shape a file used.

use crate::error::{MimosError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// One recorded operation within a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Symbolic tool name ("click", "send_text", ...)
    #[serde(default)]
    pub tool: String,

    /// Recorded tool parameters
    #[serde(default)]
    pub params: Map<String, Value>,

    /// Gap observed before this action when it was recorded, in milliseconds
    #[serde(default)]
    pub delay_before_ms: u64,
}

/// A recorded interaction sequence, normalized from either schema shape.
///
/// Immutable once loaded; the engine only reads it.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Session name the recording was made under
    pub session_name: String,

    /// Device the session was recorded against, if known
    pub device_id: Option<String>,

    /// Timestamp the session was recorded at, if the file carried one
    pub recorded_at: Option<String>,

    /// Ordered action sequence
    pub actions: Vec<Action>,

    /// Full metadata map from versioned files, preserved verbatim for
    /// reporting. Empty for legacy files.
    pub metadata: Map<String, Value>,
}

impl Scenario {
    /// Load and normalize a scenario JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`MimosError::ScenarioNotFound`] if the file does not exist,
    /// [`MimosError::ScenarioParse`] if it is not valid JSON, and
    /// [`MimosError::ScenarioValidation`] if neither schema shape matches
    /// or the `actions` field is missing or not a list.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MimosError::ScenarioNotFound(path.display().to_string()));
        }

        let raw = std::fs::read_to_string(path)?;
        let doc: Value =
            serde_json::from_str(&raw).map_err(|e| MimosError::ScenarioParse(e.to_string()))?;

        Self::from_value(doc)
    }

    /// Normalize an already-parsed scenario document.
    pub fn from_value(doc: Value) -> Result<Self> {
        let obj = doc.as_object().ok_or_else(|| {
            MimosError::ScenarioValidation("scenario must be a JSON object".to_string())
        })?;

        // Shape detection is by key presence, not by the version flag alone.
        let (session_name, device_id, recorded_at, metadata) =
            if obj.contains_key("schema_version") && obj.contains_key("metadata") {
                Self::normalize_versioned(obj)?
            } else if obj.contains_key("session_name") && obj.contains_key("device_id") {
                Self::normalize_legacy(obj)
            } else {
                return Err(MimosError::ScenarioValidation(
                    "unrecognized format: expected either 'schema_version' + 'metadata' \
                     or 'session_name' + 'device_id'"
                        .to_string(),
                ));
            };

        // Shared validation path: both shapes must carry a list of actions.
        let actions = match obj.get("actions") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    serde_json::from_value(item.clone()).map_err(|e| {
                        MimosError::ScenarioValidation(format!("invalid action entry: {e}"))
                    })
                })
                .collect::<Result<Vec<Action>>>()?,
            Some(_) => {
                return Err(MimosError::ScenarioValidation(
                    "'actions' must be a list".to_string(),
                ));
            }
            None => {
                return Err(MimosError::ScenarioValidation(
                    "missing required field 'actions'".to_string(),
                ));
            }
        };

        Ok(Self {
            session_name,
            device_id,
            recorded_at,
            actions,
            metadata,
        })
    }

    fn normalize_versioned(
        obj: &Map<String, Value>,
    ) -> Result<(String, Option<String>, Option<String>, Map<String, Value>)> {
        let metadata = obj
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| {
                MimosError::ScenarioValidation("'metadata' must be an object".to_string())
            })?;

        let session_name = metadata
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MimosError::ScenarioValidation("missing required field 'metadata.name'".to_string())
            })?
            .to_string();

        let device_id = resolve_device_id(&metadata, obj.get("actions"));
        let recorded_at = metadata
            .get("created_at")
            .and_then(Value::as_str)
            .map(String::from);

        Ok((session_name, Some(device_id), recorded_at, metadata))
    }

    fn normalize_legacy(
        obj: &Map<String, Value>,
    ) -> (String, Option<String>, Option<String>, Map<String, Value>) {
        let session_name = obj
            .get("session_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let device_id = obj
            .get("device_id")
            .and_then(Value::as_str)
            .map(String::from);
        let recorded_at = obj
            .get("timestamp")
            .and_then(Value::as_str)
            .map(String::from);

        (session_name, device_id, recorded_at, Map::new())
    }
}

/// Resolve the device identity of a versioned scenario.
///
/// Priority: `metadata.device.serial`, then `metadata.device.id`, then the
/// `device_id` parameter recorded on the first action, then `"unknown"`.
fn resolve_device_id(metadata: &Map<String, Value>, actions: Option<&Value>) -> String {
    let device = metadata.get("device").and_then(Value::as_object);

    if let Some(serial) = device.and_then(|d| d.get("serial")).and_then(Value::as_str) {
        return serial.to_string();
    }
    if let Some(id) = device.and_then(|d| d.get("id")).and_then(Value::as_str) {
        return id.to_string();
    }
    if let Some(id) = actions
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(|a| a.get("params"))
        .and_then(|p| p.get("device_id"))
        .and_then(Value::as_str)
    {
        return id.to_string();
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_scenario(dir: &tempfile::TempDir, name: &str, doc: &Value) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", serde_json::to_string_pretty(doc).unwrap()).unwrap();
        path
    }

    fn legacy_doc() -> Value {
        json!({
            "session_name": "login_flow",
            "device_id": "emulator-5554",
            "timestamp": "2025-10-01T12:00:00",
            "actions": [
                {
                    "index": 0,
                    "tool": "click",
                    "params": {"selector": "Login", "selector_type": "text"},
                    "timestamp": "2025-10-01T12:00:01",
                    "delay_before_ms": 0
                },
                {
                    "index": 1,
                    "tool": "send_text",
                    "params": {"text": "user", "clear": true},
                    "delay_before_ms": 1500
                }
            ]
        })
    }

    fn versioned_doc() -> Value {
        json!({
            "schema_version": "1.0",
            "metadata": {
                "name": "login_flow",
                "description": "Recorded login",
                "created_at": "2025-10-01T12:00:00",
                "device": {"serial": "emulator-5554"}
            },
            "actions": [
                {
                    "tool": "click",
                    "params": {"selector": "Login", "selector_type": "text"},
                    "delay_before_ms": 0
                },
                {
                    "tool": "send_text",
                    "params": {"text": "user", "clear": true},
                    "delay_before_ms": 1500
                }
            ]
        })
    }

    #[test]
    fn test_load_legacy_shape() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_scenario(&dir, "legacy.json", &legacy_doc());

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.session_name, "login_flow");
        assert_eq!(scenario.device_id.as_deref(), Some("emulator-5554"));
        assert_eq!(scenario.recorded_at.as_deref(), Some("2025-10-01T12:00:00"));
        assert_eq!(scenario.actions.len(), 2);
        assert_eq!(scenario.actions[0].tool, "click");
        assert_eq!(scenario.actions[1].delay_before_ms, 1500);
        assert!(scenario.metadata.is_empty());
    }

    #[test]
    fn test_both_shapes_normalize_identically() {
        let legacy = Scenario::from_value(legacy_doc()).unwrap();
        let versioned = Scenario::from_value(versioned_doc()).unwrap();

        assert_eq!(legacy.session_name, versioned.session_name);
        assert_eq!(legacy.device_id, versioned.device_id);
        assert_eq!(legacy.recorded_at, versioned.recorded_at);
        assert_eq!(legacy.actions.len(), versioned.actions.len());
        for (a, b) in legacy.actions.iter().zip(versioned.actions.iter()) {
            assert_eq!(a.tool, b.tool);
            assert_eq!(a.params, b.params);
            assert_eq!(a.delay_before_ms, b.delay_before_ms);
        }
    }

    #[test]
    fn test_versioned_preserves_metadata() {
        let scenario = Scenario::from_value(versioned_doc()).unwrap();
        assert_eq!(
            scenario.metadata.get("description").and_then(Value::as_str),
            Some("Recorded login")
        );
    }

    #[test]
    fn test_device_priority_serial_over_id() {
        let mut doc = versioned_doc();
        doc["metadata"]["device"] = json!({"serial": "SER123", "id": "ID456"});
        let scenario = Scenario::from_value(doc).unwrap();
        assert_eq!(scenario.device_id.as_deref(), Some("SER123"));
    }

    #[test]
    fn test_device_falls_back_to_id() {
        let mut doc = versioned_doc();
        doc["metadata"]["device"] = json!({"id": "ID456"});
        let scenario = Scenario::from_value(doc).unwrap();
        assert_eq!(scenario.device_id.as_deref(), Some("ID456"));
    }

    #[test]
    fn test_device_falls_back_to_first_action_param() {
        let mut doc = versioned_doc();
        doc["metadata"].as_object_mut().unwrap().remove("device");
        doc["actions"][0]["params"]["device_id"] = json!("FROM_ACTION");
        let scenario = Scenario::from_value(doc).unwrap();
        assert_eq!(scenario.device_id.as_deref(), Some("FROM_ACTION"));
    }

    #[test]
    fn test_device_falls_back_to_unknown() {
        let mut doc = versioned_doc();
        doc["metadata"].as_object_mut().unwrap().remove("device");
        let scenario = Scenario::from_value(doc).unwrap();
        assert_eq!(scenario.device_id.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_versioned_requires_name() {
        let mut doc = versioned_doc();
        doc["metadata"].as_object_mut().unwrap().remove("name");
        let err = Scenario::from_value(doc).unwrap_err();
        assert!(matches!(err, MimosError::ScenarioValidation(_)));
        assert!(err.to_string().contains("metadata.name"));
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("/nonexistent/scenario.json").unwrap_err();
        assert!(matches!(err, MimosError::ScenarioNotFound(_)));
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("invalid.json");
        std::fs::write(&path, "{ this is not valid json }").unwrap();

        let err = Scenario::load(&path).unwrap_err();
        assert!(matches!(err, MimosError::ScenarioParse(_)));
    }

    #[test]
    fn test_unrecognized_shape() {
        let err = Scenario::from_value(json!({"session_name": "only_name"})).unwrap_err();
        assert!(matches!(err, MimosError::ScenarioValidation(_)));
    }

    #[test]
    fn test_missing_actions() {
        let mut doc = legacy_doc();
        doc.as_object_mut().unwrap().remove("actions");
        let err = Scenario::from_value(doc).unwrap_err();
        assert!(matches!(err, MimosError::ScenarioValidation(_)));
        assert!(err.to_string().contains("actions"));
    }

    #[test]
    fn test_actions_not_a_list() {
        let mut doc = legacy_doc();
        doc["actions"] = json!("not a list");
        let err = Scenario::from_value(doc).unwrap_err();
        assert!(matches!(err, MimosError::ScenarioValidation(_)));
        assert!(err.to_string().contains("actions"));
    }

    #[test]
    fn test_action_missing_tool_defaults_empty() {
        let mut doc = legacy_doc();
        doc["actions"][0].as_object_mut().unwrap().remove("tool");
        let scenario = Scenario::from_value(doc).unwrap();
        assert_eq!(scenario.actions[0].tool, "");
    }
}
