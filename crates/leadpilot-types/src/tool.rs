//! Tool names and the uniform result envelope every tool returns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use std::fmt;
use std::str::FromStr;

/// The closed set of side-effecting tools the model may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    SaveLead,
    BookMeeting,
    NotifyTeam,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [ToolName::SaveLead, ToolName::BookMeeting, ToolName::NotifyTeam];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SaveLead => "save_lead",
            ToolName::BookMeeting => "book_meeting",
            ToolName::NotifyTeam => "notify_team",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save_lead" => Ok(ToolName::SaveLead),
            "book_meeting" => Ok(ToolName::BookMeeting),
            "notify_team" => Ok(ToolName::NotifyTeam),
            other => Err(format!("unknown tool: '{other}'")),
        }
    }
}

/// Result envelope returned by every tool invocation.
///
/// Serializes flat: `{"ok": true, "lead_id": "...", ...}` or
/// `{"ok": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolResult {
    /// Successful result carrying the fields of `data`. A non-object payload
    /// is stored under `"value"`.
    pub fn success(data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            ok: true,
            error: None,
            data,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            data: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({"ok": self.ok, "error": self.error})
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_name_roundtrip() {
        for name in ToolName::ALL {
            let parsed: ToolName = name.to_string().parse().unwrap();
            assert_eq!(parsed, name);
        }
        assert!("delete_everything".parse::<ToolName>().is_err());
    }

    #[test]
    fn test_success_serializes_flat() {
        let result = ToolResult::success(json!({"lead_id": "abc", "score": 89}));
        let value = result.to_value();
        assert_eq!(value, json!({"ok": true, "lead_id": "abc", "score": 89}));
    }

    #[test]
    fn test_failure_serializes_error() {
        let result = ToolResult::failure("Email is required");
        assert_eq!(
            result.to_value(),
            json!({"ok": false, "error": "Email is required"})
        );
    }

    #[test]
    fn test_envelope_deserializes() {
        let parsed: ToolResult =
            serde_json::from_value(json!({"ok": true, "event_id": "evt_1"})).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.get("event_id"), Some(&json!("evt_1")));
        assert!(parsed.error.is_none());
    }
}
