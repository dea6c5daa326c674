//! Notification records emitted by the instrumentation layer.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::{Handle, Value};

/// One execution notification, in the order the observed program ran it.
///
/// Serialized as a map tagged by `kind`:
///
/// ```json
/// {"kind": "event_start", "event_type": "click", "receiver": 3, "at": 120}
/// {"kind": "write", "name": "count", "value": "primitive"}
/// {"kind": "put_field", "object": {"object": 7}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A callback is about to run for `event_type` emitted on `receiver`.
    EventStart {
        event_type: String,
        receiver: Handle,
        /// Values handed to the callback.
        #[serde(default)]
        payload: Vec<Value>,
        /// Milliseconds; the wall clock is used when absent.
        #[serde(default)]
        at: Option<u64>,
    },
    EventEnd {
        #[serde(default)]
        at: Option<u64>,
    },

    /// An instrumented function body starts running.
    Enter { function: Handle },
    Exit,

    Declare {
        name: String,
        #[serde(default)]
        value: Value,
    },
    Read { name: String },
    Write { name: String, value: Value },

    GetField { object: Value },
    PutField { object: Value },

    /// A literal was evaluated. Function literals create closures.
    Literal { value: Value },

    AddListener {
        event_type: String,
        receiver: Handle,
        callback: Handle,
        #[serde(default)]
        once: bool,
    },
    RemoveListener {
        event_type: String,
        receiver: Handle,
        /// Remove every registration for the key when absent.
        #[serde(default)]
        callback: Option<Handle>,
    },

    /// A conditional was evaluated.
    Branch,
    /// A call site is about to transfer control to `function`.
    Invoke { function: Handle },
    /// The observed runtime collected `object`.
    Collected { object: Handle },
}

impl Notification {
    /// Parse a single notification from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The `kind` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::EventStart { .. } => "event_start",
            Notification::EventEnd { .. } => "event_end",
            Notification::Enter { .. } => "enter",
            Notification::Exit => "exit",
            Notification::Declare { .. } => "declare",
            Notification::Read { .. } => "read",
            Notification::Write { .. } => "write",
            Notification::GetField { .. } => "get_field",
            Notification::PutField { .. } => "put_field",
            Notification::Literal { .. } => "literal",
            Notification::AddListener { .. } => "add_listener",
            Notification::RemoveListener { .. } => "remove_listener",
            Notification::Branch => "branch",
            Notification::Invoke { .. } => "invoke",
            Notification::Collected { .. } => "collected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_event_start_with_defaults() {
        let n = Notification::from_json(r#"{"kind":"event_start","event_type":"click","receiver":3}"#)
            .unwrap();
        assert_eq!(
            n,
            Notification::EventStart {
                event_type: "click".into(),
                receiver: Handle::new(3),
                payload: vec![],
                at: None,
            }
        );
        assert_eq!(n.kind(), "event_start");
    }

    #[test]
    fn parse_values_inside_notifications() {
        let n = Notification::from_json(r#"{"kind":"put_field","object":{"object":7}}"#).unwrap();
        assert_eq!(
            n,
            Notification::PutField {
                object: Value::Object(Handle::new(7))
            }
        );

        let n = Notification::from_json(r#"{"kind":"write","name":"f","value":{"function":2}}"#)
            .unwrap();
        assert_eq!(
            n,
            Notification::Write {
                name: "f".into(),
                value: Value::Function(Handle::new(2))
            }
        );

        let n = Notification::from_json(r#"{"kind":"declare","name":"x"}"#).unwrap();
        assert_eq!(
            n,
            Notification::Declare {
                name: "x".into(),
                value: Value::Undefined
            }
        );
    }

    #[test]
    fn unit_notifications_need_only_a_kind() {
        assert_eq!(Notification::from_json(r#"{"kind":"exit"}"#).unwrap(), Notification::Exit);
        assert_eq!(Notification::from_json(r#"{"kind":"branch"}"#).unwrap(), Notification::Branch);
        assert_eq!(
            Notification::from_json(r#"{"kind":"event_end"}"#).unwrap(),
            Notification::EventEnd { at: None }
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(Notification::from_json(r#"{"kind":"teleport"}"#).is_err());
    }

    #[test]
    fn json_line_round_trip() {
        let n = Notification::RemoveListener {
            event_type: "data".into(),
            receiver: Handle::new(1),
            callback: Some(Handle::new(9)),
        };
        let line = n.to_json().unwrap();
        assert!(line.contains(r#""kind":"remove_listener""#));
        assert_eq!(Notification::from_json(&line).unwrap(), n);
    }
}
