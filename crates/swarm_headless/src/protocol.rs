//! JSON-lines protocol between the game and the decision engine.
//!
//! One JSON object per line in each direction:
//!
//! **Input (stdin):** requests from the game
//! **Output (stdout):** responses from the engine
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0"}`
//! 2. The game sends one `tick` request per turn carrying the full snapshot
//! 3. Runner answers each with the action batch for that tick
//! 4. `quit` is answered with `bye` and the runner exits
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0"}
//! -> {"type":"tick","tick":1,"yourTeamId":"me","grid":{...},"teams":{...},"constants":{...}}
//! <- {"type":"actions","tick":1,"actions":[{"type":"MOVE_TO","unitId":"u1","position":{"x":7,"y":7}}]}
//! -> {"type":"reset"}
//! <- {"type":"ack","request":"reset"}
//! -> {"type":"quit"}
//! <- {"type":"bye"}
//! ```

use serde::{Deserialize, Serialize};
use swarm_core::actions::Action;
use swarm_core::snapshot::WorldSnapshot;
use thiserror::Error;

/// Protocol version announced in the `ready` line.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Error type for protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Reading or writing a line failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line was not a valid request.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// Input Requests (Game -> Engine)
// ============================================================================

/// Requests the game can send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Decide one tick. The snapshot fields sit next to the tag.
    Tick(Box<WorldSnapshot>),

    /// Drop all engine state and reseed.
    Reset,

    /// Stop the session.
    Quit,
}

impl Request {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Request name for acknowledgments and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tick(_) => "tick",
            Self::Reset => "reset",
            Self::Quit => "quit",
        }
    }
}

// ============================================================================
// Output Responses (Engine -> Game)
// ============================================================================

/// Responses sent by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept requests.
    Ready {
        /// Protocol version.
        version: String,
    },

    /// Action batch for one tick.
    Actions {
        /// Tick the batch answers.
        tick: u64,
        /// Actions, at most one per unit and facility.
        actions: Vec<Action>,
    },

    /// Acknowledgment of a request without payload.
    Ack {
        /// Request name.
        request: String,
    },

    /// A request could not be handled.
    Error {
        /// Human-readable reason.
        message: String,
    },

    /// Goodbye message before shutdown.
    Bye,
}

impl Response {
    /// Create a ready response.
    #[must_use]
    pub fn ready() -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Create an acknowledgment.
    #[must_use]
    pub fn ack(request: &str) -> Self {
        Self::Ack {
            request: request.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_core::components::{Direction, Position, UnitId};
    use swarm_test_utils::fixtures::lone_unit_world;

    #[test]
    fn test_parse_tick_request() {
        let mut value = serde_json::to_value(lone_unit_world()).unwrap();
        value["type"] = serde_json::Value::from("tick");
        let json = serde_json::to_string(&value).unwrap();

        let request = Request::from_json(&json).unwrap();
        let Request::Tick(snapshot) = request else {
            panic!("expected a tick request");
        };
        assert_eq!(snapshot.tick, 1);
        assert_eq!(*snapshot, lone_unit_world());
    }

    #[test]
    fn test_parse_control_requests() {
        assert!(matches!(
            Request::from_json(r#"{"type":"reset"}"#).unwrap(),
            Request::Reset
        ));
        assert!(matches!(
            Request::from_json(r#"{"type":"quit"}"#).unwrap(),
            Request::Quit
        ));
    }

    #[test]
    fn test_parse_error_reported() {
        let err = Request::from_json(r#"{"type":"launch"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_serialize_actions_response() {
        let resp = Response::Actions {
            tick: 4,
            actions: vec![
                Action::MoveTo {
                    unit_id: UnitId::new("u1"),
                    position: Position::new(7, 7),
                },
                Action::Step {
                    unit_id: UnitId::new("u2"),
                    direction: Direction::Left,
                },
            ],
        };
        let json = resp.to_json_line();
        assert!(json.ends_with('\n'));
        assert!(json.contains(r#""type":"actions""#));
        assert!(json.contains(r#""tick":4"#));
        assert!(json.contains(r#""unitId":"u1""#));
    }

    #[test]
    fn test_ready_line() {
        assert_eq!(
            Response::ready().to_json_line(),
            "{\"type\":\"ready\",\"version\":\"1.0\"}\n"
        );
        assert_eq!(Response::Bye.to_json_line(), "{\"type\":\"bye\"}\n");
    }
}
