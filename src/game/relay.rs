// Two-player relay messages
//
// The transport is somebody else's problem: the combat loop hands outbound
// updates to a `Relay` and is fed inbound ones through
// `CombatLoop::receive_opponent`.

use log::info;
use serde::{Deserialize, Serialize};

/// What just happened to the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayAction {
    Success,
    Failure,
    GameOver,
}

/// Outbound update for the other player in the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub room_id: String,
    pub score: u32,
    pub action: RelayAction,
}

/// Inbound update about the opponent, stamped with their name by the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentUpdate {
    pub username: String,
    pub score: u32,
    pub action: RelayAction,
}

impl ScoreUpdate {
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }

    /// What the relay forwards to the rest of the room
    pub fn forwarded_as(&self, username: &str) -> OpponentUpdate {
        OpponentUpdate {
            username: username.to_string(),
            score: self.score,
            action: self.action,
        }
    }
}

impl OpponentUpdate {
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}

/// Relay errors
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Relay disconnected")]
    Disconnected,

    #[error("Failed to encode update: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound side of the two-player relay
pub trait Relay {
    fn send_score(&mut self, update: &ScoreUpdate) -> Result<(), RelayError>;
}

/// Relay for single-player modes: drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRelay;

impl Relay for NullRelay {
    fn send_score(&mut self, _update: &ScoreUpdate) -> Result<(), RelayError> {
        Ok(())
    }
}

/// Relay that only logs the wire form of each update
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRelay;

impl Relay for LogRelay {
    fn send_score(&mut self, update: &ScoreUpdate) -> Result<(), RelayError> {
        info!("relay <- {}", update.to_json_line()?);
        Ok(())
    }
}
