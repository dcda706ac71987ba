//! Acknowledgement returned for every inbound packet.

use crate::PacketMessage;
use serde::{Deserialize, Serialize};

/// Outcome carried by an acknowledgement.
///
/// A leg-execution failure is never an error crossing the message
/// boundary; it travels as `Failed` and becomes protocol state on the
/// coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckResult {
    /// The leg executed successfully.
    Ok,

    /// The leg's contract call was rejected.
    Failed,
}

/// Acknowledgement for a call, prepare, or commit packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// The outcome being reported.
    pub result: AckResult,
}

impl Acknowledgement {
    /// A successful acknowledgement.
    pub fn ok() -> Self {
        Self {
            result: AckResult::Ok,
        }
    }

    /// A failed acknowledgement.
    pub fn failed() -> Self {
        Self {
            result: AckResult::Failed,
        }
    }

    /// Whether the acknowledged leg succeeded.
    pub fn is_ok(&self) -> bool {
        self.result == AckResult::Ok
    }
}

impl PacketMessage for Acknowledgement {
    fn message_type_id() -> &'static str {
        "lockstep.ack"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_result() {
        assert!(Acknowledgement::ok().is_ok());
        assert!(!Acknowledgement::failed().is_ok());
    }
}
