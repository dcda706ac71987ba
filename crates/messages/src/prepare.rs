//! Prepare packet for the N-party two-phase protocol.

use crate::PacketMessage;
use lockstep_types::{BranchIndex, CallResult, Leg, Timeout, TxId};
use serde::{Deserialize, Serialize};

/// Dispatches one leg of an N-party transaction for tentative execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparePacket {
    /// Transaction this leg belongs to.
    pub tx_id: TxId,

    /// Position of the leg in the transaction's leg list.
    pub branch_index: BranchIndex,

    /// The leg to execute.
    pub leg: Leg,

    /// Cross-leg values resolved before dispatch, in link order.
    pub resolved: Vec<CallResult>,

    /// Height/timestamp bound for delivery.
    pub timeout: Timeout,
}

impl PreparePacket {
    /// Create a new prepare packet.
    pub fn new(
        tx_id: TxId,
        branch_index: BranchIndex,
        leg: Leg,
        resolved: Vec<CallResult>,
        timeout: Timeout,
    ) -> Self {
        Self {
            tx_id,
            branch_index,
            leg,
            resolved,
            timeout,
        }
    }
}

impl PacketMessage for PreparePacket {
    fn message_type_id() -> &'static str {
        "lockstep.prepare"
    }
}
