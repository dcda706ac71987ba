//! Call packet for the two-party protocol.

use crate::PacketMessage;
use lockstep_types::{CallResult, Leg, Timeout, TxId};
use serde::{Deserialize, Serialize};

/// Dispatches the counterparty leg of a two-party transaction.
///
/// The branch index is implicit: in the two-party protocol the counterparty
/// leg is always branch 1. Any links the leg declared have already been
/// resolved to concrete values by the coordinator; `resolved` carries them
/// so the participant never needs a synchronous round trip back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallPacket {
    /// Transaction this leg belongs to.
    pub tx_id: TxId,

    /// The leg to execute.
    pub leg: Leg,

    /// Cross-leg values resolved before dispatch, in link order.
    pub resolved: Vec<CallResult>,

    /// Height/timestamp bound for delivery.
    pub timeout: Timeout,
}

impl CallPacket {
    /// Create a new call packet.
    pub fn new(tx_id: TxId, leg: Leg, resolved: Vec<CallResult>, timeout: Timeout) -> Self {
        Self {
            tx_id,
            leg,
            resolved,
            timeout,
        }
    }
}

impl PacketMessage for CallPacket {
    fn message_type_id() -> &'static str {
        "lockstep.call"
    }
}
