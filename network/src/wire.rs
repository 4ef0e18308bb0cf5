//! Peer-to-peer wire messages for the consensus layer.
//!
//! Every message sent between CREST nodes during consensus is wrapped in
//! [`WireMessage`] and bincode-encoded. Field order within each struct is
//! the wire order; integers use bincode's fixed little-endian encoding.

use crate::error::NetworkError;
use serde::{Deserialize, Serialize};

/// Maximum encoded message size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16 MiB

/// Top-level consensus wire message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WireMessage {
    /// A signed peer position for the round in progress.
    ProposeSet(ProposeSetMsg),
    /// A signed statement that a closed ledger is accepted.
    Validation(ValidationMsg),
    /// A relayed transaction (e.g. a disputed tx another node may lack).
    Transaction(TransactionMsg),
    /// A node's view of its own consensus progress.
    StatusChange(StatusChangeMsg),
    /// Request for a transaction set by id.
    TxSetRequest(TxSetRequestMsg),
    /// A transaction set delivered in response to a request.
    TxSetData(TxSetDataMsg),
}

/// A peer position: the proposer's current tx-set hash for the round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeSetMsg {
    pub propose_seq: u32,
    /// Seconds since the network epoch.
    pub close_time: u32,
    pub current_tx_hash: [u8; 32],
    pub previous_ledger: [u8; 32],
    pub node_pub_key: Vec<u8>,
    pub signature: Vec<u8>,
}

/// A validation, carried as the canonical serialization of the record so
/// that the signature always covers exactly the bytes on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMsg {
    pub validation: Vec<u8>,
}

/// Relay status of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    New,
    Current,
    Committed,
    RejectedConflict,
    RejectedInvalid,
}

/// A relayed raw transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMsg {
    pub raw_transaction: Vec<u8>,
    pub status: TxStatus,
    pub receive_timestamp: u64,
}

/// Events a node reports about its own consensus progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeEvent {
    ClosingLedger,
    AcceptedLedger,
    SwitchedLedger,
    LostSync,
}

/// A node's consensus status broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeMsg {
    pub new_event: NodeEvent,
    pub ledger_seq: u32,
    /// Seconds since the network epoch.
    pub network_time: u32,
    pub ledger_hash_previous: [u8; 32],
    pub ledger_hash: [u8; 32],
    /// First sequence of the fully validated range (0 when none).
    pub first_seq: u32,
    /// Last sequence of the fully validated range (0 when none).
    pub last_seq: u32,
}

/// Ask peers for a transaction set we do not hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSetRequestMsg {
    pub set_id: [u8; 32],
}

/// A transaction set's leaves, keyed by transaction id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSetDataMsg {
    pub set_id: [u8; 32],
    pub leaves: Vec<([u8; 32], Vec<u8>)>,
}

/// Encode a message for transmission.
pub fn encode(message: &WireMessage) -> Result<Vec<u8>, NetworkError> {
    let bytes =
        bincode::serialize(message).map_err(|e| NetworkError::Malformed(e.to_string()))?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(NetworkError::MessageTooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bytes)
}

/// Decode a message from raw bytes.
pub fn decode(data: &[u8]) -> Result<WireMessage, NetworkError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(NetworkError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    bincode::deserialize(data).map_err(|e| NetworkError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_propose() -> ProposeSetMsg {
        ProposeSetMsg {
            propose_seq: 3,
            close_time: 700_000_000,
            current_tx_hash: [0xAA; 32],
            previous_ledger: [0xBB; 32],
            node_pub_key: vec![1; 32],
            signature: vec![2; 64],
        }
    }

    #[test]
    fn propose_set_roundtrip() {
        let msg = WireMessage::ProposeSet(sample_propose());
        let bytes = encode(&msg).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn validation_roundtrip() {
        let msg = WireMessage::Validation(ValidationMsg {
            validation: vec![7; 120],
        });
        let decoded = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn transaction_roundtrip() {
        let msg = WireMessage::Transaction(TransactionMsg {
            raw_transaction: vec![9, 8, 7],
            status: TxStatus::New,
            receive_timestamp: 123_456,
        });
        let decoded = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn status_change_roundtrip() {
        let msg = WireMessage::StatusChange(StatusChangeMsg {
            new_event: NodeEvent::AcceptedLedger,
            ledger_seq: 101,
            network_time: 700_000_123,
            ledger_hash_previous: [1; 32],
            ledger_hash: [2; 32],
            first_seq: 90,
            last_seq: 101,
        });
        let decoded = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn tx_set_request_roundtrip() {
        let msg = WireMessage::TxSetRequest(TxSetRequestMsg { set_id: [5; 32] });
        let decoded = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn tx_set_data_roundtrip() {
        let msg = WireMessage::TxSetData(TxSetDataMsg {
            set_id: [5; 32],
            leaves: vec![([1; 32], vec![1, 2]), ([2; 32], vec![3])],
        });
        let decoded = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn corrupt_bytes_rejected_gracefully() {
        assert!(decode(&[0xFF, 0x00, 0xDE, 0xAD]).is_err());
    }

    #[test]
    fn truncated_message_rejected() {
        let bytes = encode(&WireMessage::ProposeSet(sample_propose())).unwrap();
        assert!(decode(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn empty_bytes_rejected() {
        assert!(decode(&[]).is_err());
    }
}
