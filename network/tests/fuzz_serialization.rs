//! Property-based fuzz tests for the wire serialization boundary.
//!
//! Every message that crosses the overlay must survive an encode →
//! decode roundtrip for arbitrary valid inputs, and decoding must never
//! panic on garbage.

use proptest::prelude::*;

use crest_network::{
    decode, encode, NodeEvent, ProposeSetMsg, StatusChangeMsg, TransactionMsg, TxSetDataMsg,
    TxSetRequestMsg, TxStatus, ValidationMsg, WireMessage,
};

// ---------------------------------------------------------------------------
// Proptest strategies for wire messages
// ---------------------------------------------------------------------------

fn arb_propose_set() -> impl Strategy<Value = ProposeSetMsg> {
    (
        any::<u32>(),
        any::<u32>(),
        any::<[u8; 32]>(),
        any::<[u8; 32]>(),
        proptest::collection::vec(any::<u8>(), 32..=32),
        proptest::collection::vec(any::<u8>(), 64..=64),
    )
        .prop_map(
            |(propose_seq, close_time, current_tx_hash, previous_ledger, key, sig)| {
                ProposeSetMsg {
                    propose_seq,
                    close_time,
                    current_tx_hash,
                    previous_ledger,
                    node_pub_key: key,
                    signature: sig,
                }
            },
        )
}

fn arb_tx_status() -> impl Strategy<Value = TxStatus> {
    prop_oneof![
        Just(TxStatus::New),
        Just(TxStatus::Current),
        Just(TxStatus::Committed),
        Just(TxStatus::RejectedConflict),
        Just(TxStatus::RejectedInvalid),
    ]
}

fn arb_node_event() -> impl Strategy<Value = NodeEvent> {
    prop_oneof![
        Just(NodeEvent::ClosingLedger),
        Just(NodeEvent::AcceptedLedger),
        Just(NodeEvent::SwitchedLedger),
        Just(NodeEvent::LostSync),
    ]
}

proptest! {
    #[test]
    fn propose_set_roundtrip(msg in arb_propose_set()) {
        let wire = WireMessage::ProposeSet(msg);
        let decoded = decode(&encode(&wire).unwrap()).unwrap();
        prop_assert_eq!(decoded, wire);
    }

    #[test]
    fn validation_roundtrip(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
        let wire = WireMessage::Validation(ValidationMsg { validation: payload });
        let decoded = decode(&encode(&wire).unwrap()).unwrap();
        prop_assert_eq!(decoded, wire);
    }

    #[test]
    fn transaction_roundtrip(
        raw in proptest::collection::vec(any::<u8>(), 0..256),
        status in arb_tx_status(),
        timestamp in any::<u64>(),
    ) {
        let wire = WireMessage::Transaction(TransactionMsg {
            raw_transaction: raw,
            status,
            receive_timestamp: timestamp,
        });
        let decoded = decode(&encode(&wire).unwrap()).unwrap();
        prop_assert_eq!(decoded, wire);
    }

    #[test]
    fn status_change_roundtrip(
        event in arb_node_event(),
        ledger_seq in any::<u32>(),
        network_time in any::<u32>(),
        prev in any::<[u8; 32]>(),
        hash in any::<[u8; 32]>(),
        first in any::<u32>(),
        last in any::<u32>(),
    ) {
        let wire = WireMessage::StatusChange(StatusChangeMsg {
            new_event: event,
            ledger_seq,
            network_time,
            ledger_hash_previous: prev,
            ledger_hash: hash,
            first_seq: first,
            last_seq: last,
        });
        let decoded = decode(&encode(&wire).unwrap()).unwrap();
        prop_assert_eq!(decoded, wire);
    }

    #[test]
    fn tx_set_messages_roundtrip(
        set_id in any::<[u8; 32]>(),
        leaves in proptest::collection::vec((any::<[u8; 32]>(), proptest::collection::vec(any::<u8>(), 0..64)), 0..16),
    ) {
        let request = WireMessage::TxSetRequest(TxSetRequestMsg { set_id });
        prop_assert_eq!(decode(&encode(&request).unwrap()).unwrap(), request);

        let data = WireMessage::TxSetData(TxSetDataMsg { set_id, leaves });
        prop_assert_eq!(decode(&encode(&data).unwrap()).unwrap(), data);
    }

    /// Decoding arbitrary bytes never panics; it errors or yields a value.
    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode(&bytes);
    }
}
