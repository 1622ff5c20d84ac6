mod common;

use common::*;
use serde_json::{Value, json};

use shroud_core::abi::{WITHDRAW, keccak256};
use shroud_core::{Error, FailurePolicy, FeeOverrides, WithdrawMode, WithdrawOutcome};
use shroud_privacy::{Commitment, Note, PrivacyError};
use shroud_wire::{Address, Bytes, H256, parse_h256};

const FROM: Address = Address([0xaa; 20]);

fn direct() -> WithdrawMode {
    WithdrawMode::Direct {
        from: FROM,
        fees: FeeOverrides::default(),
    }
}

fn script_submission(fixture: &TestFixture, success: bool) -> H256 {
    let tx_hash = keccak256(&[0x02, 0x05]);
    fixture.transport.rpc("eth_getTransactionCount", json!("0x5"));
    fixture.transport.rpc("eth_estimateGas", json!("0x493e0"));
    fixture
        .transport
        .rpc("eth_sendRawTransaction", json!(tx_hash.to_string()));
    fixture
        .transport
        .rpc("eth_getTransactionReceipt", Value::Null);
    fixture
        .transport
        .rpc("eth_getTransactionReceipt", receipt_json(&tx_hash, success));
    tx_hash
}

#[tokio::test]
async fn test_stale_root_stops_before_proving() {
    let fixture = TestFixture::new();
    fixture.seed_synced_pool(13);
    fixture.script_contract(false, false);

    let err = fixture
        .withdrawer()
        .withdraw_note(&fixture.note(), &direct())
        .await
        .unwrap_err();

    let expected_root =
        parse_h256("0x156c224f23b580116f1e543fc0b78ce38f1a4aa826f2460852cfbd0860da8dd8").unwrap();
    assert!(matches!(err, Error::StaleOrCorruptTree { root } if root == expected_root));
    assert_eq!(fixture.prover.calls(), 0);
    assert_eq!(fixture.transport.call_count(IS_SPENT), 0);
}

#[tokio::test]
async fn test_spent_note_is_rejected() {
    let fixture = TestFixture::new();
    fixture.seed_synced_pool(13);
    fixture.script_contract(true, true);

    let err = fixture
        .withdrawer()
        .withdraw_note(&fixture.note(), &direct())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoteAlreadySpent { .. }));
    assert_eq!(fixture.prover.calls(), 0);
}

#[tokio::test]
async fn test_unknown_commitment() {
    let mut fixture = TestFixture::new();
    fixture.derived.commitment = Commitment(H256::from_u64(99));
    fixture.seed_synced_pool(13);
    fixture.script_contract(true, false);

    let err = fixture
        .withdrawer()
        .withdraw_note(&fixture.note(), &direct())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CommitmentNotFound { .. }));
    assert_eq!(fixture.prover.calls(), 0);
}

#[tokio::test]
async fn test_direct_withdrawal() {
    let fixture = TestFixture::new();
    fixture.seed_synced_pool(13);
    fixture.script_contract(true, false);
    let tx_hash = script_submission(&fixture, true);

    let outcome = fixture
        .withdrawer()
        .withdraw_note(&fixture.note(), &direct())
        .await
        .unwrap();
    match outcome {
        WithdrawOutcome::Submitted { tx_hash: hash, receipt } => {
            assert_eq!(hash, tx_hash);
            assert!(receipt.unwrap().succeeded());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(fixture.prover.calls(), 1);
    assert_eq!(fixture.transport.rpc_count("eth_getTransactionReceipt"), 2);
    assert_eq!(
        fixture.transport.rpc_params("eth_getTransactionCount")[0][1],
        "pending"
    );

    let signed = fixture.signer.signed.lock().unwrap();
    assert_eq!(signed.len(), 1);
    let tx = &signed[0];
    assert_eq!(tx.nonce, 5);
    assert_eq!(tx.gas_limit, 300_000);
    assert_eq!(tx.max_fee_per_gas.to_string(), "15500000000");
    assert_eq!(tx.max_priority_fee_per_gas.to_string(), "3000000000");
    assert_eq!(tx.to, fixture.denomination().contract);
    assert_eq!(tx.value.to_string(), "0");

    let data = tx.data.as_slice();
    assert_eq!(&data[..4], &WITHDRAW);
    assert_eq!(
        H256::from_be_slice(&data[36..68]).unwrap().to_string(),
        "0x156c224f23b580116f1e543fc0b78ce38f1a4aa826f2460852cfbd0860da8dd8"
    );
    assert_eq!(&data[100 + 12..132], FROM.as_bytes());
    assert!(data[132..164].iter().all(|b| *b == 0));
}

#[tokio::test]
async fn test_reverted_withdrawal() {
    let fixture = TestFixture::new();
    fixture.seed_synced_pool(13);
    fixture.script_contract(true, false);
    let tx_hash = script_submission(&fixture, false);

    let err = fixture
        .withdrawer()
        .withdraw_note(&fixture.note(), &direct())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TransactionReverted { tx_hash: hash } if hash == tx_hash));
}

#[tokio::test]
async fn test_fee_overrides_skip_queries() {
    let fixture = TestFixture::new();
    fixture.seed_synced_pool(13);
    fixture.script_contract(true, false);
    script_submission(&fixture, true);

    let mode = WithdrawMode::Direct {
        from: FROM,
        fees: FeeOverrides {
            max_fee_per_gas: Some(50u32.into()),
            max_priority_fee_per_gas: Some(2u32.into()),
            gas_limit: Some(400_000),
        },
    };
    fixture
        .withdrawer()
        .withdraw_note(&fixture.note(), &mode)
        .await
        .unwrap();

    assert_eq!(fixture.transport.rpc_count("eth_estimateGas"), 0);
    let signed = fixture.signer.signed.lock().unwrap();
    assert_eq!(signed[0].gas_limit, 400_000);
    assert_eq!(signed[0].max_fee_per_gas.to_string(), "50");
    assert_eq!(signed[0].max_priority_fee_per_gas.to_string(), "2");
}

#[tokio::test]
async fn test_dry_run_submits_nothing() {
    let fixture = TestFixture::new();
    fixture.seed_synced_pool(13);
    fixture.script_contract(true, false);
    fixture.transport.rpc("eth_call:0x21a0adb6", json!("0x"));

    let outcome = fixture
        .withdrawer()
        .withdraw_note(&fixture.note(), &WithdrawMode::DryRun { from: FROM })
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WithdrawOutcome::Simulated {
            output: Bytes::default()
        }
    );
    assert_eq!(fixture.transport.rpc_count("eth_sendRawTransaction"), 0);
    assert!(fixture.signer.signed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_note_for_other_network() {
    let fixture = TestFixture::new();
    let note = Note::new("0.1", 5, [1; 31], [2; 31]);

    let err = fixture
        .withdrawer()
        .withdraw_note(&note, &direct())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Privacy(PrivacyError::InvalidNote(_))));
    assert!(fixture.transport.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_denomination() {
    let fixture = TestFixture::new();
    let note = Note::new("10", 1, [1; 31], [2; 31]);

    let err = fixture
        .withdrawer()
        .withdraw_note(&note, &direct())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownDenomination(label) if label == "10"));
}

#[tokio::test]
async fn test_batch_skip_and_abort() {
    let notes = vec![
        Note::new("0.1", 5, [1; 31], [2; 31]),
        Note::new("0.1", 1, [1; 31], [2; 31]),
    ];
    let mode = WithdrawMode::DryRun { from: FROM };

    let fixture = TestFixture::new();
    fixture.seed_synced_pool(13);
    fixture.script_contract(true, false);
    fixture.transport.rpc("eth_call:0x21a0adb6", json!("0x"));

    let skipped = fixture
        .withdrawer()
        .withdraw_all(&notes, &mode, FailurePolicy::Skip)
        .await;
    assert_eq!(skipped.len(), 2);
    assert!(skipped[0].result.is_err());
    assert!(skipped[1].result.is_ok());
    assert_eq!(skipped[1].index, 1);

    let aborted = fixture
        .withdrawer()
        .withdraw_all(&notes, &mode, FailurePolicy::Abort)
        .await;
    assert_eq!(aborted.len(), 1);
    assert_eq!(aborted[0].label, "0.1");
}
