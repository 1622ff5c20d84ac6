mod common;

use common::*;
use serde_json::json;

use shroud_core::{CircuitInput, Error, NoteHasher, Prover, ProverServiceClient, PublicInputs};
use shroud_privacy::{MerkleTree, NullifierHash};
use shroud_wire::{Address, Bytes, H256};

const PROVER_URL: &str = "http://prover.test";

fn circuit_input(fixture: &TestFixture) -> CircuitInput {
    let tree = MerkleTree::from_leaves(&[H256::from_u64(1)]).unwrap();
    let inputs = PublicInputs {
        root: tree.root(),
        nullifier_hash: NullifierHash(H256::from_u64(9)),
        recipient: Address([1; 20]),
        relayer: Address::ZERO,
        fee: 0u8.into(),
        refund: 0u8.into(),
    };
    CircuitInput::new(&fixture.note(), &tree.path(0).unwrap(), &inputs)
}

#[tokio::test]
async fn test_note_hashing() {
    let fixture = TestFixture::new();
    let pedersen = format!("{}/v1/pedersen", PROVER_URL);
    fixture
        .transport
        .http("POST", &pedersen, 200, json!({ "hash": word(11) }));
    fixture
        .transport
        .http("POST", &pedersen, 200, json!({ "hash": word(22) }));

    let client = ProverServiceClient::new(PROVER_URL, fixture.transport.clone());
    let derived = client.derive(&fixture.note()).await.unwrap();
    assert_eq!(*derived.commitment.as_h256(), H256::from_u64(11));
    assert_eq!(*derived.nullifier_hash.as_h256(), H256::from_u64(22));

    let bodies: Vec<String> = fixture
        .transport
        .requests()
        .iter()
        .filter_map(|r| r.body.as_ref()?["data"].as_str().map(String::from))
        .collect();
    // 62-byte preimage, then the 31-byte nullifier
    assert_eq!(bodies[0].len(), 2 + 124);
    assert_eq!(bodies[1], format!("0x{}", "01".repeat(31)));
}

#[tokio::test]
async fn test_prove() {
    let fixture = TestFixture::new();
    fixture.transport.http(
        "POST",
        &format!("{}/v1/prove", PROVER_URL),
        200,
        json!({ "proof": "0xdeadbeef" }),
    );

    let client = ProverServiceClient::new(PROVER_URL, fixture.transport.clone());
    let output = client.prove(&circuit_input(&fixture)).await.unwrap();
    assert_eq!(output.proof, Bytes(vec![0xde, 0xad, 0xbe, 0xef]));
    assert_eq!(output.public_signals, None);

    let request = fixture.transport.requests()[0].body.clone().unwrap();
    assert_eq!(request["public"]["relayer"], "0");
    assert_eq!(request["private"]["pathIndices"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_prover_failure() {
    let fixture = TestFixture::new();
    fixture.transport.http(
        "POST",
        &format!("{}/v1/prove", PROVER_URL),
        500,
        json!({ "error": "constraint not satisfied" }),
    );

    let client = ProverServiceClient::new(PROVER_URL, fixture.transport.clone());
    match client.prove(&circuit_input(&fixture)).await {
        Err(Error::ProofGenerationFailed { cause }) => {
            assert!(cause.contains("constraint not satisfied"))
        }
        other => panic!("unexpected result {:?}", other.map(|o| o.proof)),
    }
}
