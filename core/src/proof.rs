//! Withdrawal proof assembly
//!
//! ```text
//! Note + ResolvedPath + (recipient, relayer, fee, refund)
//!        │
//!        ▼
//!  CircuitInput { public: {...6 signals}, private: {...} } ──▶ Prover ──▶ proof
//! ```
//!
//! No cryptography happens here. The job is to hand the prover exactly the
//! values it expects: field elements as decimal strings, path indices as 0/1.

use async_trait::async_trait;
use log::info;
use num_bigint::BigUint;
use serde::Serialize;
use std::sync::Arc;

use shroud_privacy::{DerivedNote, MerklePath, Note, NullifierHash};
use shroud_wire::{Address, Bytes, H256};

use crate::abi::{self, WithdrawCall};
use crate::error::{Error, Result};
use crate::tree::ResolvedPath;

// ============================================================================
// Collaborator traits
// ============================================================================

/// External proving service
#[async_trait]
pub trait Prover: Send + Sync {
    async fn prove(&self, input: &CircuitInput) -> Result<ProverOutput>;
}

/// External pedersen hasher deriving a note's public values
#[async_trait]
pub trait NoteHasher: Send + Sync {
    async fn derive(&self, note: &Note) -> Result<DerivedNote>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverOutput {
    pub proof: Bytes,
    /// Public signals as echoed by the prover, if it returns them
    pub public_signals: Option<Vec<String>>,
}

// ============================================================================
// Circuit input
// ============================================================================

/// Caller-chosen public parameters of a withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawParams {
    pub recipient: Address,
    pub relayer: Address,
    pub fee: BigUint,
    pub refund: BigUint,
}

impl WithdrawParams {
    /// Self-submitted withdrawal: no relayer, no fee
    pub fn direct(recipient: Address) -> Self {
        Self {
            recipient,
            relayer: Address::ZERO,
            fee: BigUint::from(0u8),
            refund: BigUint::from(0u8),
        }
    }
}

/// The six public signals, in circuit order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicInputs {
    pub root: H256,
    pub nullifier_hash: NullifierHash,
    pub recipient: Address,
    pub relayer: Address,
    pub fee: BigUint,
    pub refund: BigUint,
}

impl PublicInputs {
    pub fn signals(&self) -> Vec<String> {
        let public = PublicSignals::from(self);
        vec![
            public.root,
            public.nullifier_hash,
            public.recipient,
            public.relayer,
            public.fee,
            public.refund,
        ]
    }

    /// `withdraw` calldata carrying `proof`; `None` if fee or refund exceed 256 bits
    pub fn withdraw_calldata(&self, proof: &Bytes) -> Option<Bytes> {
        abi::encode_withdraw(&WithdrawCall {
            proof: proof.as_slice(),
            root: self.root,
            nullifier_hash: *self.nullifier_hash.as_h256(),
            recipient: self.recipient,
            relayer: self.relayer,
            fee: &self.fee,
            refund: &self.refund,
        })
    }
}

fn address_decimal(address: &Address) -> String {
    BigUint::from_bytes_be(address.as_bytes()).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSignals {
    pub root: String,
    pub nullifier_hash: String,
    pub recipient: String,
    pub relayer: String,
    pub fee: String,
    pub refund: String,
}

impl From<&PublicInputs> for PublicSignals {
    fn from(inputs: &PublicInputs) -> Self {
        Self {
            root: inputs.root.to_biguint().to_string(),
            nullifier_hash: inputs.nullifier_hash.as_h256().to_biguint().to_string(),
            recipient: address_decimal(&inputs.recipient),
            relayer: address_decimal(&inputs.relayer),
            fee: inputs.fee.to_string(),
            refund: inputs.refund.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateSignals {
    pub nullifier: String,
    pub secret: String,
    pub path_elements: Vec<String>,
    pub path_indices: Vec<u8>,
}

/// Prover input object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitInput {
    pub public: PublicSignals,
    pub private: PrivateSignals,
}

impl CircuitInput {
    pub fn new(note: &Note, path: &MerklePath, inputs: &PublicInputs) -> Self {
        Self {
            public: PublicSignals::from(inputs),
            private: PrivateSignals {
                nullifier: note.nullifier_value().to_string(),
                secret: note.secret_value().to_string(),
                path_elements: path
                    .siblings
                    .iter()
                    .map(|s| s.to_biguint().to_string())
                    .collect(),
                path_indices: path.path_bits.iter().map(|b| u8::from(*b)).collect(),
            },
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Output of one proving attempt, never cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofResult {
    pub proof: Bytes,
    pub root: H256,
    pub inputs: PublicInputs,
}

pub struct ProofOrchestrator {
    prover: Arc<dyn Prover>,
}

impl ProofOrchestrator {
    pub fn new(prover: Arc<dyn Prover>) -> Self {
        Self { prover }
    }

    pub async fn generate(
        &self,
        note: &Note,
        derived: &DerivedNote,
        resolved: &ResolvedPath,
        params: &WithdrawParams,
    ) -> Result<ProofResult> {
        let inputs = PublicInputs {
            root: resolved.root,
            nullifier_hash: derived.nullifier_hash,
            recipient: params.recipient,
            relayer: params.relayer,
            fee: params.fee.clone(),
            refund: params.refund.clone(),
        };
        let input = CircuitInput::new(note, &resolved.path, &inputs);

        info!("requesting proof for leaf {}", resolved.leaf_index);
        let output = self.prover.prove(&input).await.map_err(|e| match e {
            Error::ProofGenerationFailed { .. } => e,
            other => Error::ProofGenerationFailed {
                cause: other.to_string(),
            },
        })?;

        if let Some(echoed) = &output.public_signals {
            if *echoed != inputs.signals() {
                return Err(Error::ProofGenerationFailed {
                    cause: "prover echoed public signals that differ from the request".into(),
                });
            }
        }

        Ok(ProofResult {
            proof: output.proof,
            root: resolved.root,
            inputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_privacy::{Commitment, MerkleTree};

    fn sample_note() -> Note {
        let mut nullifier = [0u8; 31];
        nullifier[0] = 7;
        let mut secret = [0u8; 31];
        secret[1] = 1;
        Note::new("1", 1, nullifier, secret)
    }

    fn sample_inputs(root: H256) -> PublicInputs {
        PublicInputs {
            root,
            nullifier_hash: NullifierHash(H256::from_u64(99)),
            recipient: Address([0; 20]),
            relayer: Address::ZERO,
            fee: BigUint::from(1000u32),
            refund: BigUint::from(0u8),
        }
    }

    #[test]
    fn test_circuit_input_shape() {
        let tree = MerkleTree::from_leaves(&[H256::from_u64(1), H256::from_u64(2)]).unwrap();
        let path = tree.path(1).unwrap();
        let input = CircuitInput::new(&sample_note(), &path, &sample_inputs(tree.root()));
        let value = serde_json::to_value(&input).unwrap();

        assert_eq!(value["public"]["nullifierHash"], "99");
        assert_eq!(value["public"]["fee"], "1000");
        assert_eq!(value["public"]["relayer"], "0");
        assert_eq!(value["private"]["nullifier"], "7");
        assert_eq!(value["private"]["secret"], "256");
        assert_eq!(value["private"]["pathElements"].as_array().unwrap().len(), 20);
        assert_eq!(value["private"]["pathElements"][0], "1");
        assert_eq!(value["private"]["pathIndices"][0], 1);
        assert_eq!(value["private"]["pathIndices"][1], 0);
        assert_eq!(
            value["public"]["root"],
            tree.root().to_biguint().to_string()
        );
    }

    #[test]
    fn test_recipient_is_a_uint160() {
        let mut inputs = sample_inputs(H256::ZERO);
        let mut raw = [0u8; 20];
        raw[19] = 0x10;
        inputs.recipient = Address(raw);
        assert_eq!(inputs.signals()[2], "16");
    }

    struct EchoProver {
        echo: Option<Vec<String>>,
    }

    #[async_trait]
    impl Prover for EchoProver {
        async fn prove(&self, _input: &CircuitInput) -> Result<ProverOutput> {
            Ok(ProverOutput {
                proof: Bytes(vec![1, 2, 3]),
                public_signals: self.echo.clone(),
            })
        }
    }

    struct FailingProver;

    #[async_trait]
    impl Prover for FailingProver {
        async fn prove(&self, _input: &CircuitInput) -> Result<ProverOutput> {
            Err(Error::TransportError {
                status: 500,
                body: "witness generation failed".into(),
            })
        }
    }

    fn resolved() -> (ResolvedPath, DerivedNote) {
        let commitment = H256::from_u64(5);
        let tree = MerkleTree::from_leaves(&[commitment]).unwrap();
        let resolved = ResolvedPath {
            root: tree.root(),
            path: tree.path(0).unwrap(),
            leaf_index: 0,
        };
        let derived = DerivedNote {
            commitment: Commitment(commitment),
            nullifier_hash: NullifierHash(H256::from_u64(6)),
        };
        (resolved, derived)
    }

    #[tokio::test]
    async fn test_generate_checks_echo() {
        let (resolved, derived) = resolved();
        let params = WithdrawParams::direct(Address([4; 20]));

        let silent = ProofOrchestrator::new(Arc::new(EchoProver { echo: None }));
        let result = silent
            .generate(&sample_note(), &derived, &resolved, &params)
            .await
            .unwrap();
        assert_eq!(result.proof, Bytes(vec![1, 2, 3]));
        assert_eq!(result.root, resolved.root);

        let expected = result.inputs.signals();
        let honest = ProofOrchestrator::new(Arc::new(EchoProver {
            echo: Some(expected.clone()),
        }));
        assert!(
            honest
                .generate(&sample_note(), &derived, &resolved, &params)
                .await
                .is_ok()
        );

        let mut tampered = expected;
        tampered[4] = "1".into();
        let lying = ProofOrchestrator::new(Arc::new(EchoProver {
            echo: Some(tampered),
        }));
        assert!(matches!(
            lying
                .generate(&sample_note(), &derived, &resolved, &params)
                .await,
            Err(Error::ProofGenerationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_prover_failure_is_wrapped() {
        let (resolved, derived) = resolved();
        let orchestrator = ProofOrchestrator::new(Arc::new(FailingProver));
        let err = orchestrator
            .generate(
                &sample_note(),
                &derived,
                &resolved,
                &WithdrawParams::direct(Address::ZERO),
            )
            .await
            .unwrap_err();
        match err {
            Error::ProofGenerationFailed { cause } => {
                assert!(cause.contains("witness generation failed"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_withdraw_calldata() {
        let inputs = sample_inputs(H256([1; 32]));
        let data = inputs.withdraw_calldata(&Bytes(vec![0xaa; 32])).unwrap();
        assert_eq!(&data.as_slice()[..4], &abi::WITHDRAW);

        let mut oversized = inputs;
        oversized.fee = BigUint::from(1u8) << 256usize;
        assert!(oversized.withdraw_calldata(&Bytes::default()).is_none());
    }
}
