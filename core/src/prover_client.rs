//! Prover Service Client
//!
//! HTTP client for the service that owns the circuit and the pedersen hash.
//!
//! ```text
//! POST /v1/prove    CircuitInput          → { proof, publicSignals? }
//! POST /v1/pedersen { data: "0x<bytes>" } → { hash: "0x<32 bytes>" }
//! ```

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use shroud_privacy::{Commitment, DerivedNote, Note, NullifierHash};
use shroud_wire::{Bytes, H256, decode_h256};

use crate::error::{Error, Result};
use crate::proof::{CircuitInput, NoteHasher, Prover, ProverOutput};
use crate::transport::{HttpTransport, join_url};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProveResponse {
    proof: Bytes,
    #[serde(default)]
    public_signals: Option<Vec<String>>,
}

pub struct ProverServiceClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl ProverServiceClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    /// Pedersen hash of `data` as computed by the service
    pub async fn pedersen(&self, data: &[u8]) -> Result<H256> {
        let url = join_url(&self.base_url, "/v1/pedersen");
        let body = json!({ "data": format!("0x{}", hex::encode(data)) });
        let response = self
            .transport
            .post_json(&url, &body)
            .await?
            .require_success()?;
        let value = response.json()?;
        let hash = value.get("hash").ok_or_else(|| {
            Error::Wire(shroud_wire::WireError::MissingField {
                field: "hash".into(),
            })
        })?;
        Ok(decode_h256(hash)?)
    }
}

#[async_trait]
impl Prover for ProverServiceClient {
    async fn prove(&self, input: &CircuitInput) -> Result<ProverOutput> {
        let url = join_url(&self.base_url, "/v1/prove");
        let start = Instant::now();

        let response = self
            .transport
            .post_json(&url, &serde_json::to_value(input)?)
            .await?;
        if !response.is_success() {
            return Err(Error::ProofGenerationFailed {
                cause: format!("prover returned {}: {}", response.status, response.body),
            });
        }
        let parsed: ProveResponse =
            serde_json::from_str(&response.body).map_err(|e| Error::ProofGenerationFailed {
                cause: format!("unreadable prover response: {}", e),
            })?;

        info!(
            "proof of {} bytes generated in {:?}",
            parsed.proof.len(),
            start.elapsed()
        );
        Ok(ProverOutput {
            proof: parsed.proof,
            public_signals: parsed.public_signals,
        })
    }
}

#[async_trait]
impl NoteHasher for ProverServiceClient {
    async fn derive(&self, note: &Note) -> Result<DerivedNote> {
        let commitment = self.pedersen(&note.preimage()).await?;
        let nullifier_hash = self.pedersen(note.nullifier_bytes()).await?;
        debug!("derived commitment {} for {:?}", commitment, note);
        Ok(DerivedNote {
            commitment: Commitment(commitment),
            nullifier_hash: NullifierHash(nullifier_hash),
        })
    }
}
