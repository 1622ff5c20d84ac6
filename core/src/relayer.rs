//! Relayer client
//!
//! A relayer submits the withdrawal from its own account and is paid out of
//! the withdrawn amount, so the recipient never needs gas.
//!
//! ```text
//!  SUBMITTING ── POST /v1/tornadoWithdraw ──▶ job id
//!      │
//!      ▼
//!  POLLING ── GET /v1/jobs/{id} every 3s ──┬─ SENT | ACCEPTED | MINED ─▶ keep polling
//!                                          ├─ CONFIRMED ─▶ txHash ─▶ receipt wait
//!                                          └─ FAILED ────▶ RelayerJobFailed
//! ```
//!
//! Submission is never retried.

use log::{debug, info, warn};
use num_bigint::BigUint;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

use shroud_wire::{
    Address, Bytes, H256, JobStatus, RelayerStatus, TransactionReceipt, WireError,
    decode_job_status, decode_job_submission, decode_relayer_status, encode_address,
    encode_bytes, encode_h256,
};

use crate::error::{Error, Result};
use crate::poll::PollPolicy;
use crate::proof::PublicInputs;
use crate::transport::{HttpTransport, HttpResponse, join_url};
use crate::tx::{TransactionLifecycle, max_fee_per_gas};

/// Gas the relayer budgets for one withdrawal
pub const DEFAULT_RELAYER_GAS_LIMIT: u64 = 700_000;

/// Fee owed to a relayer for withdrawing `size` wei
///
/// ```text
/// fee = (base_fee * 125/100 + priority_fee) * gas_limit
///     + size * ceil(service_fee_percent * 100) / 10_000
/// ```
pub fn relayer_fee(
    base_fee: &BigUint,
    priority_fee: &BigUint,
    gas_limit: u64,
    size: &BigUint,
    service_fee_percent: f64,
) -> BigUint {
    let gas_cost = max_fee_per_gas(base_fee, priority_fee) * gas_limit;
    let basis_points = (service_fee_percent * 100.0).ceil().max(0.0) as u64;
    gas_cost + size * basis_points / 10_000u32
}

/// Proof and public inputs handed to a relayer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawRequest {
    pub contract: Address,
    pub proof: Bytes,
    pub inputs: PublicInputs,
}

impl WithdrawRequest {
    fn to_json(&self) -> Result<Value> {
        let word = |value: &BigUint| {
            H256::from_biguint(value).map(|w| encode_h256(&w)).ok_or_else(|| {
                Error::Wire(WireError::MalformedWireValue {
                    value: value.to_string(),
                })
            })
        };
        Ok(json!({
            "contract": encode_address(&self.contract),
            "proof": encode_bytes(self.proof.as_slice()),
            "args": [
                encode_h256(&self.inputs.root),
                encode_h256(self.inputs.nullifier_hash.as_h256()),
                encode_address(&self.inputs.recipient),
                encode_address(&self.inputs.relayer),
                word(&self.inputs.fee)?,
                word(&self.inputs.refund)?,
            ],
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayerJob {
    pub id: String,
    pub status: JobStatus,
}

/// Result of a relayed withdrawal that reached the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedWithdrawal {
    pub job_id: String,
    pub tx_hash: H256,
    pub receipt: Option<TransactionReceipt>,
}

fn violation(response: &HttpResponse, cause: impl std::fmt::Display) -> Error {
    Error::RelayerProtocolViolation(format!("{} in body {}", cause, response.body))
}

fn parse_body(response: &HttpResponse) -> Result<Value> {
    serde_json::from_str(&response.body).map_err(|e| violation(response, e))
}

pub struct RelayerClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    poll: PollPolicy,
}

impl fmt::Debug for RelayerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayerClient")
            .field("base_url", &self.base_url)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

impl RelayerClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            poll: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> Result<RelayerStatus> {
        let response = self
            .transport
            .get(&join_url(&self.base_url, "/status"))
            .await?
            .require_success()?;
        let body = parse_body(&response)?;
        decode_relayer_status(&body).map_err(|e| violation(&response, e))
    }

    pub async fn submit(&self, request: &WithdrawRequest) -> Result<RelayerJob> {
        let url = join_url(&self.base_url, "/v1/tornadoWithdraw");
        let response = self.transport.post_json(&url, &request.to_json()?).await?;
        if !response.is_success() {
            return Err(Error::RelayerSubmissionFailed {
                status: response.status,
                body: response.body,
            });
        }

        let body = parse_body(&response)?;
        let id = decode_job_submission(&body).map_err(|e| violation(&response, e))?;
        info!("relayer {} accepted withdrawal as job {}", self.base_url, id);
        Ok(RelayerJob {
            id,
            status: JobStatus::Sent,
        })
    }

    /// Poll job `id` until it is confirmed and return the mined transaction hash
    pub async fn poll_job(&self, id: &str) -> Result<H256> {
        let url = join_url(&self.base_url, &format!("/v1/jobs/{}", id));
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let response = self.transport.get(&url).await?.require_success()?;
            let body = parse_body(&response)?;
            let report = decode_job_status(&body).map_err(|e| violation(&response, e))?;

            match report.status {
                JobStatus::Confirmed => {
                    let tx_hash = report.tx_hash.ok_or_else(|| {
                        violation(&response, "CONFIRMED job without txHash")
                    })?;
                    info!("relayer job {} confirmed in {}", id, tx_hash);
                    return Ok(tx_hash);
                }
                JobStatus::Failed => {
                    return Err(Error::RelayerJobFailed {
                        job_id: id.to_string(),
                    });
                }
                pending => debug!("relayer job {} is {:?} (poll {})", id, pending, attempts),
            }

            if !self.poll.allows(attempts + 1) {
                return Err(Error::RelayerPollExhausted {
                    job_id: id.to_string(),
                    attempts,
                });
            }
            self.poll.pause().await;
        }
    }

    /// Submit, wait for the relayer to confirm, then wait for the receipt
    pub async fn withdraw(
        &self,
        request: &WithdrawRequest,
        lifecycle: &TransactionLifecycle,
    ) -> Result<RelayedWithdrawal> {
        let job = self.submit(request).await?;
        let tx_hash = self.poll_job(&job.id).await?;
        let receipt = match lifecycle.wait_for_receipt(&tx_hash, None).await? {
            Some(receipt) => Some(lifecycle.confirm(receipt)?),
            None => None,
        };
        Ok(RelayedWithdrawal {
            job_id: job.id,
            tx_hash,
            receipt,
        })
    }
}

/// Try candidates in random order and return the first one that answers
/// `/status` with a service fee no higher than `max_fee_percent`
pub async fn select_relayer<R: Rng + ?Sized>(
    urls: &[String],
    transport: Arc<dyn HttpTransport>,
    max_fee_percent: f64,
    rng: &mut R,
) -> Result<(RelayerClient, RelayerStatus)> {
    let mut candidates = urls.to_vec();
    candidates.shuffle(rng);

    for url in candidates {
        let client = RelayerClient::new(url, transport.clone());
        match client.status().await {
            Ok(status) if status.service_fee_percent <= max_fee_percent => {
                info!(
                    "selected relayer {} ({}% fee)",
                    client.base_url(),
                    status.service_fee_percent
                );
                return Ok((client, status));
            }
            Ok(status) => warn!(
                "relayer {} asks {}%, above the {}% ceiling",
                client.base_url(),
                status.service_fee_percent,
                max_fee_percent
            ),
            Err(e) => warn!("relayer {} rejected: {}", client.base_url(), e),
        }
    }

    Err(Error::NoViableRelayer {
        candidates: urls.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_privacy::NullifierHash;

    #[test]
    fn test_relayer_fee() {
        let fee = relayer_fee(
            &BigUint::from(10_000_000_000u64),
            &BigUint::from(3_000_000_000u64),
            DEFAULT_RELAYER_GAS_LIMIT,
            &BigUint::from(100_000_000_000_000_000u64),
            0.05,
        );
        assert_eq!(fee, BigUint::from(10_900_000_000_000_000u64));
    }

    #[test]
    fn test_service_fee_rounds_up() {
        let zero = BigUint::from(0u8);
        let size = BigUint::from(1_000_000u64);
        // 0.011% becomes 2 basis points
        assert_eq!(
            relayer_fee(&zero, &zero, 0, &size, 0.011),
            BigUint::from(200u32)
        );
    }

    #[test]
    fn test_submission_body() {
        let request = WithdrawRequest {
            contract: Address([0x12; 20]),
            proof: Bytes(vec![0xab, 0xcd]),
            inputs: PublicInputs {
                root: H256([1; 32]),
                nullifier_hash: NullifierHash(H256([2; 32])),
                recipient: Address([3; 20]),
                relayer: Address([4; 20]),
                fee: BigUint::from(255u32),
                refund: BigUint::from(0u8),
            },
        };
        let body = request.to_json().unwrap();
        assert_eq!(body["proof"], "0xabcd");
        let args = body["args"].as_array().unwrap();
        assert_eq!(args.len(), 6);
        assert_eq!(args[2], format!("0x{}", "03".repeat(20)));
        assert_eq!(args[4], format!("0x{}ff", "0".repeat(62)));
        assert_eq!(args[5], format!("0x{}", "0".repeat(64)));
    }
}
