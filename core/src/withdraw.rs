//! Withdrawal workflow
//!
//! ```text
//!  Note ──NoteHasher──▶ commitment, nullifierHash
//!    │
//!    ├─ EventSynchronizer::sync ──▶ contiguous deposits
//!    ├─ (relayer) /status + fee ──▶ relayer, fee
//!    ├─ resolve_path ─────────────▶ root, path      (isKnownRoot, isSpent)
//!    ├─ ProofOrchestrator ────────▶ proof
//!    │
//!    └─ Direct  ─▶ TransactionLifecycle::execute
//!       Relayer ─▶ RelayerClient::withdraw
//!       DryRun  ─▶ TransactionLifecycle::simulate
//! ```
//!
//! Every attempt starts from a fresh sync and a rebuilt tree.

use log::{info, warn};
use num_bigint::BigUint;
use rand::SeedableRng;
use rand::rngs::StdRng;

use shroud_privacy::{Note, PrivacyError};
use shroud_wire::{Address, Bytes, H256, TransactionReceipt, WireError};

use crate::denomination::Denomination;
use crate::error::{Error, Result};
use crate::events::EventSynchronizer;
use crate::proof::{ProofOrchestrator, PublicInputs, WithdrawParams};
use crate::relayer::{RelayerClient, WithdrawRequest, relayer_fee, select_relayer};
use crate::settings::{Services, Settings};
use crate::tree::resolve_path;
use crate::tx::{FeeOverrides, TransactionLifecycle, TxRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawMode {
    /// Sign and submit from `from`, which also receives the funds
    Direct { from: Address, fees: FeeOverrides },
    /// Hand the proof to a relayer; `None` picks one from the configured list
    Relayer {
        relayer_url: Option<String>,
        recipient: Address,
    },
    /// Prove and `eth_call` the withdrawal from `from` without submitting it
    DryRun { from: Address },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawOutcome {
    Submitted {
        tx_hash: H256,
        receipt: Option<TransactionReceipt>,
    },
    Relayed {
        job_id: String,
        tx_hash: H256,
        receipt: Option<TransactionReceipt>,
    },
    Simulated { output: Bytes },
}

/// What to do with the remaining notes after one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Skip,
    Abort,
}

/// Result for one note of a batch, by position in the input
#[derive(Debug)]
pub struct NoteOutcome {
    pub index: usize,
    pub label: String,
    pub result: Result<WithdrawOutcome>,
}

enum Route<'a> {
    Direct {
        from: Address,
        fees: &'a FeeOverrides,
    },
    Relayer(RelayerClient),
    DryRun {
        from: Address,
    },
}

pub struct Withdrawer {
    settings: Settings,
    services: Services,
    synchronizer: EventSynchronizer,
    proofs: ProofOrchestrator,
    lifecycle: TransactionLifecycle,
}

impl Withdrawer {
    pub fn new(settings: Settings, services: Services) -> Self {
        let synchronizer = EventSynchronizer::new(services.rpc.clone(), services.store.clone())
            .with_batch_size(settings.batch_size);
        let proofs = ProofOrchestrator::new(services.prover.clone());
        let lifecycle = services.lifecycle(&settings);
        Self {
            settings,
            services,
            synchronizer,
            proofs,
            lifecycle,
        }
    }

    pub fn synchronizer(&self) -> &EventSynchronizer {
        &self.synchronizer
    }

    pub async fn withdraw_note(&self, note: &Note, mode: &WithdrawMode) -> Result<WithdrawOutcome> {
        if note.net_id != self.settings.chain_id {
            return Err(Error::Privacy(PrivacyError::InvalidNote(format!(
                "note is for network {} but the client is on {}",
                note.net_id, self.settings.chain_id
            ))));
        }
        let denomination = self.settings.denominations.get(&note.label)?;
        let derived = self.services.hasher.derive(note).await?;
        let events = self.synchronizer.sync(denomination).await?;

        let (params, route) = match mode {
            WithdrawMode::Direct { from, fees } => {
                (WithdrawParams::direct(*from), Route::Direct { from: *from, fees })
            }
            WithdrawMode::DryRun { from } => {
                (WithdrawParams::direct(*from), Route::DryRun { from: *from })
            }
            WithdrawMode::Relayer {
                relayer_url,
                recipient,
            } => {
                let (client, params) = self
                    .relayer_params(denomination, relayer_url.as_deref(), *recipient)
                    .await?;
                (params, Route::Relayer(client))
            }
        };

        let resolved = resolve_path(
            &events,
            &derived,
            &denomination.contract,
            &self.services.rpc,
        )
        .await?;
        let proof = self
            .proofs
            .generate(note, &derived, &resolved, &params)
            .await?;

        match route {
            Route::Direct { from, fees } => {
                let request = withdraw_tx(from, denomination, &proof.inputs, &proof.proof)?;
                let outcome = self
                    .lifecycle
                    .execute(&request, fees, self.settings.receipt_timeout)
                    .await?;
                Ok(WithdrawOutcome::Submitted {
                    tx_hash: outcome.tx_hash,
                    receipt: outcome.receipt,
                })
            }
            Route::Relayer(client) => {
                let request = WithdrawRequest {
                    contract: denomination.contract,
                    proof: proof.proof,
                    inputs: proof.inputs,
                };
                let relayed = client.withdraw(&request, &self.lifecycle).await?;
                Ok(WithdrawOutcome::Relayed {
                    job_id: relayed.job_id,
                    tx_hash: relayed.tx_hash,
                    receipt: relayed.receipt,
                })
            }
            Route::DryRun { from } => {
                let request = withdraw_tx(from, denomination, &proof.inputs, &proof.proof)?;
                let output = self.lifecycle.simulate(&request).await?;
                info!(
                    "dry run of {} ETH withdrawal returned {}",
                    denomination.label, output
                );
                Ok(WithdrawOutcome::Simulated { output })
            }
        }
    }

    /// Withdraw `notes` in order, one attempt each
    pub async fn withdraw_all(
        &self,
        notes: &[Note],
        mode: &WithdrawMode,
        policy: FailurePolicy,
    ) -> Vec<NoteOutcome> {
        let mut outcomes = Vec::with_capacity(notes.len());
        for (index, note) in notes.iter().enumerate() {
            let result = self.withdraw_note(note, mode).await;
            let failed = match &result {
                Ok(_) => false,
                Err(e) => {
                    warn!("note {} ({} ETH) failed: {}", index, note.label, e);
                    true
                }
            };
            outcomes.push(NoteOutcome {
                index,
                label: note.label.clone(),
                result,
            });
            if failed && policy == FailurePolicy::Abort {
                break;
            }
        }
        outcomes
    }

    async fn relayer_params(
        &self,
        denomination: &Denomination,
        relayer_url: Option<&str>,
        recipient: Address,
    ) -> Result<(RelayerClient, WithdrawParams)> {
        let (client, status) = match relayer_url {
            Some(url) => {
                let client = RelayerClient::new(url, self.services.transport.clone());
                let status = client.status().await?;
                (client, status)
            }
            None => {
                let mut rng = StdRng::from_entropy();
                select_relayer(
                    &self.settings.relayer_urls,
                    self.services.transport.clone(),
                    self.settings.max_service_fee_percent,
                    &mut rng,
                )
                .await?
            }
        };

        let base_fee = self.services.rpc.latest_block().await?.base_fee_per_gas;
        let fee = relayer_fee(
            &base_fee,
            &self.settings.priority_fee,
            self.settings.relayer_gas_limit,
            &denomination.size,
            status.service_fee_percent,
        );
        if fee >= denomination.size {
            return Err(Error::FeeExceedsDenomination {
                fee,
                denomination: denomination.size.clone(),
            });
        }
        info!(
            "relayer {} fee for {} ETH: {} wei",
            client.base_url(),
            denomination.label,
            fee
        );

        let params = WithdrawParams {
            recipient,
            relayer: status.reward_account,
            fee,
            refund: BigUint::from(0u8),
        };
        Ok((client.with_poll_policy(self.settings.relayer_poll), params))
    }
}

fn withdraw_tx(
    from: Address,
    denomination: &Denomination,
    inputs: &PublicInputs,
    proof: &Bytes,
) -> Result<TxRequest> {
    let data = inputs.withdraw_calldata(proof).ok_or_else(|| {
        Error::Wire(WireError::MalformedWireValue {
            value: inputs.fee.to_string(),
        })
    })?;
    Ok(TxRequest {
        from,
        to: denomination.contract,
        value: BigUint::from(0u8),
        data,
    })
}
