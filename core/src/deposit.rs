//! Deposit workflow
//!
//! The note is created and returned before anything is sent, so the caller
//! can store it first. A deposit whose note was lost cannot be withdrawn.

use log::info;
use rand::{CryptoRng, RngCore};

use shroud_privacy::{DerivedNote, Note};
use shroud_wire::Address;

use crate::abi::encode_deposit;
use crate::denomination::Denomination;
use crate::error::Result;
use crate::settings::{Services, Settings};
use crate::tx::{FeeOverrides, TransactionLifecycle, TxOutcome, TxRequest};

/// A freshly generated note that has not been deposited yet
#[derive(Debug, Clone)]
pub struct PendingDeposit {
    pub note: Note,
    pub derived: DerivedNote,
    pub denomination: Denomination,
}

pub struct Depositor {
    settings: Settings,
    services: Services,
    lifecycle: TransactionLifecycle,
}

impl Depositor {
    pub fn new(settings: Settings, services: Services) -> Self {
        let lifecycle = services.lifecycle(&settings);
        Self {
            settings,
            services,
            lifecycle,
        }
    }

    pub async fn prepare<R: RngCore + CryptoRng>(
        &self,
        label: &str,
        rng: &mut R,
    ) -> Result<PendingDeposit> {
        let denomination = self.settings.denominations.get(label)?.clone();
        let note = Note::random(label, self.settings.chain_id, rng);
        let derived = self.services.hasher.derive(&note).await?;
        Ok(PendingDeposit {
            note,
            derived,
            denomination,
        })
    }

    /// Send `deposit(commitment)` with exactly the denomination as value
    pub async fn submit(
        &self,
        pending: &PendingDeposit,
        from: Address,
        fees: &FeeOverrides,
    ) -> Result<TxOutcome> {
        let request = TxRequest {
            from,
            to: pending.denomination.contract,
            value: pending.denomination.size.clone(),
            data: encode_deposit(pending.derived.commitment.as_h256()),
        };
        let outcome = self
            .lifecycle
            .execute(&request, fees, self.settings.receipt_timeout)
            .await?;
        info!(
            "deposited {} ETH with commitment {} in {}",
            pending.denomination.label, pending.derived.commitment, outcome.tx_hash
        );
        Ok(outcome)
    }
}
