//! Runtime settings and collaborator wiring

use num_bigint::BigUint;
use std::sync::Arc;
use std::time::Duration;

use shroud_config::ShroudConfig;

use crate::denomination::Denominations;
use crate::error::Result;
use crate::events::{EventStore, FileEventStore};
use crate::poll::PollPolicy;
use crate::proof::{NoteHasher, Prover};
use crate::prover_client::ProverServiceClient;
use crate::rpc::RpcClient;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::tx::{RemoteSigner, Signer, TransactionLifecycle};

/// Timeout for node, signer and relayer requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed view of the configuration used by the workflows
#[derive(Debug, Clone)]
pub struct Settings {
    pub chain_id: u64,
    pub batch_size: u64,
    pub priority_fee: BigUint,
    pub receipt_interval: Duration,
    pub receipt_timeout: Option<Duration>,
    pub relayer_urls: Vec<String>,
    pub relayer_poll: PollPolicy,
    pub relayer_gas_limit: u64,
    pub max_service_fee_percent: f64,
    pub denominations: Denominations,
}

impl Settings {
    pub fn from_config(config: &ShroudConfig) -> Result<Self> {
        Ok(Self {
            chain_id: config.network.chain_id,
            batch_size: config.sync.batch_size,
            priority_fee: BigUint::from(config.transaction.priority_fee_wei),
            receipt_interval: Duration::from_millis(config.transaction.receipt_poll_ms),
            receipt_timeout: config.transaction.receipt_timeout_secs.map(Duration::from_secs),
            relayer_urls: config.relayer.urls.clone(),
            relayer_poll: PollPolicy::new(
                Duration::from_secs(config.relayer.poll_interval_secs),
                config.relayer.max_polls,
            ),
            relayer_gas_limit: config.relayer.gas_limit,
            max_service_fee_percent: config.relayer.max_service_fee_percent,
            denominations: Denominations::from_config(config)?,
        })
    }
}

/// External collaborators shared by every workflow
#[derive(Clone)]
pub struct Services {
    pub rpc: Arc<RpcClient>,
    /// Transport for relayer requests
    pub transport: Arc<dyn HttpTransport>,
    pub store: Arc<dyn EventStore>,
    pub hasher: Arc<dyn NoteHasher>,
    pub prover: Arc<dyn Prover>,
    pub signer: Arc<dyn Signer>,
}

impl Services {
    /// Production wiring: reqwest transports, file cache and HTTP services
    pub fn connect(config: &ShroudConfig) -> Result<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(HTTP_TIMEOUT)?);
        let prover_transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
            Duration::from_secs(config.prover.timeout_secs),
        )?);

        let prover = Arc::new(ProverServiceClient::new(
            config.prover.url.clone(),
            prover_transport,
        ));
        let signer = RemoteSigner::new(RpcClient::new(
            config.signer.url.clone(),
            transport.clone(),
        ));

        Ok(Self {
            rpc: Arc::new(RpcClient::new(
                config.network.rpc_url.clone(),
                transport.clone(),
            )),
            transport,
            store: Arc::new(FileEventStore::new(&config.sync.cache_dir)),
            hasher: prover.clone(),
            prover,
            signer: Arc::new(signer),
        })
    }

    pub fn lifecycle(&self, settings: &Settings) -> TransactionLifecycle {
        TransactionLifecycle::new(self.rpc.clone(), self.signer.clone(), settings.chain_id)
            .with_priority_fee(settings.priority_fee.clone())
            .with_receipt_interval(settings.receipt_interval)
    }
}
