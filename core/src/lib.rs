//! Shroud Core
//!
//! Withdrawal client for fixed-denomination shielded pools.
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │                  Withdrawer                  │
//!                  └──┬──────────┬───────────┬───────────┬───────┘
//!                     │          │           │           │
//!          EventSynchronizer   tree     ProofOrchestrator  TransactionLifecycle
//!             │      │          │           │              │         │
//!        EventStore  │     MerkleTree     Prover         Signer  RelayerClient
//!                    │          │                          │         │
//!                    └──── RpcClient ─────────────────────┘         │
//!                               │                                    │
//!                               └─────────── HttpTransport ──────────┘
//! ```
//!
//! Every network call is awaited before the next one starts.

pub mod abi;
pub mod denomination;
pub mod deposit;
pub mod error;
pub mod events;
pub mod poll;
pub mod proof;
pub mod prover_client;
pub mod relayer;
pub mod rpc;
pub mod settings;
pub mod transport;
pub mod tree;
pub mod tx;
pub mod withdraw;

pub use denomination::{Denomination, Denominations};
pub use deposit::{Depositor, PendingDeposit};
pub use error::{Error, Result};
pub use events::{
    DepositEvent, EventCache, EventStore, EventSynchronizer, FileEventStore, MemoryEventStore,
};
pub use poll::PollPolicy;
pub use proof::{
    CircuitInput, NoteHasher, ProofOrchestrator, ProofResult, Prover, ProverOutput, PublicInputs,
    WithdrawParams,
};
pub use prover_client::ProverServiceClient;
pub use relayer::{RelayedWithdrawal, RelayerClient, RelayerJob, WithdrawRequest, relayer_fee};
pub use rpc::{CallRequest, LogFilter, RpcClient};
pub use settings::{Services, Settings};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use tree::{ResolvedPath, build_tree, resolve_path};
pub use tx::{
    FeeOverrides, RemoteSigner, SignedTransaction, Signer, TransactionLifecycle, TxOutcome,
    TxRequest, UnsignedTransaction,
};
pub use withdraw::{FailurePolicy, NoteOutcome, WithdrawMode, WithdrawOutcome, Withdrawer};
