#![allow(dead_code)]

use async_trait::async_trait;
use num_bigint::BigUint;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shroud_core::{
    CircuitInput, Denomination, Denominations, DepositEvent, EventCache, EventStore, HttpResponse,
    HttpTransport, MemoryEventStore, NoteHasher, PollPolicy, Prover, ProverOutput, Result,
    RpcClient, Services, Settings, SignedTransaction, Signer, UnsignedTransaction,
    Withdrawer,
};
use shroud_config::ShroudConfig;
use shroud_privacy::{Commitment, DerivedNote, Note, NullifierHash};
use shroud_wire::{Address, Bytes, H256};

pub const RPC_URL: &str = "http://node.test";
pub const RELAYER_URL: &str = "http://relayer.test";

pub const IS_KNOWN_ROOT: &str = "0x6d9833e3";
pub const IS_SPENT: &str = "0xe5285dcc";
pub const DEPOSIT_TOPIC: &str =
    "0xa945e51eec50ab98c161376f0db4cf2aeba3ec92755fe2fcd388bdbbb80ff196";

pub fn word(value: u64) -> String {
    format!("0x{:064x}", value)
}

pub fn address_hex(address: &Address) -> String {
    address.to_string()
}

// ============================================================================
// Scripted transport
// ============================================================================

/// One request seen by the mock
#[derive(Debug, Clone)]
pub struct Recorded {
    pub verb: &'static str,
    pub url: String,
    pub body: Option<Value>,
}

impl Recorded {
    pub fn rpc_method(&self) -> Option<&str> {
        self.body.as_ref()?.get("method")?.as_str()
    }
}

/// Replies are queued per key. The last reply of a queue is sticky so
/// repeated calls such as `eth_getBlockByNumber` need one entry.
///
/// Keys: the RPC method, `eth_call:<selector>` for contract reads, and
/// `GET <url>` / `POST <url>` for plain HTTP.
#[derive(Default)]
pub struct MockTransport {
    rpc: Mutex<HashMap<String, VecDeque<Value>>>,
    http: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a JSON-RPC `result` for `key`
    pub fn rpc(&self, key: &str, result: Value) {
        self.rpc
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(json!({ "result": result }));
    }

    /// Queue a JSON-RPC error object for `key`
    pub fn rpc_error(&self, key: &str, code: i64, message: &str) {
        self.rpc
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(json!({ "error": { "code": code, "message": message } }));
    }

    pub fn http(&self, verb: &str, url: &str, status: u16, body: Value) {
        self.http
            .lock()
            .unwrap()
            .entry(format!("{} {}", verb, url))
            .or_default()
            .push_back(HttpResponse::new(status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Params of every JSON-RPC call to `method`, in order
    pub fn rpc_params(&self, method: &str) -> Vec<Value> {
        self.requests()
            .iter()
            .filter(|r| r.rpc_method() == Some(method))
            .filter_map(|r| r.body.as_ref().map(|b| b["params"].clone()))
            .collect()
    }

    pub fn rpc_count(&self, method: &str) -> usize {
        self.rpc_params(method).len()
    }

    /// Number of `eth_call`s whose calldata starts with `selector`
    pub fn call_count(&self, selector: &str) -> usize {
        self.rpc_params("eth_call")
            .iter()
            .filter(|p| p[0]["data"].as_str().is_some_and(|d| d.starts_with(selector)))
            .count()
    }

    pub fn http_count(&self, verb: &str, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.verb == verb && r.url == url && r.rpc_method().is_none())
            .count()
    }

    fn next<T: Clone>(queues: &Mutex<HashMap<String, VecDeque<T>>>, key: &str) -> Option<T> {
        let mut queues = queues.lock().unwrap();
        let queue = queues.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn reply_rpc(&self, body: &Value) -> HttpResponse {
        let method = body["method"].as_str().unwrap_or_default();
        let key = if method == "eth_call" {
            let data = body["params"][0]["data"].as_str().unwrap_or_default();
            format!("eth_call:{}", &data[..data.len().min(10)])
        } else {
            method.to_string()
        };

        match Self::next(&self.rpc, &key) {
            Some(mut reply) => {
                reply["jsonrpc"] = json!("2.0");
                reply["id"] = body["id"].clone();
                HttpResponse::new(200, reply.to_string())
            }
            None => HttpResponse::new(500, format!("unscripted rpc {}", key)),
        }
    }

    fn reply_http(&self, verb: &str, url: &str) -> HttpResponse {
        let key = format!("{} {}", verb, url);
        Self::next(&self.http, &key)
            .unwrap_or_else(|| HttpResponse::new(404, format!("unscripted {}", key)))
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(Recorded {
            verb: "GET",
            url: url.to_string(),
            body: None,
        });
        Ok(self.reply_http("GET", url))
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(Recorded {
            verb: "POST",
            url: url.to_string(),
            body: Some(body.clone()),
        });
        if url == RPC_URL {
            Ok(self.reply_rpc(body))
        } else {
            Ok(self.reply_http("POST", url))
        }
    }
}

// ============================================================================
// Chain objects
// ============================================================================

pub fn block_json(number: u64, base_fee: u64) -> Value {
    let hash = word(number);
    json!({
        "parentHash": hash,
        "sha3Uncles": hash,
        "miner": format!("0x{}", "00".repeat(20)),
        "stateRoot": hash,
        "transactionsRoot": hash,
        "receiptsRoot": hash,
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "difficulty": "0x0",
        "number": format!("0x{:x}", number),
        "gasLimit": "0x1c9c380",
        "gasUsed": "0x0",
        "timestamp": "0x6553f100",
        "extraData": "0x",
        "mixHash": hash,
        "nonce": "0x0000000000000000",
        "baseFeePerGas": format!("0x{:x}", base_fee),
        "transactions": [],
        "uncles": [],
    })
}

pub fn deposit_log_json(contract: &Address, commitment: u64, leaf_index: u32, block: u64) -> Value {
    json!({
        "blockHash": word(block),
        "blockNumber": format!("0x{:x}", block),
        "transactionHash": word(1_000_000 + leaf_index as u64),
        "transactionIndex": "0x0",
        "address": address_hex(contract),
        "topics": [DEPOSIT_TOPIC, word(commitment)],
        "data": format!("0x{:064x}{:064x}", leaf_index, 1_700_000_000u64),
        "logIndex": "0x0",
        "removed": false,
    })
}

pub fn receipt_json(tx_hash: &H256, success: bool) -> Value {
    json!({
        "type": "0x2",
        "blockHash": word(77),
        "blockNumber": "0x4d",
        "transactionHash": tx_hash.to_string(),
        "transactionIndex": "0x0",
        "contractAddress": null,
        "cumulativeGasUsed": "0x5208",
        "gasUsed": "0x5208",
        "from": format!("0x{}", "11".repeat(20)),
        "to": format!("0x{}", "12".repeat(20)),
        "status": if success { "0x1" } else { "0x0" },
        "logs": [],
    })
}

pub fn event(commitment: u64, leaf_index: u32, block: u64) -> DepositEvent {
    DepositEvent {
        block_number: block,
        transaction_hash: H256::from_u64(1_000_000 + leaf_index as u64),
        commitment: Commitment(H256::from_u64(commitment)),
        leaf_index,
        timestamp: 1_700_000_000,
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Returns a fixed proof and counts calls
#[derive(Default)]
pub struct MockProver {
    pub calls: AtomicUsize,
}

impl MockProver {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prover for MockProver {
    async fn prove(&self, _input: &CircuitInput) -> Result<ProverOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProverOutput {
            proof: Bytes(vec![0xee; 256]),
            public_signals: None,
        })
    }
}

/// Derives every note to the same commitment
pub struct FixedHasher(pub DerivedNote);

#[async_trait]
impl NoteHasher for FixedHasher {
    async fn derive(&self, _note: &Note) -> Result<DerivedNote> {
        Ok(self.0)
    }
}

/// Signs by echoing the nonce; remembers what it signed
#[derive(Default)]
pub struct MockSigner {
    pub signed: Mutex<Vec<UnsignedTransaction>>,
}

#[async_trait]
impl Signer for MockSigner {
    async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction> {
        self.signed.lock().unwrap().push(tx.clone());
        Ok(SignedTransaction::from_raw(Bytes(vec![0x02, tx.nonce as u8])))
    }
}

// ============================================================================
// Fixture
// ============================================================================

pub struct TestFixture {
    pub transport: Arc<MockTransport>,
    pub store: Arc<MemoryEventStore>,
    pub prover: Arc<MockProver>,
    pub signer: Arc<MockSigner>,
    pub rpc: Arc<RpcClient>,
    pub settings: Settings,
    pub derived: DerivedNote,
}

impl TestFixture {
    pub fn new() -> Self {
        let transport = MockTransport::new();
        let rpc = Arc::new(RpcClient::new(RPC_URL, transport.clone()));

        let mut settings = Settings::from_config(&ShroudConfig::default()).unwrap();
        settings.receipt_interval = Duration::from_millis(1);
        settings.relayer_poll = PollPolicy::new(Duration::from_millis(1), Some(20));
        settings.relayer_urls = vec![RELAYER_URL.to_string()];
        settings.denominations = Denominations::new(vec![Denomination {
            label: "0.1".into(),
            contract: Address([0x12; 20]),
            deploy_block: 0,
            size: BigUint::from(100_000_000_000_000_000u64),
        }]);

        Self {
            transport,
            store: Arc::new(MemoryEventStore::new()),
            prover: Arc::new(MockProver::default()),
            signer: Arc::new(MockSigner::default()),
            rpc,
            settings,
            derived: DerivedNote {
                commitment: Commitment(H256::from_u64(2)),
                nullifier_hash: NullifierHash(H256::from_u64(0xdead)),
            },
        }
    }

    pub fn services(&self) -> Services {
        Services {
            rpc: self.rpc.clone(),
            transport: self.transport.clone(),
            store: self.store.clone(),
            hasher: Arc::new(FixedHasher(self.derived)),
            prover: self.prover.clone(),
            signer: self.signer.clone(),
        }
    }

    /// The single "0.1" pool, deployed at block 0
    pub fn denomination(&self) -> Denomination {
        self.settings.denominations.get("0.1").unwrap().clone()
    }

    pub fn note(&self) -> Note {
        Note::new("0.1", 1, [1; 31], [2; 31])
    }

    /// Chain head at `head` and deposits with commitments 1, 2, 3 cached
    /// up to it, so a sync issues one `latest` getLogs returning nothing
    pub fn seed_synced_pool(&self, head: u64) {
        let events = vec![event(1, 0, 10), event(2, 1, 11), event(3, 2, 12)];
        self.store.insert(
            "0.1",
            EventCache {
                last_block: Some(head - 1),
                events,
            },
        );
        self.transport.rpc("eth_getBlockByNumber", block_json(head, 10_000_000_000));
        self.transport.rpc("eth_getLogs", json!([]));
    }

    /// Answers for `isKnownRoot` and `isSpent`
    pub fn script_contract(&self, known_root: bool, spent: bool) {
        self.transport.rpc(
            &format!("eth_call:{}", IS_KNOWN_ROOT),
            json!(word(known_root as u64)),
        );
        self.transport
            .rpc(&format!("eth_call:{}", IS_SPENT), json!(word(spent as u64)));
    }

    pub fn withdrawer(&self) -> Withdrawer {
        Withdrawer::new(self.settings.clone(), self.services())
    }

    pub fn cached(&self) -> EventCache {
        self.store.load("0.1").unwrap()
    }
}
