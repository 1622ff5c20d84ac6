//! Shroud Configuration
//!
//! Shared configuration crate for the shroud client and CLI.
//!
//! Handles loading configuration from:
//! 1. SHROUD_CONFIG env var (explicit path)
//! 2. ./shroud.toml (current directory)
//! 3. ~/.shroud/shroud.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<ShroudConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "shroud.toml";
const CONFIG_DIR_NAME: &str = ".shroud";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_CHAIN_ID: u64 = 1;
const DEFAULT_PROVER_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_PROVER_TIMEOUT_SECS: u64 = 300;
const DEFAULT_SIGNER_URL: &str = "http://127.0.0.1:8550";
const DEFAULT_CACHE_DIR: &str = "./.shroud-cache";
const DEFAULT_GETLOGS_BATCH: u64 = 10_000;

const DEFAULT_PRIORITY_FEE_WEI: u64 = 3_000_000_000;
const DEFAULT_RECEIPT_POLL_MS: u64 = 250;

const DEFAULT_RELAYER_POLL_SECS: u64 = 3;
const DEFAULT_RELAYER_GAS_LIMIT: u64 = 700_000;
const DEFAULT_MAX_SERVICE_FEE_PERCENT: f64 = 0.5;

/// Mainnet ETH pools: (label, contract, deploy block)
const DEFAULT_INSTANCES: [(&str, &str, u64); 4] = [
    ("0.1", "0x12D66f87A04A9E220743712cE6d9bB1B5616B8Fc", 9_116_966),
    ("1", "0x47CE0C6eD5B0Ce3d3A51fdb1C52DC66a7c3c2936", 9_117_609),
    ("10", "0x910Cbd523D972eb0a6f4cAe4618aD62622b39DbF", 9_117_720),
    ("100", "0xA160cdAB225685dA1d56aa342Ad8841c3b53f291", 9_161_895),
];

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShroudConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub prover: ProverConfig,
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub transaction: TransactionConfig,
    #[serde(default)]
    pub relayer: RelayerConfig,
    #[serde(default = "default_instances")]
    pub instances: Vec<InstanceConfig>,
}

impl Default for ShroudConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            prover: ProverConfig::default(),
            signer: SignerConfig::default(),
            sync: SyncConfig::default(),
            transaction: TransactionConfig::default(),
            relayer: RelayerConfig::default(),
            instances: default_instances(),
        }
    }
}

/// JSON-RPC node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.into()
}
fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

/// Proving / hashing service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default = "default_prover_url")]
    pub url: String,
    #[serde(default = "default_prover_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROVER_URL.into(),
            timeout_secs: DEFAULT_PROVER_TIMEOUT_SECS,
        }
    }
}

fn default_prover_url() -> String {
    DEFAULT_PROVER_URL.into()
}
fn default_prover_timeout() -> u64 {
    DEFAULT_PROVER_TIMEOUT_SECS
}

/// Remote transaction signer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    #[serde(default = "default_signer_url")]
    pub url: String,
    /// Account the signer holds keys for
    #[serde(default)]
    pub account: Option<String>,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SIGNER_URL.into(),
            account: None,
        }
    }
}

fn default_signer_url() -> String {
    DEFAULT_SIGNER_URL.into()
}

/// Deposit event synchronization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "default_getlogs_batch")]
    pub batch_size: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_dir: DEFAULT_CACHE_DIR.into(),
            batch_size: DEFAULT_GETLOGS_BATCH,
        }
    }
}

fn default_cache_dir() -> String {
    DEFAULT_CACHE_DIR.into()
}
fn default_getlogs_batch() -> u64 {
    DEFAULT_GETLOGS_BATCH
}

/// Fee and receipt settings for self-submitted transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConfig {
    #[serde(default = "default_priority_fee")]
    pub priority_fee_wei: u64,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    #[serde(default)]
    pub receipt_timeout_secs: Option<u64>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            priority_fee_wei: DEFAULT_PRIORITY_FEE_WEI,
            receipt_poll_ms: DEFAULT_RECEIPT_POLL_MS,
            receipt_timeout_secs: None,
        }
    }
}

fn default_priority_fee() -> u64 {
    DEFAULT_PRIORITY_FEE_WEI
}
fn default_receipt_poll_ms() -> u64 {
    DEFAULT_RECEIPT_POLL_MS
}

/// Withdrawal relayers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerConfig {
    /// Candidate relayer base URLs
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default = "default_relayer_poll_secs")]
    pub poll_interval_secs: u64,
    /// Give up polling a job after this many status requests (unbounded if unset)
    #[serde(default)]
    pub max_polls: Option<u32>,
    /// Gas the relayer is expected to spend on the withdrawal
    #[serde(default = "default_relayer_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_max_service_fee")]
    pub max_service_fee_percent: f64,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            poll_interval_secs: DEFAULT_RELAYER_POLL_SECS,
            max_polls: None,
            gas_limit: DEFAULT_RELAYER_GAS_LIMIT,
            max_service_fee_percent: DEFAULT_MAX_SERVICE_FEE_PERCENT,
        }
    }
}

fn default_relayer_poll_secs() -> u64 {
    DEFAULT_RELAYER_POLL_SECS
}
fn default_relayer_gas_limit() -> u64 {
    DEFAULT_RELAYER_GAS_LIMIT
}
fn default_max_service_fee() -> f64 {
    DEFAULT_MAX_SERVICE_FEE_PERCENT
}

/// One fixed-denomination pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Denomination label as it appears in notes ("0.1", "1", ...)
    pub label: String,
    pub contract: String,
    /// First block worth scanning for deposits
    #[serde(default)]
    pub deploy_block: u64,
}

fn default_instances() -> Vec<InstanceConfig> {
    DEFAULT_INSTANCES
        .iter()
        .map(|(label, contract, deploy_block)| InstanceConfig {
            label: (*label).into(),
            contract: (*contract).into(),
            deploy_block: *deploy_block,
        })
        .collect()
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Set Option<T> from env var if present and parseable
fn env_parse_option<T: std::str::FromStr>(key: &str, field: &mut Option<T>) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = Some(parsed),
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Split a comma-separated list, dropping empty entries
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ============================================================================
// Implementation
// ============================================================================

impl ShroudConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check SHROUD_CONFIG env var
        if let Ok(path) = env::var("SHROUD_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("SHROUD_CONFIG points to missing file: {}", path.display());
        }

        // 2. Check ./shroud.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.shroud/shroud.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Network
        env_string("SHROUD_RPC_URL", &mut self.network.rpc_url);
        env_parse("SHROUD_CHAIN_ID", &mut self.network.chain_id);

        // Prover
        env_string("SHROUD_PROVER_URL", &mut self.prover.url);
        env_parse("SHROUD_PROVER_TIMEOUT_SECS", &mut self.prover.timeout_secs);

        // Signer
        env_string("SHROUD_SIGNER_URL", &mut self.signer.url);
        env_option_string("SHROUD_ACCOUNT", &mut self.signer.account);

        // Sync
        env_string("SHROUD_CACHE_DIR", &mut self.sync.cache_dir);
        env_parse("SHROUD_GETLOGS_BATCH", &mut self.sync.batch_size);

        // Transaction
        env_parse("SHROUD_PRIORITY_FEE_WEI", &mut self.transaction.priority_fee_wei);
        env_parse_option(
            "SHROUD_RECEIPT_TIMEOUT_SECS",
            &mut self.transaction.receipt_timeout_secs,
        );

        // Relayer
        if let Ok(v) = env::var("SHROUD_RELAYER_URLS") {
            self.relayer.urls = split_list(&v);
        }
        env_parse_option("SHROUD_RELAYER_MAX_POLLS", &mut self.relayer.max_polls);
        env_parse(
            "SHROUD_RELAYER_MAX_FEE_PERCENT",
            &mut self.relayer.max_service_fee_percent,
        );
    }

    /// Look up a pool by its denomination label
    pub fn instance(&self, label: &str) -> Option<&InstanceConfig> {
        self.instances.iter().find(|i| i.label == label)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.signer.account = Some("0x0000000000000000000000000000000000000000".into());
        sample.relayer.urls = vec!["https://relayer.example.org".into()];
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static ShroudConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Try to get the global config instance.
    ///
    /// Returns `None` if config hasn't been initialized yet.
    pub fn try_global() -> Option<&'static ShroudConfig> {
        GLOBAL_CONFIG.get()
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: ShroudConfig) -> Result<(), ShroudConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `ShroudConfig::global()`.
#[inline]
pub fn global_config() -> &'static ShroudConfig {
    ShroudConfig::global()
}

// ============================================================================
// Tests
// ============================================================================
