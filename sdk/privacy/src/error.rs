use shroud_wire::H256;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    #[error("value {value} is not a BN254 field element")]
    NotInField { value: H256 },

    #[error("tree holds at most {capacity} leaves, got {leaves}")]
    TreeFull { leaves: usize, capacity: usize },

    #[error("leaf index {index} out of range ({leaves} leaves)")]
    LeafIndexOutOfRange { index: u32, leaves: usize },

    #[error("invalid note: {0}")]
    InvalidNote(String),
}

pub type Result<T> = std::result::Result<T, PrivacyError>;
