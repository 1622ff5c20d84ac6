//! Fixed-denomination pools

use num_bigint::BigUint;
use shroud_config::{InstanceConfig, ShroudConfig};
use shroud_wire::{Address, ETHER, parse_address, parse_units};

use crate::error::{Error, Result};

/// One pool contract accepting deposits of exactly `size` wei
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denomination {
    pub label: String,
    pub contract: Address,
    pub deploy_block: u64,
    pub size: BigUint,
}

impl Denomination {
    pub fn from_config(instance: &InstanceConfig) -> Result<Self> {
        Ok(Self {
            label: instance.label.clone(),
            contract: parse_address(&instance.contract)?,
            deploy_block: instance.deploy_block,
            size: parse_units(&instance.label, ETHER)?,
        })
    }
}

/// All configured pools, looked up by label
#[derive(Debug, Clone, Default)]
pub struct Denominations {
    pools: Vec<Denomination>,
}

impl Denominations {
    pub fn new(pools: Vec<Denomination>) -> Self {
        Self { pools }
    }

    pub fn from_config(config: &ShroudConfig) -> Result<Self> {
        let pools = config
            .instances
            .iter()
            .map(Denomination::from_config)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pools })
    }

    pub fn get(&self, label: &str) -> Result<&Denomination> {
        self.pools
            .iter()
            .find(|d| d.label == label)
            .ok_or_else(|| Error::UnknownDenomination(label.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Denomination> {
        self.pools.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pools() {
        let pools = Denominations::from_config(&ShroudConfig::default()).unwrap();
        let tenth = pools.get("0.1").unwrap();
        assert_eq!(tenth.size, BigUint::from(100_000_000_000_000_000u64));
        assert_eq!(tenth.contract.to_string(), "0x12d66f87a04a9e220743712ce6d9bb1b5616b8fc");
        assert_eq!(pools.iter().count(), 4);
        assert!(matches!(
            pools.get("0.5"),
            Err(Error::UnknownDenomination(label)) if label == "0.5"
        ));
    }

    #[test]
    fn test_rejects_bad_instance() {
        let instance = InstanceConfig {
            label: "1".into(),
            contract: "0x1234".into(),
            deploy_block: 0,
        };
        assert!(matches!(
            Denomination::from_config(&instance),
            Err(Error::Wire(_))
        ));
    }
}
