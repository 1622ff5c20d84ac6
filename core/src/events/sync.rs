use log::{debug, info, warn};
use std::sync::Arc;

use shroud_wire::BlockTag;

use super::store::rescan_watermark;
use super::{DepositEvent, EventStore};
use crate::abi::DEPOSIT_EVENT_TOPIC;
use crate::denomination::Denomination;
use crate::error::{Error, Result};
use crate::rpc::{LogFilter, RpcClient};

/// Default `eth_getLogs` window width in blocks
pub const DEFAULT_BATCH_SIZE: u64 = 10_000;

/// Position and expected leaf index of the first event that breaks the
/// `0, 1, 2, …` sequence
pub fn first_discontinuity(events: &[DepositEvent]) -> Option<(usize, u32)> {
    let mut expected = 0u32;
    for (position, event) in events.iter().enumerate() {
        if event.leaf_index != expected {
            return Some((position, expected));
        }
        expected = expected.checked_add(1)?;
    }
    None
}

/// Brings the cached deposit history of a pool up to the chain head
pub struct EventSynchronizer {
    rpc: Arc<RpcClient>,
    store: Arc<dyn EventStore>,
    batch_size: u64,
}

impl EventSynchronizer {
    pub fn new(rpc: Arc<RpcClient>, store: Arc<dyn EventStore>) -> Self {
        Self {
            rpc,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Fetch new deposits, validate the whole history and persist it
    ///
    /// Returns the complete contiguous sequence. On a gap the valid prefix
    /// is persisted and `DiscontinuousLeafSequence` is returned.
    pub async fn sync(&self, denomination: &Denomination) -> Result<Vec<DepositEvent>> {
        let label = denomination.label.as_str();
        let cache = self.store.load(label)?;
        let head = self.rpc.latest_block().await?.number;

        let start = cache
            .last_block
            .map_or(0, |block| block.saturating_add(1))
            .max(denomination.deploy_block);

        let fetched = if start > head {
            debug!("{} ETH pool already synced to block {}", label, head);
            Vec::new()
        } else {
            self.fetch_range(denomination, start, head).await?
        };

        let cached_len = cache.events.len();
        let previous_watermark = cache.last_block;
        let mut events = cache.events;
        // a block rescanned after a gap returns events that are already cached
        let fresh: Vec<DepositEvent> = fetched
            .into_iter()
            .filter(|e| events.get(e.leaf_index as usize) != Some(e))
            .collect();
        events.extend(fresh);

        if let Some((position, expected_index)) = first_discontinuity(&events) {
            warn!(
                "{} ETH pool: leaf {} found where {} was expected, keeping {} events",
                label, events[position].leaf_index, expected_index, position
            );
            if position < cached_len {
                self.store.truncate(label, position)?;
            } else if position > cached_len {
                let watermark =
                    rescan_watermark(events.get(position - 1)).max(previous_watermark);
                self.store
                    .append(label, &events[cached_len..position], watermark)?;
            }
            return Err(Error::DiscontinuousLeafSequence { expected_index });
        }

        let last_event_block = events.last().map(|e| e.block_number);
        let watermark = [previous_watermark, Some(head), last_event_block]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(head);
        self.store
            .append(label, &events[cached_len..], Some(watermark))?;

        info!(
            "{} ETH pool: {} deposits ({} new), synced to block {}",
            label,
            events.len(),
            events.len() - cached_len,
            watermark
        );
        Ok(events)
    }

    /// Request logs window by window; the window that would reach `head` is
    /// requested through `latest` and ends the loop
    async fn fetch_range(
        &self,
        denomination: &Denomination,
        start: u64,
        head: u64,
    ) -> Result<Vec<DepositEvent>> {
        let mut events = Vec::new();
        let mut from = start;

        loop {
            let window_end = from.saturating_add(self.batch_size - 1);
            let reaches_head = window_end >= head;
            let to_block = if reaches_head {
                BlockTag::Latest
            } else {
                BlockTag::Number(window_end)
            };

            info!(
                "{} ETH pool: fetching deposits {} to {}",
                denomination.label, from, to_block
            );
            let logs = self
                .rpc
                .logs(&LogFilter {
                    from_block: from,
                    to_block,
                    address: denomination.contract,
                    topics: vec![DEPOSIT_EVENT_TOPIC],
                })
                .await?;
            for log in &logs {
                events.push(DepositEvent::from_log(log)?);
            }

            if reaches_head {
                break;
            }
            from = window_end + 1;
        }

        Ok(events)
    }
}
