//! Fallback tick fetch: one dense helper query per pool.
//!
//! Some chain/provider combinations starve the lens path (no lens deployed,
//! reverts on heavy words). The tick helper contract answers with up to a
//! few thousand ticks packed into one byte string, at a much larger per-call
//! gas cost, so it only runs for pools the lens left empty.

use alloy_primitives::U256;
use alloy_sol_types::{sol, SolCall};
use eyre::{bail, eyre, Result};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::multicall::{execute_with_retry, BatchCall, BatchOptions, CallExecutor};
use crate::pools::{PoolState, PoolVenue};
use crate::ticks::decoder::decode_packed_ticks;
use crate::ticks::{FetchOptions, TickRecord};

sol! {
    /// Dense tick query helper. Returns ticks packed 32 bytes each:
    /// upper 128 bits tick index, lower 128 bits liquidityNet.
    interface ITickQuery {
        function getTicks(address pool, uint256 len) external view returns (bytes memory ticks);
        function getTicksById(bytes32 id, uint256 len) external view returns (bytes memory ticks);
    }
}

/// Gas budget per helper call. Dense queries walk long stretches of storage.
const COMPACT_CALL_GAS: u64 = 8_000_000;

/// Hard cap on ticks requested in one helper call.
pub const MAX_COMPACT_TICKS: u64 = 3000;

/// Number of ticks to request so the response covers `price_range_bps` in
/// both directions around the current price.
///
/// Price moves 1.0001x per tick, so the one-sided span is
/// `ln(1 + bps/10000) / ln(1.0001)` ticks, rounded up to whole bitmap words
/// of initialized-tick candidates, doubled for both directions.
pub fn compact_query_len(tick_spacing: i32, price_range_bps: u32) -> u64 {
    debug_assert!(tick_spacing > 0);
    let span_ticks = (1.0 + f64::from(price_range_bps) / 10_000.0).ln() / 1.0001_f64.ln();
    let words = (span_ticks / f64::from(tick_spacing) / 256.0).ceil() as u64;
    (words * 2 * 256).min(MAX_COMPACT_TICKS)
}

/// Fetch initialized ticks through the dense helper, one call per pool.
///
/// Requires the chain's helper address; its absence is a configuration error
/// raised before any network call. Pools whose response decodes to zero
/// ticks are omitted unless `opts.keep_empty_pools` is set.
pub async fn fetch_ticks_via_compact<E: CallExecutor>(
    pools: &[PoolState],
    executor: &E,
    cfg: &ChainConfig,
    opts: &FetchOptions,
) -> Result<HashMap<String, Vec<TickRecord>>> {
    if pools.is_empty() {
        return Ok(HashMap::new());
    }

    let chain_id = pools[0].identity.chain_id;
    if pools.iter().any(|p| p.identity.chain_id != chain_id) {
        bail!("Compact tick batch mixes pools from different chains");
    }
    let helper = cfg
        .compact_helper
        .ok_or_else(|| eyre!("No compact tick helper configured for chain {}", cfg.chain_id))?;

    let start = Instant::now();
    let calls: Vec<BatchCall> = pools
        .iter()
        .map(|pool| {
            let len = U256::from(compact_query_len(
                pool.identity.tick_spacing,
                opts.price_range_bps,
            ));
            let calldata = match &pool.identity.venue {
                PoolVenue::Classic { address } => ITickQuery::getTicksCall {
                    pool: *address,
                    len,
                }
                .abi_encode(),
                PoolVenue::HookExtensible { pool_id, .. } => ITickQuery::getTicksByIdCall {
                    id: *pool_id,
                    len,
                }
                .abi_encode(),
            };
            BatchCall {
                target: helper,
                calldata: calldata.into(),
                gas_limit: COMPACT_CALL_GAS,
            }
        })
        .collect();

    let batch_opts = BatchOptions::for_chain(chain_id);
    let outcomes = execute_with_retry(executor, &calls, &batch_opts).await?;

    let mut ticks: HashMap<String, Vec<TickRecord>> = HashMap::new();
    for (pool, outcome) in pools.iter().zip(&outcomes) {
        let Some(data) = outcome.data() else {
            debug!("Compact query failed for pool {}", pool.key());
            continue;
        };

        // Both helper functions return a single `bytes` value.
        let packed = match ITickQuery::getTicksCall::abi_decode_returns(data) {
            Ok(packed) => packed,
            Err(e) => {
                warn!("Undecodable compact response for pool {}: {}", pool.key(), e);
                continue;
            }
        };

        let records = decode_packed_ticks(&packed);
        if !records.is_empty() || opts.keep_empty_pools {
            ticks.insert(pool.key(), records);
        }
    }

    if opts.keep_empty_pools {
        for pool in pools {
            ticks.entry(pool.key()).or_default();
        }
    }

    info!(
        "Compact tick pass: {}/{} pools populated in {:?}",
        ticks.values().filter(|t| !t.is_empty()).count(),
        pools.len(),
        start.elapsed()
    );

    Ok(ticks)
}
