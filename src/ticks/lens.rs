//! Primary tick fetch: per-bitmap-word lens queries.
//!
//! Each pool expands into one lens call per bitmap word around its current
//! tick. The two families query different lens contracts with different
//! selectors but share the populated-tick struct shape. A failed or empty
//! call costs that (pool, word) pair its data and nothing else.

use alloy_sol_types::{sol, SolCall};
use eyre::{bail, eyre, Result};
use futures::future::try_join;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::multicall::{execute_with_retry, BatchCall, BatchOptions, CallExecutor};
use crate::pools::{PoolFamily, PoolState, PoolVenue};
use crate::ticks::bitmap::plan_bitmap_windows;
use crate::ticks::{FetchOptions, TickRecord};

sol! {
    /// Lens for classic pools, addressed by pool contract
    interface ITickLens {
        struct PopulatedTick {
            int24 tick;
            int128 liquidityNet;
            uint128 liquidityGross;
        }

        function getPopulatedTicksInWord(address pool, int16 tickBitmapIndex)
            external
            view
            returns (PopulatedTick[] memory populatedTicks);
    }

    /// Lens for hook-extensible pools, addressed by pool id
    interface ICLTickLens {
        struct PopulatedTick {
            int24 tick;
            int128 liquidityNet;
            uint128 liquidityGross;
        }

        function getPopulatedTicksInWord(bytes32 id, int16 tickBitmapIndex)
            external
            view
            returns (PopulatedTick[] memory populatedTicks);
    }
}

/// Gas budget per classic lens call.
const CLASSIC_LENS_GAS: u64 = 1_000_000;

/// Gas budget per hook-extensible lens call. The singleton reads state via
/// extsload, which is heavier per word.
const HOOK_LENS_GAS: u64 = 1_500_000;

fn lens_gas(family: PoolFamily) -> u64 {
    match family {
        PoolFamily::Classic => CLASSIC_LENS_GAS,
        PoolFamily::HookExtensible => HOOK_LENS_GAS,
    }
}

/// Fetch initialized ticks for all pools through the per-word tick lens.
///
/// All pools must live on `cfg`'s chain; a mixed batch or a missing lens
/// address for a required family is a configuration error raised before any
/// network call. Pools with no ticks are omitted from the result unless
/// `opts.keep_empty_pools` is set.
pub async fn fetch_ticks_via_lens<E: CallExecutor>(
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
        bail!("Tick lens batch mixes pools from different chains");
    }
    if chain_id != cfg.chain_id {
        bail!(
            "Tick lens batch targets chain {} but config is for chain {}",
            chain_id,
            cfg.chain_id
        );
    }

    let classic: Vec<&PoolState> = pools
        .iter()
        .filter(|p| p.identity.family() == PoolFamily::Classic)
        .collect();
    let hooked: Vec<&PoolState> = pools
        .iter()
        .filter(|p| p.identity.family() == PoolFamily::HookExtensible)
        .collect();

    // Resolve lens addresses up front so a misconfigured chain fails before
    // anything is dispatched.
    let classic_lens = match classic.is_empty() {
        true => None,
        false => Some(cfg.classic_tick_lens.ok_or_else(|| {
            eyre!("No classic tick lens configured for chain {}", chain_id)
        })?),
    };
    let cl_lens = match hooked.is_empty() {
        true => None,
        false => Some(
            cfg.cl_tick_lens
                .ok_or_else(|| eyre!("No CL tick lens configured for chain {}", chain_id))?,
        ),
    };

    let start = Instant::now();
    let batch_opts = BatchOptions::for_chain(chain_id);

    let (classic_ticks, hooked_ticks) = try_join(
        fetch_family(&classic, classic_lens, PoolFamily::Classic, executor, &batch_opts),
        fetch_family(&hooked, cl_lens, PoolFamily::HookExtensible, executor, &batch_opts),
    )
    .await?;

    let mut ticks: HashMap<String, Vec<TickRecord>> = classic_ticks;
    ticks.extend(hooked_ticks);

    // Ascending per pool; within-word order was already restored per call.
    for records in ticks.values_mut() {
        records.sort_by_key(|t| t.index);
    }

    if opts.keep_empty_pools {
        for pool in pools {
            ticks.entry(pool.key()).or_default();
        }
    } else {
        ticks.retain(|_, records| !records.is_empty());
    }

    info!(
        "Tick lens pass: {}/{} pools populated ({} classic, {} hooked) in {:?}",
        ticks.values().filter(|t| !t.is_empty()).count(),
        pools.len(),
        classic.len(),
        hooked.len(),
        start.elapsed()
    );

    Ok(ticks)
}

/// Run all lens calls for one family and merge per pool key.
async fn fetch_family<E: CallExecutor>(
    pools: &[&PoolState],
    lens: Option<alloy_primitives::Address>,
    family: PoolFamily,
    executor: &E,
    batch_opts: &BatchOptions,
) -> Result<HashMap<String, Vec<TickRecord>>> {
    let mut ticks: HashMap<String, Vec<TickRecord>> = HashMap::new();
    let Some(lens) = lens else {
        return Ok(ticks);
    };

    let gas = lens_gas(family);
    let mut calls: Vec<BatchCall> = Vec::new();
    let mut owners: Vec<usize> = Vec::new();

    for (pool_idx, pool) in pools.iter().enumerate() {
        let words = plan_bitmap_windows(pool.current_tick, pool.identity.tick_spacing, family);
        debug!(
            "{} pool {}: {} bitmap words around tick {}",
            family,
            pool.key(),
            words.len(),
            pool.current_tick
        );

        for word in words {
            let calldata = match &pool.identity.venue {
                PoolVenue::Classic { address } => ITickLens::getPopulatedTicksInWordCall {
                    pool: *address,
                    tickBitmapIndex: word,
                }
                .abi_encode(),
                PoolVenue::HookExtensible { pool_id, .. } => {
                    ICLTickLens::getPopulatedTicksInWordCall {
                        id: *pool_id,
                        tickBitmapIndex: word,
                    }
                    .abi_encode()
                }
            };
            calls.push(BatchCall {
                target: lens,
                calldata: calldata.into(),
                gas_limit: gas,
            });
            owners.push(pool_idx);
        }
    }

    let outcomes = execute_with_retry(executor, &calls, batch_opts).await?;

    for (outcome, &pool_idx) in outcomes.iter().zip(&owners) {
        let pool = pools[pool_idx];
        let Some(data) = outcome.data() else {
            debug!("Lens call failed for pool {}", pool.key());
            continue;
        };

        let populated = match family {
            PoolFamily::Classic => ITickLens::getPopulatedTicksInWordCall::abi_decode_returns(data)
                .map(|ticks| {
                    ticks
                        .into_iter()
                        .map(|t| TickRecord {
                            index: t.tick.as_i32(),
                            liquidity_net: t.liquidityNet,
                            liquidity_gross: t.liquidityGross,
                        })
                        .collect::<Vec<_>>()
                }),
            PoolFamily::HookExtensible => {
                ICLTickLens::getPopulatedTicksInWordCall::abi_decode_returns(data).map(|ticks| {
                    ticks
                        .into_iter()
                        .map(|t| TickRecord {
                            index: t.tick.as_i32(),
                            liquidity_net: t.liquidityNet,
                            liquidity_gross: t.liquidityGross,
                        })
                        .collect::<Vec<_>>()
                })
            }
        };

        let mut records = match populated {
            Ok(records) => records,
            Err(e) => {
                warn!("Undecodable lens response for pool {}: {}", pool.key(), e);
                continue;
            }
        };

        // The lens reports ticks in descending order within a word; callers
        // accumulate ascending.
        records.reverse();
        ticks.entry(pool.key()).or_default().extend(records);
    }

    Ok(ticks)
}
