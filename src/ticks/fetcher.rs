//! Combined tick fetch: lens first, dense helper for the gaps.
//!
//! No single strategy is reliable on every chain/provider combination. The
//! lens pass is cheap and preferred; whatever it leaves empty is retried
//! once through the compact helper. The two passes are strictly sequential
//! with an explicit partition in between, so the fallback never races the
//! primary's results.

use eyre::Result;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::multicall::CallExecutor;
use crate::pools::PoolState;
use crate::ticks::compact::fetch_ticks_via_compact;
use crate::ticks::lens::fetch_ticks_via_lens;
use crate::ticks::{FetchOptions, TickRecord};

/// Fetch initialized ticks for all pools, keyed by pool key.
///
/// Pools left empty by both strategies are omitted from the result unless
/// `opts.keep_empty_pools` is set, in which case they appear with an empty
/// list.
pub async fn fetch_pool_ticks<E: CallExecutor>(
    pools: &[PoolState],
    executor: &E,
    cfg: &ChainConfig,
    opts: &FetchOptions,
) -> Result<HashMap<String, Vec<TickRecord>>> {
    if pools.is_empty() {
        return Ok(HashMap::new());
    }

    let start = Instant::now();

    // Primary pass runs without the keep-empty policy so gaps stay visible
    // for the partition below; the policy is applied once at the end.
    let inner_opts = FetchOptions {
        keep_empty_pools: false,
        ..*opts
    };

    let mut ticks = fetch_ticks_via_lens(pools, executor, cfg, &inner_opts).await?;

    let needs_fallback: Vec<PoolState> = pools
        .iter()
        .filter(|p| ticks.get(&p.key()).map_or(true, |t| t.is_empty()))
        .cloned()
        .collect();

    if !needs_fallback.is_empty() {
        if cfg.compact_helper.is_some() {
            info!(
                "{}/{} pools empty after lens pass, running compact fallback",
                needs_fallback.len(),
                pools.len()
            );
            let fallback =
                fetch_ticks_via_compact(&needs_fallback, executor, cfg, &inner_opts).await?;
            for (key, records) in fallback {
                if !records.is_empty() {
                    ticks.insert(key, records);
                }
            }
        } else {
            warn!(
                "{}/{} pools empty after lens pass and chain {} has no compact helper",
                needs_fallback.len(),
                pools.len(),
                cfg.chain_id
            );
        }
    } else {
        debug!("Lens pass covered all {} pools", pools.len());
    }

    if opts.keep_empty_pools {
        for pool in pools {
            ticks.entry(pool.key()).or_default();
        }
    } else {
        ticks.retain(|_, records| !records.is_empty());
    }

    info!(
        "Tick fetch: {}/{} pools with ticks in {:?}",
        ticks.values().filter(|t| !t.is_empty()).count(),
        pools.len(),
        start.elapsed()
    );

    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multicall::testing::{ok, selector, MockExecutor};
    use crate::pools::{Currency, PoolIdentity};
    use crate::ticks::compact::ITickQuery;
    use crate::ticks::lens::ITickLens;
    use alloy_primitives::{address, Bytes, U256};
    use alloy_sol_types::{SolCall, SolValue};

    fn cfg() -> ChainConfig {
        ChainConfig::builtin(56).unwrap()
    }

    fn classic_pool(cfg: &ChainConfig, fee: u32, tick_spacing: i32) -> PoolState {
        let a = Currency::token(56, address!("55d398326f99059fF775485246999027B3197955"));
        let b = Currency::native(56);
        let identity = PoolIdentity::classic(cfg, &a, &b, fee, tick_spacing);
        PoolState::new(identity, 1, U256::from(1u64) << 96, 0)
    }

    fn pack(ticks: &[(i128, i128)]) -> Vec<u8> {
        let mut out = Vec::with_capacity(ticks.len() * 32);
        for (index, net) in ticks {
            let word: U256 = (U256::from(*index as u128) << 128) | U256::from(*net as u128);
            out.extend_from_slice(&word.to_be_bytes::<32>());
        }
        out
    }

    fn empty_lens_response() -> Vec<u8> {
        Vec::<ITickLens::PopulatedTick>::new().abi_encode()
    }

    #[tokio::test]
    async fn fallback_runs_once_per_empty_pool_and_merges() {
        let cfg = cfg();
        let pool = classic_pool(&cfg, 500, 10);
        let key = pool.key();

        // Lens yields nothing; helper yields two ticks.
        let executor = MockExecutor::new(move |call| {
            if selector(call) == ITickLens::getPopulatedTicksInWordCall::SELECTOR {
                ok(empty_lens_response())
            } else {
                ok(Bytes::from(pack(&[(-10, 77), (10, -77)])).abi_encode())
            }
        });

        let ticks = fetch_pool_ticks(&[pool], &executor, &cfg, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(ticks[&key].len(), 2);
        assert_eq!(ticks[&key][0].index, -10);

        // Exactly one compact call was issued for the pool.
        let compact_calls: usize = executor
            .batches
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .filter(|c| selector(c) == ITickQuery::getTicksCall::SELECTOR)
            .count();
        assert_eq!(compact_calls, 1);
    }

    #[tokio::test]
    async fn fallback_is_skipped_for_covered_pools() {
        let cfg = cfg();
        let pool = classic_pool(&cfg, 2500, 50);

        let executor = MockExecutor::new(move |call| {
            assert_eq!(
                selector(call),
                ITickLens::getPopulatedTicksInWordCall::SELECTOR,
                "covered pool must not reach the compact helper"
            );
            ok(vec![ITickLens::PopulatedTick {
                tick: alloy_primitives::aliases::I24::ZERO,
                liquidityNet: 9,
                liquidityGross: 9,
            }]
            .abi_encode())
        });

        let ticks = fetch_pool_ticks(&[pool.clone()], &executor, &cfg, &FetchOptions::default())
            .await
            .unwrap();

        assert!(!ticks[&pool.key()].is_empty());
    }

    #[tokio::test]
    async fn empty_pools_filtered_by_default_and_kept_on_request() {
        let cfg = cfg();
        let pool = classic_pool(&cfg, 10000, 200);
        let key = pool.key();

        let responder = move |call: &crate::multicall::BatchCall| {
            if selector(call) == ITickLens::getPopulatedTicksInWordCall::SELECTOR {
                ok(empty_lens_response())
            } else {
                ok(Bytes::new().abi_encode())
            }
        };

        let executor = MockExecutor::new(responder);
        let ticks = fetch_pool_ticks(&[pool.clone()], &executor, &cfg, &FetchOptions::default())
            .await
            .unwrap();
        assert!(!ticks.contains_key(&key));

        let executor = MockExecutor::new(responder);
        let opts = FetchOptions {
            keep_empty_pools: true,
            ..FetchOptions::default()
        };
        let ticks = fetch_pool_ticks(&[pool], &executor, &cfg, &opts)
            .await
            .unwrap();
        assert!(ticks[&key].is_empty());
    }

    #[tokio::test]
    async fn missing_helper_degrades_to_lens_results_only() {
        let mut cfg = cfg();
        cfg.compact_helper = None;
        let pool = classic_pool(&cfg, 500, 10);

        let executor = MockExecutor::new(|_| ok(empty_lens_response()));
        let ticks = fetch_pool_ticks(&[pool], &executor, &cfg, &FetchOptions::default())
            .await
            .unwrap();

        assert!(ticks.is_empty());
    }
}
