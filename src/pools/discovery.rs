//! Candidate pool discovery for a currency pair.
//!
//! Enumerates every pool identity the pair could trade through on a chain
//! (all classic fee tiers plus all hook presets, with native/wrapped
//! substitution), probes them for on-chain state in one batched read, and
//! hands survivors to the tick fetcher. Identities with no on-chain state
//! are normal, not errors; most probed combinations were never deployed.

use alloy_primitives::U256;
use alloy_sol_types::{sol, SolCall};
use eyre::{bail, Result};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::ChainConfig;
use crate::multicall::{execute_with_retry, BatchCall, BatchOptions, CallExecutor, CallOutcome};
use crate::pools::types::{Currency, PoolIdentity, PoolState, PoolVenue};
use crate::ticks::fetcher::fetch_pool_ticks;
use crate::ticks::FetchOptions;

sol! {
    /// State surface of a classic pool contract
    interface IClassicPool {
        function slot0() external view returns (
            uint160 sqrtPriceX96, int24 tick, uint16 observationIndex,
            uint16 observationCardinality, uint16 observationCardinalityNext,
            uint32 feeProtocol, bool unlocked
        );
        function liquidity() external view returns (uint128);
    }

    /// State surface of the hook-extensible singleton pool manager
    interface IHookPoolManager {
        function getSlot0(bytes32 id) external view returns (
            uint160 sqrtPriceX96, int24 tick, uint24 protocolFee, uint24 lpFee
        );
        function getLiquidity(bytes32 id) external view returns (uint128 liquidity);
    }
}

/// Gas budget per state read.
const STATE_CALL_GAS: u64 = 200_000;

/// Discover all live pools for a currency pair and fetch their ticks.
///
/// Pools for which neither tick strategy finds anything are dropped (a pool
/// with no discoverable liquidity structure cannot be simulated), unless
/// `opts.keep_empty_pools` is set.
pub async fn discover_candidate_pools<E: CallExecutor>(
    currency_a: &Currency,
    currency_b: &Currency,
    executor: &E,
    cfg: &ChainConfig,
    opts: &FetchOptions,
) -> Result<Vec<PoolState>> {
    if currency_a.chain_id() != currency_b.chain_id() {
        bail!(
            "Cannot pair currencies from chains {} and {}",
            currency_a.chain_id(),
            currency_b.chain_id()
        );
    }
    if currency_a.chain_id() != cfg.chain_id {
        bail!(
            "Currency pair targets chain {} but config is for chain {}",
            currency_a.chain_id(),
            cfg.chain_id
        );
    }
    if currency_a == currency_b {
        bail!("Cannot build pools for a currency against itself");
    }

    let start = Instant::now();
    let pairs = pair_permutations(currency_a, currency_b, cfg);
    let identities = candidate_identities(&pairs, cfg);
    if identities.is_empty() {
        return Ok(Vec::new());
    }
    debug!(
        "Probing {} candidate identities over {} pair permutations",
        identities.len(),
        pairs.len()
    );

    // One batched existence read: slot0 + liquidity per identity.
    let mut calls = Vec::with_capacity(identities.len() * 2);
    for identity in &identities {
        let (slot0, liquidity) = state_calls(identity);
        calls.push(slot0);
        calls.push(liquidity);
    }

    let batch_opts = BatchOptions::for_chain(cfg.chain_id);
    let outcomes = execute_with_retry(executor, &calls, &batch_opts).await?;

    let mut pools: Vec<PoolState> = Vec::new();
    for (i, identity) in identities.into_iter().enumerate() {
        let offset = i * 2;
        match parse_pool_state(&identity, &outcomes[offset], &outcomes[offset + 1]) {
            Some(pool) => pools.push(pool),
            None => debug!("No on-chain state for candidate {}", identity.key()),
        }
    }

    info!(
        "Pool discovery: {} live pools from {} candidates in {:?}",
        pools.len(),
        outcomes.len() / 2,
        start.elapsed()
    );

    if pools.is_empty() {
        return Ok(pools);
    }

    let mut ticks = fetch_pool_ticks(&pools, executor, cfg, opts).await?;
    for pool in &mut pools {
        if let Some(records) = ticks.remove(&pool.key()) {
            pool.ticks = records;
        }
    }
    if !opts.keep_empty_pools {
        pools.retain(|p| !p.ticks.is_empty());
    }

    Ok(pools)
}

/// All distinct pair permutations including native/wrapped substitution.
fn pair_permutations(a: &Currency, b: &Currency, cfg: &ChainConfig) -> Vec<(Currency, Currency)> {
    let mut seen: HashSet<(Currency, Currency)> = HashSet::new();
    let mut pairs = Vec::new();

    for fa in equivalent_forms(a, cfg) {
        for fb in equivalent_forms(b, cfg) {
            if fa == fb {
                continue;
            }
            let canonical = if fa.sorts_before(&fb) {
                (fa.clone(), fb.clone())
            } else {
                (fb.clone(), fa.clone())
            };
            if seen.insert(canonical.clone()) {
                pairs.push(canonical);
            }
        }
    }
    pairs
}

/// A currency plus its native/wrapped counterpart, if it has one.
fn equivalent_forms(currency: &Currency, cfg: &ChainConfig) -> Vec<Currency> {
    let mut forms = vec![currency.clone()];
    match currency {
        Currency::Native { chain_id } => {
            forms.push(Currency::token(*chain_id, cfg.wrapped_native));
        }
        Currency::Token { chain_id, address } if *address == cfg.wrapped_native => {
            forms.push(Currency::native(*chain_id));
        }
        Currency::Token { .. } => {}
    }
    forms
}

/// Cross product of pair permutations with the chain's fee tiers and hook
/// presets, deduplicated by derived pool key.
fn candidate_identities(pairs: &[(Currency, Currency)], cfg: &ChainConfig) -> Vec<PoolIdentity> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut identities = Vec::new();

    for (a, b) in pairs {
        // Classic pools trade wrapped forms only; a native/wrapped pair
        // collapses to a single token and has no classic pool.
        if a.wrapped(cfg) != b.wrapped(cfg) {
            for tier in &cfg.fee_tiers {
                let id = PoolIdentity::classic(cfg, a, b, tier.fee, tier.tick_spacing);
                if seen.insert(id.key()) {
                    identities.push(id);
                }
            }
        }

        if let Some(manager) = cfg.cl_pool_manager {
            for preset in &cfg.hook_presets {
                let id = PoolIdentity::hook_extensible(cfg, manager, a, b, preset);
                if seen.insert(id.key()) {
                    identities.push(id);
                }
            }
        }
    }
    identities
}

fn state_calls(identity: &PoolIdentity) -> (BatchCall, BatchCall) {
    match &identity.venue {
        PoolVenue::Classic { address } => (
            BatchCall {
                target: *address,
                calldata: IClassicPool::slot0Call {}.abi_encode().into(),
                gas_limit: STATE_CALL_GAS,
            },
            BatchCall {
                target: *address,
                calldata: IClassicPool::liquidityCall {}.abi_encode().into(),
                gas_limit: STATE_CALL_GAS,
            },
        ),
        PoolVenue::HookExtensible {
            pool_id,
            pool_manager,
            ..
        } => (
            BatchCall {
                target: *pool_manager,
                calldata: IHookPoolManager::getSlot0Call { id: *pool_id }
                    .abi_encode()
                    .into(),
                gas_limit: STATE_CALL_GAS,
            },
            BatchCall {
                target: *pool_manager,
                calldata: IHookPoolManager::getLiquidityCall { id: *pool_id }
                    .abi_encode()
                    .into(),
                gas_limit: STATE_CALL_GAS,
            },
        ),
    }
}

/// Build a [`PoolState`] from the existence read, or `None` when the pool
/// does not exist on-chain (failed call or zero price).
fn parse_pool_state(
    identity: &PoolIdentity,
    slot0: &CallOutcome,
    liquidity: &CallOutcome,
) -> Option<PoolState> {
    let slot0_data = slot0.data()?;

    let (sqrt_price_x96, current_tick) = match identity.venue {
        PoolVenue::Classic { .. } => {
            let decoded = IClassicPool::slot0Call::abi_decode_returns(slot0_data).ok()?;
            (U256::from(decoded.sqrtPriceX96), decoded.tick.as_i32())
        }
        PoolVenue::HookExtensible { .. } => {
            let decoded = IHookPoolManager::getSlot0Call::abi_decode_returns(slot0_data).ok()?;
            (U256::from(decoded.sqrtPriceX96), decoded.tick.as_i32())
        }
    };
    if sqrt_price_x96.is_zero() {
        return None;
    }

    // A pool can be initialized with nothing currently in range; keep it and
    // let the tick fetch decide.
    let liquidity = liquidity
        .data()
        .and_then(|data| match identity.venue {
            PoolVenue::Classic { .. } => IClassicPool::liquidityCall::abi_decode_returns(data).ok(),
            PoolVenue::HookExtensible { .. } => {
                IHookPoolManager::getLiquidityCall::abi_decode_returns(data).ok()
            }
        })
        .unwrap_or(0);

    Some(PoolState::new(
        identity.clone(),
        liquidity,
        sqrt_price_x96,
        current_tick,
    ))
}
