//! Cartographer - maps the liquidity terrain of concentrated-liquidity pools.
//!
//! Given a currency pair, the engine discovers every candidate CL pool on a
//! chain (classic fee-tier pools and hook-extensible pools under a singleton
//! pool manager), probes them for on-chain state in batched reads, and
//! retrieves the sparse set of initialized ticks a router needs to simulate
//! swaps through each pool's liquidity curve.
//!
//! Entry points:
//! - [`discover_candidate_pools`]: pair in, live pools with ticks out
//! - [`fetch_pool_ticks`]: ticks for pools the caller already holds
//!
//! Every entry point is a pure function of its inputs plus an injected
//! [`CallExecutor`] and [`ChainConfig`]; there is no shared mutable state,
//! no caching, and no internal timeout. Concurrent invocations for
//! independent pairs are safe. Configuration problems (missing lens or
//! helper addresses, mixed-chain batches) fail fast before any network
//! call; individual call failures degrade into absent data, because a
//! router must quote with whatever subset of pools is actually reachable.

pub mod config;
pub mod multicall;
pub mod pools;
pub mod ticks;

pub use config::{ChainConfig, FeeTier, HookPreset};
pub use multicall::{
    execute_with_retry, BatchCall, BatchOptions, CallExecutor, CallOutcome, Multicall3Executor,
};
pub use pools::{discover_candidate_pools, Currency, PoolFamily, PoolIdentity, PoolState, PoolVenue};
pub use ticks::{fetch_pool_ticks, FetchOptions, TickRecord};
