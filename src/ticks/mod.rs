//! Initialized-tick retrieval for concentrated-liquidity pools.
//!
//! Two strategies populate a pool's tick list:
//! - `lens`: per-bitmap-word queries against a tick lens contract (primary)
//! - `compact`: a single dense query against a chain's tick helper (fallback)
//!
//! `fetcher` orchestrates the two and applies the empty-pool filter policy.

use serde::{Deserialize, Serialize};

pub mod bitmap;
pub mod compact;
pub mod decoder;
pub mod fetcher;
pub mod lens;

pub use fetcher::fetch_pool_ticks;

/// One initialized tick of a pool's liquidity curve.
///
/// Unique per pool by `index`; merging is always last-write-wins through an
/// index-keyed map, never silent stacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Tick index (price boundary), signed
    pub index: i32,
    /// Signed change in active liquidity when the price crosses this tick
    pub liquidity_net: i128,
    /// Total liquidity referencing this tick
    pub liquidity_gross: u128,
}

/// Default price range covered by a compact fallback query, in basis points
/// (applied in both directions around the current price).
pub const DEFAULT_PRICE_RANGE_BPS: u32 = 500;

/// Options for a tick fetch pass.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Keep pools in the result map even when both strategies found no
    /// ticks (as an empty array). Default: such pools are omitted.
    pub keep_empty_pools: bool,
    /// Price range the compact fallback should cover around the current
    /// price, in basis points per direction.
    pub price_range_bps: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            keep_empty_pools: false,
            price_range_bps: DEFAULT_PRICE_RANGE_BPS,
        }
    }
}
