//! Pool identity and state types.
//!
//! Two pool families share one data model:
//! - `Classic`: a standalone pool contract, identified by its CREATE2
//!   address derived from (token0, token1, fee).
//! - `HookExtensible`: a pool living inside a singleton pool manager,
//!   identified by the hash of its full configuration (currencies, hooks,
//!   fee, packed parameters).
//!
//! Map lookups use [`PoolIdentity::key`]: the lowercased hex address for
//! classic pools, the lowercased hex pool id for hook-extensible ones. The
//! 20- vs 32-byte hex strings can never collide.

use alloy_primitives::{aliases::U24, keccak256, Address, B256, U256};
use alloy_sol_types::{sol, SolValue};
use serde::{Deserialize, Serialize};

use crate::config::{ChainConfig, HookPreset};
use crate::ticks::TickRecord;

sol! {
    /// Full configuration of a hook-extensible pool; its keccak256 hash is
    /// the pool id.
    struct HookPoolKey {
        address currency0;
        address currency1;
        address hooks;
        address poolManager;
        uint24 fee;
        bytes32 parameters;
    }
}

// ============================================
// CURRENCY
// ============================================

/// A currency on one chain: the native token or an ERC-20.
///
/// Native is addressed as the zero address, which is how hook-extensible
/// pools carry it on-chain; classic pools only ever trade its wrapped form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Native { chain_id: u64 },
    Token { chain_id: u64, address: Address },
}

impl Currency {
    pub fn native(chain_id: u64) -> Self {
        Currency::Native { chain_id }
    }

    pub fn token(chain_id: u64, address: Address) -> Self {
        Currency::Token { chain_id, address }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Currency::Native { chain_id } | Currency::Token { chain_id, .. } => *chain_id,
        }
    }

    /// On-chain address: zero for native.
    pub fn address(&self) -> Address {
        match self {
            Currency::Native { .. } => Address::ZERO,
            Currency::Token { address, .. } => *address,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Currency::Native { .. })
    }

    /// ERC-20 address after wrapping: native becomes the chain's wrapped
    /// token, everything else is itself.
    pub fn wrapped(&self, cfg: &ChainConfig) -> Address {
        match self {
            Currency::Native { .. } => cfg.wrapped_native,
            Currency::Token { address, .. } => *address,
        }
    }

    /// Canonical ordering: by address, zero (native) first.
    pub fn sorts_before(&self, other: &Currency) -> bool {
        self.address() < other.address()
    }
}

// ============================================
// POOL IDENTITY
// ============================================

/// Pool family discriminant used at every dispatch boundary: ABI selection,
/// gas budgets, scan radii.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolFamily {
    Classic,
    HookExtensible,
}

impl std::fmt::Display for PoolFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolFamily::Classic => write!(f, "classic"),
            PoolFamily::HookExtensible => write!(f, "hooked"),
        }
    }
}

/// Family-specific identity payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolVenue {
    Classic {
        address: Address,
    },
    HookExtensible {
        pool_id: B256,
        hooks: Address,
        hooks_registration: u16,
        pool_manager: Address,
    },
}

/// Immutable identity of one candidate pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolIdentity {
    pub chain_id: u64,
    /// Lower-addressed currency
    pub currency0: Currency,
    /// Higher-addressed currency
    pub currency1: Currency,
    pub fee: u32,
    pub tick_spacing: i32,
    pub venue: PoolVenue,
}

impl PoolIdentity {
    /// Identity of the classic pool for a pair at one fee tier. Both
    /// currencies are taken in wrapped form and sorted canonically.
    pub fn classic(
        cfg: &ChainConfig,
        a: &Currency,
        b: &Currency,
        fee: u32,
        tick_spacing: i32,
    ) -> PoolIdentity {
        let chain_id = a.chain_id();
        let (t0, t1) = sort_addresses(a.wrapped(cfg), b.wrapped(cfg));
        let address = classic_pool_address(cfg, t0, t1, fee);
        PoolIdentity {
            chain_id,
            currency0: Currency::token(chain_id, t0),
            currency1: Currency::token(chain_id, t1),
            fee,
            tick_spacing,
            venue: PoolVenue::Classic { address },
        }
    }

    /// Identity of the hook-extensible pool for a pair under one preset.
    /// Native stays native (zero address) and sorts first.
    pub fn hook_extensible(
        cfg: &ChainConfig,
        pool_manager: Address,
        a: &Currency,
        b: &Currency,
        preset: &HookPreset,
    ) -> PoolIdentity {
        let chain_id = a.chain_id();
        let (c0, c1) = if a.sorts_before(b) {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };

        let parameters = encode_pool_parameters(preset.hooks_registration, preset.tick_spacing);
        let key = HookPoolKey {
            currency0: c0.address(),
            currency1: c1.address(),
            hooks: preset.hooks,
            poolManager: pool_manager,
            fee: U24::from(preset.fee),
            parameters,
        };
        let pool_id = keccak256(key.abi_encode());

        PoolIdentity {
            chain_id,
            currency0: c0,
            currency1: c1,
            fee: preset.fee,
            tick_spacing: preset.tick_spacing,
            venue: PoolVenue::HookExtensible {
                pool_id,
                hooks: preset.hooks,
                hooks_registration: preset.hooks_registration,
                pool_manager,
            },
        }
    }

    pub fn family(&self) -> PoolFamily {
        match self.venue {
            PoolVenue::Classic { .. } => PoolFamily::Classic,
            PoolVenue::HookExtensible { .. } => PoolFamily::HookExtensible,
        }
    }

    /// Map key: lowercased hex of the pool address or pool id.
    pub fn key(&self) -> String {
        match &self.venue {
            PoolVenue::Classic { address } => format!("0x{}", hex::encode(address)),
            PoolVenue::HookExtensible { pool_id, .. } => format!("0x{}", hex::encode(pool_id)),
        }
    }
}

fn sort_addresses(a: Address, b: Address) -> (Address, Address) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// CREATE2 address of the classic pool for (token0, token1, fee).
fn classic_pool_address(cfg: &ChainConfig, token0: Address, token1: Address, fee: u32) -> Address {
    let salt = keccak256((token0, token1, U24::from(fee)).abi_encode());
    cfg.classic_pool_deployer
        .create2(salt, cfg.classic_init_code_hash)
}

/// Pack the pool parameters word: hook-registration bitmap in bits 0..16,
/// tick spacing (int24) in bits 16..40.
pub fn encode_pool_parameters(hooks_registration: u16, tick_spacing: i32) -> B256 {
    let spacing_bits = (tick_spacing as u32) & 0x00FF_FFFF;
    let word: U256 = U256::from(hooks_registration) | (U256::from(spacing_bits) << 16);
    B256::from(word.to_be_bytes::<32>())
}

// ============================================
// POOL STATE
// ============================================

/// On-chain state of one surviving candidate pool.
///
/// Built right after the existence read; `ticks` stays empty until the tick
/// fetch pass fills it in.
#[derive(Debug, Clone)]
pub struct PoolState {
    pub identity: PoolIdentity,
    pub liquidity: u128,
    pub sqrt_price_x96: U256,
    pub current_tick: i32,
    pub ticks: Vec<TickRecord>,
}

impl PoolState {
    pub fn new(
        identity: PoolIdentity,
        liquidity: u128,
        sqrt_price_x96: U256,
        current_tick: i32,
    ) -> Self {
        Self {
            identity,
            liquidity,
            sqrt_price_x96,
            current_tick,
            ticks: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        self.identity.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn cfg() -> ChainConfig {
        ChainConfig::builtin(56).unwrap()
    }

    #[test]
    fn native_sorts_first() {
        let native = Currency::native(56);
        let token = Currency::token(56, address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"));
        assert!(native.sorts_before(&token));
        assert_eq!(native.address(), Address::ZERO);
    }

    #[test]
    fn classic_identity_sorts_and_wraps() {
        let cfg = cfg();
        let native = Currency::native(56);
        let usdt = Currency::token(56, address!("55d398326f99059fF775485246999027B3197955"));

        let id = PoolIdentity::classic(&cfg, &usdt, &native, 500, 10);
        assert_eq!(id.family(), PoolFamily::Classic);
        // Native wrapped to WBNB, then sorted below USDT by address.
        assert_eq!(id.currency0.address(), usdt.address());
        assert_eq!(id.currency1.address(), cfg.wrapped_native);

        // Argument order must not matter.
        let swapped = PoolIdentity::classic(&cfg, &native, &usdt, 500, 10);
        assert_eq!(id, swapped);
        assert_eq!(id.key(), swapped.key());
    }

    #[test]
    fn classic_key_is_lowercase_address() {
        let cfg = cfg();
        let a = Currency::token(56, address!("55d398326f99059fF775485246999027B3197955"));
        let b = Currency::native(56);
        let key = PoolIdentity::classic(&cfg, &a, &b, 500, 10).key();
        assert!(key.starts_with("0x"));
        assert_eq!(key.len(), 42);
        assert_eq!(key, key.to_lowercase());
    }

    #[test]
    fn hook_identity_is_stable_and_order_independent() {
        let cfg = cfg();
        let manager = cfg.cl_pool_manager.unwrap();
        let native = Currency::native(56);
        let usdt = Currency::token(56, address!("55d398326f99059fF775485246999027B3197955"));
        let preset = cfg.hook_presets[1];

        let id1 = PoolIdentity::hook_extensible(&cfg, manager, &native, &usdt, &preset);
        let id2 = PoolIdentity::hook_extensible(&cfg, manager, &usdt, &native, &preset);
        assert_eq!(id1, id2);
        assert_eq!(id1.family(), PoolFamily::HookExtensible);
        assert_eq!(id1.currency0, native);
        assert_eq!(id1.key().len(), 66);
    }

    #[test]
    fn different_presets_derive_different_pool_ids() {
        let cfg = cfg();
        let manager = cfg.cl_pool_manager.unwrap();
        let a = Currency::native(56);
        let b = Currency::token(56, address!("55d398326f99059fF775485246999027B3197955"));

        let id1 = PoolIdentity::hook_extensible(&cfg, manager, &a, &b, &cfg.hook_presets[0]);
        let id2 = PoolIdentity::hook_extensible(&cfg, manager, &a, &b, &cfg.hook_presets[1]);
        assert_ne!(id1.key(), id2.key());
    }

    #[test]
    fn pool_parameters_pack_registration_and_spacing() {
        let word = encode_pool_parameters(0x00ff, 60);
        let value = U256::from_be_bytes(word.0);
        assert_eq!((value & U256::from(0xffffu64)).to::<u64>(), 0x00ff);
        assert_eq!(((value >> 16usize) & U256::from(0xff_ffffu64)).to::<u64>(), 60);
        // Nothing above bit 40.
        assert_eq!(value >> 40, U256::ZERO);
    }
}
