//! Per-chain configuration.
//!
//! Everything chain-specific the engine needs is carried by an explicit
//! [`ChainConfig`] handed into every entry point: lens and helper contract
//! addresses, the classic pool deployer, the hook-extensible pool manager,
//! and the fee-tier / hook presets to probe during discovery. No ambient
//! globals; tests inject fakes.

use alloy_primitives::{address, b256, Address, B256};
use eyre::{eyre, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// ============================================
// PRESETS
// ============================================

/// One classic fee tier to probe for every candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTier {
    /// Fee in hundredths of a bip (500 = 0.05%)
    pub fee: u32,
    pub tick_spacing: i32,
}

/// One hook-extensible pool configuration to probe for every candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookPreset {
    /// Hook contract, zero for hookless pools
    pub hooks: Address,
    /// Callback-registration bitmap packed into the pool parameters
    pub hooks_registration: u16,
    pub fee: u32,
    pub tick_spacing: i32,
}

// ============================================
// CHAIN CONFIG
// ============================================

/// Static per-chain lookup table for one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,

    /// Wrapped form of the chain's native token
    pub wrapped_native: Address,

    // ========== Classic pools ==========
    /// CREATE2 deployer for classic pools
    pub classic_pool_deployer: Address,
    /// Init code hash of the classic pool contract
    pub classic_init_code_hash: B256,
    /// Tick lens serving classic pools, if deployed on this chain
    pub classic_tick_lens: Option<Address>,
    /// Fee tiers every candidate pair is probed at
    pub fee_tiers: Vec<FeeTier>,

    // ========== Hook-extensible pools ==========
    /// Singleton pool manager, if the chain has a hook-extensible deployment
    pub cl_pool_manager: Option<Address>,
    /// Tick lens serving hook-extensible pools
    pub cl_tick_lens: Option<Address>,
    /// Hook/fee combinations every candidate pair is probed at
    pub hook_presets: Vec<HookPreset>,

    // ========== Fallback ==========
    /// Dense tick query helper used when the lens yields nothing
    pub compact_helper: Option<Address>,
}

impl ChainConfig {
    /// Builtin configuration for a supported chain.
    pub fn builtin(chain_id: u64) -> Option<ChainConfig> {
        BUILTIN_CHAINS.get(&chain_id).cloned()
    }

    /// Load a configuration from a JSON file, for bespoke deployments.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<ChainConfig> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read chain config {}: {}", path.display(), e))?;
        let cfg: ChainConfig = serde_json::from_str(&raw)
            .map_err(|e| eyre!("Invalid chain config {}: {}", path.display(), e))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(eyre!("Chain id must be non-zero"));
        }
        if let Some(tier) = self.fee_tiers.iter().find(|t| t.tick_spacing <= 0) {
            return Err(eyre!(
                "Fee tier {} has non-positive tick spacing {}",
                tier.fee,
                tier.tick_spacing
            ));
        }
        if let Some(preset) = self.hook_presets.iter().find(|p| p.tick_spacing <= 0) {
            return Err(eyre!(
                "Hook preset (fee {}) has non-positive tick spacing {}",
                preset.fee,
                preset.tick_spacing
            ));
        }
        if !self.hook_presets.is_empty() && self.cl_pool_manager.is_none() {
            return Err(eyre!(
                "Hook presets configured for chain {} without a pool manager",
                self.chain_id
            ));
        }
        Ok(())
    }
}

// ============================================
// BUILTIN CHAINS
// ============================================

fn no_hook_preset(fee: u32, tick_spacing: i32) -> HookPreset {
    HookPreset {
        hooks: Address::ZERO,
        hooks_registration: 0,
        fee,
        tick_spacing,
    }
}

lazy_static! {
    static ref BUILTIN_CHAINS: HashMap<u64, ChainConfig> = {
        let mut chains = HashMap::new();

        // Ethereum mainnet - classic pools only
        chains.insert(1, ChainConfig {
            chain_id: 1,
            wrapped_native: address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            classic_pool_deployer: address!("1F98431c8aD98523631AE4a59f267346ea31F984"),
            classic_init_code_hash: b256!("e34f199b19b2b4f47f68442619d555527d244f78a3297ea89325f843f87b8b54"),
            classic_tick_lens: Some(address!("bfd8137f7d1516D3ea5cA83523914859ec47F573")),
            fee_tiers: vec![
                FeeTier { fee: 100, tick_spacing: 1 },
                FeeTier { fee: 500, tick_spacing: 10 },
                FeeTier { fee: 3000, tick_spacing: 60 },
                FeeTier { fee: 10000, tick_spacing: 200 },
            ],
            cl_pool_manager: None,
            cl_tick_lens: None,
            hook_presets: Vec::new(),
            compact_helper: None,
        });

        // BNB Chain - classic + hook-extensible, plus the dense tick helper
        chains.insert(56, ChainConfig {
            chain_id: 56,
            wrapped_native: address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"),
            classic_pool_deployer: address!("41ff9AA7e16B8B1a8a8dc4f0eFacd93D02d071c9"),
            classic_init_code_hash: b256!("6ce8eb472fa82df5469c6ab680d90b35e3e8eaa1f2e04d49eacbcfcc1a518d97"),
            classic_tick_lens: Some(address!("9a489505a00cE272eAa5e07Dba6491314CaE3796")),
            fee_tiers: vec![
                FeeTier { fee: 100, tick_spacing: 1 },
                FeeTier { fee: 500, tick_spacing: 10 },
                FeeTier { fee: 2500, tick_spacing: 50 },
                FeeTier { fee: 10000, tick_spacing: 200 },
            ],
            cl_pool_manager: Some(address!("a0ffb9c1ce1fe56963b0321b32e7a0302114058b")),
            cl_tick_lens: Some(address!("d06ffd8b9b2d1bea29fa1b1b0b51e0d5b7e5f0aa")),
            hook_presets: vec![
                no_hook_preset(100, 1),
                no_hook_preset(500, 10),
                no_hook_preset(2500, 50),
                no_hook_preset(10000, 200),
            ],
            compact_helper: Some(address!("3c95b2c5eccb3a0b5eb9e153ba5b4b8c9b6f1d84")),
        });

        // Base - classic pools only
        chains.insert(8453, ChainConfig {
            chain_id: 8453,
            wrapped_native: address!("4200000000000000000000000000000000000006"),
            classic_pool_deployer: address!("33128a8fC17869897dcE68Ed026d694621f6FDfD"),
            classic_init_code_hash: b256!("e34f199b19b2b4f47f68442619d555527d244f78a3297ea89325f843f87b8b54"),
            classic_tick_lens: Some(address!("3d4e44Eb1374240CE5F1B871ab261CD16335B76a")),
            fee_tiers: vec![
                FeeTier { fee: 100, tick_spacing: 1 },
                FeeTier { fee: 500, tick_spacing: 10 },
                FeeTier { fee: 3000, tick_spacing: 60 },
                FeeTier { fee: 10000, tick_spacing: 200 },
            ],
            cl_pool_manager: None,
            cl_tick_lens: None,
            hook_presets: Vec::new(),
            compact_helper: None,
        });

        chains
    };
}
