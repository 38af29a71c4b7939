//! Tick bitmap window planning.
//!
//! On-chain, initialized ticks are flagged in 256-bit bitmap words keyed by
//! `floor(tick / tickSpacing / 256)`. The planner decides which word indices
//! to query around a pool's current tick so the lens pass covers the price
//! band a swap simulation can realistically traverse.

use crate::pools::PoolFamily;

/// Ticks per bitmap word, matching the on-chain packing.
pub const TICKS_PER_WORD: i32 = 256;

/// Scan radius around the current tick for classic pools, in tick units
/// (~one price doubling at 1.0001 per tick).
pub const CLASSIC_SCAN_RADIUS: i32 = 7000;

/// Scan radius for hook-extensible pools. Liquidity on these tends to sit
/// much closer to the current price, so a narrower band suffices.
pub const HOOK_SCAN_RADIUS: i32 = 3500;

/// Fixed scan radius for a pool family, in tick units.
pub fn scan_radius(family: PoolFamily) -> i32 {
    match family {
        PoolFamily::Classic => CLASSIC_SCAN_RADIUS,
        PoolFamily::HookExtensible => HOOK_SCAN_RADIUS,
    }
}

/// Bitmap word index containing `tick` for a pool with `tick_spacing`.
///
/// Both divisions floor toward negative infinity, matching the contract-side
/// arithmetic for negative ticks.
pub fn bitmap_word_index(tick: i32, tick_spacing: i32) -> i16 {
    debug_assert!(tick_spacing > 0);
    tick.div_euclid(tick_spacing).div_euclid(TICKS_PER_WORD) as i16
}

/// All bitmap word indices whose tick range intersects
/// `[current_tick - radius, current_tick + radius]`, gapless and ascending.
pub fn plan_bitmap_windows(current_tick: i32, tick_spacing: i32, family: PoolFamily) -> Vec<i16> {
    let radius = scan_radius(family);
    let min_word = bitmap_word_index(current_tick - radius, tick_spacing);
    let max_word = bitmap_word_index(current_tick + radius, tick_spacing);
    (min_word..=max_word).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_index_floors_toward_negative_infinity() {
        assert_eq!(bitmap_word_index(0, 60), 0);
        assert_eq!(bitmap_word_index(100, 60), 0);
        assert_eq!(bitmap_word_index(-1, 60), -1);
        assert_eq!(bitmap_word_index(-60 * 256, 60), -1);
        assert_eq!(bitmap_word_index(-60 * 256 - 60, 60), -2);
        assert_eq!(bitmap_word_index(60 * 256, 60), 1);
    }

    #[test]
    fn windows_cover_current_tick_word() {
        let words = plan_bitmap_windows(100, 60, PoolFamily::Classic);
        assert!(words.contains(&bitmap_word_index(100, 60)));
        assert!(words.contains(&0));
    }

    #[test]
    fn windows_are_gapless_and_ascending() {
        for &(tick, spacing) in &[(100, 60), (-44523, 10), (887000, 200), (-1, 1)] {
            let words = plan_bitmap_windows(tick, spacing, PoolFamily::Classic);
            assert!(!words.is_empty());
            for pair in words.windows(2) {
                assert_eq!(pair[1], pair[0] + 1);
            }
        }
    }

    #[test]
    fn windows_contain_every_word_in_radius() {
        let (tick, spacing) = (12345, 10);
        let words = plan_bitmap_windows(tick, spacing, PoolFamily::HookExtensible);
        let radius = scan_radius(PoolFamily::HookExtensible);
        for t in (tick - radius..=tick + radius).step_by(spacing as usize) {
            assert!(words.contains(&bitmap_word_index(t, spacing)));
        }
    }

    #[test]
    fn planning_is_idempotent() {
        let a = plan_bitmap_windows(-3000, 10, PoolFamily::HookExtensible);
        let b = plan_bitmap_windows(-3000, 10, PoolFamily::HookExtensible);
        assert_eq!(a, b);
    }

    #[test]
    fn hook_radius_is_narrower_than_classic() {
        let classic = plan_bitmap_windows(0, 1, PoolFamily::Classic);
        let hooked = plan_bitmap_windows(0, 1, PoolFamily::HookExtensible);
        assert!(hooked.len() < classic.len());
    }
}
