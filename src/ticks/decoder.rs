//! Packed tick word decoding.
//!
//! The compact tick helper returns ticks as raw bytes, one 256-bit word per
//! tick: the upper 128 bits are the signed tick index, the lower 128 bits the
//! signed liquidityNet, both two's complement. No liquidityGross on the wire;
//! it is reconstructed as |liquidityNet|.

use alloy_primitives::U256;
use std::collections::BTreeMap;

use super::TickRecord;

/// Decode a packed tick payload into records sorted ascending by index.
///
/// - A trailing partial word is ignored, not an error.
/// - An empty payload is a valid "no ticks" result.
/// - Duplicate indices collapse to the last-written record.
/// - Words whose index does not fit a valid tick range are discarded as
///   corrupt helper output.
pub fn decode_packed_ticks(data: &[u8]) -> Vec<TickRecord> {
    if data.is_empty() {
        return Vec::new();
    }

    let low_mask = U256::from(u128::MAX);
    let mut by_index: BTreeMap<i32, TickRecord> = BTreeMap::new();

    for word in data.chunks_exact(32) {
        let value = U256::from_be_slice(word);

        // u128 -> i128 reinterprets the two's complement bit pattern,
        // which is exactly the 128-bit sign extension we need.
        let index_wide = (value >> 128usize).to::<u128>() as i128;
        let liquidity_net = (value & low_mask).to::<u128>() as i128;

        let index = match i32::try_from(index_wide) {
            Ok(i) => i,
            Err(_) => continue,
        };

        by_index.insert(
            index,
            TickRecord {
                index,
                liquidity_net,
                liquidity_gross: liquidity_net.unsigned_abs(),
            },
        );
    }

    by_index.into_values().collect()
}
