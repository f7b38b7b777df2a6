/// Number of bits needed to represent `fanout` distinct values, i.e. `ceil(log2(fanout))`.
///
/// `fanout <= 1` needs no bits: a single child per step never grows the address space.
pub fn ceil_log2(fanout: u32) -> u32 {
    if fanout <= 1 {
        0
    } else {
        32 - (fanout - 1).leading_zeros()
    }
}

/// Per-layer spatial bit budget `S_l` for `l` in `1..=layer_count`, index 0 == layer 1.
///
/// `S_1` is the atomic (layer 1) budget; each coarser layer loses `ceil(log2(fanout))`
/// bits, clamped at 1 so no layer ever loses addressability entirely.
pub fn compute_bitmasks(layer_count: u8, fanout: u32, s_bits_atomic: u8) -> Vec<u8> {
    let step = ceil_log2(fanout) as i32;
    (0..layer_count as i32)
        .map(|i| (s_bits_atomic as i32 - i * step).max(1) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log2_steps() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(4), 2);
        assert_eq!(ceil_log2(8), 3);
    }

    #[test]
    fn shrinks_by_one_bit_per_layer_for_fanout_two() {
        let bits = compute_bitmasks(4, 2, 10);
        assert_eq!(bits, vec![10, 9, 8, 7]);
    }

    #[test]
    fn clamps_at_one() {
        let bits = compute_bitmasks(20, 2, 5);
        assert!(bits.iter().all(|&b| b >= 1));
        assert_eq!(bits[19], 1);
    }
}
