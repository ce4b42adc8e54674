//! Packed-short (un)packing for the post-1.16 "no value spans two longs"
//! palette layout (spec.md §4.1).

/// Number of values packed into each `i64` for a payload of `n` values
/// spread across `data_len` longs: `ceil(n / data_len)`.
pub fn shorts_per_long(n: usize, data_len: usize) -> usize {
    if data_len == 0 {
        return 1;
    }
    (n + data_len - 1) / data_len
}

/// Bits used per packed value, derived from how many longs actually back
/// `n` values.
pub fn bits_per_value(n: usize, data_len: usize) -> u32 {
    let spl = shorts_per_long(n, data_len).max(1);
    (64 / spl) as u32
}

/// Unpacks `n` values from `data`, deriving `bits_per_value` from `data`'s
/// length the way a real chunk section's `data` long-array is sized.
pub fn unpack(data: &[i64], n: usize) -> Vec<u32> {
    if data.is_empty() {
        return vec![0; n];
    }
    let bpv = bits_per_value(n, data.len());
    unpack_bits(data, n, bpv)
}

/// Unpacks `n` values from `data` using an explicit `bits_per_value`
/// (exposed so tests can round-trip arbitrary bit widths; chunk decoding
/// itself always goes through [`unpack`]).
pub fn unpack_bits(data: &[i64], n: usize, bits_per_value: u32) -> Vec<u32> {
    let mut out = vec![0u32; n];
    if bits_per_value == 0 {
        return out;
    }
    let spl = (64 / bits_per_value) as usize;
    let mask = (1u64 << bits_per_value) - 1;
    for (j, long) in data.iter().enumerate() {
        let long = *long as u64;
        for i in 0..spl {
            let idx = j * spl + i;
            if idx >= n {
                break;
            }
            out[idx] = ((long >> (i as u32 * bits_per_value)) & mask) as u32;
        }
    }
    out
}

/// Packs `values` at `bits_per_value` bits each, one value-group per `i64`,
/// no value spanning two longs. Used only by tests to construct fixtures
/// for the round-trip property (spec.md §8 item 2).
pub fn pack(values: &[u32], bits_per_value: u32) -> Vec<i64> {
    let spl = (64 / bits_per_value) as usize;
    let longs_needed = (values.len() + spl - 1) / spl.max(1);
    let mask = (1u64 << bits_per_value) - 1;
    let mut out = vec![0i64; longs_needed.max(1)];
    for (idx, v) in values.iter().enumerate() {
        let j = idx / spl;
        let i = idx % spl;
        out[j] |= (((*v as u64) & mask) << (i as u32 * bits_per_value)) as i64;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pack_unpack_round_trips_for_common_bit_widths() {
        for bits in 4..=12u32 {
            let max_value = (1u32 << bits) - 1;
            let values: Vec<u32> = (0..4096).map(|i| (i as u32 * 7) % (max_value + 1)).collect();
            let packed = pack(&values, bits);
            let unpacked = unpack(&packed, values.len());
            assert_eq!(unpacked, values, "round trip failed for bits_per_value={bits}");
        }
    }

    #[test]
    fn biome_sized_payload_round_trips() {
        for bits in 1..=6u32 {
            let max_value = (1u32 << bits) - 1;
            let values: Vec<u32> = (0..64).map(|i| (i as u32 * 3) % (max_value + 1)).collect();
            let packed = pack(&values, bits);
            let unpacked = unpack(&packed, values.len());
            assert_eq!(unpacked, values);
        }
    }

    proptest! {
        #[test]
        fn arbitrary_values_round_trip(bits in 4u32..=12, seed in 0u32..10_000) {
            let max_value = (1u32 << bits) - 1;
            let values: Vec<u32> = (0..4096u32)
                .map(|i| (i.wrapping_mul(2654435761).wrapping_add(seed)) % (max_value + 1))
                .collect();
            let packed = pack(&values, bits);
            let unpacked = unpack(&packed, values.len());
            prop_assert_eq!(unpacked, values);
        }
    }

    #[test]
    fn size_17_palette_needs_five_bits_and_342_longs() {
        // Post-1.16 layout never spans a value across two longs: 12 values
        // per long at 5 bits each, so 4096 values need ceil(4096/12) = 342.
        let bits = bits_per_value(4096, 342);
        assert_eq!(bits, 5);
        let values: Vec<u32> = (0..4096).map(|i| (i % 17) as u32).collect();
        let packed = pack(&values, 5);
        assert_eq!(packed.len(), 342);
        assert_eq!(unpack(&packed, 4096), values);
    }
}
