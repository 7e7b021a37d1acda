//! Hash positions and fingerprints.
//!
//! Each of the `depth` rows gets its own xxh3 seed, derived from a fixed odd
//! multiplier so the row hashes are independent of each other. The fingerprint
//! uses a separate seed outside the row-seed sequence; it identifies the item
//! that currently owns a bucket and is never used for placement.

use xxhash_rust::xxh3::xxh3_64_with_seed;

const ROW_SEED_MULTIPLIER: u64 = 0x517c_c1b7_2722_0a95;
const FINGERPRINT_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Seed for row `row`'s hash function.
#[inline]
fn row_seed(row: usize) -> u64 {
    ROW_SEED_MULTIPLIER.wrapping_mul(row as u64 + 1)
}

/// Bucket column for `item` in row `row` of a grid `width` buckets wide.
#[inline]
pub fn bucket_index(item: &[u8], row: usize, width: usize) -> usize {
    (xxh3_64_with_seed(item, row_seed(row)) % width as u64) as usize
}

/// Ownership fingerprint for `item`.
///
/// Distinct items may share a fingerprint; the grid treats them as one.
#[inline]
pub fn fingerprint(item: &[u8]) -> u64 {
    xxh3_64_with_seed(item, FINGERPRINT_SEED)
}
