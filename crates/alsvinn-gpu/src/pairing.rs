//! Index pairing for in-place gate dispatch.
//!
//! A single-qubit gate touches `2^(n-1)` disjoint amplitude pairs, each pair
//! differing only in the target bit. Every parallel unit of work owns exactly
//! one pair: it loads both members, then stores both. Because the pairs are
//! disjoint, no unit ever reads an amplitude another unit writes in the same
//! dispatch, which is what makes the in-place update race-free.
//!
//! This module is the host-side mirror of the pairing function in
//! `statevector.wgsl`. The two must agree bit for bit; the tests below pin
//! down the properties the kernels rely on (coverage and disjointness).

/// Base index of pair `unit` for the given target bit: the index obtained by
/// inserting a 0 bit at position `target` into `unit`.
///
/// The base always has target bit 0; its partner is `base | (1 << target)`.
#[inline]
pub fn pair_base(unit: u64, target: u32) -> u64 {
    let low_mask = (1u64 << target) - 1;
    ((unit & !low_mask) << 1) | (unit & low_mask)
}

/// Both members of pair `unit`: `(base, partner)` with the target bit clear
/// and set respectively.
#[inline]
pub fn pair(unit: u64, target: u32) -> (u64, u64) {
    let base = pair_base(unit, target);
    (base, base | (1u64 << target))
}
