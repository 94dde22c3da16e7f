// Derived from code in LLVM, which is:
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception

/// Members start on even offsets.
pub(crate) const MEMBER_ALIGNMENT: usize = 2;

/// Returns the first multiple of `align` that is greater than or equal to
/// `value`. `align` must be a power of two.
pub(crate) fn align_to(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    value.saturating_add(align - 1) & !(align - 1)
}

/// Returns the offset of the header that follows a payload ending at
/// `payload_end`.
pub(crate) fn next_member_offset(payload_end: usize) -> usize {
    align_to(payload_end, MEMBER_ALIGNMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_odd_offsets_by_one() {
        assert_eq!(next_member_offset(68), 68);
        assert_eq!(next_member_offset(69), 70);
        assert_eq!(align_to(13, 8), 16);
        assert_eq!(align_to(0, 8), 0);
    }
}
