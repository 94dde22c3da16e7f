// Derived from code in LLVM, which is:
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception

//! Classification of member payloads by their leading bytes.

/// Raw bitcode stream: `'B' 'C' 0xC0DE`.
pub const BITCODE_MAGIC: [u8; 4] = [b'B', b'C', 0xc0, 0xde];

/// Bitcode wrapper header, as written by Darwin toolchains.
pub const BITCODE_WRAPPER_MAGIC: [u8; 4] = [0xde, 0xc0, 0x17, 0x0b];

/// What a member payload looks like.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileMagic {
    Bitcode,
    BitcodeWrapper,
    /// A native object file recognized by the `object` crate.
    Native(object::FileKind),
    Unknown,
}

impl FileMagic {
    pub fn is_bitcode(self) -> bool {
        matches!(self, FileMagic::Bitcode | FileMagic::BitcodeWrapper)
    }
}

/// Identifies the format of `buf`.
///
/// Bitcode is recognized from the first four bytes alone, anything else is
/// handed to [`object::FileKind::parse`].
pub fn identify_magic(buf: &[u8]) -> FileMagic {
    match buf.get(..4) {
        Some(prefix) if prefix == BITCODE_MAGIC => return FileMagic::Bitcode,
        Some(prefix) if prefix == BITCODE_WRAPPER_MAGIC => return FileMagic::BitcodeWrapper,
        _ => {}
    }
    match object::FileKind::parse(buf) {
        Ok(kind) => FileMagic::Native(kind),
        Err(_) => FileMagic::Unknown,
    }
}
