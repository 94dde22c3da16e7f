// Derived from code in LLVM, which is:
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception

use std::mem::size_of;

pub(crate) use object::archive::{Header, MAGIC, TERMINATOR};

/// Size of the fixed member header.
pub(crate) const MEMBER_HEADER_SIZE: usize = size_of::<Header>();

/// Name of the GNU/SVR4 long filename table.
pub(crate) const STRTAB_NAME: &[u8; 16] = b"//              ";

/// Name of the GNU/SVR4 symbol table.
pub(crate) const SVR4_SYMTAB_NAME: &[u8; 16] = b"/               ";

/// Name of the GNU symbol table with 64-bit offsets.
pub(crate) const SVR4_SYMTAB64_NAME: &[u8; 16] = b"/SYM64/         ";

/// Name of the BSD symbol table.
pub(crate) const BSD4_SYMTAB_NAME: &[u8; 16] = b"__.SYMDEF       ";

/// Name of the sorted BSD symbol table written by Darwin tools.
pub(crate) const BSD4_SORTED_SYMTAB_NAME: &[u8; 16] = b"__.SYMDEF SORTED";

/// Prefix of a BSD name stored inline after the header.
pub(crate) const INLINE_NAME_PREFIX: &[u8] = b"#1/";

/// Terminator of a name in the long filename table.
pub(crate) const STRTAB_NAME_TERMINATOR: &[u8] = b"/\n";

const _: () = assert!(MEMBER_HEADER_SIZE == 60);
