// Derived from code in LLVM, which is:
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception

use std::borrow::Cow;

use bitflags::bitflags;
use tracing::trace;

use crate::archive::*;
use crate::error::{Error, Result};
use crate::magic::{identify_magic, FileMagic};

bitflags! {
    /// Properties of an archive member discovered while decoding its header.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct MemberFlags: u8 {
        /// The name is stored outside the 16-byte name field.
        const HAS_LONG_FILENAME = 1 << 0;
        /// The member is the long filename table.
        const STRING_TABLE = 1 << 1;
        /// The member is a GNU/SVR4 symbol table.
        const SVR4_SYMBOL_TABLE = 1 << 2;
        /// The member is a BSD symbol table.
        const BSD4_SYMBOL_TABLE = 1 << 3;
        /// The payload starts with a bitcode magic.
        const BITCODE = 1 << 4;
    }
}

/// One entry of an archive.
///
/// A member never owns its bytes: both the name and the payload are views
/// into the archive data, so a member cannot outlive the mapping it was
/// decoded from.
#[derive(Clone, Debug)]
pub struct Member<'data> {
    name: &'data [u8],
    offset: usize,
    data: &'data [u8],
    mtime: u64,
    uid: u32,
    gid: u32,
    mode: u32,
    flags: MemberFlags,
}

impl<'data> Member<'data> {
    /// The decoded member name.
    pub fn name(&self) -> &'data [u8] {
        self.name
    }

    /// The member name for display purposes.
    pub fn path(&self) -> Cow<'data, str> {
        String::from_utf8_lossy(self.name)
    }

    /// Absolute offset of the member header within the archive.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The payload, excluding any inline name and the padding byte.
    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Modification time in seconds since the epoch.
    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn flags(&self) -> MemberFlags {
        self.flags
    }

    pub fn is_bitcode(&self) -> bool {
        self.flags.contains(MemberFlags::BITCODE)
    }

    pub fn is_string_table(&self) -> bool {
        self.flags.contains(MemberFlags::STRING_TABLE)
    }

    /// Whether this is a native symbol table, which this reader skips.
    pub fn is_foreign_symbol_table(&self) -> bool {
        self.flags
            .intersects(MemberFlags::SVR4_SYMBOL_TABLE | MemberFlags::BSD4_SYMBOL_TABLE)
    }

    pub fn has_long_filename(&self) -> bool {
        self.flags.contains(MemberFlags::HAS_LONG_FILENAME)
    }

    /// Classifies the whole payload, including native object formats.
    pub fn file_magic(&self) -> FileMagic {
        identify_magic(self.data)
    }
}

/// How the 16-byte name field of a header is to be read.
#[derive(Debug, PartialEq, Eq)]
enum NameEncoding<'data> {
    /// `#1/N`: the name is the first `N` bytes of the payload.
    Inline { len: usize },
    /// `//`: this member is the long filename table.
    StringTable,
    /// `/` or `/SYM64/`: GNU/SVR4 symbol table.
    Svr4SymbolTable,
    /// `__.SYMDEF`: BSD symbol table.
    Bsd4SymbolTable,
    /// `/N`: the name starts at offset `N` of the long filename table.
    StringTableIndex { index: usize },
    /// Short name terminated by `/`, or filling the whole field.
    Literal(&'data [u8]),
}

fn parse_number(field: &[u8], radix: u32) -> Option<u64> {
    let digits = field.trim_ascii();
    if digits.is_empty() {
        return Some(0);
    }
    if !digits.iter().all(|b| (*b as char).is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(std::str::from_utf8(digits).ok()?, radix).ok()
}

fn parse_field<T: TryFrom<u64>>(
    field: &[u8],
    radix: u32,
    name: &'static str,
    offset: usize,
) -> Result<T> {
    parse_number(field, radix)
        .and_then(|value| T::try_from(value).ok())
        .ok_or(Error::InvalidHeaderField {
            field: name,
            offset,
        })
}

fn classify_name(name: &[u8; 16], offset: usize) -> Result<NameEncoding<'_>> {
    if let Some(digits) = name.strip_prefix(INLINE_NAME_PREFIX) {
        if !digits.first().is_some_and(u8::is_ascii_digit) {
            return Err(Error::InvalidLongFilename { offset });
        }
        let len = parse_number(digits, 10)
            .and_then(|len| usize::try_from(len).ok())
            .ok_or(Error::InvalidLongFilename { offset })?;
        return Ok(NameEncoding::Inline { len });
    }

    Ok(match name {
        STRTAB_NAME => NameEncoding::StringTable,
        SVR4_SYMTAB_NAME | SVR4_SYMTAB64_NAME => NameEncoding::Svr4SymbolTable,
        BSD4_SYMTAB_NAME | BSD4_SORTED_SYMTAB_NAME => NameEncoding::Bsd4SymbolTable,
        [b'/', b'/', ..] => return Err(Error::InvalidStringTableName { offset }),
        [b'/', b' ', ..] => return Err(Error::InvalidSymbolTableName { offset }),
        [b'/', first, ..] if first.is_ascii_digit() => NameEncoding::StringTableIndex {
            index: parse_field(&name[1..], 10, "name", offset)?,
        },
        _ => {
            let end = name.iter().position(|&b| b == b'/').unwrap_or(name.len());
            NameEncoding::Literal(&name[..end])
        }
    })
}

fn lookup_string_table(table: &[u8], index: usize) -> Result<&[u8]> {
    if index >= table.len() {
        return Err(Error::NameIndexOutOfRange {
            index,
            len: table.len(),
        });
    }
    let names = &table[index..];
    let end = names
        .windows(STRTAB_NAME_TERMINATOR.len())
        .position(|w| w == STRTAB_NAME_TERMINATOR)
        .ok_or(Error::MissingNameTerminator { index })?;
    Ok(&names[..end])
}

/// Decodes the member whose header starts at `*offset`.
///
/// On success `*offset` is left at the first byte of the member's payload,
/// which for `#1/N` names is past the inline name. `string_table` is the long
/// filename table read so far, if any.
pub(crate) fn parse_member_header<'data>(
    data: &'data [u8],
    offset: &mut usize,
    string_table: Option<&'data [u8]>,
) -> Result<Member<'data>> {
    let header_offset = *offset;
    let (header, _) = data
        .get(header_offset..)
        .and_then(|rest| object::pod::from_bytes::<Header>(rest).ok())
        .ok_or(Error::UnexpectedEof {
            offset: header_offset,
        })?;

    if header.terminator != TERMINATOR {
        return Err(Error::InvalidMemberSignature {
            offset: header_offset,
        });
    }

    let mut size: usize = parse_field(&header.size, 10, "size", header_offset)?;
    let mut payload_offset = header_offset + MEMBER_HEADER_SIZE;
    let available = data.len() - payload_offset;
    if size > available {
        return Err(Error::InvalidMemberSize {
            offset: header_offset,
            size,
            available,
        });
    }

    let mut flags = MemberFlags::empty();
    let name: &'data [u8] = match classify_name(&header.name, header_offset)? {
        NameEncoding::Inline { len } => {
            if len > size {
                return Err(Error::InvalidLongFilename {
                    offset: header_offset,
                });
            }
            let raw = &data[payload_offset..payload_offset + len];
            payload_offset += len;
            size -= len;
            flags |= MemberFlags::HAS_LONG_FILENAME;
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            &raw[..end]
        }
        NameEncoding::StringTable => {
            flags |= MemberFlags::STRING_TABLE;
            header.name.trim_ascii_end()
        }
        NameEncoding::Svr4SymbolTable => {
            flags |= MemberFlags::SVR4_SYMBOL_TABLE;
            header.name.trim_ascii_end()
        }
        NameEncoding::Bsd4SymbolTable => {
            flags |= MemberFlags::BSD4_SYMBOL_TABLE;
            header.name.trim_ascii_end()
        }
        NameEncoding::StringTableIndex { index } => {
            let table = string_table.ok_or(Error::MissingStringTable {
                offset: header_offset,
            })?;
            flags |= MemberFlags::HAS_LONG_FILENAME;
            lookup_string_table(table, index)?
        }
        NameEncoding::Literal(name) => name,
    };

    let payload = &data[payload_offset..payload_offset + size];
    if payload
        .get(..4)
        .is_some_and(|prefix| identify_magic(prefix).is_bitcode())
    {
        flags |= MemberFlags::BITCODE;
    }

    let member = Member {
        name,
        offset: header_offset,
        data: payload,
        mtime: parse_field(&header.date, 10, "date", header_offset)?,
        uid: parse_field(&header.uid, 10, "uid", header_offset)?,
        gid: parse_field(&header.gid, 10, "gid", header_offset)?,
        mode: parse_field(&header.mode, 8, "mode", header_offset)?,
        flags,
    };
    trace!(
        offset = header_offset,
        name = %member.path(),
        size,
        flags = ?flags,
        "decoded member header"
    );

    *offset = payload_offset;
    Ok(member)
}
