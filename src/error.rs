// Derived from code in LLVM, which is:
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception

//! Error types for archive loading and symbol resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive bytes are not well formed.
    Format,
    /// A member declares more payload than the archive holds.
    Size,
    /// The module reader failed on a member payload.
    Parse,
    /// The archive file could not be opened or mapped.
    Io,
    /// The archive is not in a usable state.
    State,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to open archive '{path}': {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to memory map archive '{path}': {source}")]
    MemoryMap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid signature for an archive file")]
    InvalidSignature,

    #[error("unexpected end of file at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("invalid file member signature at offset {offset}")]
    InvalidMemberSignature { offset: usize },

    #[error("invalid `{field}` field in member header at offset {offset}")]
    InvalidHeaderField { field: &'static str, offset: usize },

    #[error("invalid long filename in member header at offset {offset}")]
    InvalidLongFilename { offset: usize },

    #[error("invalid string table name at offset {offset}")]
    InvalidStringTableName { offset: usize },

    #[error("invalid SVR4 symbol table name at offset {offset}")]
    InvalidSymbolTableName { offset: usize },

    #[error("member at offset {offset} refers to a string table that has not been read")]
    MissingStringTable { offset: usize },

    #[error("name index {index} beyond string table of {len} bytes")]
    NameIndexOutOfRange { index: usize, len: usize },

    #[error("missing name terminator in string table at index {index}")]
    MissingNameTerminator { index: usize },

    #[error("invalid member length in archive file: {size} bytes at offset {offset}, {available} available")]
    InvalidMemberSize {
        offset: usize,
        size: usize,
        available: usize,
    },

    #[error("symbol offset {offset} lies outside the archive")]
    SymbolOffsetOutOfRange { offset: usize },

    #[error("can't parse bitcode member {member}: {message}")]
    ModuleParse { member: String, message: String },

    #[error("archive is not loaded")]
    NotLoaded,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileOpen { .. } | Error::MemoryMap { .. } => ErrorKind::Io,
            Error::InvalidSignature
            | Error::UnexpectedEof { .. }
            | Error::InvalidMemberSignature { .. }
            | Error::InvalidHeaderField { .. }
            | Error::InvalidLongFilename { .. }
            | Error::InvalidStringTableName { .. }
            | Error::InvalidSymbolTableName { .. }
            | Error::MissingStringTable { .. }
            | Error::NameIndexOutOfRange { .. }
            | Error::MissingNameTerminator { .. }
            | Error::SymbolOffsetOutOfRange { .. } => ErrorKind::Format,
            Error::InvalidMemberSize { .. } => ErrorKind::Size,
            Error::ModuleParse { .. } => ErrorKind::Parse,
            Error::NotLoaded => ErrorKind::State,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
