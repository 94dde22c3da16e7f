//! Reads Unix `ar` archives of bitcode modules and resolves symbols to the
//! member that defines them, loading only the modules that are asked for.

mod alignment;
mod archive;
mod error;
mod magic;
mod mapping;
mod member;
mod reader;

pub use error::{Error, ErrorKind, Result};
pub use magic::{identify_magic, FileMagic, BITCODE_MAGIC, BITCODE_WRAPPER_MAGIC};
pub use mapping::ArchiveFile;
pub use member::{Member, MemberFlags};
pub use reader::Archive;

/// Parses a member payload into a module. The first argument names the
/// payload as `archive(member)`; failures are reported as a message.
pub type ParseModuleFn<M> = fn(name: &str, buf: &[u8]) -> std::result::Result<M, String>;
/// Reports every symbol defined by a member payload to the callback and
/// returns a module that may be only partially materialized.
pub type GetSymbolsFn<M> =
    fn(name: &str, buf: &[u8], f: &mut dyn FnMut(&[u8])) -> std::result::Result<M, String>;

/// Helper struct to turn member payloads into modules of type `M`.
pub struct ModuleReader<M> {
    /// Fully parses a payload.
    pub parse_module: ParseModuleFn<M>,
    /// Parses a payload, deferring as much work as possible.
    pub lazy_module: ParseModuleFn<M>,
    /// Extracts the defined symbols of a payload.
    pub get_symbols: GetSymbolsFn<M>,
}
