// Derived from code in LLVM, which is:
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::alignment::next_member_offset;
use crate::archive::MAGIC;
use crate::error::{Error, Result};
use crate::member::{parse_member_header, Member};
use crate::ModuleReader;

/// An `ar` archive of bitcode modules.
///
/// The archive borrows its bytes. Symbols are indexed on first use, and every
/// module loaded while resolving symbols is cached, keyed by the absolute
/// offset of its member header, until the archive is dropped.
pub struct Archive<'data, M: 'static> {
    data: &'data [u8],
    name: String,
    reader: &'static ModuleReader<M>,
    members: Vec<Member<'data>>,
    /// Symbol name to member offset relative to `first_file_offset`.
    symbols: HashMap<Box<[u8]>, usize>,
    modules: HashMap<usize, (M, Member<'data>)>,
    string_table: Option<&'data [u8]>,
    first_file_offset: usize,
    loaded: bool,
    indexed: bool,
}

impl<'data, M: 'static> Archive<'data, M> {
    fn new(data: &'data [u8], name: String, reader: &'static ModuleReader<M>) -> Self {
        Archive {
            data,
            name,
            reader,
            members: Vec::new(),
            symbols: HashMap::new(),
            modules: HashMap::new(),
            string_table: None,
            first_file_offset: data.len(),
            loaded: false,
            indexed: false,
        }
    }

    /// Reads every member header of `data`.
    ///
    /// `name` identifies the archive in the names handed to `reader`, which
    /// take the form `archive(member)`.
    pub fn load(
        data: &'data [u8],
        name: impl Into<String>,
        reader: &'static ModuleReader<M>,
    ) -> Result<Self> {
        let mut archive = Archive::new(data, name.into(), reader);
        archive.load_archive()?;
        Ok(archive)
    }

    /// Reads `data` only as far as its first ordinary member.
    ///
    /// This is the cheap way to open an archive that will only be used for
    /// symbol resolution.
    pub fn load_symbols(
        data: &'data [u8],
        name: impl Into<String>,
        reader: &'static ModuleReader<M>,
    ) -> Result<Self> {
        let mut archive = Archive::new(data, name.into(), reader);
        archive.load_symbol_table()?;
        Ok(archive)
    }

    fn check_signature(&self) -> Result<()> {
        if self.data.get(..MAGIC.len()) != Some(&MAGIC[..]) {
            return Err(Error::InvalidSignature);
        }
        Ok(())
    }

    /// Scans the whole archive, collecting every ordinary member in file
    /// order. Symbol tables are skipped and the long filename table is kept
    /// for name lookups.
    ///
    /// The symbol index is discarded. Modules that were already loaded stay
    /// cached. If this fails the archive is unusable until a load succeeds.
    pub fn load_archive(&mut self) -> Result<()> {
        self.loaded = false;
        self.indexed = false;
        self.members.clear();
        self.symbols.clear();
        self.string_table = None;
        self.first_file_offset = self.data.len();

        self.check_signature()?;

        let mut at = MAGIC.len();
        let mut first_file = None;
        while at < self.data.len() {
            let start = at;
            let member = parse_member_header(self.data, &mut at, self.string_table)?;
            at = next_member_offset(at + member.size());

            if member.is_foreign_symbol_table() {
                trace!(offset = start, "skipping foreign symbol table");
            } else if member.is_string_table() {
                self.string_table = Some(member.data());
            } else {
                if first_file.is_none() {
                    first_file = Some(start);
                }
                self.members.push(member);
            }
        }

        if let Some(offset) = first_file {
            self.first_file_offset = offset;
        }
        self.loaded = true;
        debug!(
            archive = %self.name,
            members = self.members.len(),
            first_file_offset = self.first_file_offset,
            "loaded archive"
        );
        Ok(())
    }

    /// Locates the first ordinary member, skipping a leading symbol table and
    /// long filename table, and records it as the only member.
    ///
    /// The symbol index is left alone. If this fails the archive is unusable
    /// until a load succeeds.
    pub fn load_symbol_table(&mut self) -> Result<()> {
        self.loaded = false;
        self.members.clear();
        self.string_table = None;
        self.first_file_offset = self.data.len();

        self.check_signature()?;

        let mut at = MAGIC.len();
        let mut first_file = at;
        let mut member = parse_member_header(self.data, &mut at, None)?;

        if member.is_foreign_symbol_table() {
            at = next_member_offset(at + member.size());
            first_file = at;
            member = parse_member_header(self.data, &mut at, None)?;
        }

        if member.is_string_table() {
            self.string_table = Some(member.data());
            at = next_member_offset(at + member.size());
            first_file = at;
            member = parse_member_header(self.data, &mut at, self.string_table)?;
        }

        self.members.push(member);
        self.first_file_offset = first_file;
        self.loaded = true;
        debug!(
            archive = %self.name,
            first_file_offset = first_file,
            "located first archive member"
        );
        Ok(())
    }

    /// Builds the symbol index by asking the module reader for the symbols
    /// of every bitcode member from the first ordinary member onwards.
    ///
    /// The modules produced along the way are cached. Nothing is kept if any
    /// member fails to decode. When two members define the same symbol, the
    /// one further into the archive wins.
    pub fn build_symbol_table(&mut self) -> Result<()> {
        if !self.loaded {
            return Err(Error::NotLoaded);
        }

        let mut symbols = HashMap::new();
        let mut modules = Vec::new();
        let mut at = self.first_file_offset;
        while at < self.data.len() {
            let start = at;
            let relative = start - self.first_file_offset;
            let member = parse_member_header(self.data, &mut at, self.string_table)?;
            at = next_member_offset(at + member.size());

            if !member.is_bitcode() {
                continue;
            }
            let member_name = self.member_name(&member);
            let mut names = Vec::new();
            let module = (self.reader.get_symbols)(&member_name, member.data(), &mut |name: &[u8]| {
                names.push(Box::<[u8]>::from(name))
            })
            .map_err(|message| Error::ModuleParse {
                member: member_name,
                message,
            })?;
            trace!(offset = start, symbols = names.len(), "indexed bitcode member");
            for name in names {
                symbols.insert(name, relative);
            }
            modules.push((start, (module, member)));
        }

        debug!(
            archive = %self.name,
            symbols = symbols.len(),
            modules = modules.len(),
            "built symbol table"
        );
        self.symbols = symbols;
        for (offset, entry) in modules {
            self.modules.entry(offset).or_insert(entry);
        }
        self.indexed = true;
        Ok(())
    }

    /// Installs a symbol index obtained elsewhere, such as a previous run.
    ///
    /// Offsets are relative to [`Archive::first_file_offset`]. No member is
    /// read until a symbol is resolved, and the archive is not scanned again
    /// to build an index of its own.
    pub fn import_symbol_table<I, S>(&mut self, symbols: I)
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<Box<[u8]>>,
    {
        self.symbols = symbols
            .into_iter()
            .map(|(name, offset)| (name.into(), offset))
            .collect();
        self.indexed = true;
    }

    fn member_name(&self, member: &Member<'_>) -> String {
        format!("{}({})", self.name, member.path())
    }

    /// Returns the cache key of the module defining `symbol`, loading the
    /// module if it is not cached yet.
    fn load_module_defining_symbol(&mut self, symbol: &[u8]) -> Result<Option<usize>> {
        let Some(&relative) = self.symbols.get(symbol) else {
            return Ok(None);
        };

        let offset = relative
            .checked_add(self.first_file_offset)
            .ok_or(Error::SymbolOffsetOutOfRange { offset: relative })?;
        if self.modules.contains_key(&offset) {
            return Ok(Some(offset));
        }

        let mut at = offset;
        let member = parse_member_header(self.data, &mut at, self.string_table)?;
        let member_name = self.member_name(&member);
        let module = (self.reader.lazy_module)(&member_name, member.data()).map_err(|message| {
            Error::ModuleParse {
                member: member_name,
                message,
            }
        })?;
        trace!(offset, member = %member.path(), "loaded module");
        self.modules.insert(offset, (module, member));
        Ok(Some(offset))
    }

    /// Looks up `symbol` in the symbol index and returns the module that
    /// defines it.
    ///
    /// Returns `Ok(None)` if no member defines the symbol. This does not build
    /// the index; see [`Archive::find_modules_defining_symbols`].
    pub fn find_module_defining_symbol(&mut self, symbol: &[u8]) -> Result<Option<&M>> {
        if !self.loaded {
            return Err(Error::NotLoaded);
        }
        let offset = self.load_module_defining_symbol(symbol)?;
        Ok(offset
            .and_then(|offset| self.modules.get(&offset))
            .map(|(module, _)| module))
    }

    /// Resolves as many of `symbols` as possible, building the symbol index
    /// first if needed.
    ///
    /// Every resolved symbol is removed from `symbols` and the rest are left
    /// in place. Each defining module appears once in the result even if it
    /// defines several of the symbols.
    pub fn find_modules_defining_symbols(
        &mut self,
        symbols: &mut BTreeSet<Vec<u8>>,
    ) -> Result<Vec<&M>> {
        if !self.loaded {
            return Err(Error::NotLoaded);
        }
        if !self.indexed {
            self.build_symbol_table()?;
        }

        let mut seen = HashSet::new();
        let mut offsets = Vec::new();
        symbols.retain(|symbol| match self.load_module_defining_symbol(symbol) {
            Ok(Some(offset)) => {
                if seen.insert(offset) {
                    offsets.push(offset);
                }
                false
            }
            Ok(None) => true,
            Err(err) => {
                warn!(
                    symbol = %String::from_utf8_lossy(symbol),
                    error = %err,
                    "failed to load module defining symbol"
                );
                true
            }
        });

        Ok(offsets
            .iter()
            .filter_map(|offset| self.modules.get(offset))
            .map(|(module, _)| module)
            .collect())
    }

    /// Returns whether this archive holds bitcode.
    ///
    /// An archive with symbols in its index is a bitcode archive. Otherwise
    /// the archive is fully loaded and the first bitcode member, if any, must
    /// parse. Failures of any kind answer `false`.
    pub fn is_bitcode_archive(&mut self) -> bool {
        if !self.indexed {
            if let Err(err) = self.build_symbol_table() {
                warn!(archive = %self.name, error = %err, "could not index archive");
                return false;
            }
        }

        if !self.symbols.is_empty() {
            return true;
        }

        if let Err(err) = self.load_archive() {
            warn!(archive = %self.name, error = %err, "could not load archive");
            return false;
        }

        let Some(member) = self.members.iter().find(|member| member.is_bitcode()) else {
            return false;
        };
        let member_name = self.member_name(member);
        match (self.reader.parse_module)(&member_name, member.data()) {
            Ok(_) => true,
            Err(message) => {
                warn!(member = %member_name, error = %message, "bitcode member does not parse");
                false
            }
        }
    }

    /// Fully parses every bitcode member, in file order.
    pub fn get_all_modules(&self) -> Result<Vec<M>> {
        if !self.loaded {
            return Err(Error::NotLoaded);
        }
        self.members
            .iter()
            .filter(|member| member.is_bitcode())
            .map(|member| {
                let member_name = self.member_name(member);
                (self.reader.parse_module)(&member_name, member.data()).map_err(|message| {
                    Error::ModuleParse {
                        member: member_name,
                        message,
                    }
                })
            })
            .collect()
    }

    /// The name used for this archive in `archive(member)` identifiers.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    /// Whether the last load succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The members read by the last load, in file order.
    pub fn members(&self) -> std::slice::Iter<'_, Member<'data>> {
        self.members.iter()
    }

    /// Absolute offset of the first ordinary member, or the archive length if
    /// there is none. Symbol offsets are relative to it.
    pub fn first_file_offset(&self) -> usize {
        self.first_file_offset
    }

    /// The long filename table, if the archive has one.
    pub fn string_table(&self) -> Option<&'data [u8]> {
        self.string_table
    }

    /// The symbol index as `(name, relative offset)` pairs, in no particular
    /// order.
    pub fn symbols(&self) -> impl Iterator<Item = (&[u8], usize)> + '_ {
        self.symbols
            .iter()
            .map(|(name, &offset)| (&**name, offset))
    }

    /// The cached module whose member header is at absolute `offset`.
    pub fn cached_module(&self, offset: usize) -> Option<(&M, &Member<'data>)> {
        self.modules
            .get(&offset)
            .map(|(module, member)| (module, member))
    }

    pub fn cached_module_count(&self) -> usize {
        self.modules.len()
    }
}
