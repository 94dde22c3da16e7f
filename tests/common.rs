#![allow(dead_code)]

use std::cell::Cell;
use std::io::Write;

use ar_archive_reader::{ModuleReader, BITCODE_MAGIC};

/// Writes archives byte by byte, the way `ar` lays them out.
pub struct ArchiveBuilder {
    bytes: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        ArchiveBuilder {
            bytes: b"!<arch>\n".to_vec(),
        }
    }

    /// Offset at which the next member header will be written.
    pub fn offset(&self) -> usize {
        self.bytes.len()
    }

    fn header(&mut self, name_field: &str, size: usize) {
        write!(
            self.bytes,
            "{:<16}{:<12}{:<6}{:<6}{:<8o}{:<10}`\n",
            name_field, 0, 0, 0, 0o644, size
        )
        .unwrap();
    }

    fn pad(&mut self) {
        if self.bytes.len() % 2 != 0 {
            self.bytes.push(b'\n');
        }
    }

    /// Adds a member whose 16-byte name field is written verbatim.
    pub fn raw(mut self, name_field: &str, payload: &[u8]) -> Self {
        self.header(name_field, payload.len());
        self.bytes.extend_from_slice(payload);
        self.pad();
        self
    }

    /// Adds a member with a short GNU style name.
    pub fn member(self, name: &str, payload: &[u8]) -> Self {
        assert!(name.len() < 16);
        self.raw(&format!("{name}/"), payload)
    }

    /// Adds a member with a BSD style name stored after the header.
    pub fn inline_named(mut self, name: &str, name_len: usize, payload: &[u8]) -> Self {
        assert!(name.len() <= name_len);
        self.header(&format!("#1/{name_len}"), name_len + payload.len());
        self.bytes.extend_from_slice(name.as_bytes());
        self.bytes.resize(self.bytes.len() + name_len - name.len(), 0);
        self.bytes.extend_from_slice(payload);
        self.pad();
        self
    }

    pub fn symbol_table(self, payload: &[u8]) -> Self {
        self.raw("/", payload)
    }

    pub fn bsd_symbol_table(self, payload: &[u8]) -> Self {
        self.raw("__.SYMDEF", payload)
    }

    pub fn string_table(self, names: &[&str]) -> Self {
        let table: String = names.iter().map(|name| format!("{name}/\n")).collect();
        self.raw("//", table.as_bytes())
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// A toy module format: the bitcode magic followed by lines of text.
///
/// `define NAME` lines declare symbols. A `corrupt` line makes a full parse
/// fail while symbol extraction and lazy loading still succeed. An
/// `unreadable` line makes every entry point fail.
pub fn bitcode(lines: &[&str]) -> Vec<u8> {
    let mut payload = BITCODE_MAGIC.to_vec();
    for line in lines {
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
    }
    payload
}

#[derive(Debug, PartialEq)]
pub struct ToyModule {
    pub name: String,
    pub symbols: Vec<String>,
    pub lazy: bool,
}

thread_local! {
    static PARSE_CALLS: Cell<usize> = const { Cell::new(0) };
    static LAZY_CALLS: Cell<usize> = const { Cell::new(0) };
    static SYMBOL_CALLS: Cell<usize> = const { Cell::new(0) };
}

/// Number of calls into each reader entry point made by this test thread, as
/// `(parse, lazy, symbols)`.
pub fn reader_calls() -> (usize, usize, usize) {
    (
        PARSE_CALLS.with(Cell::get),
        LAZY_CALLS.with(Cell::get),
        SYMBOL_CALLS.with(Cell::get),
    )
}

fn lines(buf: &[u8]) -> Result<Vec<&str>, String> {
    let body = buf
        .strip_prefix(&BITCODE_MAGIC[..])
        .ok_or_else(|| "invalid bitcode signature".to_string())?;
    let text = std::str::from_utf8(body).map_err(|err| err.to_string())?;
    let lines: Vec<&str> = text.lines().collect();
    if lines.contains(&"unreadable") {
        return Err("malformed block record".to_string());
    }
    Ok(lines)
}

fn toy_module(name: &str, lines: &[&str], lazy: bool) -> ToyModule {
    ToyModule {
        name: name.to_string(),
        symbols: lines
            .iter()
            .filter_map(|line| line.strip_prefix("define "))
            .map(str::to_string)
            .collect(),
        lazy,
    }
}

fn parse_module(name: &str, buf: &[u8]) -> Result<ToyModule, String> {
    PARSE_CALLS.with(|calls| calls.set(calls.get() + 1));
    let lines = lines(buf)?;
    if lines.contains(&"corrupt") {
        return Err("invalid record".to_string());
    }
    Ok(toy_module(name, &lines, false))
}

fn lazy_module(name: &str, buf: &[u8]) -> Result<ToyModule, String> {
    LAZY_CALLS.with(|calls| calls.set(calls.get() + 1));
    let lines = lines(buf)?;
    Ok(toy_module(name, &lines, true))
}

fn get_symbols(
    name: &str,
    buf: &[u8],
    f: &mut dyn FnMut(&[u8]),
) -> Result<ToyModule, String> {
    SYMBOL_CALLS.with(|calls| calls.set(calls.get() + 1));
    let lines = lines(buf)?;
    let module = toy_module(name, &lines, true);
    for symbol in &module.symbols {
        f(symbol.as_bytes());
    }
    Ok(module)
}

pub const TOY_READER: ModuleReader<ToyModule> = ModuleReader {
    parse_module,
    lazy_module,
    get_symbols,
};
