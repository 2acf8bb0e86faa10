//! Stream framings for the sizes table
//!
//! Textual: `[ n [size [i …]] … ]` with whitespace-separated tokens.
//! Binary: little-endian u64 count, then per entry the raw f64 size bits
//! followed by the bincode bytes of the IndexSet.
use std::io::{BufRead, Read, Write};
use tracing::error;

use crate::{
    collections::IndexSet,
    sdk::{
        api::{ChainError, ChainResult},
        wire_bytes,
    },
};

use super::table::{ModuliSizes, SizeEntry};

pub fn write_text<W: Write>(writer: &mut W, table: &ModuliSizes) -> ChainResult<()> {
    write!(writer, "[ {}", table.len()).map_err(write_failure)?;
    for entry in table.entries() {
        write!(writer, " [{} {}]", entry.size, entry.set).map_err(write_failure)?;
    }
    write!(writer, " ]").map_err(write_failure)?;
    Ok(())
}

pub fn read_text<R: BufRead>(reader: &mut R) -> ChainResult<ModuliSizes> {
    expect(reader, "[")?;
    let n: usize = parse_token(reader)?;
    let mut entries = Vec::with_capacity(n.min(1 << 20));
    for _ in 0..n {
        expect(reader, "[")?;
        let size: f64 = parse_token(reader)?;
        let set = read_set(reader)?;
        expect(reader, "]")?;
        entries.push(SizeEntry { size, set });
    }
    expect(reader, "]")?;
    Ok(ModuliSizes::from_entries(entries))
}

pub fn write_binary<W: Write>(writer: &mut W, table: &ModuliSizes) -> ChainResult<()> {
    writer
        .write_all(&(table.len() as u64).to_le_bytes())
        .map_err(write_failure)?;
    for entry in table.entries() {
        writer
            .write_all(&entry.size.to_le_bytes())
            .map_err(write_failure)?;
        writer
            .write_all(&wire_bytes::serialize(&entry.set)?)
            .map_err(write_failure)?;
    }
    Ok(())
}

pub fn read_binary<R: Read>(reader: &mut R) -> ChainResult<ModuliSizes> {
    let mut word = [0u8; 8];
    reader.read_exact(&mut word).map_err(read_failure)?;
    let n = u64::from_le_bytes(word) as usize;
    let mut entries = Vec::with_capacity(n.min(1 << 20));
    for _ in 0..n {
        reader.read_exact(&mut word).map_err(read_failure)?;
        let size = f64::from_le_bytes(word);
        let set: IndexSet = bincode::deserialize_from(&mut *reader).map_err(|err| {
            error!("binary read failure: {}", err.to_string());
            ChainError::MalformedStream
        })?;
        entries.push(SizeEntry { size, set });
    }
    Ok(ModuliSizes::from_entries(entries))
}

fn write_failure(err: std::io::Error) -> ChainError {
    error!("stream write failure: {}", err);
    ChainError::MalformedStream
}

fn read_failure(err: std::io::Error) -> ChainError {
    error!("stream read failure: {}", err);
    ChainError::MalformedStream
}

/// `[1 2 5]` as written by IndexSet's Display impl.
fn read_set<R: BufRead>(reader: &mut R) -> ChainResult<IndexSet> {
    expect(reader, "[")?;
    let mut set = IndexSet::new();
    loop {
        let token = required_token(reader)?;
        if token == "]" {
            return Ok(set);
        }
        set.insert(parse(&token)?);
    }
}

fn expect<R: BufRead>(reader: &mut R, expected: &str) -> ChainResult<()> {
    let token = required_token(reader)?;
    if token != expected {
        error!("expected token '{}', found '{}'", expected, token);
        return Err(ChainError::MalformedStream);
    }
    Ok(())
}

fn parse_token<R: BufRead, T: std::str::FromStr>(reader: &mut R) -> ChainResult<T> {
    parse(&required_token(reader)?)
}

fn parse<T: std::str::FromStr>(token: &str) -> ChainResult<T> {
    token.parse().map_err(|_| {
        error!("unparseable token '{}'", token);
        ChainError::MalformedStream
    })
}

fn required_token<R: BufRead>(reader: &mut R) -> ChainResult<String> {
    match next_token(reader)? {
        Some(token) => Ok(token),
        None => {
            error!("unexpected end of stream");
            Err(ChainError::MalformedStream)
        }
    }
}

/// Whitespace-delimited tokens; brackets always stand alone.
fn next_token<R: BufRead>(reader: &mut R) -> ChainResult<Option<String>> {
    loop {
        match peek(reader)? {
            Some(byte) if byte.is_ascii_whitespace() => reader.consume(1),
            _ => break,
        }
    }
    match peek(reader)? {
        None => Ok(None),
        Some(byte @ (b'[' | b']')) => {
            reader.consume(1);
            Ok(Some((byte as char).to_string()))
        }
        Some(_) => {
            let mut token = Vec::new();
            while let Some(byte) = peek(reader)? {
                if byte.is_ascii_whitespace() || byte == b'[' || byte == b']' {
                    break;
                }
                token.push(byte);
                reader.consume(1);
            }
            String::from_utf8(token).map(Some).map_err(|err| {
                error!("non-utf8 token in stream: {}", err);
                ChainError::MalformedStream
            })
        }
    }
}

fn peek<R: BufRead>(reader: &mut R) -> ChainResult<Option<u8>> {
    let buf = reader.fill_buf().map_err(read_failure)?;
    Ok(buf.first().copied())
}
