//! Fixed-size byte records stored inside the arenas.
//!
//! Everything the shell keeps in its memory regions (environment nodes,
//! bucket heads, parsed arguments) is written as little-endian records so
//! that no typed pointer ever points into the caller's buffer.

use crate::atom::{Atom, CommandId, StrHandle, Text};

/// Offset value meaning "no record".
pub(crate) const NIL: u32 = u32::MAX;

pub(crate) const ATOM_LEN: usize = 9;
pub(crate) const NODE_LEN: usize = 2 * ATOM_LEN + 4;
pub(crate) const ARGUMENT_LEN: usize = 1 + 2 * ATOM_LEN + 4;
pub(crate) const BUCKET_LEN: usize = 8;

const TAG_INPUT: u8 = 0;
const TAG_STORED: u8 = 1;
const TAG_EXACT: u8 = 2;
const TAG_INEXACT: u8 = 3;
const TAG_COMMAND: u8 = 4;

const KIND_ATOM: u8 = 0;
const KIND_PAIR: u8 = 1;

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes(raw.try_into().ok()?))
}

fn read_u64(bytes: &[u8], at: usize) -> Option<u64> {
    let raw = bytes.get(at..at + 8)?;
    Some(u64::from_le_bytes(raw.try_into().ok()?))
}

fn write_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_u64(bytes: &mut [u8], at: usize, value: u64) {
    bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

/// An atom as it sits in arena memory.
///
/// `Input` strings are recorded as a span of the line being evaluated and
/// only appear in argument records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Packed {
    Input { offset: u32, len: u32 },
    Stored(StrHandle),
    Exact(u64),
    Inexact(u64),
    Command(CommandId),
}

impl Packed {
    fn encode(self, out: &mut [u8]) {
        let (tag, payload) = match self {
            Packed::Input { offset, len } => {
                (TAG_INPUT, u64::from(offset) | (u64::from(len) << 32))
            }
            Packed::Stored(h) => (TAG_STORED, u64::from(h.offset) | (u64::from(h.len) << 32)),
            Packed::Exact(n) => (TAG_EXACT, n),
            Packed::Inexact(bits) => (TAG_INEXACT, bits),
            Packed::Command(id) => (TAG_COMMAND, u64::from(id.0)),
        };
        out[0] = tag;
        write_u64(out, 1, payload);
    }

    fn decode(bytes: &[u8]) -> Option<Packed> {
        let payload = read_u64(bytes, 1)?;
        let low = payload as u32;
        let high = (payload >> 32) as u32;
        match *bytes.first()? {
            TAG_INPUT => Some(Packed::Input {
                offset: low,
                len: high,
            }),
            TAG_STORED => Some(Packed::Stored(StrHandle {
                offset: low,
                len: high,
            })),
            TAG_EXACT => Some(Packed::Exact(payload)),
            TAG_INEXACT => Some(Packed::Inexact(payload)),
            TAG_COMMAND => Some(Packed::Command(CommandId(u16::try_from(payload).ok()?))),
            _ => None,
        }
    }

    /// Rebuilds the atom, resolving `Input` spans against `line`.
    pub(crate) fn unpack(self, line: &[u8]) -> Atom<'_> {
        match self {
            Packed::Input { offset, len } => {
                let begin = offset as usize;
                let bytes = line.get(begin..begin + len as usize).unwrap_or_default();
                Atom::Str(Text::Input(bytes))
            }
            Packed::Stored(h) => Atom::Str(Text::Stored(h)),
            Packed::Exact(n) => Atom::Exact(n),
            Packed::Inexact(bits) => Atom::Inexact(f64::from_bits(bits)),
            Packed::Command(id) => Atom::Command(id),
        }
    }
}

/// One link of an environment chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Node {
    pub key: Packed,
    pub value: Packed,
    pub next: u32,
}

impl Node {
    pub fn encode(&self, out: &mut [u8]) {
        self.key.encode(&mut out[..ATOM_LEN]);
        self.value.encode(&mut out[ATOM_LEN..2 * ATOM_LEN]);
        write_u32(out, 2 * ATOM_LEN, self.next);
    }

    pub fn decode(bytes: &[u8]) -> Option<Node> {
        Some(Node {
            key: Packed::decode(bytes.get(..ATOM_LEN)?)?,
            value: Packed::decode(bytes.get(ATOM_LEN..2 * ATOM_LEN)?)?,
            next: read_u32(bytes, 2 * ATOM_LEN)?,
        })
    }

    pub fn set_next(bytes: &mut [u8], next: u32) {
        write_u32(bytes, 2 * ATOM_LEN, next);
    }
}

/// Head and tail node offsets of one hashtable bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bucket {
    pub head: u32,
    pub tail: u32,
}

impl Bucket {
    pub const EMPTY: Bucket = Bucket {
        head: NIL,
        tail: NIL,
    };

    pub fn is_empty(&self) -> bool {
        self.head == NIL && self.tail == NIL
    }

    pub fn encode(&self, out: &mut [u8]) {
        write_u32(out, 0, self.head);
        write_u32(out, 4, self.tail);
    }

    pub fn decode(bytes: &[u8]) -> Option<Bucket> {
        Some(Bucket {
            head: read_u32(bytes, 0)?,
            tail: read_u32(bytes, 4)?,
        })
    }
}

/// A parsed argument, linked to the next one of the same line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ArgumentRecord {
    Atom(Packed),
    Pair { key: Packed, value: Packed },
}

impl ArgumentRecord {
    pub fn encode(&self, next: u32, out: &mut [u8]) {
        let (kind, key, value) = match *self {
            ArgumentRecord::Atom(atom) => (KIND_ATOM, atom, Packed::Exact(0)),
            ArgumentRecord::Pair { key, value } => (KIND_PAIR, key, value),
        };
        out[0] = kind;
        key.encode(&mut out[1..1 + ATOM_LEN]);
        value.encode(&mut out[1 + ATOM_LEN..1 + 2 * ATOM_LEN]);
        write_u32(out, 1 + 2 * ATOM_LEN, next);
    }

    pub fn decode(bytes: &[u8]) -> Option<(ArgumentRecord, u32)> {
        let key = Packed::decode(bytes.get(1..1 + ATOM_LEN)?)?;
        let next = read_u32(bytes, 1 + 2 * ATOM_LEN)?;
        let record = match *bytes.first()? {
            KIND_ATOM => ArgumentRecord::Atom(key),
            KIND_PAIR => ArgumentRecord::Pair {
                key,
                value: Packed::decode(bytes.get(1 + ATOM_LEN..1 + 2 * ATOM_LEN)?)?,
            },
            _ => return None,
        };
        Some((record, next))
    }

    pub fn set_next(bytes: &mut [u8], next: u32) {
        write_u32(bytes, 1 + 2 * ATOM_LEN, next);
    }
}
