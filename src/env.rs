//! The environment: an insert-only hashtable of atoms.
//!
//! Buckets live in a plain byte region, chain nodes in one arena and string
//! bytes in another. Because the arenas cannot give back individual blocks,
//! entries can be added but never updated or removed; the whole table is
//! cleared at once.

use crate::arena::{Arena, ArenaError, Block};
use crate::atom::{Atom, StrHandle, Text};
use crate::error::{self, ErrorKind};
use crate::record::{BUCKET_LEN, Bucket, NIL, NODE_LEN, Node, Packed};
use log::debug;
use std::fmt;
use thiserror::Error;

const SEED: u32 = 0xCAFE_BABE;
const MULTIPLIER: u32 = 0x5bd1_e995;
const MODULUS: u64 = u32::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("key is already defined")]
    DuplicateKey,
    #[error("environment memory exhausted")]
    OutOfMemory,
    #[error("bucket region cannot hold a single bucket")]
    NoBuckets,
}

impl From<ArenaError> for EnvError {
    fn from(_: ArenaError) -> Self {
        EnvError::OutOfMemory
    }
}

impl From<EnvError> for ErrorKind {
    fn from(err: EnvError) -> Self {
        match err {
            EnvError::DuplicateKey => ErrorKind::DuplicateKey,
            EnvError::OutOfMemory => ErrorKind::OutOfMemory,
            EnvError::NoBuckets => ErrorKind::BufferTooSmall,
        }
    }
}

impl From<EnvError> for error::Error {
    fn from(err: EnvError) -> Self {
        ErrorKind::from(err).into()
    }
}

/// Multiply-xor-shift mix over `bytes`.
fn mix(bytes: &[u8]) -> u32 {
    bytes.iter().fold(SEED, |hash, &byte| {
        let hash = hash ^ u32::from(byte).wrapping_mul(MULTIPLIER);
        hash ^ (hash >> 15)
    })
}

fn offset32(block: Block) -> Result<u32, EnvError> {
    u32::try_from(block.offset()).map_err(|_| EnvError::OutOfMemory)
}

pub struct Environment<'m> {
    buckets: &'m mut [u8],
    nodes: Arena<'m>,
    strings: Arena<'m>,
}

impl fmt::Debug for Environment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("buckets", &self.bucket_count())
            .field("nodes", &self.nodes.used())
            .field("strings", &self.strings.used())
            .finish()
    }
}

impl<'m> Environment<'m> {
    /// Builds an empty environment. `buckets` is split into as many buckets
    /// as fit; trailing bytes are ignored.
    pub fn new(
        buckets: &'m mut [u8],
        nodes: Arena<'m>,
        strings: Arena<'m>,
    ) -> Result<Self, EnvError> {
        if buckets.len() < BUCKET_LEN {
            return Err(EnvError::NoBuckets);
        }
        let mut env = Self {
            buckets,
            nodes,
            strings,
        };
        env.clear();
        Ok(env)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len() / BUCKET_LEN
    }

    pub fn hash(&self, key: &Atom<'_>) -> u32 {
        match key {
            Atom::Str(text) => mix(self.text(text)),
            Atom::Exact(n) => (n % MODULUS) as u32,
            Atom::Inexact(x) => mix(&x.to_le_bytes()),
            Atom::Command(id) => (u64::from(id.0) % MODULUS) as u32,
        }
    }

    /// Bytes of a string atom, wherever they live.
    pub fn text<'s>(&'s self, text: &Text<'s>) -> &'s [u8] {
        match *text {
            Text::Input(bytes) => bytes,
            Text::Stored(h) => {
                let block = h.block();
                self.strings
                    .region()
                    .get(block.offset()..block.offset() + block.len())
                    .unwrap_or_default()
            }
        }
    }

    /// Content equality: strings by bytes, numbers by value, commands by id.
    pub fn atom_eq(&self, a: &Atom<'_>, b: &Atom<'_>) -> bool {
        match (a, b) {
            (Atom::Str(x), Atom::Str(y)) => self.text(x) == self.text(y),
            (Atom::Exact(x), Atom::Exact(y)) => x == y,
            (Atom::Inexact(x), Atom::Inexact(y)) => x == y,
            (Atom::Command(x), Atom::Command(y)) => x == y,
            _ => false,
        }
    }

    /// Adds `key → value`, copying borrowed strings into the string arena.
    ///
    /// An existing key is never overwritten: the insert fails with
    /// [`EnvError::DuplicateKey`] and the table is left as it was. On
    /// [`EnvError::OutOfMemory`] no entry becomes reachable, although the
    /// bytes already reserved stay used until the next [`Environment::clear`].
    pub fn insert(&mut self, key: Atom<'_>, value: Atom<'_>) -> Result<(), EnvError> {
        let index = self.bucket_index(&key);
        if self.chain(index).any(|node| self.matches(&node.key, &key)) {
            debug!("env: rejected duplicate key in bucket {index}");
            return Err(EnvError::DuplicateKey);
        }

        let block = self.nodes.allocate(NODE_LEN)?;
        let offset = offset32(block)?;
        let node = Node {
            key: self.own(&key)?,
            value: self.own(&value)?,
            next: NIL,
        };
        node.encode(self.nodes.bytes_mut(block));

        let mut bucket = self.bucket(index);
        if bucket.head == NIL {
            bucket.head = offset;
        } else {
            let tail = Block::new(bucket.tail as usize, NODE_LEN);
            Node::set_next(self.nodes.bytes_mut(tail), offset);
        }
        bucket.tail = offset;
        self.set_bucket(index, bucket);
        Ok(())
    }

    pub fn find(&self, key: &Atom<'_>) -> Option<Atom<'static>> {
        self.find_packed(key).map(|value| value.unpack(&[]))
    }

    pub fn contains(&self, key: &Atom<'_>) -> bool {
        self.find_packed(key).is_some()
    }

    pub(crate) fn find_packed(&self, key: &Atom<'_>) -> Option<Packed> {
        self.chain(self.bucket_index(key))
            .find(|node| self.matches(&node.key, key))
            .map(|node| node.value)
    }

    /// Drops every entry in O(bucket count).
    pub fn clear(&mut self) {
        self.nodes.reset();
        self.strings.reset();
        self.nil_buckets();
    }

    /// Like [`Environment::clear`], but also zeroes both arenas.
    pub fn wipe(&mut self) {
        self.nodes.wipe();
        self.strings.wipe();
        self.nil_buckets();
    }

    pub fn is_empty(&self) -> bool {
        (0..self.bucket_count()).all(|i| self.bucket(i).is_empty())
            && self.nodes.is_empty()
            && self.strings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Bytes still free in the node and string arenas.
    pub fn available(&self) -> usize {
        self.nodes.available() + self.strings.available()
    }

    /// Every entry, bucket by bucket, in insertion order within a bucket.
    pub fn iter(&self) -> impl Iterator<Item = (Atom<'static>, Atom<'static>)> + '_ {
        (0..self.bucket_count())
            .flat_map(move |index| self.chain(index))
            .map(|node| (node.key.unpack(&[]), node.value.unpack(&[])))
    }

    /// Copies `bytes` into the string arena.
    pub(crate) fn store_text(&mut self, bytes: &[u8]) -> Result<StrHandle, EnvError> {
        if bytes.is_empty() {
            return Ok(StrHandle::EMPTY);
        }
        let block = self.strings.allocate(bytes.len())?;
        let handle = StrHandle {
            offset: offset32(block)?,
            len: u32::try_from(bytes.len()).map_err(|_| EnvError::OutOfMemory)?,
        };
        self.strings.bytes_mut(block).copy_from_slice(bytes);
        Ok(handle)
    }

    /// Packs `atom` so that it no longer borrows anything outside the arenas.
    fn own(&mut self, atom: &Atom<'_>) -> Result<Packed, EnvError> {
        Ok(match *atom {
            Atom::Str(Text::Input(bytes)) => Packed::Stored(self.store_text(bytes)?),
            Atom::Str(Text::Stored(h)) => Packed::Stored(h),
            Atom::Exact(n) => Packed::Exact(n),
            Atom::Inexact(x) => Packed::Inexact(x.to_bits()),
            Atom::Command(id) => Packed::Command(id),
        })
    }

    fn matches(&self, stored: &Packed, key: &Atom<'_>) -> bool {
        self.atom_eq(&stored.unpack(&[]), key)
    }

    fn bucket_index(&self, key: &Atom<'_>) -> usize {
        self.hash(key) as usize % self.bucket_count()
    }

    fn bucket(&self, index: usize) -> Bucket {
        let at = index * BUCKET_LEN;
        self.buckets
            .get(at..at + BUCKET_LEN)
            .and_then(Bucket::decode)
            .unwrap_or(Bucket::EMPTY)
    }

    fn set_bucket(&mut self, index: usize, bucket: Bucket) {
        let at = index * BUCKET_LEN;
        bucket.encode(&mut self.buckets[at..at + BUCKET_LEN]);
    }

    fn nil_buckets(&mut self) {
        for chunk in self.buckets.chunks_exact_mut(BUCKET_LEN) {
            Bucket::EMPTY.encode(chunk);
        }
    }

    fn node(&self, offset: u32) -> Option<Node> {
        let begin = offset as usize;
        Node::decode(self.nodes.region().get(begin..begin + NODE_LEN)?)
    }

    fn chain(&self, index: usize) -> Chain<'_, 'm> {
        Chain {
            env: self,
            next: self.bucket(index).head,
        }
    }
}

struct Chain<'e, 'm> {
    env: &'e Environment<'m>,
    next: u32,
}

impl Iterator for Chain<'_, '_> {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        if self.next == NIL {
            return None;
        }
        let node = self.env.node(self.next)?;
        self.next = node.next;
        Some(node)
    }
}
