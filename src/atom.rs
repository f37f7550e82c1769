//! Values of the command language.

use crate::arena::Block;
use strum::{EnumIs, EnumTryAs};

/// Location of string bytes owned by an environment's string arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrHandle {
    pub(crate) offset: u32,
    pub(crate) len: u32,
}

impl StrHandle {
    pub(crate) const EMPTY: StrHandle = StrHandle { offset: 0, len: 0 };

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn block(&self) -> Block {
        Block::new(self.offset as usize, self.len as usize)
    }
}

/// String contents of an [`Atom`].
///
/// `Input` borrows the line being evaluated and is only valid while that
/// line is. `Stored` lives in the environment until it is cleared; resolve
/// it with [`Environment::text`](crate::env::Environment::text).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text<'a> {
    Input(&'a [u8]),
    Stored(StrHandle),
}

/// Identifies a handler in the shell's command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub(crate) u16);

impl CommandId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// The smallest value of the language.
///
/// The derived `PartialEq` is structural: two `Stored` strings are equal
/// when their handles are, and a `Stored` string never equals an `Input` one.
/// Use [`Environment::atom_eq`](crate::env::Environment::atom_eq) to compare
/// string contents.
#[derive(Debug, Clone, Copy, PartialEq, EnumIs, EnumTryAs)]
pub enum Atom<'a> {
    Str(Text<'a>),
    Exact(u64),
    Inexact(f64),
    Command(CommandId),
}

impl<'a> Atom<'a> {
    pub fn str(s: &'a str) -> Self {
        Atom::Str(Text::Input(s.as_bytes()))
    }

    pub fn bytes(bytes: &'a [u8]) -> Self {
        Atom::Str(Text::Input(bytes))
    }
}

impl<'a> From<&'a str> for Atom<'a> {
    fn from(s: &'a str) -> Self {
        Atom::str(s)
    }
}

impl From<u64> for Atom<'_> {
    fn from(n: u64) -> Self {
        Atom::Exact(n)
    }
}

impl From<f64> for Atom<'_> {
    fn from(n: f64) -> Self {
        Atom::Inexact(n)
    }
}

/// One parsed argument of a command line.
#[derive(Debug, Clone, Copy, PartialEq, EnumIs)]
pub enum Argument<'a> {
    Atom(Atom<'a>),
    Pair { key: Atom<'a>, value: Atom<'a> },
}
