//! Parsing and name resolution of one command line.
//!
//! ```text
//! Command = Identifier { Pair | Atom } (Newline | EndOfInput)
//! Pair    = Atom ':' Atom
//! Atom    = ['$'] (Identifier | Number | StringLiteral)
//! ```
//!
//! The grammar is flat, so the parser is a small state machine instead of a
//! set of recursive functions. Variables are resolved against the
//! environment as soon as they are read, and every argument is written as a
//! linked record into the arguments arena.

use crate::arena::{Arena, Block};
use crate::atom::{Argument, Atom};
use crate::env::Environment;
use crate::error::{Error, ErrorKind, Range};
use crate::lexer::{Lexeme, LexemeKind, Lexer, Number};
use crate::record::{ARGUMENT_LEN, ArgumentRecord, NIL, Packed};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Start,
    CommandWord,
    Arguments,
    Done,
    Failed(Error),
}

/// Result of a successful parse.
///
/// Only offsets are kept; [`Parsed::split`] turns them back into atoms, given
/// the same line and arena that were parsed into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parsed {
    command: Packed,
    word: Range,
    first: u32,
    len: usize,
}

impl Parsed {
    /// Where the command word is in the line.
    pub fn word(&self) -> Range {
        self.word
    }

    /// Number of arguments after the command word.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The resolved command word and the remaining arguments.
    pub fn split<'a>(&self, line: &'a [u8], args: &'a Arena<'_>) -> (Atom<'a>, ArgumentList<'a>) {
        let list = ArgumentList {
            line,
            records: args.region(),
            first: self.first,
            len: self.len,
        };
        (self.command.unpack(line), list)
    }
}

/// Parses `line` into `args`, resolving names through `env`.
///
/// `args` is not reset here. On failure the records already written stay in
/// the arena, unreachable, until the caller resets it.
pub fn parse(line: &[u8], args: &mut Arena<'_>, env: &Environment<'_>) -> Result<Parsed, Error> {
    let mut parser = Parser {
        lexer: Lexer::new(line),
        args,
        env,
        command: Packed::Exact(0),
        word: Range::default(),
        first: NIL,
        tail: NIL,
        len: 0,
    };

    let mut state = State::Start;
    loop {
        state = match state {
            State::Start => parser.start(),
            State::CommandWord => parser.command_word(),
            State::Arguments => parser.argument(),
            State::Done => {
                debug!("parsed command with {} arguments", parser.len);
                return Ok(Parsed {
                    command: parser.command,
                    word: parser.word,
                    first: parser.first,
                    len: parser.len,
                });
            }
            State::Failed(err) => {
                debug!("parse failed: {err}");
                return Err(err);
            }
        };
    }
}

struct Parser<'p, 'a, 'e> {
    lexer: Lexer<'p>,
    args: &'p mut Arena<'a>,
    env: &'p Environment<'e>,
    command: Packed,
    word: Range,
    first: u32,
    tail: u32,
    len: usize,
}

impl Parser<'_, '_, '_> {
    fn start(&mut self) -> State {
        match self.lexer.next_lexeme() {
            Ok(lexeme) if lexeme.kind.is_identifier() => State::CommandWord,
            Ok(lexeme) => State::Failed(Error::new(ErrorKind::ExpectedCommand, lexeme.range())),
            Err(err) => State::Failed(err),
        }
    }

    fn command_word(&mut self) -> State {
        self.word = self.lexer.lexeme().range();
        let result = self.literal(self.lexer.lexeme()).and_then(|word| {
            let word = self.resolve(word, self.word)?;
            self.push(ArgumentRecord::Atom(word))?;
            self.command = word;
            self.lexer.next_lexeme()
        });
        match result {
            Ok(_) => State::Arguments,
            Err(err) => State::Failed(err),
        }
    }

    fn argument(&mut self) -> State {
        match self.lexer.lexeme().kind {
            LexemeKind::Newline | LexemeKind::Eof => return State::Done,
            _ => {}
        }

        let result = self.atom().and_then(|key| {
            if !self.lexer.lexeme().kind.is_colon() {
                return Ok(ArgumentRecord::Atom(key));
            }
            self.lexer.next_lexeme()?;
            let value = self.atom()?;
            Ok(ArgumentRecord::Pair { key, value })
        });
        match result.and_then(|record| self.push(record)) {
            Ok(()) => {
                self.len += 1;
                State::Arguments
            }
            Err(err) => State::Failed(err),
        }
    }

    /// Reads one atom, resolving it if it is prefixed with `$`, and moves
    /// past it.
    fn atom(&mut self) -> Result<Packed, Error> {
        let lexeme = self.lexer.lexeme();
        let packed = if lexeme.kind.is_dollar() {
            let name = self.lexer.next_lexeme()?;
            let packed = self.literal(name)?;
            self.resolve(packed, Range::new(lexeme.begin, name.end))?
        } else {
            self.literal(lexeme)?
        };
        self.lexer.next_lexeme()?;
        Ok(packed)
    }

    fn literal(&self, lexeme: Lexeme) -> Result<Packed, Error> {
        let invalid = || Error::new(ErrorKind::InvalidSyntax, lexeme.range());
        match (lexeme.kind, lexeme.value) {
            (LexemeKind::Identifier | LexemeKind::Str, _) => {
                let (begin, end) = lexeme.body();
                let offset = u32::try_from(begin).map_err(|_| invalid())?;
                let len = u32::try_from(end - begin).map_err(|_| invalid())?;
                Ok(Packed::Input { offset, len })
            }
            (LexemeKind::Number, Some(Number::Exact(n))) => Ok(Packed::Exact(n)),
            (LexemeKind::Number, Some(Number::Inexact(x))) => Ok(Packed::Inexact(x.to_bits())),
            _ => Err(invalid()),
        }
    }

    fn resolve(&self, name: Packed, range: Range) -> Result<Packed, Error> {
        let key = name.unpack(self.lexer.input());
        self.env
            .find_packed(&key)
            .ok_or(Error::new(ErrorKind::VariableNotFound, range))
    }

    fn push(&mut self, record: ArgumentRecord) -> Result<(), Error> {
        let out_of_memory = Error::new(ErrorKind::ParserOutOfMemory, self.lexer.lexeme().range());
        let block = self.args.allocate(ARGUMENT_LEN).map_err(|_| out_of_memory)?;
        let offset = u32::try_from(block.offset()).map_err(|_| out_of_memory)?;
        record.encode(NIL, self.args.bytes_mut(block));

        // the first record is the command word; arguments start after it
        if self.tail != NIL {
            if self.first == NIL {
                self.first = offset;
            }
            let tail = Block::new(self.tail as usize, ARGUMENT_LEN);
            ArgumentRecord::set_next(self.args.bytes_mut(tail), offset);
        }
        self.tail = offset;
        Ok(())
    }
}

/// Arguments of a parsed line, in the order they were written.
///
/// Borrows the line and the arguments arena, so it cannot outlive the next
/// evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentList<'a> {
    line: &'a [u8],
    records: &'a [u8],
    first: u32,
    len: usize,
}

impl<'a> ArgumentList<'a> {
    pub fn empty() -> Self {
        Self {
            line: &[],
            records: &[],
            first: NIL,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> Arguments<'a> {
        Arguments {
            list: *self,
            next: self.first,
        }
    }

    pub fn only_pairs(&self) -> bool {
        self.iter().all(|arg| arg.is_pair())
    }
}

impl<'a> IntoIterator for &ArgumentList<'a> {
    type Item = Argument<'a>;
    type IntoIter = Arguments<'a>;

    fn into_iter(self) -> Arguments<'a> {
        self.iter()
    }
}

pub struct Arguments<'a> {
    list: ArgumentList<'a>,
    next: u32,
}

impl<'a> Iterator for Arguments<'a> {
    type Item = Argument<'a>;

    fn next(&mut self) -> Option<Argument<'a>> {
        if self.next == NIL {
            return None;
        }
        let begin = self.next as usize;
        let bytes = self.list.records.get(begin..begin + ARGUMENT_LEN)?;
        let (record, next) = ArgumentRecord::decode(bytes)?;
        self.next = next;

        let line = self.list.line;
        Some(match record {
            ArgumentRecord::Atom(atom) => Argument::Atom(atom.unpack(line)),
            ArgumentRecord::Pair { key, value } => Argument::Pair {
                key: key.unpack(line),
                value: value.unpack(line),
            },
        })
    }
}
