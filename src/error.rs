use thiserror::Error;

/// Byte range `[begin, end)` of the input where an error occurred.
///
/// Errors that are not tied to the input (configuration, memory, command
/// failures) carry an empty range at offset 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Range {
    pub begin: usize,
    pub end: usize,
}

impl Range {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }
}

/// What went wrong.
///
/// Every fallible operation of the shell eventually reports one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("memory layout ratios do not add up to the granularity")]
    BadMemoryConfig,
    #[error("memory buffer is empty")]
    NullBuffer,
    #[error("memory buffer is too small for the configured layout")]
    BufferTooSmall,
    #[error("memory buffer is larger than 4 GiB")]
    BufferTooLarge,
    #[error("environment memory exhausted")]
    OutOfMemory,
    #[error("argument memory exhausted while parsing")]
    ParserOutOfMemory,
    #[error("malformed UTF-8 sequence")]
    BadRune,
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unrecognized character")]
    UnrecognizedRune,
    #[error("invalid syntax, expected an atom")]
    InvalidSyntax,
    #[error("expected a command name")]
    ExpectedCommand,
    #[error("variable not found")]
    VariableNotFound,
    #[error("key is already defined")]
    DuplicateKey,
    #[error("arguments do not match what the command expects")]
    ContractViolation,
    #[error("command name is not bound to a command")]
    NotACommand,
    #[error("command table is full")]
    TooManyCommands,
    #[error("command failed")]
    CommandFailure,
    #[error("internal error")]
    Internal,
}

/// An [`ErrorKind`] together with the input range it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} (bytes {}..{})", .range.begin, .range.end)]
pub struct Error {
    pub kind: ErrorKind,
    pub range: Range,
}

impl Error {
    pub fn new(kind: ErrorKind, range: Range) -> Self {
        Self { kind, range }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            range: Range::default(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
