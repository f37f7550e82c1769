//! A tiny command shell that lives inside one fixed-size buffer.
//!
//! The caller hands a byte buffer to [`Shell::new`]; the shell splits it into
//! an arguments arena, an environment (a hashtable over two more arenas and a
//! bucket region) and an output buffer, and never allocates anything else.
//! Lines look like
//!
//! ```text
//! def port:8080 name:"i2c bus"
//! echo $name $port
//! ```
//!
//! and are lexed straight from the input, parsed with variables resolved on
//! the fly, and dispatched to a registered [`Handler`].
//!
//! The lower layers are public too: [`arena`] for the bump allocator,
//! [`rune`] for UTF-8 decoding, [`env`] for the hashtable and [`lexer`] /
//! [`parser`] for the front end.

pub mod arena;
pub mod atom;
mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod lexer;
pub mod output;
pub mod parser;
mod record;
pub mod rune;
mod shell;

pub use atom::{Argument, Atom, CommandId, StrHandle, Text};
pub use builtin::{BuiltinCommand, Clear, Def, Echo, Env, Mem, register, register_builtins};
pub use command::{Handler, MAX_COMMANDS};
pub use config::{MemoryLayout, ShellConfig};
pub use error::{Error, ErrorKind, Range};
pub use parser::ArgumentList;
pub use shell::{Context, Shell};
