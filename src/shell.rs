//! The shell: one caller buffer split into arenas, an environment, a
//! command table and an output buffer.

use crate::arena::Arena;
use crate::atom::{Argument, Atom, CommandId, Text};
use crate::builtin;
use crate::command::{CommandTable, Handler};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::error::{Error, ErrorKind};
use crate::output::OutputBuffer;
use crate::parser::{self, ArgumentList};
use log::debug;
use std::fmt::Write;

/// Everything a command handler may touch.
///
/// The arguments arena is not part of it, so a handler can never reset the
/// memory its own arguments live in.
#[derive(Debug)]
pub struct Context<'m> {
    env: Environment<'m>,
    commands: CommandTable,
    output: OutputBuffer<'m>,
    config: ShellConfig,
}

impl<'m> Context<'m> {
    pub fn env(&self) -> &Environment<'m> {
        &self.env
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn output(&self) -> &OutputBuffer<'m> {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputBuffer<'m> {
        &mut self.output
    }

    /// Binds `key` to `value` in the environment.
    pub fn define(&mut self, key: Atom<'_>, value: Atom<'_>) -> Result<(), Error> {
        Ok(self.env.insert(key, value)?)
    }

    /// Adds a command and binds `name` to it.
    ///
    /// Fails with [`ErrorKind::DuplicateKey`] if `name` is already bound and
    /// with [`ErrorKind::TooManyCommands`] if the table is full; in both cases
    /// nothing changes.
    pub fn register(&mut self, name: &str, handler: Handler) -> Result<CommandId, Error> {
        if self.commands.is_full() {
            return Err(ErrorKind::TooManyCommands.into());
        }
        let key = Atom::str(name);
        if self.env.contains(&key) {
            return Err(ErrorKind::DuplicateKey.into());
        }

        let stored = self.env.store_text(name.as_bytes())?;
        let next = u16::try_from(self.commands.len()).map_err(|_| ErrorKind::TooManyCommands)?;
        self.env
            .insert(Atom::Str(Text::Stored(stored)), Atom::Command(CommandId(next)))?;
        let id = self.commands.push(stored, handler)?;
        debug!("registered command {name:?} as {}", id.index());
        Ok(id)
    }

    /// Empties the environment and the command table.
    pub fn hard_clear(&mut self) {
        if self.config.secure_clear {
            self.env.wipe();
        } else {
            self.env.clear();
        }
        self.commands.clear();
        debug!("environment cleared");
    }

    pub fn write_atom(&mut self, atom: &Atom<'_>) {
        Render::new(&self.env, &self.commands).atom(&mut self.output, atom);
    }

    pub fn write_argument(&mut self, arg: &Argument<'_>) {
        Render::new(&self.env, &self.commands).argument(&mut self.output, arg);
    }

    /// Writes every argument, separated and terminated as configured.
    pub fn write_arguments(&mut self, args: &ArgumentList<'_>) {
        let render = Render::new(&self.env, &self.commands);
        let config = &self.config;
        render.separated(&mut self.output, config, args.iter());
    }

    /// Writes every environment entry as a pair, separated and terminated as
    /// configured.
    pub fn write_entries(&mut self) {
        let render = Render::new(&self.env, &self.commands);
        let entries = self
            .env
            .iter()
            .map(|(key, value)| Argument::Pair { key, value });
        render.separated(&mut self.output, &self.config, entries);
    }

    /// Writes `value` followed by the configured terminator.
    pub fn write_line(&mut self, value: impl std::fmt::Display) {
        let _ = write!(self.output, "{value}{}", self.config.terminator);
    }
}

/// Formats atoms into an [`OutputBuffer`].
struct Render<'c, 'm> {
    env: &'c Environment<'m>,
    commands: &'c CommandTable,
}

impl<'c, 'm> Render<'c, 'm> {
    fn new(env: &'c Environment<'m>, commands: &'c CommandTable) -> Self {
        Self { env, commands }
    }

    fn atom(&self, out: &mut OutputBuffer<'_>, atom: &Atom<'_>) {
        match atom {
            Atom::Str(text) => {
                out.write_quoted(self.env.text(text));
            }
            Atom::Exact(n) => {
                let _ = write!(out, "{n}");
            }
            Atom::Inexact(x) => {
                let _ = write!(out, "{x:?}");
            }
            Atom::Command(id) => {
                let name = self
                    .commands
                    .name(*id)
                    .map(|h| self.env.text(&Text::Stored(h)))
                    .unwrap_or(b"?".as_slice());
                out.write_bytes(b"<");
                out.write_bytes(name);
                out.write_bytes(b">");
            }
        }
    }

    fn argument(&self, out: &mut OutputBuffer<'_>, arg: &Argument<'_>) {
        match arg {
            Argument::Atom(atom) => self.atom(out, atom),
            Argument::Pair { key, value } => {
                out.write_bytes(b"(");
                self.atom(out, key);
                out.write_bytes(b", ");
                self.atom(out, value);
                out.write_bytes(b")");
            }
        }
    }

    fn separated<'a>(
        &self,
        out: &mut OutputBuffer<'_>,
        config: &ShellConfig,
        args: impl Iterator<Item = Argument<'a>>,
    ) {
        for (i, arg) in args.enumerate() {
            if i > 0 {
                out.write_bytes(config.separator.as_bytes());
            }
            self.argument(out, &arg);
        }
        out.write_bytes(config.terminator.as_bytes());
    }
}

/// A command interpreter running entirely inside one caller-owned buffer.
///
/// ```
/// use mish::{Shell, ShellConfig};
///
/// let mut memory = [0u8; 4096];
/// let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();
/// shell.evaluate(b"def greeting:hello\n").unwrap();
/// shell.evaluate(b"echo $greeting 42\n").unwrap();
/// assert_eq!(shell.output(), b"\"hello\" 42\n");
/// ```
#[derive(Debug)]
pub struct Shell<'m> {
    arguments: Arena<'m>,
    context: Context<'m>,
}

impl<'m> Shell<'m> {
    /// Carves `buffer` into the regions described by `config.layout`.
    ///
    /// No command is registered; see [`Shell::with_builtins`].
    pub fn new(buffer: &'m mut [u8], config: ShellConfig) -> Result<Self, Error> {
        let regions = config.layout.regions(buffer.len())?;
        let too_small = || Error::from(ErrorKind::BufferTooSmall);

        let (arguments, rest) = buffer
            .split_at_mut_checked(regions.arguments)
            .ok_or_else(too_small)?;
        let (strings, rest) = rest.split_at_mut_checked(regions.strings).ok_or_else(too_small)?;
        let (nodes, rest) = rest.split_at_mut_checked(regions.nodes).ok_or_else(too_small)?;
        let (buckets, rest) = rest.split_at_mut_checked(regions.buckets).ok_or_else(too_small)?;
        let (output, _) = rest.split_at_mut_checked(regions.output).ok_or_else(too_small)?;

        let env = Environment::new(buckets, Arena::new(nodes), Arena::new(strings))?;
        debug!(
            "shell memory: {regions:?}, {} buckets",
            env.bucket_count()
        );
        let mut shell = Self {
            arguments: Arena::new(arguments),
            context: Context {
                env,
                commands: CommandTable::default(),
                output: OutputBuffer::new(output),
                config,
            },
        };
        shell.hard_clear();
        Ok(shell)
    }

    /// Like [`Shell::new`], with `def`, `echo`, `clear`, `mem` and `env`
    /// registered.
    pub fn with_builtins(buffer: &'m mut [u8], config: ShellConfig) -> Result<Self, Error> {
        let mut shell = Self::new(buffer, config)?;
        builtin::register_builtins(&mut shell.context)?;
        Ok(shell)
    }

    /// Parses and runs one line.
    ///
    /// The output buffer and the arguments arena are reset first, so after a
    /// failure the output is empty unless the command wrote before failing.
    pub fn evaluate(&mut self, line: &[u8]) -> Result<(), Error> {
        self.arguments.reset();
        self.context.output.reset();

        let parsed = parser::parse(line, &mut self.arguments, &self.context.env)?;
        let (command, args) = parsed.split(line, &self.arguments);
        let Atom::Command(id) = command else {
            debug!("{command:?} is not a command");
            return Err(Error::new(ErrorKind::NotACommand, parsed.word()));
        };
        let handler = self
            .context
            .commands
            .handler(id)
            .ok_or(Error::new(ErrorKind::Internal, parsed.word()))?;

        debug!("dispatching command {} with {} arguments", id.index(), args.len());
        handler(&mut self.context, &args)
    }

    pub fn register(&mut self, name: &str, handler: Handler) -> Result<CommandId, Error> {
        self.context.register(name, handler)
    }

    pub fn define(&mut self, key: Atom<'_>, value: Atom<'_>) -> Result<(), Error> {
        self.context.define(key, value)
    }

    /// Empties the environment and the command table, builtins included.
    pub fn hard_clear(&mut self) {
        self.context.hard_clear();
    }

    pub fn available_env_memory(&self) -> usize {
        self.context.env.available()
    }

    /// Output of the last evaluated line.
    pub fn output(&self) -> &[u8] {
        self.context.output.as_bytes()
    }

    pub fn output_buffer(&self) -> &OutputBuffer<'m> {
        &self.context.output
    }

    pub fn env(&self) -> &Environment<'m> {
        &self.context.env
    }

    pub fn context(&self) -> &Context<'m> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context<'m> {
        &mut self.context
    }

    pub fn config(&self) -> &ShellConfig {
        &self.context.config
    }
}
