//! The table of commands a shell can dispatch to.

use crate::atom::{CommandId, StrHandle};
use crate::error::{Error, ErrorKind};
use crate::parser::ArgumentList;
use crate::shell::Context;
use std::fmt;

/// Maximum number of commands one shell can hold.
pub const MAX_COMMANDS: usize = 32;

/// A command implementation.
///
/// Receives the shell context and the arguments that followed the command
/// word. The first error aborts the line and is returned from
/// [`Shell::evaluate`](crate::Shell::evaluate).
pub type Handler = fn(&mut Context<'_>, &ArgumentList<'_>) -> Result<(), Error>;

#[derive(Clone, Copy)]
struct Entry {
    name: StrHandle,
    handler: Handler,
}

/// Fixed-capacity list of handlers, indexed by [`CommandId`].
pub struct CommandTable {
    entries: [Option<Entry>; MAX_COMMANDS],
    len: usize,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self {
            entries: [None; MAX_COMMANDS],
            len: 0,
        }
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTable")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl CommandTable {
    /// Adds a handler whose name is stored in the environment at `name`.
    pub fn push(&mut self, name: StrHandle, handler: Handler) -> Result<CommandId, ErrorKind> {
        let slot = self
            .entries
            .get_mut(self.len)
            .ok_or(ErrorKind::TooManyCommands)?;
        let id = u16::try_from(self.len).map_err(|_| ErrorKind::TooManyCommands)?;
        *slot = Some(Entry { name, handler });
        self.len += 1;
        Ok(CommandId(id))
    }

    pub fn handler(&self, id: CommandId) -> Option<Handler> {
        self.entry(id).map(|e| e.handler)
    }

    pub fn name(&self, id: CommandId) -> Option<StrHandle> {
        self.entry(id).map(|e| e.name)
    }

    pub fn clear(&mut self) {
        self.entries = [None; MAX_COMMANDS];
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == MAX_COMMANDS
    }

    fn entry(&self, id: CommandId) -> Option<&Entry> {
        self.entries.get(id.index())?.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Context<'_>, _: &ArgumentList<'_>) -> Result<(), Error> {
        Ok(())
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let mut table = CommandTable::default();
        let a = table.push(StrHandle::EMPTY, noop).unwrap();
        let b = table.push(StrHandle::EMPTY, noop).unwrap();

        assert_eq!((a.index(), b.index()), (0, 1));
        assert!(table.handler(b).is_some());
        assert!(table.handler(CommandId(2)).is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_capacity_is_fixed() {
        let mut table = CommandTable::default();
        for _ in 0..MAX_COMMANDS {
            table.push(StrHandle::EMPTY, noop).unwrap();
        }
        assert!(table.is_full());
        assert_eq!(
            table.push(StrHandle::EMPTY, noop),
            Err(ErrorKind::TooManyCommands)
        );

        table.clear();
        assert!(table.is_empty());
        assert!(table.handler(CommandId(0)).is_none());
    }
}
