use crate::atom::{Argument, CommandId};
use crate::error::{Error, ErrorKind};
use crate::parser::ArgumentList;
use crate::shell::Context;

/// Commands every shell built with [`Shell::with_builtins`](crate::Shell::with_builtins)
/// knows.
///
/// `execute` has the shape of a [`Handler`](crate::command::Handler), so a
/// builtin registers like any other command.
pub trait BuiltinCommand {
    /// Name the command is bound to, e.g. "def" or "echo".
    fn name() -> &'static str;

    fn execute(ctx: &mut Context<'_>, args: &ArgumentList<'_>) -> Result<(), Error>;
}

pub fn register<T: BuiltinCommand>(ctx: &mut Context<'_>) -> Result<CommandId, Error> {
    ctx.register(T::name(), T::execute)
}

/// Registers `def`, `echo`, `clear`, `mem` and `env`.
pub fn register_builtins(ctx: &mut Context<'_>) -> Result<(), Error> {
    register::<Def>(ctx)?;
    register::<Echo>(ctx)?;
    register::<Clear>(ctx)?;
    register::<Mem>(ctx)?;
    register::<Env>(ctx)?;
    Ok(())
}

fn no_arguments(args: &ArgumentList<'_>) -> Result<(), Error> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ErrorKind::ContractViolation.into())
    }
}

/// `def key:value ...` binds every key to its value.
///
/// All arguments must be pairs. Pairs before a failing insert stay defined.
pub struct Def;

impl BuiltinCommand for Def {
    fn name() -> &'static str {
        "def"
    }

    fn execute(ctx: &mut Context<'_>, args: &ArgumentList<'_>) -> Result<(), Error> {
        if !args.only_pairs() {
            return Err(ErrorKind::ContractViolation.into());
        }
        for arg in args {
            if let Argument::Pair { key, value } = arg {
                ctx.define(key, value)?;
            }
        }
        Ok(())
    }
}

/// `echo ...` writes its arguments back.
pub struct Echo;

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(ctx: &mut Context<'_>, args: &ArgumentList<'_>) -> Result<(), Error> {
        ctx.write_arguments(args);
        Ok(())
    }
}

/// `clear` forgets every definition. Only the builtins survive.
pub struct Clear;

impl BuiltinCommand for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn execute(ctx: &mut Context<'_>, args: &ArgumentList<'_>) -> Result<(), Error> {
        no_arguments(args)?;
        ctx.hard_clear();
        register_builtins(ctx)
    }
}

/// `mem` writes how many bytes the environment has left.
pub struct Mem;

impl BuiltinCommand for Mem {
    fn name() -> &'static str {
        "mem"
    }

    fn execute(ctx: &mut Context<'_>, args: &ArgumentList<'_>) -> Result<(), Error> {
        no_arguments(args)?;
        let available = ctx.env().available();
        ctx.write_line(available);
        Ok(())
    }
}

/// `env` writes every binding as a `(key, value)` pair.
pub struct Env;

impl BuiltinCommand for Env {
    fn name() -> &'static str {
        "env"
    }

    fn execute(ctx: &mut Context<'_>, args: &ArgumentList<'_>) -> Result<(), Error> {
        no_arguments(args)?;
        ctx.write_entries();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::atom::Atom;
    use crate::config::ShellConfig;
    use crate::error::ErrorKind;
    use crate::shell::Shell;

    #[test]
    fn test_def_then_echo() {
        let mut memory = [0u8; 4096];
        let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

        shell.evaluate(b"def cmd:i2cscan port:8080\n").unwrap();
        assert!(shell.output().is_empty());
        shell.evaluate(b"echo $cmd $port\n").unwrap();
        assert_eq!(shell.output(), b"\"i2cscan\" 8080\n");
    }

    #[test]
    fn test_def_requires_pairs() {
        let mut memory = [0u8; 4096];
        let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

        let err = shell.evaluate(b"def a:1 b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ContractViolation);
        assert!(!shell.env().contains(&Atom::str("a")));
    }

    #[test]
    fn test_def_keeps_pairs_before_a_failure() {
        let mut memory = [0u8; 4096];
        let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

        shell.evaluate(b"def a:1").unwrap();
        let err = shell.evaluate(b"def b:2 a:3 c:4").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateKey);
        assert_eq!(shell.env().find(&Atom::str("a")), Some(Atom::Exact(1)));
        assert_eq!(shell.env().find(&Atom::str("b")), Some(Atom::Exact(2)));
        assert_eq!(shell.env().find(&Atom::str("c")), None);
    }

    #[test]
    fn test_builtin_names_cannot_be_redefined() {
        let mut memory = [0u8; 4096];
        let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

        let err = shell.evaluate(b"def echo:1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateKey);
        shell.evaluate(b"echo ok").unwrap();
        assert_eq!(shell.output(), b"\"ok\"\n");
    }

    #[test]
    fn test_clear_keeps_builtins() {
        let mut memory = [0u8; 4096];
        let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

        shell.evaluate(b"def previous:1").unwrap();
        shell.evaluate(b"clear").unwrap();
        let err = shell.evaluate(b"echo $previous").unwrap_err();
        assert_eq!(err.kind, ErrorKind::VariableNotFound);

        shell.evaluate(b"def previous:2").unwrap();
        shell.evaluate(b"echo $previous").unwrap();
        assert_eq!(shell.output(), b"2\n");
        assert_eq!(shell.context().commands().len(), 5);
    }

    #[test]
    fn test_mem_reports_shrinking_memory() {
        let mut memory = [0u8; 4096];
        let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

        shell.evaluate(b"mem").unwrap();
        let before = shell.available_env_memory();
        assert_eq!(shell.output(), format!("{before}\n").as_bytes());

        shell.evaluate(b"def key:\"some value\"").unwrap();
        assert!(shell.available_env_memory() < before);

        let err = shell.evaluate(b"mem 1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ContractViolation);
    }

    #[test]
    fn test_env_lists_bindings() {
        let mut memory = [0u8; 4096];
        let config = ShellConfig {
            separator: "\n".to_string(),
            ..ShellConfig::default()
        };
        let mut shell = Shell::new(&mut memory, config).unwrap();
        crate::builtin::register::<super::Env>(shell.context_mut()).unwrap();
        shell.define(Atom::str("x"), Atom::Exact(1)).unwrap();

        shell.evaluate(b"env").unwrap();
        let output = String::from_utf8(shell.output().to_vec()).unwrap();
        let mut lines: Vec<_> = output.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["(\"env\", <env>)", "(\"x\", 1)"]);
    }
}
