use mish::{
    Atom, Context, Error, ErrorKind, MemoryLayout, Shell, ShellConfig, Text,
    parser::ArgumentList,
};

const MEMORY: usize = 4096;

#[test]
fn test_session() {
    let mut memory = [0u8; MEMORY];
    let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

    let session: [(&str, &str); 7] = [
        ("def cmd:i2cscan port:8080\n", ""),
        ("echo $cmd $port\n", "\"i2cscan\" 8080\n"),
        ("def a:0xFF b:0b1010\n", ""),
        ("echo $a $b\n", "255 10\n"),
        ("clear\n", ""),
        ("def a:\"\u{68}\u{393}\u{30AC}\u{101FA}\"\n", ""),
        ("echo $a\n", "\"\u{68}\u{393}\u{30AC}\u{101FA}\"\n"),
    ];
    for (line, expected) in session {
        shell.evaluate(line.as_bytes()).unwrap();
        assert_eq!(
            String::from_utf8_lossy(shell.output()),
            expected,
            "after {line:?}"
        );
    }
}

#[test]
fn test_missing_variable_leaves_output_empty() {
    let mut memory = [0u8; MEMORY];
    let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

    shell.evaluate(b"echo 1\n").unwrap();
    let err = shell.evaluate(b"echo $missing\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::VariableNotFound);
    assert!(shell.output().is_empty());
}

#[test]
fn test_redefinition_is_rejected() {
    let mut memory = [0u8; MEMORY];
    let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

    shell.evaluate(b"def a:1\n").unwrap();
    let err = shell.evaluate(b"def a:2\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateKey);

    shell.evaluate(b"echo $a\n").unwrap();
    assert_eq!(shell.output(), b"1\n");
}

#[test]
fn test_clear_forgets_definitions() {
    let mut memory = [0u8; MEMORY];
    let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

    shell.evaluate(b"def previous:\"value\"\n").unwrap();
    let before = shell.available_env_memory();
    shell.evaluate(b"clear\n").unwrap();
    assert!(shell.available_env_memory() > before);

    let err = shell.evaluate(b"echo $previous\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::VariableNotFound);
}

#[test]
fn test_environment_fills_up() {
    let mut memory = [0u8; 1024];
    let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

    let mut defined = 0;
    let err = loop {
        let line = format!("def key{defined}:{defined}\n");
        match shell.evaluate(line.as_bytes()) {
            Ok(()) => defined += 1,
            Err(err) => break err,
        }
        assert!(defined < 1000, "environment never filled up");
    };
    assert_eq!(err.kind, ErrorKind::OutOfMemory);
    assert!(defined > 0);

    // everything that was defined is still there
    for i in 0..defined {
        let line = format!("echo $key{i}\n");
        shell.evaluate(line.as_bytes()).unwrap();
        assert_eq!(shell.output(), format!("{i}\n").as_bytes());
    }
}

#[test]
fn test_long_lines_run_out_of_argument_memory() {
    let mut memory = [0u8; 1024];
    let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

    let line = format!("echo{}\n", " 1".repeat(100));
    let err = shell.evaluate(line.as_bytes()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ParserOutOfMemory);

    shell.evaluate(b"echo 1\n").unwrap();
    assert_eq!(shell.output(), b"1\n");
}

#[test]
fn test_output_truncates_at_capacity() {
    let mut memory = [0u8; 1024];
    let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();
    let capacity = shell.output_buffer().capacity();

    shell
        .evaluate(format!("def long:\"{}\"\n", "x".repeat(capacity)).as_bytes())
        .unwrap();
    shell.evaluate(b"echo $long\n").unwrap();
    assert_eq!(shell.output().len(), capacity);
    assert!(shell.output_buffer().is_truncated());

    shell.evaluate(b"echo 1\n").unwrap();
    assert!(!shell.output_buffer().is_truncated());
}

fn greet(ctx: &mut Context<'_>, args: &ArgumentList<'_>) -> Result<(), Error> {
    let name = ctx
        .env()
        .find(&Atom::str("name"))
        .ok_or(ErrorKind::VariableNotFound)?;
    ctx.output_mut().write_bytes(b"hello ");
    ctx.write_atom(&name);
    for arg in args {
        ctx.output_mut().write_bytes(b" and ");
        ctx.write_argument(&arg);
    }
    ctx.output_mut().write_bytes(b"\n");
    Ok(())
}

#[test]
fn test_embedding_program_registers_its_own_command() {
    let mut memory = [0u8; MEMORY];
    let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();
    shell.register("greet", greet).unwrap();
    shell.define(Atom::str("name"), Atom::str("world")).unwrap();

    shell.evaluate(b"greet 'you'\n").unwrap();
    assert_eq!(shell.output(), b"hello \"world\" and \"you\"\n");

    let stored = shell.env().find(&Atom::str("name")).unwrap();
    let Atom::Str(text @ Text::Stored(_)) = stored else {
        panic!("expected a stored string, got {stored:?}");
    };
    assert_eq!(shell.env().text(&text), b"world");
}

#[test]
fn test_memory_layout_is_validated() {
    let mut memory = [0u8; MEMORY];
    let config = ShellConfig {
        layout: MemoryLayout {
            strings: 47,
            ..MemoryLayout::default()
        },
        ..ShellConfig::default()
    };
    let err = Shell::new(&mut memory, config).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadMemoryConfig);

    let config = ShellConfig {
        layout: MemoryLayout {
            granularity: 4,
            arguments: 1,
            strings: 1,
            nodes: 1,
            buckets: 0,
            output: 1,
        },
        ..ShellConfig::default()
    };
    let err = Shell::new(&mut memory, config).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BufferTooSmall);
}

#[test]
fn test_errors_point_into_the_line() {
    let mut memory = [0u8; MEMORY];
    let mut shell = Shell::with_builtins(&mut memory, ShellConfig::default()).unwrap();

    let line = b"echo 1 $nope 2\n";
    let err = shell.evaluate(line).unwrap_err();
    assert_eq!(&line[err.range.begin..err.range.end], b"$nope");

    let err = shell.evaluate(b"42\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExpectedCommand);
}
