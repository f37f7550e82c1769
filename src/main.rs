use anyhow::{Context, Result, anyhow};
use argh::FromArgs;
use log::{LevelFilter, Log, Metadata, Record};
use mish::{MemoryLayout, Shell, ShellConfig};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};

#[derive(FromArgs)]
/// Run the mish command shell inside a fixed memory buffer.
struct Args {
    /// size of the shell memory in bytes
    #[argh(option, short = 'm', default = "4096")]
    memory: usize,

    /// terminate output lines with "\r\n" instead of "\n"
    #[argh(switch)]
    crlf: bool,

    /// zero the environment memory on clear
    #[argh(switch)]
    secure_clear: bool,

    /// log parsing and dispatch to stderr
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// evaluate a single line and exit
    #[argh(option, short = 'c')]
    command: Option<String>,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) -> Result<()> {
    log::set_logger(&LOGGER).map_err(|err| anyhow!("{err}"))?;
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });
    Ok(())
}

/// Evaluates one line and prints whatever it wrote, even if it failed.
fn run_line(shell: &mut Shell<'_>, line: &str) -> Result<Result<(), mish::Error>> {
    let result = shell.evaluate(line.as_bytes());
    let mut stdout = io::stdout().lock();
    stdout.write_all(shell.output())?;
    stdout.flush()?;
    Ok(result)
}

fn repl(shell: &mut Shell<'_>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("mish> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                if let Err(err) = run_line(shell, &line)? {
                    eprintln!("error: {err}");
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_logging(args.verbose)?;

    let config = ShellConfig {
        layout: MemoryLayout::default(),
        terminator: if args.crlf { "\r\n" } else { "\n" }.to_string(),
        secure_clear: args.secure_clear,
        ..ShellConfig::default()
    };
    let mut memory = vec![0u8; args.memory];
    let mut shell = Shell::with_builtins(&mut memory, config)
        .with_context(|| format!("cannot start a shell in {} bytes", args.memory))?;

    match args.command {
        Some(line) => Ok(run_line(&mut shell, &line)??),
        None => repl(&mut shell),
    }
}
