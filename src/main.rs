use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, Result};

use ciasm::error::{label_report, parse_report, runtime_report};
use ciasm::output::{Category, Condition, Output, Radix};
use ciasm::{ConsoleIo, DebuggerOptions, Halt, Program, RunEnvironment};

/// ciasm runs programs written for the Cambridge International accumulator machine.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program and print the final machine state
    Run {
        /// `.asm` file to run
        name: PathBuf,
        #[command(flatten)]
        display: DisplayArgs,
        /// Stop after this many instructions
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// Run a program, pausing before every instruction
    Debug {
        /// `.asm` file to run
        name: PathBuf,
        /// Read debugger commands from argument
        #[arg(short, long)]
        command: Option<String>,
        #[command(flatten)]
        display: DisplayArgs,
    },
    /// Check a `.asm` file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Place a watch on a `.asm` file to receive constant checker updates
    Watch {
        /// `.asm` file to watch
        name: PathBuf,
    },
}

#[derive(clap::Args, Default)]
struct DisplayArgs {
    /// Show registers and memory as 16-bit binary
    #[arg(short, long)]
    binary: bool,
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
    /// Characters for `IN`, read before the terminal is asked
    #[arg(short, long)]
    input: Option<String>,
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    ciasm::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(ciasm::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        if let Some(path) = args.path {
            return run(&path, DisplayArgs::default(), None, None);
        }
        println!("\n~ ciasm v{VERSION} - Copyright (c) 2024 Artemis Rosman ~");
        println!("{}", LOGO.truecolor(255, 183, 197).bold());
        println!("{SHORT_INFO}");
        return Ok(());
    };

    match command {
        Command::Run {
            name,
            display,
            limit,
        } => run(&name, display, None, limit),
        Command::Debug {
            name,
            command,
            display,
        } => {
            let radix = radix(display.binary);
            run(&name, display, Some(DebuggerOptions { command, radix }), None)
        }
        Command::Check { name } => {
            file_message(Green, "Checking", &name);
            let src = fs::read_to_string(&name).into_diagnostic()?;
            check(&src)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
        Command::Watch { name } => watch(name),
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, right.as_str());
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    if Output::is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn radix(binary: bool) -> Radix {
    if binary || ciasm::env::binary_default() {
        Radix::Binary
    } else {
        Radix::Decimal
    }
}

fn run(
    name: &Path,
    display: DisplayArgs,
    debugger_opts: Option<DebuggerOptions>,
    limit: Option<u64>,
) -> Result<()> {
    Output::set_minimal(display.minimal);
    let radix = radix(display.binary);

    file_message(MsgColor::Green, "Loading", name);
    let src = fs::read_to_string(name).into_diagnostic()?;
    let program = Program::parse(&src).map_err(|error| parse_report(&error, &src))?;
    let mut env =
        RunEnvironment::new(&program).map_err(|error| label_report(&error, &program, &src))?;
    warn_duplicates(&env);

    Output::Debugger(Condition::Sometimes, Category::Normal).print_program(env.store());
    env.set_step_limit(limit.or_else(ciasm::env::step_limit));
    if let Some(opts) = debugger_opts {
        env.attach_debugger(opts);
    }

    message(MsgColor::Green, "Running", "program");
    let mut io = ConsoleIo::new(display.input);
    let halt = env
        .run(&mut io)
        .map_err(|error| runtime_report(&error, &program, &src))?;

    let output = Output::Debugger(Condition::Always, Category::Normal);
    output.start_new_line();
    let category = match halt {
        Halt::StepLimit => Category::Warning,
        _ => Category::Info,
    };
    Output::Debugger(Condition::Always, category).print_str(&format!("Program Halted: {halt}\n"));
    Output::Debugger(Condition::Always, Category::Info).print_str(&format!(
        "{} instructions executed\n",
        env.state().steps()
    ));
    Output::Debugger(Condition::Sometimes, Category::Normal).print_memory(env.store(), radix);
    output.print_cpu(env.state(), radix);

    file_message(MsgColor::Green, "Completed", name);
    Ok(())
}

/// Load a program and resolve its labels, without running it.
fn check(src: &str) -> Result<()> {
    let program = Program::parse(src).map_err(|error| parse_report(&error, src))?;
    let env =
        RunEnvironment::new(&program).map_err(|error| label_report(&error, &program, src))?;
    warn_duplicates(&env);
    Ok(())
}

fn warn_duplicates(env: &RunEnvironment) {
    for name in env.labels().duplicates() {
        Output::Debugger(Condition::Always, Category::Warning).print_str(&format!(
            "Warning: label `{name}` is declared more than once, the last declaration is used\n"
        ));
    }
}

fn watch(name: PathBuf) -> Result<()> {
    use MsgColor::*;
    if !name.exists() {
        bail!("File does not exist. Exiting...")
    }
    // Vim breaks if watching a single file
    let folder_path = match name.parent() {
        Some(pth) if pth.is_dir() => pth.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };

    // Clear screen and move cursor to top left
    print!("\x1B[2J\x1B[2;1H");
    file_message(Green, "Watching", &name);
    message(Cyan, "Help", "press CTRL+C to exit");

    let mut watcher =
        Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

    watcher
        .watch(folder_path, move |event: Event| match event.kind {
            // Watch remove for vim changes
            EventKind::Modify(_) | EventKind::Remove(_) => {
                // Clear screen
                print!("\x1B[2J\x1B[2;1H");
                file_message(Green, "Watching", &name);
                message(Green, "Re-checking", "file change detected");
                message(Cyan, "Help", "press CTRL+C to exit");

                // Makes reruns more obvious
                sleep(Duration::from_millis(50));

                let src = match fs::read_to_string(&name) {
                    Ok(src) => src,
                    Err(e) => {
                        eprintln!("{e}. Exiting...");
                        std::process::exit(1)
                    }
                };
                // Every check builds its own program and labels
                match check(&src) {
                    Ok(()) => message(Green, "Success", "no errors found!"),
                    Err(e) => println!("\n{:?}", e),
                }
                Flow::Continue
            }
            _ => Flow::Continue,
        })
        .into_diagnostic()?;
    watcher.run();
    Ok(())
}

const LOGO: &str = r#"
       _
   ___(_) __ _ ___ _ __ ___
  / __| |/ _` / __| '_ ` _ \
 | (__| | (_| \__ \ | | | | |
  \___|_|\__,_|___/_| |_| |_|"#;

const SHORT_INFO: &str = r"
Welcome to ciasm, an interpreter and step debugger for the
Cambridge International accumulator assembly language.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
