#![forbid(unsafe_code)]

//! Interactive REPL demonstrating the rawline editor.
//!
//! Parses args manually (no external dependencies) to keep the binary
//! lean. Wires up sample completion, hints, and highlight callbacks, keeps
//! history in a file, and exposes the key-code debug mode.
//!
//! Set `RAWLINE_LOG=<file>` to capture tracing output (stderr is useless
//! while the terminal is raw).

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use rawline::{Editor, Error, Hint, TerminalPort};
use rawline_tty::UnixTerminal;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
rawline-demo — interactive line editor demo

USAGE:
    rawline-demo [OPTIONS]

OPTIONS:
    --multiline          Wrap long lines over multiple rows
    --mask               Render input masked (password entry)
    --history=FILE       Load and save history at FILE
    --keycodes           Print raw key codes until 'quit' is typed
    --help, -h           Show this help message
    --version, -V        Show version

COMMANDS AT THE PROMPT:
    /historylen N        Change the history capacity
";

/// Commands the sample completion and hints callbacks know about.
const COMMANDS: &[&str] = &["hello", "hello there", "help", "history", "quit"];

#[derive(Debug, Default)]
struct Args {
    multiline: bool,
    mask: bool,
    keycodes: bool,
    history: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--multiline" => args.multiline = true,
            "--mask" => args.mask = true,
            "--keycodes" => args.keycodes = true,
            "--help" | "-h" => {
                print!("{HELP_TEXT}");
                process::exit(0);
            }
            "--version" | "-V" => {
                println!("rawline-demo {VERSION}");
                process::exit(0);
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--history=") {
                    args.history = Some(PathBuf::from(path));
                } else {
                    eprintln!("unknown option: {arg}\n\n{HELP_TEXT}");
                    process::exit(1);
                }
            }
        }
    }
    args
}

fn init_tracing() {
    let Ok(path) = std::env::var("RAWLINE_LOG") else {
        return;
    };
    let Ok(file) = std::fs::File::create(&path) else {
        eprintln!("cannot open log file {path}");
        return;
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trace"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || file.try_clone().expect("clone log file"))
        .with_ansi(false)
        .init();
}

/// Key-code debug mode: echo byte values until the last four spell `quit`.
fn print_key_codes(term: &mut UnixTerminal) -> rawline::Result<()> {
    println!("Key-code debug mode. Press keys to see byte values; type 'quit' to exit.");
    term.enter_raw()?;
    let mut window = [b' '; 4];
    loop {
        let byte = match term.read_byte(None) {
            Ok(Some(byte)) => byte,
            Ok(None) => continue,
            Err(_) => break,
        };
        window.rotate_left(1);
        window[3] = byte;
        if window == *b"quit" {
            break;
        }
        let shown = if byte.is_ascii_graphic() {
            byte as char
        } else {
            '?'
        };
        // Raw mode: no output post-processing, move to the left edge by hand.
        print!("'{shown}' {byte:#04x} ({byte})\r\n");
        let _ = io::stdout().flush();
    }
    term.leave_raw()?;
    println!();
    Ok(())
}

fn build_editor(args: &Args) -> Editor {
    let mut editor = Editor::new()
        .with_multiline(args.multiline)
        .with_mask_mode(args.mask);

    editor.set_completion_callback(|prefix| {
        COMMANDS
            .iter()
            .filter(|c| !prefix.is_empty() && c.starts_with(prefix))
            .map(|c| (*c).to_string())
            .collect()
    });

    editor.set_hints_callback(|line| {
        (line == "hello").then(|| Hint::new(" there").with_color(5))
    });

    // Digits in green, so `/historylen 400` shows the idea.
    editor.set_highlight_callback(|line, colors| {
        for (i, byte) in line.bytes().enumerate() {
            if byte.is_ascii_digit() {
                colors[i] = 2;
            }
        }
    });

    editor
}

fn main() {
    init_tracing();
    let args = parse_args();
    let mut term = UnixTerminal::new();

    if args.keycodes {
        if let Err(err) = print_key_codes(&mut term) {
            eprintln!("keycodes mode failed: {err}");
            process::exit(1);
        }
        return;
    }

    let mut editor = build_editor(&args);
    if let Some(path) = &args.history {
        // A missing file just means a first run.
        let _ = editor.history_load(path);
    }

    loop {
        let line = match editor.read(&mut term, "rawline> ") {
            Ok(line) => line,
            Err(Error::Eof) | Err(Error::Interrupted) => break,
            Err(err) => {
                eprintln!("read failed: {err}");
                process::exit(1);
            }
        };

        if let Some(rest) = line.strip_prefix("/historylen") {
            match rest.trim().parse::<usize>() {
                Ok(n) if n > 0 => {
                    editor.history_set_max_len(n);
                    println!("history capacity set to {n}");
                }
                _ => println!("usage: /historylen N"),
            }
            continue;
        }

        if !line.is_empty() {
            println!("echo: '{line}'");
            editor.history_add(&line);
            if let Some(path) = &args.history {
                if let Err(err) = editor.history_save(path) {
                    eprintln!("history save failed: {err}");
                }
            }
        }
    }
}
