//! Voltfs CLI - Exercises the in-memory filesystem.
//!
//! Provides:
//! - A scripted demo of the counter files and namespace operations
//! - A line-oriented shell over one mounted namespace

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use voltfs_core::FileKind;
use voltfs_vfs::{mount_demo, MountOptions, Namespace};

/// Voltfs in-memory filesystem CLI.
#[derive(Parser)]
#[command(name = "voltfs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scripted counter-file demonstration
    Demo {
        /// Filesystem name for the mount
        #[arg(long, default_value = "uxfs")]
        name: String,
    },

    /// Interactive shell over a fresh namespace (reads stdin)
    Shell {
        /// Filesystem name for the mount
        #[arg(long, default_value = "voltfs")]
        name: String,

        /// Pre-populate the counter files
        #[arg(long)]
        counters: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Demo { name } => run_demo(&name),
        Commands::Shell { name, counters } => run_shell(&name, counters),
    }
}

fn print_stat(ns: &Namespace, path: &str) -> Result<()> {
    let meta = ns.stat(path)?;
    println!("{} {}", path, serde_json::to_string(&meta)?);
    Ok(())
}

fn run_demo(name: &str) -> Result<()> {
    let ns = mount_demo(name, MountOptions::default())?;
    info!(name, "mounted demo namespace");

    println!("== counter file: increments once per handle");
    let h = ns.open("/counter")?;
    let first = ns.read(h, 16)?;
    let second = ns.read(h, 16)?;
    print!("first read:  {}", String::from_utf8_lossy(&first));
    print!("second read: {}", String::from_utf8_lossy(&second));
    ns.close(h)?;

    let h = ns.open("/counter")?;
    print!(
        "fresh handle: {}",
        String::from_utf8_lossy(&ns.read(h, 16)?)
    );
    ns.close(h)?;

    println!("== namespace operations");
    ns.mkdir("/docs", 0o755)?;
    ns.create("/docs/hello.txt", 0o644)?;
    let h = ns.open("/docs/hello.txt")?;
    ns.write(h, b"hello from voltfs\n")?;
    ns.close(h)?;
    ns.link("/docs/hello.txt", "/hello-link")?;
    ns.rename("/docs/hello.txt", "/docs/greeting.txt")?;

    for path in ["/", "/counter", "/docs", "/docs/greeting.txt", "/hello-link"] {
        print_stat(&ns, path)?;
    }

    ns.unmount()?;
    println!("== unmounted; all contents discarded");
    Ok(())
}

fn shell_command(ns: &Namespace, line: &str) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return Ok(false);
    };
    let args: Vec<&str> = parts.collect();
    let arg = |i: usize| -> Result<&str> {
        args.get(i)
            .copied()
            .with_context(|| format!("{cmd}: missing argument"))
    };

    match cmd {
        "quit" | "exit" => return Ok(true),
        "ls" => {
            let path = args.first().copied().unwrap_or("/");
            for (name, id) in ns.read_dir(path)? {
                println!("{id:>6} {name}");
            }
        }
        "mkdir" => {
            ns.mkdir(arg(0)?, 0o755)?;
        }
        "touch" => {
            ns.create(arg(0)?, 0o644)?;
        }
        "write" => {
            let path = arg(0)?;
            let contents = args[1..].join(" ");
            let h = ns.open(path)?;
            let result = ns
                .write(h, contents.as_bytes())
                .and_then(|_| ns.write(h, b"\n"));
            ns.close(h)?;
            result?;
        }
        "cat" => {
            let path = arg(0)?;
            // Counter reads replay the handle snapshot and never come back
            // empty, so a counter is read exactly once.
            let kind = ns.stat(path)?.kind;
            let h = ns.open(path)?;
            let result = (|| -> Result<()> {
                if kind == FileKind::Special {
                    print!("{}", String::from_utf8_lossy(&ns.read(h, 64)?));
                    return Ok(());
                }
                loop {
                    let chunk = ns.read(h, 4096)?;
                    if chunk.is_empty() {
                        return Ok(());
                    }
                    print!("{}", String::from_utf8_lossy(&chunk));
                }
            })();
            ns.close(h)?;
            result?;
        }
        "ln" => {
            ns.link(arg(0)?, arg(1)?)?;
        }
        "ln-s" => {
            ns.symlink(arg(0)?, arg(1)?)?;
        }
        "readlink" => {
            println!("{}", ns.read_link(arg(0)?)?);
        }
        "rm" => {
            ns.unlink(arg(0)?)?;
        }
        "rmdir" => {
            ns.rmdir(arg(0)?)?;
        }
        "mv" => {
            ns.rename(arg(0)?, arg(1)?)?;
        }
        "stat" => {
            print_stat(ns, arg(0)?)?;
        }
        "help" => {
            println!(
                "commands: ls mkdir touch write cat ln ln-s readlink rm rmdir mv stat quit"
            );
        }
        other => bail!("unknown command: {other} (try help)"),
    }
    Ok(false)
}

fn run_shell(name: &str, counters: bool) -> Result<()> {
    let ns = if counters {
        mount_demo(name, MountOptions::default())?
    } else {
        Namespace::mount(name, MountOptions::default())
    };
    info!(name, counters, "mounted shell namespace");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("{name}> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match shell_command(&ns, line.trim()) {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => eprintln!("error: {err}"),
        }
    }

    ns.unmount()?;
    println!("unmounted {name}");
    Ok(())
}
