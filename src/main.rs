//! pinseal: command-line front end
//!
//! Thin layer over [`pinseal::Custody`]: collects the PIN and paths, calls
//! the core, prints the result. Exit codes: 0 success or valid signature,
//! 1 signature invalid, 2 any error.

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use zeroize::Zeroizing;

use pinseal::{logging, Config, Custody, ErrorReport};

const PIN_ENV: &str = "PINSEAL_PIN";

#[derive(Parser)]
#[command(name = "pinseal")]
#[command(about = "Sign documents with a PIN-protected key kept on removable media")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "PINSEAL_CONFIG", default_value = "pinseal.toml")]
    config: PathBuf,

    /// Local public key file (overrides config file)
    #[arg(long, env = "PINSEAL_PUBLIC_KEY")]
    public_key: Option<PathBuf>,

    /// Extra directory to treat as removable media (repeatable)
    #[arg(long = "media-root", env = "PINSEAL_MEDIA_ROOT", value_delimiter = ',')]
    media_roots: Vec<PathBuf>,

    /// Log level (overrides config file)
    #[arg(long, env = "PINSEAL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a key pair; private key to removable media, public key locally
    Provision {
        /// Replace an existing key pair
        #[arg(long)]
        force: bool,
    },
    /// Sign a document, writing <document>.sig
    Sign { document: PathBuf },
    /// Verify <document>.sig against the local public key
    Verify { document: PathBuf },
    /// List mounted volumes and how they are classified
    Volumes,
    /// Show whether the key on the medium matches the local public key
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_found = cli.config.exists();
    let mut config = Config::load(&cli.config)?;

    // CLI/env overrides
    if let Some(path) = cli.public_key {
        config.keys.public_key_path = path;
    }
    config.media.extra_roots.extend(cli.media_roots);
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json_logs {
        config.logging.json = true;
    }

    logging::init(&config.logging);
    if config_found {
        debug!(config = %cli.config.display(), "Configuration loaded");
    } else {
        info!(config = %cli.config.display(), "Config file not found, using defaults");
    }

    let custody = Custody::from_config(&config)?;

    let code = match cli.command {
        Command::Provision { force } => {
            let pin = read_pin()?;
            let result = custody.provision(&pin, force);
            if cli.json {
                print_json(&result)?;
            } else if let Some(volume) = &result.volume_path {
                let layout = custody.layout();
                println!("Key pair provisioned");
                println!("  private key: {}", layout.private_key_path(volume).display());
                println!("  public key:  {}", layout.public_key_path.display());
                if let Some(fingerprint) = &result.fingerprint {
                    println!("  fingerprint: {fingerprint}");
                }
            }
            report(&result.error, cli.json);
            exit_code(result.ok)
        }
        Command::Sign { document } => {
            let pin = read_pin()?;
            let result = custody.sign(&document, &pin);
            if cli.json {
                print_json(&result)?;
            } else if let Some(path) = &result.signature_path {
                println!("Signature written to {}", path.display());
            }
            report(&result.error, cli.json);
            exit_code(result.ok)
        }
        Command::Verify { document } => {
            let result = custody.verify(&document);
            if cli.json {
                print_json(&result)?;
            } else if result.error.is_none() {
                if result.valid {
                    println!("Signature VALID for {}", document.display());
                } else {
                    println!("Signature INVALID for {}", document.display());
                }
            }
            report(&result.error, cli.json);
            match (&result.error, result.valid) {
                (Some(_), _) => ExitCode::from(2),
                (None, true) => ExitCode::SUCCESS,
                (None, false) => ExitCode::from(1),
            }
        }
        Command::Volumes => {
            let volumes = custody.volumes();
            if cli.json {
                print_json(&volumes)?;
            } else {
                for v in &volumes {
                    println!(
                        "{:<8} {:<12} removable={:<5} {}",
                        format!("{:?}", v.kind).to_lowercase(),
                        if v.writable { "writable" } else { "read-only" },
                        v.volume.is_removable,
                        v.volume.mount_point.display()
                    );
                }
            }
            ExitCode::SUCCESS
        }
        Command::Status => {
            let status = custody.status();
            if cli.json {
                print_json(&status)?;
            } else {
                let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".into());
                match &status.private_key_path {
                    Some(path) => println!("private key: {}", path.display()),
                    None => println!("private key: not found"),
                }
                println!("  fingerprint: {}", show(&status.private_key_fingerprint));
                println!("public key:  {}", status.public_key_path.display());
                println!("  fingerprint: {}", show(&status.public_key_fingerprint));
                println!("paired:      {}", status.paired);
                for issue in &status.issues {
                    println!("  - {}", issue.message);
                }
            }
            exit_code(status.paired)
        }
    };

    info!("Done");
    Ok(code)
}

/// PIN from `PINSEAL_PIN` (removed once read) or the first line of stdin.
fn read_pin() -> anyhow::Result<Zeroizing<String>> {
    if let Ok(pin) = std::env::var(PIN_ENV) {
        std::env::remove_var(PIN_ENV);
        return non_empty(Zeroizing::new(pin));
    }

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("PIN: ");
        std::io::stderr().flush().ok();
    }

    let mut line = Zeroizing::new(String::new());
    stdin
        .lock()
        .read_line(&mut line)
        .context("Failed to read PIN from stdin")?;
    non_empty(Zeroizing::new(
        line.trim_end_matches(['\r', '\n']).to_string(),
    ))
}

fn non_empty(pin: Zeroizing<String>) -> anyhow::Result<Zeroizing<String>> {
    anyhow::ensure!(!pin.is_empty(), "No PIN supplied (set {PIN_ENV} or pipe it on stdin)");
    Ok(pin)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Human-readable errors go to stderr; JSON output already carries them.
fn report(error: &Option<ErrorReport>, json: bool) {
    if let (Some(error), false) = (error, json) {
        eprintln!("error: {}", error.message);
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}
