//! jfcrypt: streaming passphrase encryption for large files
//!
//! Commands:
//!   encrypt (--encrypt, -e)   STDIN -> sealed stream on STDOUT
//!   decrypt (--decrypt, -d)   sealed stream on STDIN -> STDOUT
//!   version (--version, -v)   print the version
//!   help    (--help, -h)      print usage
//!
//! STDOUT carries data only; prompts, logs and errors go to the terminal
//! or STDERR.

use anyhow::{Context, Result};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::PathBuf;

use jfcrypt_core::config::{default_config_path, expand_tilde, JfcryptConfig};
use jfcrypt_core::types::FORMAT_VERSION;
use jfcrypt_core::{Format, JfcryptError, JfcryptResult};
use jfcrypt_crypto::{decrypt_stream, encrypt_stream, EncryptOptions, KdfParams};
use jfcrypt_secrets::{PassphraseChain, PassphraseSource};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "jfcrypt",
    about = "Streaming authenticated encryption for large files",
    long_about = "jfcrypt: streaming authenticated encryption for large files.\n\n\
        Data is read from STDIN and written to STDOUT in 1 MiB AES-256-GCM segments, \
        under a key derived from a passphrase with Argon2id.",
    after_help = "PASSPHRASE:\n    Set JFCRYPT_PASSPHRASE environment variable, or enter interactively.\n\n\
        EXAMPLES:\n    \
        cat backup.tar | jfcrypt encrypt > backup.tar.sealed\n    \
        cat backup.tar | jfcrypt encrypt -m=2G -i=4 > backup.tar.sealed\n    \
        cat backup.tar.sealed | jfcrypt decrypt > backup.tar",
    disable_version_flag = true,
    arg_required_else_help = true
)]
struct Cli {
    /// Path to config.toml (default: ~/.config/jfcrypt/config.toml)
    #[arg(long, short = 'c', env = "JFCRYPT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, env = "JFCRYPT_LOG", global = true)]
    log: Option<String>,

    /// Log format
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt data from STDIN to STDOUT
    #[command(long_flag = "encrypt", short_flag = 'e')]
    Encrypt(EncryptArgs),

    /// Decrypt data from STDIN to STDOUT (parameters come from the header)
    #[command(long_flag = "decrypt", short_flag = 'd')]
    Decrypt,

    /// Show version information
    #[command(long_flag = "version", short_flag = 'v')]
    Version,
}

#[derive(clap::Args, Debug, Default)]
struct EncryptArgs {
    /// Use base64 encoding (text-safe but 33% larger)
    #[arg(long, short = 'b')]
    base64: bool,

    /// Argon2 memory cost, e.g. 64M, 256M, 1G (bare number = MB; default: 1G)
    #[arg(long, short = 'm', value_name = "SIZE", value_parser = parse_memory)]
    memory: Option<u32>,

    /// Argon2 iterations (default: 3)
    #[arg(long, short = 'i', value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    iterations: Option<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ────────────────────────────────────────────────────────────────

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => exit_on_parse_error(e),
    };

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Help goes to STDERR like everything else that is not data.
fn exit_on_parse_error(e: clap::Error) -> ! {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            eprint!("{}", e.render());
            std::process::exit(0);
        }
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            eprint!("{}", e.render());
            eprintln!("Error: no command specified");
            std::process::exit(1);
        }
        kind => {
            if kind == ErrorKind::InvalidSubcommand {
                eprint!("{}", Cli::command().render_help());
            }
            eprintln!("Error: {}", parse_error_message(&e));
            std::process::exit(1);
        }
    }
}

/// One-line form of a clap error, without clap's `error: ` prefix and tips.
fn parse_error_message(e: &clap::Error) -> String {
    if let Some(ContextValue::String(name)) = e.get(ContextKind::InvalidSubcommand) {
        return format!("unknown command: {name}");
    }
    let rendered = e.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .as_deref()
        .map(expand_tilde)
        .unwrap_or_else(default_config_path);
    let config = JfcryptConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let format = match cli.log_format {
        Some(f) => f,
        None => LogFormat::from_str(&config.log.format, true)
            .map_err(|e| anyhow::anyhow!("log.format: {e}"))?,
    };
    init_logging(level, format);
    tracing::debug!(config = %config_path.display(), "config loaded");

    match cli.command {
        Commands::Encrypt(args) => cmd_encrypt(&config, &args),
        Commands::Decrypt => cmd_decrypt(),
        Commands::Version => {
            eprintln!("jfcrypt version {FORMAT_VERSION}");
            Ok(())
        }
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_ansi(io::stderr().is_terminal())
                        .with_writer(io::stderr),
                )
                .init();
        }
    }
}

// ── Commands ───────────────────────────────────────────────────────────────────

/// CLI flags win over the config file, which wins over built-in defaults.
fn encrypt_options(config: &JfcryptConfig, args: &EncryptArgs) -> EncryptOptions {
    EncryptOptions {
        kdf: KdfParams {
            mem_cost_kib: args.memory.unwrap_or(config.kdf.memory_kib),
            time_cost: args.iterations.unwrap_or(config.kdf.time_cost),
            parallelism: config.kdf.parallelism,
            ..KdfParams::default()
        },
        format: if args.base64 {
            Format::Base64
        } else {
            config.output.format
        },
        ..EncryptOptions::default()
    }
}

fn cmd_encrypt(config: &JfcryptConfig, args: &EncryptArgs) -> Result<()> {
    let options = encrypt_options(config, args);
    tracing::debug!(
        mem_cost_kib = options.kdf.mem_cost_kib,
        time_cost = options.kdf.time_cost,
        format = options.format.as_str(),
        "encrypting"
    );

    let passphrase = PassphraseChain::default()
        .acquire_with_confirmation("Enter passphrase: ", "Confirm passphrase: ")?;

    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());
    encrypt_stream(stdin.lock(), &mut out, &passphrase, &options)?;
    out.flush().context("flushing stdout")?;
    Ok(())
}

fn cmd_decrypt() -> Result<()> {
    let chain = PassphraseChain::default();

    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());
    decrypt_stream(stdin.lock(), &mut out, || chain.acquire("Enter passphrase: "))?;
    out.flush().context("flushing stdout")?;
    Ok(())
}

// ── Helpers ────────────────────────────────────────────────────────────────────

/// Parse an Argon2 memory size into KiB.
///
/// Accepts `64`, `64M`, `64MB`, `1G`, `1GB`, `2048K`, `2048KB`
/// (case-insensitive). A bare number is megabytes.
fn parse_memory(s: &str) -> JfcryptResult<u32> {
    let upper = s.trim().to_ascii_uppercase();
    let (digits, multiplier): (&str, u64) = if let Some(n) = strip_unit(&upper, "G") {
        (n, 1024 * 1024)
    } else if let Some(n) = strip_unit(&upper, "M") {
        (n, 1024)
    } else if let Some(n) = strip_unit(&upper, "K") {
        (n, 1)
    } else {
        (upper.as_str(), 1024)
    };

    let value: u32 = digits
        .parse()
        .map_err(|e| JfcryptError::parameter(format!("invalid memory value {s:?}: {e}")))?;
    let kib = u64::from(value) * multiplier;
    if kib > u64::from(u32::MAX) {
        return Err(JfcryptError::parameter("memory value too large"));
    }
    if kib < 1024 {
        return Err(JfcryptError::parameter("memory must be at least 1MB"));
    }
    Ok(kib as u32)
}

/// `"64MB"` / `"64M"` with unit `"M"` -> `"64"`
fn strip_unit<'a>(s: &'a str, unit: &str) -> Option<&'a str> {
    let rest = s.strip_suffix('B').unwrap_or(s);
    rest.strip_suffix(unit)
}
