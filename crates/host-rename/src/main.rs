// # host-rename - Foreman host rename hook
//
// This binary is a THIN integration layer. All rename logic lives in
// host-rename-core; this file only:
// 1. Parses the command line
// 2. Reads configuration from the environment (or a settings file)
// 3. Initializes logging and the runtime
// 4. Hands the event to the RenameEngine
//
// ## Usage
//
// Foreman runs every hook as `<hook> <event> <object>` with the host as
// JSON on stdin:
//
// ```bash
// echo '{"host":{"id":42,"name":"web02.example.com"}}' | host-rename update web02.example.com
// ```
//
// `host-rename install [HOOKDIR]` and `host-rename uninstall [HOOKDIR]`
// manage the shims in Foreman's hook tree.
//
// ## Configuration
//
// - `HOST_RENAME_CONFIG`: JSON settings file (replaces all variables below)
// - Without it, `/etc/foreman-host-rename/settings.json` is used when present;
//   this is how an installed hook finds its settings, since Foreman does not
//   pass `HOST_RENAME_*` variables to hooks
// - `HOST_RENAME_COMMAND`: Executable run as `<cmd> <old_name> <new_name>` (required)
// - `HOST_RENAME_FOREMAN_URL`, `HOST_RENAME_FOREMAN_USER`,
//   `HOST_RENAME_FOREMAN_PASSWORD`: Foreman API access (required)
// - `HOST_RENAME_DATABASE_PATH`: Identity table location
// - `HOST_RENAME_PAGE_SIZE`: Hosts per API page during the first import
// - `HOST_RENAME_LOCK_TIMEOUT_SECS`, `HOST_RENAME_IMPORT_TIMEOUT_SECS`,
//   `HOST_RENAME_NOTIFY_TIMEOUT_SECS`: Timeouts
// - `HOST_RENAME_LOG_LEVEL`: trace, debug, info, warn (default), error
// - `HOST_RENAME_LOG_PATH`: Append logs to this file instead of stderr

mod install;
mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use host_rename_core::config::LogConfig;
use host_rename_core::{ErrorKind, HookConfig, RenameEngine};
use host_rename_foreman::ForemanInventory;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the hook
///
/// - 0: Event applied (a failing rename action is only a warning)
/// - 1: Configuration or startup error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy)]
enum HookExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<HookExitCode> for ExitCode {
    fn from(code: HookExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "host-rename",
    version,
    about = "Runs an action when a Foreman host is renamed"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install the hook shims into Foreman's hook tree
    Install {
        #[arg(default_value = install::DEFAULT_HOOK_DIR)]
        hookdir: PathBuf,
    },
    /// Remove the hook shims
    Uninstall {
        #[arg(default_value = install::DEFAULT_HOOK_DIR)]
        hookdir: PathBuf,
    },
    /// A host lifecycle event: `<action> [object]`, host JSON on stdin
    #[command(external_subcommand)]
    Hook(Vec<String>),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let code = match cli.command {
        Command::Install { hookdir } => run_install(&hookdir),
        Command::Uninstall { hookdir } => run_uninstall(&hookdir),
        Command::Hook(args) => run_hook(args),
    };
    code.into()
}

fn run_install(hookdir: &std::path::Path) -> HookExitCode {
    let settings_file = std::path::Path::new(settings::DEFAULT_CONFIG_FILE);
    let result = std::env::current_exe()
        .context("Failed to locate the host-rename executable")
        .and_then(|program| install::install(hookdir, &program))
        .and_then(|report| {
            if let Some(dir) = settings_file.parent() {
                install::create_config_dir(dir)?;
            }
            Ok(report)
        });

    match result {
        Ok(report) => {
            for shim in &report.skipped {
                println!("Already installed: {}", shim.display());
            }
            println!(
                "The hook has been installed ({} new shim(s)). Restart Foreman to activate it.",
                report.written.len()
            );
            if !settings_file.exists() {
                println!(
                    "Write the hook settings to {} (JSON, see HOST_RENAME_CONFIG).",
                    settings_file.display()
                );
            }
            HookExitCode::Success
        }
        Err(e) => {
            eprintln!("Install failed: {:#}", e);
            HookExitCode::ConfigError
        }
    }
}

fn run_uninstall(hookdir: &std::path::Path) -> HookExitCode {
    match install::uninstall(hookdir) {
        Ok(removed) => {
            println!(
                "The hook has been uninstalled ({} shim(s) removed). Restart Foreman to deactivate it.",
                removed.len()
            );
            HookExitCode::Success
        }
        Err(e) => {
            eprintln!("Uninstall failed: {:#}", e);
            HookExitCode::RuntimeError
        }
    }
}

fn run_hook(args: Vec<String>) -> HookExitCode {
    // Foreman's second argument (the object's display name) is informational.
    let Some(action) = args.into_iter().next() else {
        eprintln!("Missing hook action");
        return HookExitCode::ConfigError;
    };

    // Load configuration from environment
    let config = match settings::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return HookExitCode::ConfigError;
        }
    };

    if let Err(e) = init_tracing(&config.log) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return HookExitCode::ConfigError;
    }

    let engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Configuration validation error: {}", e);
            eprintln!("Configuration validation error: {}", e);
            return HookExitCode::ConfigError;
        }
    };

    // One event per process; no need for worker threads
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HookExitCode::RuntimeError;
        }
    };

    rt.block_on(async {
        let payload = match read_payload().await {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to read the host from stdin: {:#}", e);
                return HookExitCode::RuntimeError;
            }
        };

        match engine.run_hook(&action, &payload).await {
            Ok(outcome) => {
                info!(
                    "Hook finished: rename_detected={}",
                    outcome.reconciliation.rename_detected
                );
                HookExitCode::Success
            }
            Err(e) if e.kind() == ErrorKind::Config => HookExitCode::ConfigError,
            Err(_) => HookExitCode::RuntimeError,
        }
    })
}

fn build_engine(config: &HookConfig) -> host_rename_core::Result<RenameEngine> {
    let inventory = ForemanInventory::from_config(&config.inventory)?;
    RenameEngine::from_config(config, Box::new(inventory))
}

async fn read_payload() -> Result<String> {
    let mut payload = String::new();
    tokio::io::stdin()
        .read_to_string(&mut payload)
        .await
        .context("stdin is not valid UTF-8 or could not be read")?;
    Ok(payload)
}

/// Install the global subscriber, writing to stderr or the configured file
fn init_tracing(log: &LogConfig) -> Result<()> {
    log.validate()?;

    let level = match log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    match &log.path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_subcommand_is_a_hook_action() {
        let cli = Cli::try_parse_from(["host-rename", "update", "web01.example.com"]).unwrap();
        match cli.command {
            Command::Hook(args) => assert_eq!(args, vec!["update", "web01.example.com"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_install_default_hookdir() {
        let cli = Cli::try_parse_from(["host-rename", "install"]).unwrap();
        match cli.command {
            Command::Install { hookdir } => {
                assert_eq!(hookdir, PathBuf::from(install::DEFAULT_HOOK_DIR))
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_uninstall_custom_hookdir() {
        let cli = Cli::try_parse_from(["host-rename", "uninstall", "/tmp/hooks"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Uninstall { hookdir } if hookdir == PathBuf::from("/tmp/hooks")
        ));
    }
}
