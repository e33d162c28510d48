//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.
//! Every command receives the shared [`Context`] built once from the global
//! flags and the configuration file, and reports failures through exit codes.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mtx_core::{Config, ConfigManager, Error, ObjectHandle, Settings};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod du;
mod get;
mod ls;
mod mkdir;
mod put;
mod session;
mod stat;

pub use session::Session;

/// mtx - Media device transfer tool
///
/// Browse and transfer files on handle-addressed media device storages.
#[derive(Parser, Debug)]
#[command(name = "mtx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Directory that mirrors the device storage
    #[arg(long, global = true, env = "MTX_DEVICE")]
    pub device: Option<PathBuf>,

    /// Storage id to operate on (decimal or 0x-prefixed hex)
    #[arg(long, global = true)]
    pub storage: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List objects under a device path
    Ls(ls::LsArgs),

    /// Show object metadata
    Stat(stat::StatArgs),

    /// Create directories on the device
    Mkdir(mkdir::MkdirArgs),

    /// Upload local files and directories to the device
    Put(put::PutArgs),

    /// Download an object or directory tree from the device
    Get(get::GetArgs),

    /// Summarize local trees as an upload would see them
    Du(du::DuArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// State shared by every command invocation
#[derive(Debug)]
pub struct Context {
    pub output: OutputConfig,
    pub settings: Settings,
    pub device: Option<PathBuf>,
    pub storage: Option<String>,
}

impl Context {
    /// Merge command-line flags over the configuration file
    pub fn new(cli: &Cli, config: Config) -> Self {
        let output = OutputConfig {
            json: cli.json || config.defaults.output == "json",
            no_color: cli.no_color || config.defaults.color == "never",
            no_progress: cli.no_progress || !config.defaults.progress,
            quiet: cli.quiet,
        };
        let settings = config.settings();
        let device = cli.device.clone().or_else(|| config.device.root.clone());

        Self {
            output,
            settings,
            device,
            storage: cli.storage.clone(),
        }
    }

    /// A formatter for this invocation's output settings
    pub fn formatter(&self) -> Formatter {
        Formatter::new(self.output.clone())
    }
}

/// Print an engine error with some context and map it to its exit code
pub(crate) fn report(formatter: &Formatter, context: &str, err: &Error) -> ExitCode {
    formatter.error(&format!("{context}: {err}"));
    ExitCode::from_error(err)
}

/// Turn a `--handle` argument into an object handle; `0` means none given
pub(crate) fn handle_arg(raw: Option<u32>) -> Option<ObjectHandle> {
    raw.filter(|handle| *handle != 0).map(ObjectHandle)
}

/// Execute the CLI command and return an exit code
pub fn execute(cli: Cli) -> ExitCode {
    if let Commands::Completions(args) = &cli.command {
        return completions::execute(args);
    }

    let config = match ConfigManager::new().and_then(|manager| manager.load()) {
        Ok(config) => config,
        Err(e) => {
            let formatter = Formatter::new(OutputConfig {
                json: cli.json,
                no_color: cli.no_color,
                ..Default::default()
            });
            return report(&formatter, "Failed to load configuration", &e);
        }
    };
    let ctx = Context::new(&cli, config);

    match cli.command {
        Commands::Ls(args) => ls::execute(args, &ctx),
        Commands::Stat(args) => stat::execute(args, &ctx),
        Commands::Mkdir(args) => mkdir::execute(args, &ctx),
        Commands::Put(args) => put::execute(args, &ctx),
        Commands::Get(args) => get::execute(args, &ctx),
        Commands::Du(args) => du::execute(args, &ctx),
        Commands::Completions(args) => completions::execute(&args),
    }
}
