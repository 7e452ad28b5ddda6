//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// clinic-migrate - idempotent schema migrations for the clinic database
#[derive(Parser, Debug)]
#[command(name = "cm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override database path from migrate.yml
    #[arg(short, long, global = true, env = "CM_DATABASE")]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply or revert changesets
    Migrate(MigrateArgs),

    /// Show applied, pending and orphaned changesets
    Status(StatusArgs),

    /// Remove a run lock left behind by a crashed run
    Unlock,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: MigrateCommand,
}

#[derive(Subcommand, Debug)]
pub enum MigrateCommand {
    /// Apply pending changesets in order
    Up(UpArgs),

    /// Revert the most recently applied changesets
    Down(DownArgs),
}

/// Arguments for `migrate up`
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Stop after applying this changeset id
    #[arg(long)]
    pub to: Option<String>,

    /// List the changesets that would be applied without running them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for `migrate down`
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Number of changesets to revert
    #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub steps: u32,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
