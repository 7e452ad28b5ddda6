//! Unlock command implementation

use anyhow::{Context, Result};

use crate::cli::GlobalArgs;
use crate::commands::common::MigrationContext;

/// Execute the unlock command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = MigrationContext::load(global)?;
    let removed = ctx
        .migrator()
        .force_unlock()
        .context("Failed to remove run lock")?;
    if removed {
        println!("Run lock removed");
    } else {
        println!("No run lock was held");
    }
    Ok(())
}
