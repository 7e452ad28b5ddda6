//! Status command implementation

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cm_db::RunLock;
use cm_migrate::{ChangesetState, ChangesetStatus};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{print_table, MigrationContext};

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = MigrationContext::load(global)?;
    let statuses = ctx
        .migrator()
        .status()
        .context("Failed to read migration status")?;

    match args.output {
        StatusOutput::Json => {
            let json =
                serde_json::to_string_pretty(&statuses).context("Failed to serialize status")?;
            println!("{json}");
        }
        StatusOutput::Table => {
            print_status_table(&statuses);
            if let Some(lock) = ctx.db.lock_holder().context("Failed to read run lock")? {
                println!();
                println!(
                    "Run lock held by {} since {}",
                    lock.holder,
                    format_time(&lock.acquired_at)
                );
            }
        }
    }
    Ok(())
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn print_status_table(statuses: &[ChangesetStatus]) {
    let rows: Vec<Vec<String>> = statuses
        .iter()
        .map(|s| {
            let (state, at) = match &s.state {
                ChangesetState::Applied { at } => ("applied", format_time(at)),
                ChangesetState::Pending => ("pending", String::new()),
                ChangesetState::Orphaned { at } => ("orphaned", format_time(at)),
            };
            vec![s.id.to_string(), state.to_string(), at]
        })
        .collect();
    print_table(&["CHANGESET", "STATE", "APPLIED AT"], &rows);

    let pending = statuses
        .iter()
        .filter(|s| s.state == ChangesetState::Pending)
        .count();
    println!();
    println!("{} changeset(s), {pending} pending", statuses.len());
}
