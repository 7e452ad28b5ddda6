//! Migrate command implementation

use anyhow::{bail, Context, Result};
use cm_core::ChangesetId;
use cm_migrate::{ChangesetReport, MigrateError};

use crate::cli::{DownArgs, GlobalArgs, MigrateArgs, MigrateCommand, UpArgs};
use crate::commands::common::MigrationContext;

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = MigrationContext::load(global)?;
    match &args.command {
        MigrateCommand::Up(up_args) => up(&ctx, up_args),
        MigrateCommand::Down(down_args) => down(&ctx, down_args),
    }
}

fn up(ctx: &MigrationContext, args: &UpArgs) -> Result<()> {
    let target = args
        .to
        .as_deref()
        .map(ChangesetId::parse)
        .transpose()
        .context("Invalid --to changeset id")?;
    if let Some(target) = &target {
        if !ctx.registry.contains(target) {
            bail!("Changeset {target} is not registered");
        }
    }

    let migrator = ctx.migrator();
    if args.dry_run {
        let pending: Vec<ChangesetId> = migrator
            .pending()?
            .into_iter()
            .filter(|id| target.as_ref().map_or(true, |t| id <= t))
            .collect();
        if pending.is_empty() {
            println!("Schema is up to date");
        } else {
            println!("Would apply {} changeset(s):", pending.len());
            for id in &pending {
                println!("  {id}");
            }
        }
        return Ok(());
    }

    let report = match &target {
        Some(target) => migrator.apply_to(target),
        None => migrator.apply_pending(),
    }
    .context("Migration failed")?;

    if report.is_empty() {
        println!("Schema is up to date");
        return Ok(());
    }
    for changeset in &report.applied {
        print_changeset("Applied", changeset);
    }
    println!("Applied {} changeset(s)", report.applied.len());
    Ok(())
}

fn down(ctx: &MigrationContext, args: &DownArgs) -> Result<()> {
    let migrator = ctx.migrator();
    let mut reverted = 0;
    for _ in 0..args.steps {
        match migrator.revert_last() {
            Ok(report) => {
                print_changeset("Reverted", &report);
                reverted += 1;
            }
            Err(MigrateError::NoAppliedMigrations) => {
                println!("No applied migrations to revert");
                break;
            }
            Err(e) => return Err(e).context("Revert failed"),
        }
    }
    if reverted > 0 {
        println!("Reverted {reverted} changeset(s)");
    }
    Ok(())
}

fn print_changeset(verb: &str, report: &ChangesetReport) {
    println!(
        "  {verb} {} ({} changes, {} already in place)",
        report.id,
        report.mutations(),
        report.no_ops()
    );
}
