use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_migrate_up_with_target() {
    let cli = Cli::try_parse_from([
        "cm",
        "migrate",
        "up",
        "--to",
        "20240115093000_initial_schema",
        "--dry-run",
    ])
    .unwrap();
    match cli.command {
        Commands::Migrate(MigrateArgs {
            command: MigrateCommand::Up(args),
        }) => {
            assert_eq!(args.to.as_deref(), Some("20240115093000_initial_schema"));
            assert!(args.dry_run);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_migrate_down_defaults_to_one_step() {
    let cli = Cli::try_parse_from(["cm", "migrate", "down"]).unwrap();
    match cli.command {
        Commands::Migrate(MigrateArgs {
            command: MigrateCommand::Down(args),
        }) => assert_eq!(args.steps, 1),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_down_rejects_zero_steps() {
    assert!(Cli::try_parse_from(["cm", "migrate", "down", "--steps", "0"]).is_err());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["cm", "status", "-o", "json", "-v", "-d", "/tmp/clinic.duckdb"])
        .unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.database.as_deref(), Some("/tmp/clinic.duckdb"));
    assert!(matches!(
        cli.command,
        Commands::Status(StatusArgs {
            output: StatusOutput::Json
        })
    ));
}

#[test]
fn test_unlock_takes_no_arguments() {
    let cli = Cli::try_parse_from(["cm", "unlock"]).unwrap();
    assert!(matches!(cli.command, Commands::Unlock));
    assert!(Cli::try_parse_from(["cm", "unlock", "--force"]).is_err());
}
