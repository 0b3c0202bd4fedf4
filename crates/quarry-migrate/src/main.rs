//! quarry-migrate CLI
//!
//! Command-line tool for applying and creating SQL migrations.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use quarry_migrate::config::{DEFAULT_CONFIG_FILE, DEFAULT_CONNECTION};
use quarry_migrate::prelude::*;

/// Linear SQL migrations for quarry.
#[derive(Parser)]
#[command(name = "quarry-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, env = "QUARRY_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Connection to use.
    #[arg(long, default_value = DEFAULT_CONNECTION)]
    conn: String,

    /// Print the causes of failures.
    #[arg(long)]
    stacktrace: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply missing migrations.
    Migrations {
        /// Migration namespace (`default` if not specified).
        #[arg(short, long)]
        namespace: Option<String>,

        /// Commit the migrations instead of rolling them back.
        #[arg(long)]
        apply: bool,
    },

    /// Create a new migration file.
    AddMigration {
        /// Migration name, optionally with a `.sql` or `.tpql` extension.
        #[arg(short, long)]
        file: String,

        /// Migration namespace (`default` if not specified).
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Create the migrations table.
    CreateMigrationsTable,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match run(&cli) {
        Ok(code) => Ok(code),
        Err(err) => {
            eprintln!("Error: {err}");
            if cli.stacktrace {
                for cause in err.chain().skip(1) {
                    eprintln!("  caused by: {cause}");
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load(&cli.config)?;
    let connection = config.connection(&cli.conn)?;

    match &cli.command {
        Commands::Migrations { namespace, apply } => {
            let mut env = Environment::open(&connection)?;
            let mut migrator = Migrator::new().apply(*apply);
            if let Some(namespace) = namespace {
                migrator = migrator.namespace(namespace);
            }
            let report = migrator.run(&mut env)?;
            env.close()?;

            print_report(&report, cli.stacktrace);
            Ok(ExitCode::from(report.exit_code()))
        }

        Commands::AddMigration { file, namespace } => {
            let path = add_migration(&connection, file, namespace.as_deref())?;
            println!("Migration created:\n{}", path.display());
            Ok(ExitCode::SUCCESS)
        }

        Commands::CreateMigrationsTable => {
            let mut env = Environment::open(&connection)?;
            env.create_migrations_table()?;
            info!(table = %env.history().table(), "Migrations table created successfully.");
            env.close()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_report(report: &MigrationReport, stacktrace: bool) {
    for entry in &report.entries {
        println!("{entry}");
        if let Status::Error { causes, .. } = &entry.status {
            if stacktrace {
                for cause in causes {
                    println!("  caused by: {cause}");
                }
            }
        }
    }
    println!("\n{}", report.summary());
}
