use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use ecliniq_lib::config::AppConfig;
use ecliniq_lib::core_state::CoreState;
use ecliniq_lib::{db, maintenance};

#[derive(Parser)]
#[command(name = "ecliniq")]
#[command(about = "Clinic scheduling, inventory and medical records server", version)]
struct Cli {
    /// Database file (overrides ECLINIQ_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Listen address (overrides ECLINIQ_BIND / PORT)
    #[arg(long, global = true)]
    bind: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server (default)
    Serve,

    /// Print row counts and total inventory value
    Stats,

    /// List all appointments
    Appointments,

    /// List all inventory items
    Inventory,

    /// List all medical records (id, patient, diagnosis, created)
    Records,

    /// Write an online backup of the database
    Backup {
        /// Target directory (default: `backups/` next to the database)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Export appointments, inventory and medical records to JSON
    Export {
        /// Target directory (default: next to the database)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Delete all appointments, inventory and medical records
    Reset {
        /// Skip the interactive confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Apply pending schema migrations and exit
    Migrate,
}

fn confirm_reset() -> anyhow::Result<bool> {
    println!("WARNING: this deletes ALL appointments, inventory and medical records.");
    print!("Type \"{}\" to proceed: ", maintenance::RESET_CONFIRMATION);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == maintenance::RESET_CONFIRMATION)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();
    ecliniq_lib::init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    let core = Arc::new(CoreState::from_config(&config));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            core.initialize().context("Database initialization failed")?;
            ecliniq_lib::run_server(core, config.bind).await?;
        }
        Commands::Stats => {
            let conn = core.open_db()?;
            let stats = maintenance::fetch_stats(&conn)?;
            println!("{stats}");
        }
        Commands::Appointments => {
            let conn = core.open_db()?;
            println!("{}", maintenance::appointments_table(&db::list_appointments(&conn)?));
        }
        Commands::Inventory => {
            let conn = core.open_db()?;
            println!("{}", maintenance::inventory_table(&db::list_inventory(&conn)?));
        }
        Commands::Records => {
            let conn = core.open_db()?;
            println!("{}", maintenance::records_table(&db::list_medical_records(&conn)?));
        }
        Commands::Export { dir } => {
            let conn = core.open_db()?;
            let dir = dir.unwrap_or_else(|| maintenance::default_export_dir(core.db_path()));
            let path = maintenance::write_export(&conn, &dir)?;
            println!("Data exported to {}", path.display());
        }
        Commands::Reset { yes } => {
            if !yes && !confirm_reset().context("Cannot read confirmation")? {
                println!("Reset cancelled");
                return Ok(());
            }
            let mut conn = core.open_db()?;
            let summary = maintenance::reset_database(&mut conn)?;
            println!(
                "Database reset: removed {} appointments, {} inventory items, {} medical records",
                summary.appointments, summary.inventory_items, summary.medical_records
            );
        }
        Commands::Backup { dir } => {
            let conn = core.open_db()?;
            let dir = dir.unwrap_or_else(|| maintenance::default_backup_dir(core.db_path()));
            let path = maintenance::backup_database(&conn, &dir)?;
            println!("Backup written to {}", path.display());
        }
        Commands::Migrate => {
            let conn = core.open_db()?;
            println!(
                "Database at schema version {} ({})",
                db::get_current_version(&conn),
                core.db_path().display()
            );
        }
    }

    Ok(())
}
