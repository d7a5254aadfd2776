use std::io::Read;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use legacy_sql_bridge::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect T-SQL rewriting and PostgreSQL connectivity")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the PostgreSQL form of a T-SQL statement (`-` reads stdin)
    Rewrite { sql: String },
    /// Connect with the DB_* settings and run `SELECT 1`
    Ping {
        #[command(flatten)]
        config: BridgeConfig,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Rewrite { sql } => run_rewrite(&sql),
        Command::Ping { config } => run_ping(&config).await,
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_rewrite(sql: &str) -> Result<(), Box<dyn std::error::Error>> {
    let sql = if sql == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        sql.to_string()
    };
    println!("{}", rewrite(&sql)?);
    Ok(())
}

async fn run_ping(config: &BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let db = Database::connect(config)?;
    let started = std::time::Instant::now();
    let row = db.get_one("SELECT 1 AS ok", &[]).await;
    db.close();
    let row = row?.ok_or("server returned no row")?;
    println!(
        "{}:{}/{} ok={:?} in {:?}",
        config.host,
        config.port,
        config.database,
        row.get("ok").and_then(RowValues::as_int),
        started.elapsed()
    );
    Ok(())
}
