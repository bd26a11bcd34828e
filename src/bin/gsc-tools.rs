use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gsc_insights::build_executor;
use gsc_insights::config::Config;
use gsc_insights::tools::GscToolSchemas;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gsc-tools")]
#[command(about = "Search Console tool runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all tools
    List {
        /// Print full parameter schemas as JSON
        #[arg(long)]
        schemas: bool,
    },
    /// Call one tool and print its payload
    Call {
        /// Tool name, e.g. get_top_queries
        name: String,
        /// JSON argument bag
        #[arg(default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { schemas } => {
            if schemas {
                println!("{}", serde_json::to_string_pretty(&GscToolSchemas::all())?);
            } else {
                for schema in GscToolSchemas::all() {
                    println!("{:<28} {}", schema.name, schema.description);
                }
            }
        }
        Commands::Call { name, args } => {
            let args: Value =
                serde_json::from_str(&args).context("Tool arguments must be valid JSON")?;

            let config = Config::from_env()?;
            let executor = build_executor(&config)?;

            let outcome = executor.execute(&name, args).await;
            println!("{}", serde_json::to_string_pretty(&outcome.payload)?);
            if outcome.is_error {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
