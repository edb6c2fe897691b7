//! Stock research newsletter CLI
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_KEY="sk-..."
//!
//! # Serve the research form on http://127.0.0.1:8501
//! cargo run --bin stock-newsletter -- serve
//!
//! # Research one ticker and print the newsletter
//! cargo run --bin stock-newsletter -- run --ticket AAPL
//! ```
//!
//! Against a local OpenAI-compatible server, set `OPENAI_API_BASE` (and
//! `OPENAI_MODEL`) instead of the API key.

use agent_crew::CrewOutput;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use stock_newsletter::crew::ResearchRunner;
use stock_newsletter::{AppConfig, build_runner, web};

#[derive(Parser)]
#[command(name = "stock-newsletter")]
#[command(about = "Three-agent stock research crew that writes a markdown newsletter", long_about = None)]
struct Cli {
    /// Do not log every agent step
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the research web form
    Serve {
        /// Bind host (overrides STOCK_CREW_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides STOCK_CREW_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Research one ticker and print the newsletter
    Run {
        /// Ticker symbol, e.g. AAPL
        #[arg(long)]
        ticket: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agent_utils::init_tracing("warn,stock_newsletter=info,agent_crew=info");

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    let verbose = !cli.quiet;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config.validate()?;

            let runner = build_runner(&config, verbose)?;
            web::serve(&config.bind_addr(), runner).await?;
        }
        Commands::Run { ticket } => {
            if ticket.trim().is_empty() {
                anyhow::bail!(web::EMPTY_TICKET_MESSAGE);
            }

            let runner = build_runner(&config, verbose)?;
            let output = runner.research(&ticket).await?;

            println!("{}\n", output.final_output);
            println!("{}", summary_table(&output));
        }
    }

    Ok(())
}

fn summary_table(output: &CrewOutput) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Task", "Agent", "Tokens", "Output chars"]);

    for task in &output.tasks_output {
        table.add_row(vec![
            task.name.clone(),
            task.agent.clone(),
            task.token_usage.total().to_string(),
            task.raw.chars().count().to_string(),
        ]);
    }
    table.add_row(vec![
        "total".to_string(),
        output.run_id.clone(),
        output.token_usage.total().to_string(),
        output.final_output.chars().count().to_string(),
    ]);

    table
}
