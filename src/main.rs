use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wikivault::cli::{Cli, Commands};
use wikivault::commands;
use wikivault::config::Config;
use wikivault::context::AppContext;
use wikivault::tools;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(command) = cli.command else {
        Cli::parse_from(["wikivault", "--help"]);
        return Ok(());
    };

    let config = Config::load()?;
    let mut ctx = AppContext::from_config(config)?;

    let output = match command {
        Commands::Backlinks { document } => {
            let results = commands::backlinks(&ctx, &document)?;
            commands::render_backlinks(&document, &results)
        }
        Commands::Forward { document } => {
            let results = commands::forward_links(&ctx, &document)?;
            commands::render_forward_links(&document, &results)
        }
        Commands::Broken { document } => {
            let titles = commands::broken_links(&mut ctx, &document)?;
            commands::render_broken_links(&document, &titles)
        }
        Commands::Path { from, to, max_hops } => {
            let path = commands::link_path(&mut ctx, &from, &to, max_hops)?;
            commands::render_path(&from, &to, path.as_ref())
        }
        Commands::Metrics { hubs } => {
            let metrics = commands::link_metrics(&mut ctx, hubs)?;
            commands::render_metrics(&metrics)
        }
        Commands::Index { incremental, since } => {
            let summary = commands::index(&mut ctx, incremental, since)?;
            commands::render_summary(&summary)
        }
        Commands::Search {
            query,
            documents,
            limit,
            max_distance,
        } => {
            if documents {
                let matches = commands::search_documents(&ctx, &query, limit, max_distance)?;
                commands::render_documents(&query, &matches)
            } else {
                let results = commands::search_excerpts(&ctx, &query, limit, max_distance)?;
                commands::render_excerpts(&query, &results)
            }
        }
        Commands::Tool { name, args } => {
            let tool = tools::find(&name).with_context(|| {
                format!("Unknown tool '{name}'. Run `wikivault tools` to list them.")
            })?;
            let args = match args {
                Some(json) => serde_json::from_str(&json).context("Tool arguments must be JSON")?,
                None => serde_json::Value::Null,
            };
            tool.run(&mut ctx, &args)?
        }
        Commands::Tools => tools::registry()
            .iter()
            .map(|tool| {
                let descriptor = tool.descriptor();
                format!("{:<18} {}", descriptor.name, descriptor.description)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };

    println!("{output}");
    Ok(())
}
