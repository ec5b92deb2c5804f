//! Orchestra CLI - command-line harness for the agent orchestration engine

mod cli;
mod demo;

use clap::Parser;
use cli::{Cli, Commands, RegistryCommands};
use colored::Colorize;
use orchestra::OrchestratorConfig;
use orchestra_registry::FindCriteria;
use tokio::sync::mpsc;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command(cli))
}

async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Query { text, session } => run_query(&text, session).await,
        Commands::Registry { action } => match action {
            RegistryCommands::List => {
                run_registry_list();
                Ok(())
            }
        },
    }
}

async fn run_query(text: &str, session: String) -> anyhow::Result<()> {
    let orchestrator = demo::demo_orchestrator(OrchestratorConfig::default());

    let (progress_tx, mut progress_rx) = mpsc::channel(32);
    let progress_task = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            eprintln!(
                "{} {} {:?} ({}ms)",
                "progress".dimmed(),
                event.step_id.cyan(),
                event.state,
                event.elapsed_ms
            );
        }
    });

    let result = orchestrator
        .handle_query(text, session, None, Some(progress_tx), None)
        .await;

    drop(orchestrator);
    let _ = progress_task.await;

    match result {
        Ok(result) => {
            println!("{}", result.text);
            if let Some(error) = &result.error {
                println!("{} {}", "warning:".yellow().bold(), error.user_message);
            }
            if !result.tools_used.is_empty() {
                let names: Vec<&str> = result.tools_used.iter().map(|t| t.name.as_str()).collect();
                println!("{} {}", "tools used:".dimmed(), names.join(", "));
            }
            println!(
                "{} {}ms",
                "processing time:".dimmed(),
                result.processing_time_ms
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            Err(e.into())
        }
    }
}

fn run_registry_list() {
    let registry = demo::demo_registry();
    let tools = registry.find(&FindCriteria::default());

    println!("{}", "Built-in demo tool catalog".bold());
    for tool in tools {
        println!(
            "  {} {} — {}",
            tool.name.green().bold(),
            format!("(v{})", tool.version).dimmed(),
            tool.description
        );
    }
}
