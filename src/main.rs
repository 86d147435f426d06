use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use pipedream_rs::engine::context::PipelineContext;
use pipedream_rs::engine::execution::ExecutionContext;
use pipedream_rs::engine::pipeline::PipelineExecutor;
use pipedream_rs::pipedream::definition::{DefinitionLoader, PipelineBuilder};
use pipedream_rs::pipedream::sources;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a pipeline from a file
    Run {
        /// Path to the pipeline definition
        #[arg(short, long)]
        file: String,

        /// Initial context as a JSON object
        #[arg(short, long)]
        context: Option<String>,
    },
    /// Check that a pipeline definition loads and builds
    Validate {
        /// Path to the pipeline definition
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let loader = DefinitionLoader::new();
    let builder = PipelineBuilder::default();

    match args.command {
        Commands::Run { file, context } => {
            let def = loader.load(&file)?;
            let pipeline = builder.build(&def)?;

            let mut ctx = match context {
                Some(raw) => {
                    let json: serde_json::Value =
                        serde_json::from_str(&raw).context("Failed to parse --context")?;
                    PipelineContext::from_json(json)?
                }
                None => PipelineContext::new(),
            };

            let executor = PipelineExecutor::new();
            sources::register_builtins(&executor).await;

            let ectx = ExecutionContext::new();
            let interrupt = ectx.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, cancelling run {}", interrupt.run_id());
                    interrupt.cancel();
                }
            });

            log::info!("Running pipeline '{}' from {}", def.name, file);
            let result = executor
                .execute_with_context(&ectx, &pipeline, &mut ctx)
                .await
                .with_context(|| format!("Pipeline '{}' failed", def.name))?;

            let output = result.map_or(serde_json::Value::Null, |v| v.to_json());
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Validate { file } => {
            let def = loader.load(&file)?;
            let pipeline = builder.build(&def)?;
            println!(
                "Pipeline '{}' is valid ({} top-level nodes)",
                def.name,
                pipeline.len()
            );
        }
    }

    Ok(())
}
