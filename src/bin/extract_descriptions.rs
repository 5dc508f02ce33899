use anyhow::Context;
use clap::Parser;
use likelihood_etl::core::filter;
use likelihood_etl::core::Storage;
use likelihood_etl::utils::logger;
use likelihood_etl::LocalStorage;

#[derive(Parser, Debug)]
#[command(name = "extract-descriptions")]
#[command(about = "Project raw event dumps down to their description field")]
struct Args {
    /// Source JSON array with arbitrary event objects
    #[arg(short, long, default_value = filter::DEFAULT_SOURCE_FILE)]
    input: String,

    /// Output JSON file for the projected entries
    #[arg(short, long, default_value = filter::DEFAULT_DESCRIPTIONS_FILE)]
    output: String,

    /// Assign sequential ids (item_0001, item_0002, ...) so the output
    /// can feed the assessment tool directly
    #[arg(long)]
    with_ids: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    if args.with_ids {
        tracing::info!("🔧 Assigning sequential ids to kept entries");
    }

    let storage = LocalStorage::new(".".to_string());

    let data = storage
        .read_file(&args.input)
        .await
        .with_context(|| format!("cannot read source file '{}'", args.input))?;

    let projection = filter::project_descriptions(&data, args.with_ids)
        .with_context(|| format!("'{}' is not a JSON array of objects", args.input))?;

    if projection.skipped > 0 {
        tracing::info!(
            "⏭️ Skipped {} entries without a description",
            projection.skipped
        );
    }

    let json = serde_json::to_string_pretty(&projection.entries)?;
    storage
        .write_file(&args.output, json.as_bytes())
        .await
        .with_context(|| format!("cannot write '{}'", args.output))?;

    println!(
        "✅ Wrote {} descriptions to {}",
        projection.entries.len(),
        args.output
    );

    Ok(())
}
