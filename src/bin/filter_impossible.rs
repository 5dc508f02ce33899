use anyhow::Context;
use clap::Parser;
use likelihood_etl::core::filter;
use likelihood_etl::core::Storage;
use likelihood_etl::utils::logger;
use likelihood_etl::LocalStorage;

#[derive(Parser, Debug)]
#[command(name = "filter-impossible")]
#[command(about = "Keep only the entries judged impossible for 2026")]
struct Args {
    /// Assessment report produced by the likelihood tool
    #[arg(short, long, default_value = filter::DEFAULT_ASSESSMENT_FILE)]
    input: String,

    /// Output JSON file for the filtered projection
    #[arg(short, long, default_value = filter::DEFAULT_IMPOSSIBLE_FILE)]
    output: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    let storage = LocalStorage::new(".".to_string());

    let data = storage
        .read_file(&args.input)
        .await
        .with_context(|| format!("cannot read assessment report '{}'", args.input))?;

    let entries = filter::filter_impossible_entries(&data)
        .with_context(|| format!("'{}' is not a usable assessment report", args.input))?;

    let json = serde_json::to_string_pretty(&entries)?;
    storage
        .write_file(&args.output, json.as_bytes())
        .await
        .with_context(|| format!("cannot write '{}'", args.output))?;

    println!("✅ Wrote {} entries to {}", entries.len(), args.output);

    Ok(())
}
