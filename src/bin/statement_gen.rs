use clap::Parser;
use likelihood_etl::core::statements::{self, StatementPipeline, STATEMENTS_PER_ITEM};
use likelihood_etl::core::InputItem;
use likelihood_etl::utils::{logger, validation::Validate};
use likelihood_etl::{JobConfig, JudgeEngine, LocalStorage};

#[derive(Parser, Debug)]
#[command(name = "statement-gen")]
#[command(about = "Generate labeled true/false statements from event descriptions")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Input JSON file with {id, description} items
    #[arg(short, long)]
    input: Option<String>,

    /// Output JSON file for the generated statements
    #[arg(short, long)]
    output: Option<String>,

    /// JSONL file collecting the raw API responses
    #[arg(long)]
    raw_log: Option<String>,

    /// Override the chat completions endpoint URL
    #[arg(long)]
    api_url: Option<String>,

    /// Override the model name
    #[arg(long)]
    model: Option<String>,

    /// Items per API request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f64>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Attempts per batch before giving up
    #[arg(long)]
    retry: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long)]
    retry_wait: Option<u64>,

    /// Only process the first N items (handy for a cheap trial run)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting true/false statement generator");

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            match JobConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    std::process::exit(1);
                }
            }
        }
        None => JobConfig::default(),
    };

    apply_overrides(&mut config, &args);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    println!("📋 Configuration Summary:");
    println!("  Endpoint: {}", config.api_url());
    println!("  Model: {}", config.model());
    println!("  Input: {}", input_file(&config));
    println!("  Results: {}", results_file(&config));
    println!("  Raw log: {}", raw_log_file(&config));
    println!("  Batch size: {}", config.batch_size());
    if let Some(limit) = config.limit() {
        println!("  Limit: first {} items", limit);
    }
    println!();

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");

        let input = input_file(&config);
        match tokio::fs::read(&input).await {
            Ok(data) => match InputItem::parse_list(&data) {
                Ok(items) => {
                    let effective = config
                        .limit()
                        .map(|limit| limit.min(items.len()))
                        .unwrap_or(items.len());
                    let batch_size = config.batch_size();
                    let batches = (effective + batch_size - 1) / batch_size.max(1);

                    println!(
                        "🔍 Would send {} items in {} batches of up to {}",
                        effective, batches, batch_size
                    );
                    println!(
                        "🔍 Expecting {} statements in {}",
                        effective * STATEMENTS_PER_ITEM,
                        results_file(&config)
                    );
                }
                Err(e) => println!("⚠️ Input file is not usable: {}", e),
            },
            Err(e) => println!("⚠️ Cannot read input file '{}': {}", input, e),
        }

        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());

    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 建立存儲與生成管線
    let storage = LocalStorage::new(".".to_string());
    let pipeline = match StatementPipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    let raw_log = pipeline.raw_log_file();

    let engine = JudgeEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ Statement generation completed successfully!");
            println!("✅ Statement generation completed successfully!");
            println!("📁 Statements saved to: {}", summary.output_path);
            println!("📝 Raw responses logged to: {}", raw_log);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Statement generation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                likelihood_etl::utils::error::ErrorSeverity::Low => 0, // 警告，但成功
                likelihood_etl::utils::error::ErrorSeverity::Medium => 2, // 重試錯誤
                likelihood_etl::utils::error::ErrorSeverity::High => 1, // 處理錯誤
                likelihood_etl::utils::error::ErrorSeverity::Critical => 3, // 系統錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut JobConfig, args: &Args) {
    if let Some(input) = &args.input {
        config.files.input = Some(input.clone());
    }
    if let Some(output) = &args.output {
        config.files.results = Some(output.clone());
    }
    if let Some(raw_log) = &args.raw_log {
        config.files.raw_log = Some(raw_log.clone());
    }
    if let Some(api_url) = &args.api_url {
        config.endpoint.url = Some(api_url.clone());
    }
    if let Some(model) = &args.model {
        config.endpoint.model = Some(model.clone());
        tracing::info!("🔧 Model overridden to: {}", model);
    }
    if let Some(batch_size) = args.batch_size {
        config.batch.size = Some(batch_size);
        tracing::info!("🔧 Batch size overridden to: {}", batch_size);
    }
    if let Some(temperature) = args.temperature {
        config.endpoint.temperature = Some(temperature);
    }
    if let Some(timeout) = args.timeout {
        config.endpoint.timeout_seconds = Some(timeout);
    }
    if let Some(retry) = args.retry {
        config.endpoint.retry_attempts = Some(retry);
    }
    if let Some(retry_wait) = args.retry_wait {
        config.endpoint.retry_wait_seconds = Some(retry_wait);
    }
    if let Some(limit) = args.limit {
        config.batch.limit = Some(limit);
        tracing::info!("🔧 Limit overridden to: {}", limit);
    }
}

fn input_file(config: &JobConfig) -> String {
    config
        .files
        .input
        .clone()
        .unwrap_or_else(|| statements::DEFAULT_INPUT_FILE.to_string())
}

fn results_file(config: &JobConfig) -> String {
    config
        .files
        .results
        .clone()
        .unwrap_or_else(|| statements::DEFAULT_RESULTS_FILE.to_string())
}

fn raw_log_file(config: &JobConfig) -> String {
    config
        .files
        .raw_log
        .clone()
        .unwrap_or_else(|| statements::DEFAULT_RAW_LOG_FILE.to_string())
}
