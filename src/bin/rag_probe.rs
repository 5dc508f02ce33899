use clap::Parser;
use likelihood_etl::core::rag::RagProbe;
use likelihood_etl::utils::{logger, validation::Validate};
use likelihood_etl::{JobConfig, LocalStorage};

#[derive(Parser, Debug)]
#[command(name = "rag-probe")]
#[command(about = "Check one true/false statement against a retrieved context passage")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Context passage given to the model
    #[arg(long, conflicts_with = "context_file", required_unless_present = "context_file")]
    context: Option<String>,

    /// Read the context passage from a file instead
    #[arg(long)]
    context_file: Option<String>,

    /// The true/false statement to check
    #[arg(short, long)]
    statement: String,

    /// File the result line is appended to
    #[arg(short, long)]
    output: Option<String>,

    /// Override the chat completions endpoint URL
    #[arg(long)]
    api_url: Option<String>,

    /// Override the model name
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f64>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Attempts before giving up
    #[arg(long)]
    retry: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long)]
    retry_wait: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
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

    tracing::info!("🚀 Starting RAG conflict probe");

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

    // 取得 context：文字參數或檔案擇一
    let context = match (&args.context, &args.context_file) {
        (_, Some(path)) => match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                eprintln!("❌ Cannot read context file '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        (Some(text), None) => text.clone(),
        (None, None) => {
            eprintln!("❌ Provide --context or --context-file");
            std::process::exit(1);
        }
    };

    let storage = LocalStorage::new(".".to_string());
    let probe = match RagProbe::new(storage, config) {
        Ok(probe) => probe,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    let results_file = probe.results_file();

    tracing::info!("📡 Probing model: {}", args.statement);

    match probe.run(&context, &args.statement).await {
        Ok(_) => {
            println!("✅ Result appended to: {}", results_file);
        }
        Err(e) => {
            tracing::error!(
                "❌ RAG probe failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );

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
    if let Some(output) = &args.output {
        config.files.results = Some(output.clone());
    }
    if let Some(api_url) = &args.api_url {
        config.endpoint.url = Some(api_url.clone());
    }
    if let Some(model) = &args.model {
        config.endpoint.model = Some(model.clone());
        tracing::info!("🔧 Model overridden to: {}", model);
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
}
