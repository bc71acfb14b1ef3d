use clap::Parser;
use std::io;
use uni_records::adapters::{FlatFileStore, SystemClock, TracingObserver};
use uni_records::utils::error::{ErrorSeverity, RecordsError};
use uni_records::utils::{logger, validation::Validate};
use uni_records::{AppConfig, CliConfig, Console, UniversitySystem};

fn main() {
    let cli = CliConfig::parse();

    let config = match cli.validate().and_then(|_| cli.resolve()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    logger::init_cli_logger(cli.verbose, &config.logging.level);
    tracing::info!("Starting uni-records");
    tracing::debug!("Configuration: {:?}", config);

    if let Err(e) = run(config) {
        tracing::error!(
            "❌ Session ended with an error: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let code = exit_code(&e);
        if code > 0 {
            std::process::exit(code);
        }
    }
}

fn run(config: AppConfig) -> uni_records::Result<()> {
    let store = FlatFileStore::new(&config.storage.data_dir);
    tracing::info!("📁 Records directory: {}", store.base_path().display());

    let mut system = UniversitySystem::open(store, Box::new(SystemClock), config.settings())?;
    system.add_observer(Box::new(TracingObserver));

    let stdin = io::stdin();
    let mut console = Console::new(system, stdin.lock(), io::stdout());
    console.run()
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(error: &RecordsError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
