use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use uni_records::adapters::FlatFileStore;
use uni_records::domain::ports::Store;
use uni_records::utils::logger;
use uni_records::CliConfig;

#[derive(Parser)]
#[command(name = "records-dump")]
#[command(about = "Print the stored university records as JSON")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the record files
    #[arg(long)]
    data_dir: Option<String>,

    /// Single-line output instead of pretty-printed JSON
    #[arg(long)]
    compact: bool,
}

fn main() {
    let args = Args::parse();
    let cli = CliConfig {
        config: args.config,
        data_dir: args.data_dir,
        verbose: false,
    };

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    logger::init_json_logger(&config.logging.level);

    if let Err(e) = dump(&config.storage.data_dir, args.compact) {
        tracing::error!("Dump failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(3);
    }
}

fn dump(data_dir: &str, compact: bool) -> uni_records::Result<()> {
    let store = FlatFileStore::new(data_dir);
    let snapshot = store.load_snapshot()?;
    tracing::info!(
        users = snapshot.users.len(),
        subjects = snapshot.subjects.len(),
        "Loaded records from {}",
        data_dir
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if compact {
        serde_json::to_writer(&mut out, &snapshot)?;
    } else {
        serde_json::to_writer_pretty(&mut out, &snapshot)?;
    }
    writeln!(out)?;
    Ok(())
}
