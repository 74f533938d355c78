use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use diskmedic::cleanup;
use diskmedic::config::StorageConfig;
use diskmedic::monitor;
use diskmedic::plan::format_mb;
use diskmedic::status;

#[derive(Parser)]
#[command(
    name = "diskmedic",
    about = "Appliance-grade disk capacity management for continuously-recording hosts",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, env = "DISKMEDIC_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Plan and report actions without applying them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Emit per-file decisions on the diagnostic stream
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show disk pressure, watched-directory statistics, and active settings
    Status {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Compact oversized logs and sweep every retention category
    Cleanup,

    /// Evaluate disk pressure once and run the selected tier's cleanup
    Monitor,

    /// Force emergency eviction followed by a full cleanup
    Emergency,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    // Invalid configuration is fatal before any file-system mutation.
    let config = StorageConfig::resolve(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Status { json } => {
            let report = status::collect(&config);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\nDiskMedic Storage Status");
                match &report.snapshot {
                    Some(s) => println!(
                        "Mount {}: {}% used, {} MB free",
                        s.mount.display(),
                        s.used_percent,
                        s.free_mb
                    ),
                    None => println!(
                        "Mount {}: unreadable (cannot assess)",
                        config.paths.mount.display()
                    ),
                }
                println!();
                println!("{:<10} | {:>6} | {:>12} | Path", "Category", "Files", "Size");
                println!("{:-<10}-|-{:-<6}-|-{:-<12}-|-{:-<30}", "", "", "", "");
                for t in &report.targets {
                    println!(
                        "{:<10} | {:>6} | {:>12} | {}",
                        t.category.as_str(),
                        t.managed_files,
                        format_mb(t.size_bytes),
                        t.path.display()
                    );
                }
                println!();
                let r = &config.retention;
                println!(
                    "Retention: recordings {}d, logs {}d, temp {}h, buffer {}h",
                    r.recording_days, r.log_days, r.temp_hours, r.buffer_hours
                );
                let t = &config.thresholds;
                println!(
                    "Thresholds: warning {}%, critical {}%, emergency {}%, min free {} MB",
                    t.warning_percent, t.critical_percent, t.emergency_percent, t.min_free_mb
                );
                println!(
                    "Log cap: {} MB, retaining {} on compaction",
                    config.compaction.max_log_size_mb,
                    format_mb(config.compaction.retain_bytes)
                );
                println!(
                    "Emergency eviction bound: {} recordings",
                    config.eviction.max_delete
                );
                println!();
            }
        }
        Commands::Cleanup => {
            tracing::info!(dry_run = cli.dry_run, "running cleanup");
            let report = cleanup::run_cleanup(&config, cli.dry_run);
            print!("{report}");
        }
        Commands::Monitor => {
            tracing::info!(dry_run = cli.dry_run, "running monitor pass");
            let (tier, report) = monitor::run_monitor(&config, cli.dry_run);
            match tier {
                Some(tier) => println!("tier: {tier}"),
                None => println!("tier: unknown (mount unreadable)"),
            }
            print!("{report}");
        }
        Commands::Emergency => {
            tracing::info!(dry_run = cli.dry_run, "running forced emergency eviction");
            let report = cleanup::run_emergency(&config, cli.dry_run);
            print!("{report}");
        }
    }

    Ok(())
}
