use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tracing::info;

use chainlog_ledger::Ledger;
use chainlog_store::{FileRecordStore, SyncMode};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let sync_mode = if cli.no_fsync {
        SyncMode::OsDefault
    } else {
        SyncMode::EveryWrite
    };
    let store = FileRecordStore::open(Path::new(&cli.path), sync_mode)?;
    let ledger = Ledger::open(Arc::new(store))?;

    match cli.command {
        Command::Append(args) => cmd_append(&ledger, args),
        Command::Show(args) => cmd_show(&ledger, args),
        Command::Height(_) => cmd_height(&ledger),
        Command::Verify(_) => cmd_verify(&ledger),
        Command::Run(args) => cmd_run(&ledger, args),
    }
}

fn cmd_append(ledger: &Ledger, args: AppendArgs) -> anyhow::Result<()> {
    let height = ledger.append(args.payload.as_bytes())?;
    let record = ledger.get_record(height)?;
    println!(
        "{} Appended record #{} ({})",
        "✓".green().bold(),
        height.to_string().bold(),
        record.hash.short_hex().yellow()
    );
    Ok(())
}

fn cmd_show(ledger: &Ledger, args: ShowArgs) -> anyhow::Result<()> {
    let record = ledger.get_record(args.height)?;
    println!("Record #{}", record.height.to_string().bold());
    println!("  Hash:      {}", record.hash.to_hex().yellow());
    match record.prev_hash {
        Some(prev) => println!("  Previous:  {}", prev.to_hex().yellow()),
        None => println!("  Previous:  {}", "(genesis)".dimmed()),
    }
    println!("  Timestamp: {}", record.timestamp);
    println!("  Payload:   {}", String::from_utf8_lossy(&record.payload));
    Ok(())
}

fn cmd_height(ledger: &Ledger) -> anyhow::Result<()> {
    match ledger.height() {
        Some(height) => println!("{height}"),
        None => println!("{}", "(empty)".dimmed()),
    }
    Ok(())
}

fn cmd_verify(ledger: &Ledger) -> anyhow::Result<()> {
    let report = ledger.validate_chain();
    if report.is_valid() {
        println!(
            "{} Chain integrity verified ({} records)",
            "✓".green().bold(),
            report.record_count.to_string().bold()
        );
        Ok(())
    } else {
        let heights: Vec<String> = report
            .invalid_heights
            .iter()
            .map(|h| h.to_string())
            .collect();
        println!(
            "{} {} invalid record(s) at heights: {}",
            "✗".red().bold(),
            report.invalid_heights.len(),
            heights.join(", ").red()
        );
        anyhow::bail!("chain validation failed")
    }
}

/// Timer-driven append loop: the original test driver, made explicit.
fn cmd_run(ledger: &Ledger, args: RunArgs) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async {
        let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
        for _ in 0..args.count {
            interval.tick().await;
            // A failed append terminates the run; retrying is the caller's
            // decision, not the driver's.
            let height = ledger.append(args.payload.as_bytes())?;
            info!(height, "appended");
            println!("Record #{height}");
        }
        Ok::<(), anyhow::Error>(())
    })?;

    println!(
        "{} Appended {} record(s); height is now {}",
        "✓".green().bold(),
        args.count,
        ledger.height().unwrap_or_default().to_string().bold()
    );
    Ok(())
}
