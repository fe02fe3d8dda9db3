use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "chainlog",
    about = "Chainlog — tamper-evident append-only ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the ledger segment file.
    #[arg(long, global = true, default_value = "chaindata/records.seg")]
    pub path: String,

    /// Skip fsync on writes (faster, less durable).
    #[arg(long, global = true)]
    pub no_fsync: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Append a payload as the next record
    Append(AppendArgs),
    /// Show the record at a height
    Show(ShowArgs),
    /// Print the current chain height
    Height(HeightArgs),
    /// Verify chain integrity end-to-end
    Verify(VerifyArgs),
    /// Append test payloads on a fixed interval
    Run(RunArgs),
}

#[derive(Args)]
pub struct AppendArgs {
    pub payload: String,
}

#[derive(Args)]
pub struct ShowArgs {
    pub height: u64,
}

#[derive(Args)]
pub struct HeightArgs {}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct RunArgs {
    /// Milliseconds between appends.
    #[arg(long, default_value = "100")]
    pub interval_ms: u64,
    /// Number of records to append.
    #[arg(long, default_value = "10")]
    pub count: u64,
    /// Payload for each appended record.
    #[arg(long, default_value = "Testing data")]
    pub payload: String,
}
