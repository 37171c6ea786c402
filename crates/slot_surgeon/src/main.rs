use std::process::ExitCode;

use clap::Parser;
use slot_surgeon::{
    HttpClient, ProbeParams, SurgeonError, check_balance,
    encoding::{parse_amount, parse_slot_index},
    find_and_set,
    rpc::DEFAULT_SET_STORAGE_METHOD,
};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Set an ERC20 balance on an anvil fork by scanning for the balances mapping slot.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// RPC URL, e.g. http://127.0.0.1:8545
    #[arg(long)]
    rpc: String,

    /// ERC20 token address
    #[arg(long)]
    token: String,

    /// Account address to set balance for
    #[arg(long)]
    account: String,

    /// New balance (raw integer)
    #[arg(long, allow_hyphen_values = true)]
    amount: String,

    /// Search mapping slot indices [0..max-slot] (default 20)
    #[arg(long, allow_hyphen_values = true)]
    max_slot: Option<String>,

    /// Storage-write method exposed by the node
    #[arg(long, default_value = DEFAULT_SET_STORAGE_METHOD)]
    set_storage_method: String,
}

impl Args {
    fn probe_params(&self) -> Result<ProbeParams, SurgeonError> {
        let mut params = ProbeParams::new(
            self.token.parse()?,
            self.account.parse()?,
            parse_amount(&self.amount)?,
        );
        if let Some(max_slot) = &self.max_slot {
            params.max_slot = parse_slot_index(max_slot)?;
        }
        params.set_storage_method = self.set_storage_method.clone();
        Ok(params)
    }
}

fn log_directives(rust_log: Option<&str>, default_level: LevelFilter) -> String {
    let base = match rust_log {
        Some(dirs) if !dirs.trim().is_empty() => dirs.to_string(),
        _ => default_level.to_string(),
    };
    format!("{base},hyper=off,reqwest=off")
}

fn start_logger(default_level: LevelFilter) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::builder().parse_lossy(log_directives(rust_log.as_deref(), default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: &Args) -> Result<(), SurgeonError> {
    let params = args.probe_params()?;
    let client = HttpClient::new(args.rpc.as_str())?;
    tracing::debug!(token = %params.token, account = %params.account, max_slot = params.max_slot, "starting probe");

    let before = check_balance(&client, &params).await?;
    println!("balanceOf(before) = {}", before);

    let found = find_and_set(&client, &params).await?;
    println!("{}", found);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    start_logger(LevelFilter::INFO);
    let args = Args::parse();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}
