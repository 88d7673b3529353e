use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use zwallet_ledger::{ConsensusParams, LedgerBundle, LedgerReport, Network};

#[derive(Parser)]
#[command(
    name = "zwallet-tools",
    about = "Inspect wallet ledger records and their confirmation status"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every transaction of a saved bundle and print the ledger.
    Report(ReportArgs),
    /// Print the effective consensus parameters.
    Params(ParamsArgs),
}

/// Network profile to evaluate under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NetworkArg {
    Main,
    Test,
    Regtest,
}

impl From<NetworkArg> for Network {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::Main => Network::Main,
            NetworkArg::Test => Network::Test,
            NetworkArg::Regtest => Network::Regtest,
        }
    }
}

#[derive(Args)]
struct ReportArgs {
    /// JSON bundle with chain, wallet and relay snapshots plus transactions.
    #[arg(long)]
    bundle: PathBuf,
    /// Override the parameters stored in the bundle.
    #[arg(long, value_enum)]
    network: Option<NetworkArg>,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ParamsArgs {
    #[arg(long, value_enum)]
    network: Option<NetworkArg>,
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zwallet_tools=info,zwallet_ledger=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Report(args) => report(args),
        Commands::Params(args) => params(args),
    }
}

fn report(args: ReportArgs) -> Result<()> {
    let bundle = load_bundle(&args.bundle)?;
    let (params, source) = resolve_params(args.network, bundle.params.as_ref())?;
    info!(
        network = %params.network,
        source = source.as_str(),
        transactions = bundle.transactions.len(),
        "building ledger report"
    );
    println!("{}", render_report(&bundle, &params, args.json)?);
    Ok(())
}

fn params(args: ParamsArgs) -> Result<()> {
    let (params, source) = resolve_params(args.network, None)?;
    let summary = ParamsSummary {
        source: source.as_str(),
        params,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

fn load_bundle(path: &Path) -> Result<LedgerBundle> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    LedgerBundle::from_json(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Where the effective parameters came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamsSource {
    Flag,
    Bundle,
    Environment,
}

impl ParamsSource {
    fn as_str(self) -> &'static str {
        match self {
            ParamsSource::Flag => "flag",
            ParamsSource::Bundle => "bundle",
            ParamsSource::Environment => "environment",
        }
    }
}

/// A `--network` flag wins, then parameters saved in the bundle, then the
/// environment. Environment overrides apply on top of a chosen profile.
fn resolve_params(
    network: Option<NetworkArg>,
    saved: Option<&ConsensusParams>,
) -> Result<(ConsensusParams, ParamsSource)> {
    match (network, saved) {
        (Some(network), _) => {
            let params = ConsensusParams::for_network(network.into())
                .with_env_overrides()
                .context("invalid parameter override in environment")?;
            Ok((params, ParamsSource::Flag))
        }
        (None, Some(saved)) => {
            saved
                .validate()
                .context("bundle carries invalid parameters")?;
            Ok((saved.clone(), ParamsSource::Bundle))
        }
        (None, None) => {
            let params = ConsensusParams::from_env().context("failed to load parameters")?;
            Ok((params, ParamsSource::Environment))
        }
    }
}

fn render_report(bundle: &LedgerBundle, params: &ConsensusParams, json: bool) -> Result<String> {
    let report = bundle
        .report(params)
        .context("wallet snapshot is inconsistent")?;
    for notice in &report.notices {
        warn!(tx = %notice.tx, notice = ?notice.notice, "classification notice");
    }
    if json {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        Ok(ReportTable(&report).to_string())
    }
}

struct ReportTable<'a>(&'a LedgerReport);

impl fmt::Display for ReportTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:>3}  {:<18} {:<30} {:<34} {:>14} {:>14} {:>8}",
            "tx", "idx", "kind", "status", "address", "debit", "credit", "fee"
        )?;
        for entry in &self.0.entries {
            let record = &entry.record;
            let status = &entry.status;
            let mut state = status.state.to_string();
            if status.matures_in > 0 {
                state.push_str(&format!(" ({} blocks)", status.matures_in));
            } else if status.depth != 0 {
                state.push_str(&format!(" ({})", status.depth));
            }
            let address = if record.involves_watch_only {
                format!("{} (watch)", record.address)
            } else {
                record.address.clone()
            };
            writeln!(
                f,
                "{:<16} {:>3}  {:<18} {:<30} {:<34} {:>14} {:>14} {:>8}",
                &record.tx_id()[..16],
                record.output_index(),
                record.kind.label(),
                state,
                address,
                record.debit,
                record.credit,
                record.fee
            )?;
        }
        write!(f, "{} records", self.0.entries.len())
    }
}

#[derive(Serialize)]
struct ParamsSummary {
    source: &'static str,
    #[serde(flatten)]
    params: ConsensusParams,
}

impl fmt::Display for ParamsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.params;
        writeln!(f, "network: {} (from {})", p.network, self.source)?;
        writeln!(f, "lock_time_threshold: {}", p.lock_time_threshold)?;
        writeln!(f, "coinbase_maturity: {} blocks", p.coinbase_maturity)?;
        writeln!(f, "recommended_confirmations: {}", p.recommended_confirmations)?;
        writeln!(f, "stale_window: {} s", p.stale_window_secs)?;
        write!(f, "per_operation_fee: {}", p.per_operation_fee)
    }
}
