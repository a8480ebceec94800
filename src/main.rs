use anyhow::{bail, Context, Result};
use biotope_core::{init_logging, SimConfig, TraitTable};
use biotope_lib::app::{ParamUpdate, Pipeline, PipelineOptions};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Trait table to load (TOML). Built-in values are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many ecosystem ticks. Runs until Ctrl+C when omitted
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Seed for the ecosystem RNG
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print a JSON run report on exit
    #[arg(long)]
    report: bool,

    /// Force parameter override applied before the first tick, e.g. `max_force=150`
    #[arg(long = "set", value_name = "NAME=VALUE")]
    overrides: Vec<String>,

    /// Print the effective trait table as TOML and exit
    #[arg(long)]
    print_traits: bool,
}

fn parse_override(raw: &str) -> Result<ParamUpdate> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("override `{raw}` is not NAME=VALUE");
    };
    let value: f32 = value
        .trim()
        .parse()
        .with_context(|| format!("override `{raw}` has a non-numeric value"))?;
    Ok(ParamUpdate::new(name.trim(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let traits = match &args.config {
        Some(path) => TraitTable::load(path)
            .with_context(|| format!("failed to load trait table {}", path.display()))?,
        None => TraitTable::builtin(),
    };
    if args.print_traits {
        print!("{}", traits.to_toml().context("failed to encode trait table")?);
        return Ok(());
    }
    let config = SimConfig::from_traits(&traits).context("invalid configuration")?;
    let overrides = args
        .overrides
        .iter()
        .map(|raw| parse_override(raw))
        .collect::<Result<Vec<_>>>()?;

    let pipeline = Pipeline::new(
        config,
        PipelineOptions {
            max_ticks: args.ticks,
            seed: args.seed,
        },
    );
    pipeline.shutdown_signal().listen_for_ctrl_c();
    let params = pipeline.param_sender();
    for update in overrides {
        params
            .send(update)
            .context("parameter channel closed before start")?;
    }
    drop(params);

    let report = pipeline.run().await?;
    if args.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
