//! Registration trace replay.
//!
//! Feeds a recorded sequence of voice/data registration payloads through
//! normalization and the RAT ratchet, printing the published service state
//! of every step as one JSON line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use strata_netreg::config::{CarrierConfig, InMemoryConfigStore};
use strata_netreg::{
    Domain, RatFamilies, RatRatchet, RawRegistrationResult, ServiceState, normalize,
};

/// Replay a registration trace through the RAT ratchet.
#[derive(Parser, Debug)]
#[command(name = "strata-netreg-replay", about = "Replay cellular registration traces")]
struct Cli {
    /// JSON trace: an array of steps.
    trace: PathBuf,

    /// Carrier config TOML. Platform default RAT families when omitted.
    #[arg(long)]
    carrier_config: Option<PathBuf>,

    /// Subscription id the carrier config is stored under.
    #[arg(long, default_value_t = 1)]
    sub_id: i32,
}

#[derive(Debug, Deserialize)]
struct TraceStep {
    voice: RawRegistrationResult,
    data: RawRegistrationResult,
    #[serde(default)]
    cell_bandwidths: Vec<u32>,
    #[serde(default)]
    location_changed: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.carrier_config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            CarrierConfig::from_toml_str(&text).map_err(anyhow::Error::msg)?
        }
        None => CarrierConfig::default(),
    };
    let store = InMemoryConfigStore::new();
    store.insert(cli.sub_id, config);

    let families = Arc::new(RatFamilies::new());
    let faults = families.reload(&store, cli.sub_id)?;
    for fault in &faults {
        tracing::warn!(error = %fault, "carrier config fault");
    }
    tracing::info!(
        families = families.load().len(),
        faults = faults.len(),
        "RAT families loaded"
    );

    let text = std::fs::read_to_string(&cli.trace)
        .with_context(|| format!("reading {}", cli.trace.display()))?;
    let steps: Vec<TraceStep> = serde_json::from_str(&text).context("parsing trace")?;
    if steps.is_empty() {
        bail!("trace {} has no steps", cli.trace.display());
    }

    let mut ratchet = RatRatchet::new(families);
    let mut published: Option<ServiceState> = None;

    for (index, step) in steps.into_iter().enumerate() {
        let voice = normalize(&step.voice, Domain::Cs)
            .with_context(|| format!("step {index}: voice"))?;
        let data = normalize(&step.data, Domain::Ps)
            .with_context(|| format!("step {index}: data"))?;
        let mut state = ServiceState {
            voice,
            data,
            cell_bandwidths: step.cell_bandwidths,
        };

        let outcome = published
            .as_ref()
            .map(|old| ratchet.ratchet(old, &mut state, step.location_changed));

        let line = json!({
            "step": index,
            "voice_rat": state.voice.technology(),
            "data_rat": state.data.technology(),
            "carrier_aggregation": state.is_using_carrier_aggregation(),
            "cell_bandwidths": state.cell_bandwidths,
            "same_family": outcome.map(|o| o.same_family),
            "voice_held": outcome.map(|o| o.voice_held),
            "data_held": outcome.map(|o| o.data_held),
            "bandwidths_updated": outcome.map(|o| o.bandwidths_updated),
            "state": state,
        });
        println!("{line}");
        published = Some(state);
    }

    Ok(())
}
