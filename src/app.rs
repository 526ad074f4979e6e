//! Core application runner (business logic) for `ruuvitag-collector`.
//!
//! This module is decoupled from CLI parsing and process exit codes so it can
//! be driven deterministically with an injected dump stream and sink.

use crate::alias::{Alias, AliasMap};
use crate::beacon::BeaconSelector;
use crate::decoder::RuuviDecoder;
use crate::fields::{Field, FieldSelection};
use crate::filter::{FilterError, FilterMode, MacFilter};
use crate::hci::{self, EVENT_MARKER, FrameAssembler};
use crate::mac_address::MacAddress;
use crate::output::Sink;
use crate::output::influxdb::InfluxDbFormatter;
use crate::pipeline::Pipeline;
use crate::registry::StrategyRegistry;
use crate::strategy::{StrategyConfig, StrategyKind};
use clap::{ArgAction, Parser};
use log::{debug, error, info, trace};
use std::io;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Collects RuuviTag measurements from `hcidump --raw` output on stdin and
/// prints accepted readings as InfluxDB line protocol.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "ruuvi_measurements")]
    pub influxdb_measurement: String,

    /// Specify human-readable alias for RuuviTag id.
    /// Format: --alias DE:AD:BE:EF:00:00=Sauna
    #[arg(long = "alias", value_parser = crate::alias::parse_alias, value_name = "ALIAS")]
    pub aliases: Vec<Alias>,

    /// Tag added to every reading to identify this receiver.
    #[arg(long)]
    pub receiver: Option<String>,

    /// How readings are thinned out per device.
    #[arg(long, default_value_t, value_enum)]
    pub strategy: StrategyKind,

    /// Minimum interval between stored readings of one device.
    /// Accepts duration with suffix: 3s, 1m, 9900ms, 2h.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, default_value = "9900ms", value_parser = crate::strategy::parse_duration)]
    pub update_limit: Duration,

    /// Acceleration change (in g) on any axis that counts as motion.
    #[arg(long, default_value_t = crate::strategy::DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Number of past accelerations kept per device.
    #[arg(long, default_value_t = crate::strategy::DEFAULT_HISTORY_SIZE)]
    pub history_size: NonZeroUsize,

    /// Accept a reading that arrives exactly at the update limit.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub inclusive_boundary: bool,

    /// Which devices to process.
    #[arg(long, default_value_t, value_enum)]
    pub filter_mode: FilterMode,

    /// Device listed for the blacklist or whitelist filter.
    #[arg(long = "filter-mac", value_name = "MAC")]
    pub filter_macs: Vec<MacAddress>,

    /// Comma-separated field names to store. All fields when omitted.
    #[arg(long, value_delimiter = ',', value_parser = crate::fields::parse_field)]
    pub fields: Vec<&'static Field>,

    /// Verbose output, log skipped and discarded lines
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        let config = StrategyConfig::default();
        Self {
            influxdb_measurement: "ruuvi_measurements".to_string(),
            aliases: vec![],
            receiver: None,
            strategy: config.kind,
            update_limit: config.update_limit,
            threshold: config.threshold,
            history_size: config.history_size,
            inclusive_boundary: config.inclusive_boundary,
            filter_mode: FilterMode::None,
            filter_macs: vec![],
            fields: vec![],
            verbose: false,
        }
    }
}

impl Options {
    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig {
            kind: self.strategy,
            update_limit: self.update_limit,
            inclusive_boundary: self.inclusive_boundary,
            threshold: self.threshold,
            history_size: self.history_size,
        }
    }

    pub fn alias_map(&self) -> AliasMap {
        crate::alias::to_map(&self.aliases)
    }

    pub fn formatter(&self) -> InfluxDbFormatter {
        InfluxDbFormatter::new(
            self.influxdb_measurement.clone(),
            FieldSelection::new(self.fields.clone()),
        )
    }

    pub fn build_pipeline(&self) -> Result<Pipeline, RunError> {
        let aliases = self.alias_map();
        let filter = MacFilter::new(
            self.filter_mode,
            self.filter_macs.iter().copied(),
            &aliases,
        )?;
        let selector = BeaconSelector::new(
            Box::new(RuuviDecoder),
            Box::new(aliases),
            self.receiver.clone(),
        );
        let registry = StrategyRegistry::new(self.strategy_config());
        Ok(Pipeline::new(filter, selector, registry))
    }
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// How the dump stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// False if the adapter failed after the last decoded frame, or no event
    /// was ever seen.
    pub healthy: bool,
    /// Readings handed to the sink.
    pub saved: usize,
}

/// Adapter failure messages printed by `hcidump`, with a hint for each.
const ADAPTER_FAILURES: [(&str, &str); 2] = [
    (
        "device: disconnected",
        "the bluetooth adapter was disabled or physically disconnected",
    ),
    (
        "No such device",
        "check that the bluetooth adapter is enabled and working",
    ),
];

fn adapter_failure(line: &str) -> Option<&'static str> {
    ADAPTER_FAILURES
        .iter()
        .find(|(pattern, _)| line.contains(pattern))
        .map(|(_, hint)| *hint)
}

struct Runner<'p, 's> {
    pipeline: &'p Pipeline,
    sink: &'s mut dyn Sink,
    summary: RunSummary,
}

impl Runner<'_, '_> {
    fn handle_event(&mut self, line: &str) -> io::Result<()> {
        let frame = match hci::parse_line(line) {
            Ok(frame) => frame,
            Err(e) => {
                trace!("Skipping line: {e}");
                return Ok(());
            }
        };
        self.summary.healthy = true;

        let accepted = self
            .pipeline
            .process_frame(&frame, Instant::now(), SystemTime::now());
        if let Some(measurement) = accepted {
            self.sink.save(&measurement)?;
            self.summary.saved += 1;
            debug!("Saved reading from {}", measurement.mac);
        }
        Ok(())
    }
}

/// Run the collector over a `hcidump --raw` stream until it ends.
///
/// - Leading banner lines are skipped until the first event line.
/// - Wrapped events are joined before decoding.
/// - Adapter failure lines are logged and mark the run unhealthy until the
///   next decoded frame.
/// - Accepted readings are passed to `sink`; a sink failure ends the run.
pub async fn run_with_io<R>(
    options: &Options,
    input: R,
    sink: &mut dyn Sink,
) -> Result<RunSummary, RunError>
where
    R: AsyncBufRead + Unpin,
{
    let pipeline = options.build_pipeline()?;
    let mut runner = Runner {
        pipeline: &pipeline,
        sink,
        summary: RunSummary::default(),
    };
    let mut assembler = FrameAssembler::new();
    let mut data_received = false;
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if let Some(hint) = adapter_failure(&line) {
            error!("{line}: {hint}");
            runner.summary.healthy = false;
            continue;
        }

        if !data_received {
            if !line.starts_with(EVENT_MARKER) {
                trace!("Skipping banner: {line}");
                continue;
            }
            info!("Successfully reading data from hcidump");
            data_received = true;
            runner.summary.healthy = true;
        }

        if let Some(event) = assembler.push(&line) {
            runner.handle_event(&event)?;
        }
    }

    if let Some(event) = assembler.flush() {
        runner.handle_event(&event)?;
    }

    Ok(runner.summary)
}
