//! Output of accepted RuuviTag measurements.
//!
//! Formatting is split from delivery: an [`OutputFormatter`] renders one
//! measurement as text and a [`Sink`] persists measurements. The default sink
//! writes formatted lines to any `io::Write`.

pub mod influxdb;

use crate::measurement::Measurement;
use std::io::{self, Write};

/// Trait for formatting measurements into output strings.
pub trait OutputFormatter: Send + Sync {
    /// Format a measurement (includes its timestamp). Returns `None` when the
    /// measurement carries nothing this format can write.
    fn format(&self, measurement: &Measurement) -> Option<String>;
}

/// Destination for accepted measurements.
pub trait Sink {
    fn save(&mut self, measurement: &Measurement) -> io::Result<()>;
}

/// Writes one formatted line per measurement. Measurements the formatter
/// declines are skipped.
pub struct LineSink<'a, W: Write> {
    formatter: &'a dyn OutputFormatter,
    out: W,
}

impl<'a, W: Write> LineSink<'a, W> {
    pub fn new(formatter: &'a dyn OutputFormatter, out: W) -> Self {
        Self { formatter, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for LineSink<'_, W> {
    fn save(&mut self, measurement: &Measurement) -> io::Result<()> {
        let Some(line) = self.formatter.format(measurement) else {
            log::debug!("{}: no fields to write, skipping", measurement.mac);
            return Ok(());
        };
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }
}

/// Keeps every measurement in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub saved: Vec<Measurement>,
}

impl Sink for MemorySink {
    fn save(&mut self, measurement: &Measurement) -> io::Result<()> {
        self.saved.push(measurement.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_MAC, base_measurement};
    use std::time::SystemTime;

    struct MacFormatter;

    impl OutputFormatter for MacFormatter {
        fn format(&self, measurement: &Measurement) -> Option<String> {
            measurement.name.is_none().then(|| measurement.mac.to_string())
        }
    }

    #[test]
    fn test_line_sink_writes_lines() {
        let mut sink = LineSink::new(&MacFormatter, Vec::new());
        let m = base_measurement(TEST_MAC, SystemTime::UNIX_EPOCH);
        sink.save(&m).unwrap();
        sink.save(&m).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "AABBCCDDEEFF\nAABBCCDDEEFF\n");
    }

    #[test]
    fn test_line_sink_skips_declined_measurements() {
        let mut sink = LineSink::new(&MacFormatter, Vec::new());
        let mut named = base_measurement(TEST_MAC, SystemTime::UNIX_EPOCH);
        named.name = Some("Sauna".to_string());
        sink.save(&named).unwrap();
        sink.save(&base_measurement(TEST_MAC, SystemTime::UNIX_EPOCH))
            .unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "AABBCCDDEEFF\n");
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::default();
        sink.save(&base_measurement(TEST_MAC, SystemTime::UNIX_EPOCH))
            .unwrap();
        assert_eq!(sink.saved.len(), 1);
    }
}
