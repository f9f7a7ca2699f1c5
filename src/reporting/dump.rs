use crate::error::ReportError;
use crate::records::{PoolMap, PoolRecord};
use crate::reporting::pipeline::{ReportFormatter, ReportSender};
use chrono::{Local, NaiveDateTime};
use std::fmt::{Display, Write as _};
use std::io::Write;

const UNSET: &str = "not measured";

/// One block of `label: value` lines per pool, then a summary block
#[derive(Debug, Clone, Copy)]
pub struct TextDump {
    /// Reference time for scrub ages
    now: NaiveDateTime,
}

impl TextDump {
    /// Dump with scrub ages measured from the local clock
    pub fn new() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn at(now: NaiveDateTime) -> Self {
        Self { now }
    }

    fn write_record(&self, out: &mut String, record: &PoolRecord) -> std::fmt::Result {
        writeln!(out, "{}", record.name)?;
        writeln!(out, "  health:          {}", record.health)?;
        writeln!(out, "  size:            {}", record.size)?;
        writeln!(out, "  used:            {}", record.used)?;
        writeln!(out, "  free:            {}", record.free)?;
        writeln!(out, "  fragmentation:   {}", record.fragmentation_percent)?;
        writeln!(out, "  capacity:        {}", record.capacity_percent)?;
        writeln!(out, "  read errors:     {}", or_unset(record.read_errors))?;
        writeln!(out, "  write errors:    {}", or_unset(record.write_errors))?;
        writeln!(out, "  checksum errors: {}", or_unset(record.checksum_errors))?;
        writeln!(out, "  total errors:    {}", or_unset(record.total_errors()))?;
        writeln!(out, "  last scrub:      {}", or_unset(record.scrub_date.as_ref()))?;
        writeln!(
            out,
            "  days since scrub: {}",
            or_unset(record.days_since_scrub(self.now))
        )?;
        let repaired = match (&record.repaired_bytes, record.repaired_bytes_value()) {
            (Some(raw), Some(bytes)) => format!("{} ({} bytes)", raw, bytes),
            (raw, _) => or_unset(raw.as_ref()),
        };
        writeln!(out, "  scrub repaired:  {}", repaired)?;
        writeln!(out, "  scrub duration:  {}", or_unset(record.repair_duration.as_ref()))?;
        writeln!(out, "  scrub errors:    {}", or_unset(record.scrub_error_count))
    }

    fn write_summary(out: &mut String, pools: &PoolMap) -> std::fmt::Result {
        let healthy = pools.values().filter(|r| r.is_online()).count();
        let measured: Vec<u64> = pools.values().filter_map(PoolRecord::total_errors).collect();
        let total_errors = if measured.is_empty() {
            None
        } else {
            Some(measured.iter().sum::<u64>())
        };
        let fullest = highest(pools, PoolRecord::capacity_value);
        let most_fragmented = highest(pools, PoolRecord::fragmentation_value);

        writeln!(out, "SUMMARY")?;
        writeln!(out, "  total pools:     {}", pools.len())?;
        writeln!(out, "  healthy pools:   {}/{}", healthy, pools.len())?;
        writeln!(out, "  total errors:    {}", or_unset(total_errors))?;
        writeln!(out, "  fullest pool:    {}", or_unset(fullest))?;
        writeln!(out, "  most fragmented: {}", or_unset(most_fragmented))
    }
}

impl Default for TextDump {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for TextDump {
    fn format(&self, pools: &PoolMap) -> Result<String, ReportError> {
        if pools.is_empty() {
            return Ok(String::new());
        }

        let mut out = String::new();
        for record in pools.values() {
            self.write_record(&mut out, record)
                .map_err(|e| ReportError::Format(e.to_string()))?;
            out.push('\n');
        }
        Self::write_summary(&mut out, pools).map_err(|e| ReportError::Format(e.to_string()))?;
        Ok(out)
    }
}

/// `"<pool> (<n>%)"` for the pool with the largest percentage
fn highest(pools: &PoolMap, value: fn(&PoolRecord) -> Option<u8>) -> Option<String> {
    pools
        .values()
        .filter_map(|r| value(r).map(|v| (v, r)))
        .max_by_key(|(v, _)| *v)
        .map(|(v, r)| format!("{} ({}%)", r.name, v))
}

/// Pretty-printed JSON object keyed by pool name
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDump;

impl ReportFormatter for JsonDump {
    fn format(&self, pools: &PoolMap) -> Result<String, ReportError> {
        serde_json::to_string_pretty(pools).map_err(|e| ReportError::Format(e.to_string()))
    }
}

/// Writes the report to standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSender;

impl ReportSender for StdoutSender {
    fn send(&self, _pools: &PoolMap, body: &str) -> Result<(), ReportError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", body.trim_end())
            .and_then(|_| stdout.flush())
            .map_err(|e| ReportError::Delivery(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

fn or_unset<T: Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| UNSET.to_string())
}
