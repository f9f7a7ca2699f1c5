use crate::error::ReportError;
use crate::records::PoolMap;
use log::{debug, info};

/// Gathers per-device SMART attributes for the disks behind the pools
///
/// No real collector exists yet; [`NoSmartData`] is the only implementation.
#[cfg_attr(test, mockall::automock)]
pub trait SmartCollector {
    fn collect(&self, pools: &PoolMap) -> Result<(), ReportError>;

    fn name(&self) -> &'static str;
}

/// Turns a completed record map into a report body
#[cfg_attr(test, mockall::automock)]
pub trait ReportFormatter {
    fn format(&self, pools: &PoolMap) -> Result<String, ReportError>;
}

/// Delivers a formatted report
#[cfg_attr(test, mockall::automock)]
pub trait ReportSender {
    fn send(&self, pools: &PoolMap, body: &str) -> Result<(), ReportError>;

    fn name(&self) -> &'static str;
}

/// SMART collector placeholder that gathers nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSmartData;

impl SmartCollector for NoSmartData {
    fn collect(&self, pools: &PoolMap) -> Result<(), ReportError> {
        debug!(
            "SMART collection not available, skipping {} pool(s)",
            pools.len()
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Run the collaborators over one collection run
///
/// SMART data is gathered first, then the report is formatted and handed to
/// the sender. The first failure stops the sequence.
pub fn publish(
    pools: &PoolMap,
    smart: &dyn SmartCollector,
    formatter: &dyn ReportFormatter,
    sender: &dyn ReportSender,
) -> Result<(), ReportError> {
    debug!("Collecting SMART data with {}", smart.name());
    smart.collect(pools)?;

    let body = formatter.format(pools)?;

    info!("Sending report for {} pool(s) via {}", pools.len(), sender.name());
    sender.send(pools, &body)
}
