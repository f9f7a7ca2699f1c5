/// Collaborator traits and the publish sequence
pub mod pipeline;

/// Text and JSON renderings of collected records
pub mod dump;

pub use dump::{JsonDump, StdoutSender, TextDump};
pub use pipeline::{publish, NoSmartData, ReportFormatter, ReportSender, SmartCollector};
