//! Pool record types and the line parsers that populate them
//!
//! `zpool list` rows become [`PoolRecord`]s and recognised `zpool status`
//! lines become [`StatusUpdate`]s that are merged into an existing record.
//! Lines that match neither shape are not errors; real command output is full
//! of headers, blank lines and vdev tree decoration.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// All records of one collection run, keyed by pool name
pub type PoolMap = BTreeMap<String, PoolRecord>;

/// Token whose presence marks a listing line as the column header
pub const HEADER_TOKEN: &str = "NAME";

/// Date layout used by `zpool status` on scan lines, after whitespace is collapsed
const SCRUB_DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

lazy_static! {
    // Nine whitespace-separated columns:
    //   1 name  2 size  3 alloc  4 free  5 ckpoint  6 expandsz  7 frag  8 cap  9 health
    // Columns 5 and 6 are allocation counters that are not reported.
    static ref LISTING_LINE: Regex = Regex::new(
        r"^\s*(?P<name>\S+)\s+(?P<size>\S+)\s+(?P<used>\S+)\s+(?P<free>\S+)\s+\S+\s+\S+\s+(?P<frag>\S+)\s+(?P<cap>\S+)\s+(?P<health>\S+)\s*$"
    )
    .unwrap();

    static ref SCRUB_LINE: Regex = Regex::new(
        r"^\s*scan:\s+scrub\s+repaired\s+(?P<repaired>\S+)\s+in\s+(?P<duration>(?:\d+\s+days?\s+)?\d+:\d{2}:\d{2})\s+with\s+(?P<errors>\d+)\s+errors\s+on\s+(?P<date>.+?)\s*$"
    )
    .unwrap();

    static ref ERROR_COUNTER_LINE: Regex = Regex::new(
        r"^\s*(?P<name>\S+)\s+(?P<state>[A-Za-z]+)\s+(?P<read>\d+)\s+(?P<write>\d+)\s+(?P<cksum>\d+)\s*$"
    )
    .unwrap();
}

/// Health state reported in the HEALTH column
///
/// zpool prints states in upper case. Matching is case-sensitive, so any other
/// spelling lands in `Unrecognized` and is reported exactly as it was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolHealth {
    Online,
    Degraded,
    Faulted,
    Offline,
    Removed,
    Unavail,
    Suspended,
    /// Any state word this crate does not know, kept verbatim
    Unrecognized(String),
}

impl PoolHealth {
    pub fn as_str(&self) -> &str {
        match self {
            PoolHealth::Online => "ONLINE",
            PoolHealth::Degraded => "DEGRADED",
            PoolHealth::Faulted => "FAULTED",
            PoolHealth::Offline => "OFFLINE",
            PoolHealth::Removed => "REMOVED",
            PoolHealth::Unavail => "UNAVAIL",
            PoolHealth::Suspended => "SUSPENDED",
            PoolHealth::Unrecognized(word) => word,
        }
    }
}

impl From<&str> for PoolHealth {
    fn from(word: &str) -> Self {
        match word {
            "ONLINE" => PoolHealth::Online,
            "DEGRADED" => PoolHealth::Degraded,
            "FAULTED" => PoolHealth::Faulted,
            "OFFLINE" => PoolHealth::Offline,
            "REMOVED" => PoolHealth::Removed,
            "UNAVAIL" => PoolHealth::Unavail,
            "SUSPENDED" => PoolHealth::Suspended,
            _ => PoolHealth::Unrecognized(word.to_string()),
        }
    }
}

impl FromStr for PoolHealth {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PoolHealth::from(s))
    }
}

impl fmt::Display for PoolHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PoolHealth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Health and usage of a single storage pool
///
/// Listing fields are always present. Status fields stay `None` until a
/// matching `zpool status` line is seen, so "not measured" and "measured as
/// zero" remain distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolRecord {
    pub name: String,
    pub size: String,
    pub used: String,
    pub free: String,
    /// Verbatim FRAG column, e.g. `"12%"` or `"-"`
    pub fragmentation_percent: String,
    /// Verbatim CAP column, e.g. `"47%"`
    pub capacity_percent: String,
    pub health: PoolHealth,

    pub read_errors: Option<u64>,
    pub write_errors: Option<u64>,
    pub checksum_errors: Option<u64>,

    /// Repaired amount as printed by zpool, e.g. `"0B"` or `"1.50M"`
    pub repaired_bytes: Option<String>,
    pub repair_duration: Option<String>,
    pub scrub_error_count: Option<u64>,
    /// Completion date of the last scrub, captured verbatim
    pub scrub_date: Option<String>,
}

impl PoolRecord {
    /// Parse one `zpool list` line into a record
    ///
    /// Returns `None` for the header line (anything containing `NAME`) and for
    /// any line that does not have exactly nine columns.
    pub fn from_listing_line(line: &str) -> Option<Self> {
        if line.contains(HEADER_TOKEN) {
            return None;
        }

        let caps = LISTING_LINE.captures(line)?;
        Some(Self {
            name: caps["name"].to_string(),
            size: caps["size"].to_string(),
            used: caps["used"].to_string(),
            free: caps["free"].to_string(),
            fragmentation_percent: caps["frag"].to_string(),
            capacity_percent: caps["cap"].to_string(),
            health: PoolHealth::from(&caps["health"]),
            read_errors: None,
            write_errors: None,
            checksum_errors: None,
            repaired_bytes: None,
            repair_duration: None,
            scrub_error_count: None,
            scrub_date: None,
        })
    }

    /// Merge a parsed status line into this record
    pub fn apply(&mut self, update: StatusUpdate) {
        match update {
            StatusUpdate::Scrub {
                repaired,
                duration,
                errors,
                date,
            } => {
                self.repaired_bytes = Some(repaired);
                self.repair_duration = Some(duration);
                self.scrub_error_count = Some(errors);
                self.scrub_date = Some(date);
            }
            StatusUpdate::ErrorCounters {
                read,
                write,
                checksum,
            } => {
                self.read_errors = Some(read);
                self.write_errors = Some(write);
                self.checksum_errors = Some(checksum);
            }
        }
    }

    pub fn is_online(&self) -> bool {
        self.health == PoolHealth::Online
    }

    /// FRAG as a number, `None` for `"-"` or anything unparseable
    pub fn fragmentation_value(&self) -> Option<u8> {
        parse_percent(&self.fragmentation_percent)
    }

    /// CAP as a number, `None` if unparseable
    pub fn capacity_value(&self) -> Option<u8> {
        parse_percent(&self.capacity_percent)
    }

    /// Sum of read, write and checksum errors, if they were measured
    pub fn total_errors(&self) -> Option<u64> {
        Some(self.read_errors? + self.write_errors? + self.checksum_errors?)
    }

    /// Repaired amount converted to bytes (binary multipliers)
    pub fn repaired_bytes_value(&self) -> Option<u64> {
        self.repaired_bytes.as_deref().and_then(parse_size)
    }

    /// When the last scrub finished, if the date is in the usual zpool layout
    pub fn scrub_completed_at(&self) -> Option<NaiveDateTime> {
        let date = self.scrub_date.as_deref()?;
        let collapsed = date.split_whitespace().collect::<Vec<_>>().join(" ");
        NaiveDateTime::parse_from_str(&collapsed, SCRUB_DATE_FORMAT).ok()
    }

    /// Whole days between the last scrub and `now`
    pub fn days_since_scrub(&self, now: NaiveDateTime) -> Option<i64> {
        self.scrub_completed_at()
            .map(|completed| (now - completed).num_days())
    }
}

/// Fields recognised on one `zpool status` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// `scan: scrub repaired <BYTES> in <DURATION> with <N> errors on <DATE>`
    Scrub {
        repaired: String,
        duration: String,
        errors: u64,
        date: String,
    },
    /// `<pool> <STATE> <READ> <WRITE> <CKSUM>` row of the config tree
    ErrorCounters { read: u64, write: u64, checksum: u64 },
}

impl StatusUpdate {
    /// Recognise a scrub summary or the pool's own error-counter row
    ///
    /// The scrub pattern is tried first. Counter rows for vdevs and disks are
    /// ignored because their first column is not the pool name.
    pub fn from_status_line(pool_name: &str, line: &str) -> Option<Self> {
        if let Some(caps) = SCRUB_LINE.captures(line) {
            return Some(StatusUpdate::Scrub {
                repaired: caps["repaired"].to_string(),
                duration: caps["duration"].to_string(),
                errors: caps["errors"].parse().ok()?,
                date: caps["date"].to_string(),
            });
        }

        let caps = ERROR_COUNTER_LINE.captures(line)?;
        if &caps["name"] != pool_name {
            return None;
        }
        Some(StatusUpdate::ErrorCounters {
            read: caps["read"].parse().ok()?,
            write: caps["write"].parse().ok()?,
            checksum: caps["cksum"].parse().ok()?,
        })
    }
}

fn parse_percent(value: &str) -> Option<u8> {
    value.trim_end_matches('%').parse().ok()
}

/// Parse zpool's human-readable sizes ("0B", "512", "1.50M", "2T")
fn parse_size(value: &str) -> Option<u64> {
    let value = value.trim().trim_end_matches(|c| c == 'B' || c == 'b');
    if value.is_empty() {
        return None;
    }

    let (number, shift) = match value.chars().last()? {
        'K' | 'k' => (&value[..value.len() - 1], 10),
        'M' => (&value[..value.len() - 1], 20),
        'G' => (&value[..value.len() - 1], 30),
        'T' => (&value[..value.len() - 1], 40),
        'P' => (&value[..value.len() - 1], 50),
        'E' => (&value[..value.len() - 1], 60),
        _ => (value, 0),
    };

    let number: f64 = number.parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    let bytes = (number * (1u64 << shift) as f64).round();
    if bytes >= u64::MAX as f64 {
        return None;
    }
    Some(bytes as u64)
}
