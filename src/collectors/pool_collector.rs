use crate::collectors::command::{display_command, CommandRunner, SystemCommandRunner};
use crate::config::ZpoolConfig;
use crate::error::CollectorError;
use crate::records::{PoolMap, PoolRecord, StatusUpdate, HEADER_TOKEN};
use log::{debug, info, warn};

/// Collects pool health from `zpool list` and `zpool status`
///
/// Every call to [`run`](Self::run) starts from an empty map; nothing is
/// cached between runs. Commands are executed one at a time and the first
/// failing command aborts the run.
pub struct PoolStatusCollector<R: CommandRunner = SystemCommandRunner> {
    config: ZpoolConfig,
    runner: R,
}

impl PoolStatusCollector<SystemCommandRunner> {
    /// Create a collector that runs the real `zpool` binary
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use zfs_report::collectors::PoolStatusCollector;
    /// use zfs_report::config::ZpoolConfig;
    ///
    /// let collector = PoolStatusCollector::new(ZpoolConfig::default());
    /// let pools = collector.run().expect("zpool should be available");
    /// ```
    pub fn new(config: ZpoolConfig) -> Self {
        Self::with_runner(config, SystemCommandRunner)
    }
}

impl<R: CommandRunner> PoolStatusCollector<R> {
    pub fn with_runner(config: ZpoolConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// Run the listing command and return its raw lines
    ///
    /// # Errors
    ///
    /// A `CollectorError` command variant if `zpool` cannot be run or fails,
    /// `CollectorError::EmptyOutput` if it printed nothing but headers or
    /// blank lines.
    pub fn list_pools(&self) -> Result<Vec<String>, CollectorError> {
        let args = &self.config.list_args;
        let output = self.runner.run(&self.config.program, args)?;
        let lines: Vec<String> = output.lines().map(str::to_string).collect();

        let has_data = lines
            .iter()
            .any(|line| !line.trim().is_empty() && !line.contains(HEADER_TOKEN));
        if !has_data {
            return Err(CollectorError::EmptyOutput {
                command: display_command(&self.config.program, args),
            });
        }

        Ok(lines)
    }

    /// Run the status command for one pool and return its raw lines
    pub fn query_pool_status(&self, pool_name: &str) -> Result<Vec<String>, CollectorError> {
        let mut args = self.config.status_args.clone();
        args.push(pool_name.to_string());

        let output = self.runner.run(&self.config.program, &args)?;
        Ok(output.lines().map(str::to_string).collect())
    }

    /// Collect a fresh record for every pool in the listing
    pub fn run(&self) -> Result<PoolMap, CollectorError> {
        let mut pools = PoolMap::new();

        for line in self.list_pools()? {
            match PoolRecord::from_listing_line(&line) {
                Some(record) => {
                    debug!("Matched listing line for pool {}", record.name);
                    if pools.contains_key(&record.name) {
                        warn!("Pool {} listed more than once, keeping the first row", record.name);
                        continue;
                    }
                    pools.insert(record.name.clone(), record);
                }
                None => debug!("No match for listing line: {:?}", line),
            }
        }

        if pools.is_empty() {
            return Err(CollectorError::EmptyOutput {
                command: display_command(&self.config.program, &self.config.list_args),
            });
        }

        for name in pools.keys() {
            info!("Discovered pool: {}", name);
        }

        for (name, record) in pools.iter_mut() {
            for line in self.query_pool_status(name)? {
                match StatusUpdate::from_status_line(name, &line) {
                    Some(update) => {
                        debug!("Matched status line for pool {}: {:?}", name, update);
                        record.apply(update);
                    }
                    None => debug!("No match for status line: {:?}", line),
                }
            }
        }

        info!("Collected {} pool record(s)", pools.len());
        Ok(pools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::command::MockCommandRunner;
    use crate::records::PoolHealth;
    use mockall::predicate::eq;

    const LISTING: &str = "\
NAME     SIZE  ALLOC   FREE  CKPOINT  EXPANDSZ   FRAG    CAP  HEALTH
tank    10.9T  5.20T  5.70T        -         -    12%    47%  ONLINE
backup  3.62T  3.10T   530G        -         -    31%    85%  DEGRADED
";

    const TANK_STATUS: &str = "\
  pool: tank
 state: ONLINE
  scan: scrub repaired 0B in 00:00:01 with 0 errors on Mon Jan  1 00:00:00 2024
config:

\tNAME        STATE     READ WRITE CKSUM
\ttank        ONLINE       2     0     1
\t  mirror-0  ONLINE       2     0     1
\t    sda     ONLINE       2     0     0
\t    sdb     ONLINE       0     0     1

errors: No known data errors
";

    const BACKUP_STATUS: &str = "\
  pool: backup
 state: DEGRADED
  scan: none requested
config:

\tNAME        STATE     READ WRITE CKSUM
\tbackup      DEGRADED     0     0     0
\t  sdc       UNAVAIL      0     0     0
";

    fn status_args(pool: &str) -> Vec<String> {
        vec!["status".to_string(), pool.to_string()]
    }

    fn mock_with(listing: &'static str, statuses: &[(&'static str, &'static str)]) -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        let list_args = ZpoolConfig::default().list_args;
        runner
            .expect_run()
            .with(eq("zpool"), eq(list_args))
            .returning(move |_, _| Ok(listing.to_string()));
        for &(pool, output) in statuses {
            runner
                .expect_run()
                .with(eq("zpool"), eq(status_args(pool)))
                .times(1)
                .returning(move |_, _| Ok(output.to_string()));
        }
        runner
    }

    #[test]
    fn test_run_collects_listing_and_status() {
        let runner = mock_with(LISTING, &[("tank", TANK_STATUS), ("backup", BACKUP_STATUS)]);
        let collector = PoolStatusCollector::with_runner(ZpoolConfig::default(), runner);

        let pools = collector.run().unwrap();
        assert_eq!(pools.len(), 2);

        let tank = &pools["tank"];
        assert_eq!(tank.size, "10.9T");
        assert_eq!(tank.used, "5.20T");
        assert_eq!(tank.free, "5.70T");
        assert_eq!(tank.fragmentation_percent, "12%");
        assert_eq!(tank.capacity_percent, "47%");
        assert_eq!(tank.health, PoolHealth::Online);
        assert_eq!(tank.read_errors, Some(2));
        assert_eq!(tank.write_errors, Some(0));
        assert_eq!(tank.checksum_errors, Some(1));
        assert_eq!(tank.repaired_bytes.as_deref(), Some("0B"));
        assert_eq!(tank.repair_duration.as_deref(), Some("00:00:01"));
        assert_eq!(tank.scrub_error_count, Some(0));
        assert_eq!(tank.scrub_date.as_deref(), Some("Mon Jan  1 00:00:00 2024"));

        let backup = &pools["backup"];
        assert_eq!(backup.health, PoolHealth::Degraded);
        assert_eq!(backup.capacity_percent, "85%");
        assert_eq!(backup.read_errors, Some(0));
        assert_eq!(backup.scrub_date, None);
        assert_eq!(backup.scrub_error_count, None);
    }

    #[test]
    fn test_status_without_matches_leaves_fields_unset() {
        let runner = mock_with(
            LISTING,
            &[("tank", "  pool: tank\n"), ("backup", "")],
        );
        let collector = PoolStatusCollector::with_runner(ZpoolConfig::default(), runner);

        let pools = collector.run().unwrap();
        for record in pools.values() {
            assert_eq!(record.read_errors, None);
            assert_eq!(record.write_errors, None);
            assert_eq!(record.checksum_errors, None);
            assert_eq!(record.scrub_error_count, None);
            assert_eq!(record.repaired_bytes, None);
        }
    }

    #[test]
    fn test_listing_failure_aborts_run() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|_, _| {
            Err(CollectorError::NonZeroExit {
                command: "zpool list".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "no pools available".to_string(),
            })
        });
        let collector = PoolStatusCollector::with_runner(ZpoolConfig::default(), runner);

        let err = collector.run().unwrap_err();
        assert!(err.is_command_error());
    }

    #[test]
    fn test_status_failure_aborts_run() {
        let mut runner = MockCommandRunner::new();
        let list_args = ZpoolConfig::default().list_args;
        runner
            .expect_run()
            .with(eq("zpool"), eq(list_args))
            .returning(|_, _| Ok(LISTING.to_string()));
        runner
            .expect_run()
            .withf(|_, args| args.first().map(String::as_str) == Some("status"))
            .times(1)
            .returning(|_, _| {
                Err(CollectorError::NonZeroExit {
                    command: "zpool status".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "cannot open pool".to_string(),
                })
            });
        let collector = PoolStatusCollector::with_runner(ZpoolConfig::default(), runner);

        assert!(matches!(
            collector.run(),
            Err(CollectorError::NonZeroExit { .. })
        ));
    }

    #[test]
    fn test_header_only_listing_is_empty_output() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok("NAME SIZE ALLOC FREE CKPOINT EXPANDSZ FRAG CAP HEALTH\n\n".to_string()));
        let collector = PoolStatusCollector::with_runner(ZpoolConfig::default(), runner);

        assert!(matches!(
            collector.list_pools(),
            Err(CollectorError::EmptyOutput { .. })
        ));
    }

    #[test]
    fn test_unparseable_listing_is_empty_output() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_, _| Ok("no pools available\n".to_string()));
        let collector = PoolStatusCollector::with_runner(ZpoolConfig::default(), runner);

        let err = collector.run().unwrap_err();
        assert!(!err.is_command_error());
    }

    #[test]
    fn test_duplicate_pool_keeps_first_row() {
        let listing = "\
tank 10T 4T 6T - - 12% 40% ONLINE
tank 20T 4T 16T - - 1% 20% FAULTED
";
        let runner = mock_with(listing, &[("tank", "")]);
        let collector = PoolStatusCollector::with_runner(ZpoolConfig::default(), runner);

        let pools = collector.run().unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools["tank"].size, "10T");
    }

    #[test]
    fn test_pool_name_is_passed_as_single_argument() {
        let name = "odd pool;$(id)";
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .with(eq("zpool"), eq(status_args(name)))
            .times(1)
            .returning(|_, _| Ok(String::new()));
        let collector = PoolStatusCollector::with_runner(ZpoolConfig::default(), runner);

        assert!(collector.query_pool_status(name).unwrap().is_empty());
    }

    #[test]
    fn test_run_is_repeatable() {
        let mut runner = mock_with(LISTING, &[]);
        runner
            .expect_run()
            .with(eq("zpool"), eq(status_args("tank")))
            .times(2)
            .returning(|_, _| Ok(TANK_STATUS.to_string()));
        runner
            .expect_run()
            .with(eq("zpool"), eq(status_args("backup")))
            .times(2)
            .returning(|_, _| Ok(BACKUP_STATUS.to_string()));
        let collector = PoolStatusCollector::with_runner(ZpoolConfig::default(), runner);

        let first = collector.run().unwrap();
        let second = collector.run().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_program_and_arguments() {
        let config = ZpoolConfig {
            program: "/sbin/zpool".to_string(),
            list_args: vec!["list".to_string(), "-H".to_string()],
            status_args: vec!["status".to_string(), "-p".to_string()],
        };
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .with(eq("/sbin/zpool"), eq(vec!["list".to_string(), "-H".to_string()]))
            .returning(|_, _| Ok("tank\t10T\t4T\t6T\t-\t-\t12%\t40%\tONLINE\n".to_string()));
        runner
            .expect_run()
            .with(
                eq("/sbin/zpool"),
                eq(vec!["status".to_string(), "-p".to_string(), "tank".to_string()]),
            )
            .times(1)
            .returning(|_, _| Ok(String::new()));
        let collector = PoolStatusCollector::with_runner(config, runner);

        let pools = collector.run().unwrap();
        assert_eq!(pools["tank"].free, "6T");
    }
}
