/// External command execution
pub mod command;

/// Pool listing and status collection
pub mod pool_collector;

pub use command::{CommandRunner, SystemCommandRunner};
pub use pool_collector::PoolStatusCollector;
