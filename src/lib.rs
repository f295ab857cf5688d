//! Converge the containers running on a docker host to a declared configuration.
//!
//! A pass lists and inspects every container, claims the ones matching a
//! desired container, removes unclaimed containers of images the host is
//! authoritative for and launches whatever is still missing. Nothing is kept
//! between passes; running a pass again converges from whatever state the
//! previous one left behind.
pub mod config;
pub mod docker;
pub mod error;
pub mod launcher;
pub mod matcher;
pub mod planner;
pub mod report;
pub mod runtime;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ContainerCheck, ContainerConfiguration, MachineConfiguration};
pub use error::{ConvergeError, Operation, Result, RuntimeError};
pub use launcher::{Launcher, ServiceDiscovery};
pub use planner::Planner;
pub use report::{Observation, PassReport};
pub use runtime::{ContainerRuntime, HostResolver, SystemResolver};
pub use snapshot::{ObservedContainer, RuntimeSnapshot};

use log::info;

#[derive(Debug, Clone)]
pub struct PassOptions {
    /// DNS server to inject into launched containers. `None` disables injection.
    pub discovery: Option<ServiceDiscovery>,
    pub stop_grace_seconds: i32,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            discovery: Some(ServiceDiscovery::default()),
            stop_grace_seconds: planner::DEFAULT_STOP_GRACE_SECONDS,
        }
    }
}

/// Run one full convergence pass against `runtime`.
///
/// Any runtime failure aborts the pass; actions taken before it stay in place.
pub async fn run_convergence_pass(
    runtime: &dyn ContainerRuntime,
    resolver: &dyn HostResolver,
    config: &MachineConfiguration,
    options: &PassOptions,
) -> Result<PassReport> {
    let snapshot = RuntimeSnapshot::read(runtime).await?;
    info!(
        "converging {} desired containers against {} existing",
        config.containers.len(),
        snapshot.len()
    );
    let launcher = Launcher::new(runtime, resolver, options.discovery.as_ref());
    let planner = Planner::new(runtime, launcher, options.stop_grace_seconds);
    planner.converge(config, snapshot).await
}
