//! Containers observed on the host at the start of a pass.
use crate::config::ContainerConfiguration;
use crate::error::{ConvergeError, Operation, Result};
use crate::matcher::find_matching;
use crate::runtime::ContainerRuntime;
use bollard::models::{ContainerInspectResponse, ContainerSummary};
use log::{debug, warn};

/// A listed container together with its inspected details.
#[derive(Debug, Clone, Default)]
pub struct ObservedContainer {
    pub summary: ContainerSummary,
    pub details: ContainerInspectResponse,
}

impl ObservedContainer {
    /// Docker reports names with a leading `/` (e.g. "/comet"); it is stripped here.
    pub fn new(summary: ContainerSummary, mut details: ContainerInspectResponse) -> Self {
        if let Some(name) = details.name.as_mut()
            && name.starts_with('/')
        {
            name.remove(0);
        }
        Self { summary, details }
    }

    pub fn id(&self) -> &str {
        self.details
            .id
            .as_deref()
            .or(self.summary.id.as_deref())
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.details.name.as_deref().unwrap_or_default()
    }

    /// Image reference from the inspected container configuration.
    pub fn image(&self) -> &str {
        self.details
            .config
            .as_ref()
            .and_then(|config| config.image.as_deref())
            .unwrap_or_default()
    }

    /// Image reference as reported by the container listing.
    pub fn listed_image(&self) -> &str {
        self.summary.image.as_deref().unwrap_or_default()
    }

    pub fn hostname(&self) -> &str {
        self.details
            .config
            .as_ref()
            .and_then(|config| config.hostname.as_deref())
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.details
            .state
            .as_ref()
            .and_then(|state| state.running)
            .unwrap_or(false)
    }
}

/// Ordered containers of one pass. Matched entries are taken out as the pass claims them.
#[derive(Debug, Clone, Default)]
pub struct RuntimeSnapshot {
    containers: Vec<ObservedContainer>,
}

impl RuntimeSnapshot {
    pub fn new(containers: Vec<ObservedContainer>) -> Self {
        Self { containers }
    }

    /// List every container, running or not, and inspect each of them.
    pub async fn read(runtime: &dyn ContainerRuntime) -> Result<Self> {
        let listed = runtime
            .list_containers(true)
            .await
            .map_err(ConvergeError::RuntimeUnavailable)?;

        let mut containers = Vec::with_capacity(listed.len());
        for summary in listed {
            let Some(id) = summary.id.clone() else {
                continue;
            };
            match runtime.inspect_container(&id).await {
                Ok(details) => containers.push(ObservedContainer::new(summary, details)),
                Err(e) if e.is_not_found() => {
                    warn!("container {id} disappeared before it could be inspected");
                }
                Err(e) => return Err(ConvergeError::operation(Operation::Inspect, id)(e)),
            }
        }
        debug!("snapshot holds {} containers", containers.len());
        Ok(Self { containers })
    }

    /// Remove and return every container matching `desired`.
    pub fn take_matching(&mut self, desired: &ContainerConfiguration) -> Vec<ObservedContainer> {
        let (found, remaining) = find_matching(std::mem::take(&mut self.containers), desired);
        self.containers = remaining;
        found
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObservedContainer> {
        self.containers.iter()
    }

    pub fn into_remaining(self) -> Vec<ObservedContainer> {
        self.containers
    }
}
