//! Decides and applies what a host needs to match its configuration.
use crate::config::{ContainerConfiguration, MachineConfiguration};
use crate::error::{ConvergeError, Operation, Result};
use crate::launcher::Launcher;
use crate::report::{LaunchedContainer, Observation, PassReport, RemovedContainer};
use crate::runtime::ContainerRuntime;
use crate::snapshot::{ObservedContainer, RuntimeSnapshot};
use log::{debug, info, warn};

pub const DEFAULT_STOP_GRACE_SECONDS: i32 = 10;

/// Image name without its tag, e.g. `repo/app` for `repo/app:2.0`.
pub fn strip_tag(image: &str) -> Result<&str> {
    image
        .split_once(':')
        .map(|(name, _)| name)
        .ok_or_else(|| ConvergeError::ImageReferenceMalformed {
            reference: image.to_string(),
            reason: "no tag separator".to_string(),
        })
}

pub struct Planner<'a> {
    runtime: &'a dyn ContainerRuntime,
    launcher: Launcher<'a>,
    stop_grace_seconds: i32,
}

impl<'a> Planner<'a> {
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        launcher: Launcher<'a>,
        stop_grace_seconds: i32,
    ) -> Self {
        Self {
            runtime,
            launcher,
            stop_grace_seconds,
        }
    }

    /// Match, clean up authoritative leftovers, then launch what is missing.
    pub async fn converge(
        &self,
        config: &MachineConfiguration,
        mut snapshot: RuntimeSnapshot,
    ) -> Result<PassReport> {
        let mut report = PassReport::default();
        let mut ready_for_launch = Vec::new();

        for desired in config.containers.values() {
            let found = snapshot.take_matching(desired);
            match found.as_slice() {
                [] => {
                    info!(
                        "no container matches {} ({}), marking for launch",
                        desired.name,
                        desired.image()
                    );
                    ready_for_launch.push(desired);
                }
                [container] if container.is_running() => {
                    debug!("{} is running as {}", desired.name, container.id());
                    report.satisfied.push(desired.name.clone());
                }
                [container] => {
                    warn!(
                        "{} matches container {} but it is not running",
                        desired.name,
                        container.id()
                    );
                    report.observations.push(Observation::NotRunning {
                        name: desired.name.clone(),
                        id: container.id().to_string(),
                    });
                }
                containers => {
                    let container_ids: Vec<String> =
                        containers.iter().map(|c| c.id().to_string()).collect();
                    warn!(
                        "found {} containers matching {}: {container_ids:?}",
                        containers.len(),
                        desired.name
                    );
                    report.observations.push(Observation::AmbiguousMatch {
                        name: desired.name.clone(),
                        container_ids,
                    });
                }
            }
        }

        let remaining = snapshot.into_remaining();
        info!("{} containers left unclaimed", remaining.len());
        for container in &remaining {
            self.eliminate_if_authoritative(config, container, &mut report)
                .await?;
        }

        for desired in ready_for_launch {
            self.launch(desired, &mut report).await?;
        }

        Ok(report)
    }

    async fn eliminate_if_authoritative(
        &self,
        config: &MachineConfiguration,
        container: &ObservedContainer,
        report: &mut PassReport,
    ) -> Result<()> {
        let image = match strip_tag(container.listed_image()) {
            Ok(image) => image,
            Err(e) => {
                warn!("cannot decide authority for {}: {e}", container.name());
                report.observations.push(Observation::MalformedImage {
                    name: container.name().to_string(),
                    id: container.id().to_string(),
                    image: container.listed_image().to_string(),
                });
                return Ok(());
            }
        };
        if !config.is_authoritative(image) {
            return Ok(());
        }

        let id = container.id().to_string();
        info!(
            "{} ({id}) runs authoritative image {image} but is not configured, removing it",
            container.name()
        );
        self.runtime
            .stop_container(&id, self.stop_grace_seconds)
            .await
            .map_err(ConvergeError::operation(Operation::Stop, container.name()))?;
        self.runtime
            .remove_container(&id, true, true)
            .await
            .map_err(ConvergeError::operation(Operation::Remove, container.name()))?;

        report.removed.push(RemovedContainer {
            name: container.name().to_string(),
            image: container.listed_image().to_string(),
            id,
        });
        Ok(())
    }

    async fn launch(&self, desired: &ContainerConfiguration, report: &mut PassReport) -> Result<()> {
        let id = self.launcher.launch(desired).await?;
        report.launched.push(LaunchedContainer {
            name: desired.name.clone(),
            image: desired.image().to_string(),
            id,
        });
        Ok(())
    }
}
