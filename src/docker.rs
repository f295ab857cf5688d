use crate::error::RuntimeError;
use crate::runtime::{ContainerID, ContainerRuntime, PullRequest};
use async_trait::async_trait;
use bollard::Docker;
use bollard::errors::Error as BollardError;
use bollard::models::{
    ContainerCreateBody, ContainerInspectResponse, ContainerSummary, ImageInspect,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions,
    ListContainersOptionsBuilder, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptionsBuilder,
};
use futures_util::StreamExt;
use log::{debug, info, trace};
use std::io::Write;

/// [`ContainerRuntime`] backed by the local docker daemon.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let options = ListContainersOptionsBuilder::default().all(all).build();
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| match e {
                BollardError::DockerResponseServerError { .. } => RuntimeError::from_docker(e),
                other => RuntimeError::Unavailable(other.to_string()),
            })?;
        debug!("docker reports {} containers", containers.len());
        Ok(containers)
    }

    async fn inspect_container(
        &self,
        id: &ContainerID,
    ) -> Result<ContainerInspectResponse, RuntimeError> {
        let details = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(RuntimeError::from_docker)?;
        trace!(
            "container details: {}",
            serde_json::to_string_pretty(&details).unwrap_or_default()
        );
        Ok(details)
    }

    async fn inspect_image(&self, reference: &str) -> Result<Option<ImageInspect>, RuntimeError> {
        match self.docker.inspect_image(reference).await {
            Ok(image) => Ok(Some(image)),
            Err(e) => match RuntimeError::from_docker(e) {
                RuntimeError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn pull_image(
        &self,
        request: &PullRequest,
        progress: &mut (dyn Write + Send),
    ) -> Result<(), RuntimeError> {
        let options = CreateImageOptions {
            from_image: Some(request.repository.clone()),
            tag: Some(request.tag.clone()),
            ..Default::default()
        };
        let mut pull_stream = self.docker.create_image(Some(options), None, None);
        while let Some(result) = pull_stream.next().await {
            let output = result.map_err(|e| RuntimeError::PullFailed(e.to_string()))?;
            if let Some(status) = &output.status {
                let _ = match &output.progress {
                    Some(bar) => writeln!(progress, "{status} {bar}"),
                    None => writeln!(progress, "{status}"),
                };
            }
        }
        info!("pulled {}:{}", request.repository, request.tag);
        Ok(())
    }

    async fn create_container(
        &self,
        name: &str,
        body: ContainerCreateBody,
    ) -> Result<ContainerID, RuntimeError> {
        let options = CreateContainerOptions {
            name: Some(name.to_string()),
            ..Default::default()
        };
        let container = self
            .docker
            .create_container(Some(options), body)
            .await
            .map_err(RuntimeError::from_docker)?;
        debug!("container {name} created with ID: {}", container.id);
        Ok(container.id)
    }

    async fn start_container(&self, id: &ContainerID) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions>)
            .await
            .map_err(|e| match RuntimeError::from_docker(e) {
                RuntimeError::Docker(inner) => RuntimeError::StartFailed(inner.to_string()),
                RuntimeError::InvalidConfig(message) => RuntimeError::StartFailed(message),
                other => other,
            })
    }

    async fn stop_container(
        &self,
        id: &ContainerID,
        grace_seconds: i32,
    ) -> Result<(), RuntimeError> {
        let options = StopContainerOptionsBuilder::new().t(grace_seconds).build();
        match self.docker.stop_container(id, Some(options)).await {
            // 304: the container was not running
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            result => result.map_err(RuntimeError::from_docker),
        }
    }

    async fn remove_container(
        &self,
        id: &ContainerID,
        force: bool,
        remove_volumes: bool,
    ) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            v: remove_volumes,
            force,
            link: false,
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(RuntimeError::from_docker)
    }
}
