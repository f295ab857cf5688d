//! The container runtime as seen by a convergence pass.
use crate::error::RuntimeError;
use async_trait::async_trait;
use bollard::models::{
    ContainerCreateBody, ContainerInspectResponse, ContainerSummary, ImageInspect,
};
use std::io::Write;
use std::net::IpAddr;

pub type ContainerID = String;

/// Image reference split into the parts a registry pull needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// Registry host the reference names, if any. Informational: `repository`
    /// already carries it, and that is what the engine is asked to pull.
    pub registry: Option<String>,
    /// Full repository path including the registry prefix, e.g. `registry:5000/app`.
    pub repository: String,
    pub tag: String,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, RuntimeError>;

    async fn inspect_container(
        &self,
        id: &ContainerID,
    ) -> Result<ContainerInspectResponse, RuntimeError>;

    /// `Ok(None)` when the image is not present locally.
    async fn inspect_image(&self, reference: &str) -> Result<Option<ImageInspect>, RuntimeError>;

    async fn pull_image(
        &self,
        request: &PullRequest,
        progress: &mut (dyn Write + Send),
    ) -> Result<(), RuntimeError>;

    async fn create_container(
        &self,
        name: &str,
        body: ContainerCreateBody,
    ) -> Result<ContainerID, RuntimeError>;

    async fn start_container(&self, id: &ContainerID) -> Result<(), RuntimeError>;

    async fn stop_container(&self, id: &ContainerID, grace_seconds: i32)
    -> Result<(), RuntimeError>;

    async fn remove_container(
        &self,
        id: &ContainerID,
        force: bool,
        remove_volumes: bool,
    ) -> Result<(), RuntimeError>;
}

#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>>;
}

/// Resolves through the system resolver.
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        let addresses = tokio::net::lookup_host((host, 0)).await?;
        Ok(addresses.map(|address| address.ip()).collect())
    }
}
