//! In-memory runtime and resolver for tests.
use crate::error::RuntimeError;
use crate::runtime::{ContainerID, ContainerRuntime, HostResolver, PullRequest};
use crate::snapshot::ObservedContainer;
use async_trait::async_trait;
use bollard::errors::Error as BollardError;
use bollard::models::{
    ContainerConfig, ContainerCreateBody, ContainerInspectResponse, ContainerState,
    ContainerSummary, ImageInspect,
};
use std::collections::BTreeSet;
use std::io::Write;
use std::net::IpAddr;
use std::sync::Mutex;

pub(crate) fn observed(id: &str, name: &str, image: &str, running: bool) -> ObservedContainer {
    let summary = ContainerSummary {
        id: Some(id.to_string()),
        image: Some(image.to_string()),
        names: Some(vec![name.to_string()]),
        ..Default::default()
    };
    let details = ContainerInspectResponse {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        config: Some(ContainerConfig {
            image: Some(image.to_string()),
            ..Default::default()
        }),
        state: Some(ContainerState {
            running: Some(running),
            ..Default::default()
        }),
        ..Default::default()
    };
    ObservedContainer::new(summary, details)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    List,
    Inspect(ContainerID),
    InspectImage(String),
    Pull(PullRequest),
    Create(String),
    Start(ContainerID),
    Stop(ContainerID),
    Remove(ContainerID),
}

struct FakeContainer {
    id: ContainerID,
    name: String,
    image: String,
    running: bool,
    body: Option<ContainerCreateBody>,
}

#[derive(Default)]
struct State {
    containers: Vec<FakeContainer>,
    images: BTreeSet<String>,
    calls: Vec<Call>,
    vanished: BTreeSet<String>,
    unavailable: bool,
    inspect_image_failure: Option<String>,
    pull_failure: Option<String>,
    start_failure: Option<String>,
    stop_failure: Option<String>,
    remove_failure: Option<String>,
}

/// What the engine answers when it fails internally.
fn server_error(message: &str) -> RuntimeError {
    RuntimeError::from_docker(BollardError::DockerResponseServerError {
        status_code: 500,
        message: message.to_string(),
    })
}

impl State {
    fn unique_id(&self, name: &str) -> ContainerID {
        let base = format!("{}-id", name.trim_start_matches('/'));
        let mut id = base.clone();
        let mut n = 1;
        while self.containers.iter().any(|c| c.id == id) {
            n += 1;
            id = format!("{base}-{n}");
        }
        id
    }
}

/// Applies every mutation to its own state, so consecutive passes observe earlier ones.
#[derive(Default)]
pub(crate) struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// `name` as docker reports it, usually with a leading `/`. The id is `<name>-id`.
    pub(crate) fn with_container(self, name: &str, image: &str, running: bool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.unique_id(name);
            state.containers.push(FakeContainer {
                id,
                name: name.to_string(),
                image: image.to_string(),
                running,
                body: None,
            });
        }
        self
    }

    pub(crate) fn with_image(self, reference: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .images
            .insert(reference.to_string());
        self
    }

    /// Listed but gone by the time it is inspected.
    pub(crate) fn forget_on_inspect(&self, name: &str) {
        self.state.lock().unwrap().vanished.insert(name.to_string());
    }

    pub(crate) fn set_unavailable(&self) {
        self.state.lock().unwrap().unavailable = true;
    }

    pub(crate) fn fail_inspect_image(&self, reason: &str) {
        self.state.lock().unwrap().inspect_image_failure = Some(reason.to_string());
    }

    pub(crate) fn fail_pull(&self, reason: &str) {
        self.state.lock().unwrap().pull_failure = Some(reason.to_string());
    }

    pub(crate) fn fail_remove(&self, reason: &str) {
        self.state.lock().unwrap().remove_failure = Some(reason.to_string());
    }

    pub(crate) fn fail_start(&self, reason: &str) {
        self.state.lock().unwrap().start_failure = Some(reason.to_string());
    }

    pub(crate) fn fail_stop(&self, reason: &str) {
        self.state.lock().unwrap().stop_failure = Some(reason.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Name of the container with `id`, if it still exists.
    pub(crate) fn container(&self, id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    }

    pub(crate) fn created_body(&self, id: &str) -> Option<ContainerCreateBody> {
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.body.clone())
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self, _all: bool) -> Result<Vec<ContainerSummary>, RuntimeError> {
        self.record(Call::List);
        let state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(RuntimeError::Unavailable(
                "/var/run/docker.sock not found".to_string(),
            ));
        }
        Ok(state
            .containers
            .iter()
            .map(|c| ContainerSummary {
                id: Some(c.id.clone()),
                image: Some(c.image.clone()),
                names: Some(vec![c.name.clone()]),
                ..Default::default()
            })
            .collect())
    }

    async fn inspect_container(
        &self,
        id: &ContainerID,
    ) -> Result<ContainerInspectResponse, RuntimeError> {
        self.record(Call::Inspect(id.clone()));
        let state = self.state.lock().unwrap();
        let container = state
            .containers
            .iter()
            .find(|c| &c.id == id)
            .filter(|c| !state.vanished.contains(c.name.trim_start_matches('/')))
            .ok_or_else(|| RuntimeError::NotFound(format!("no such container: {id}")))?;
        let hostname = container
            .body
            .as_ref()
            .and_then(|body| body.hostname.clone());
        Ok(ContainerInspectResponse {
            id: Some(container.id.clone()),
            name: Some(container.name.clone()),
            config: Some(ContainerConfig {
                image: Some(container.image.clone()),
                hostname,
                ..Default::default()
            }),
            state: Some(ContainerState {
                running: Some(container.running),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    async fn inspect_image(&self, reference: &str) -> Result<Option<ImageInspect>, RuntimeError> {
        self.record(Call::InspectImage(reference.to_string()));
        let state = self.state.lock().unwrap();
        if let Some(reason) = &state.inspect_image_failure {
            return Err(server_error(reason));
        }
        Ok(state.images.contains(reference).then(|| ImageInspect {
            id: Some(format!("sha256:{reference}")),
            ..Default::default()
        }))
    }

    async fn pull_image(
        &self,
        request: &PullRequest,
        progress: &mut (dyn Write + Send),
    ) -> Result<(), RuntimeError> {
        self.record(Call::Pull(request.clone()));
        if let Some(reason) = self.state.lock().unwrap().pull_failure.clone() {
            return Err(RuntimeError::PullFailed(reason));
        }
        let _ = writeln!(progress, "Pull complete");
        self.state
            .lock()
            .unwrap()
            .images
            .insert(format!("{}:{}", request.repository, request.tag));
        Ok(())
    }

    async fn create_container(
        &self,
        name: &str,
        body: ContainerCreateBody,
    ) -> Result<ContainerID, RuntimeError> {
        self.record(Call::Create(name.to_string()));
        let mut state = self.state.lock().unwrap();
        if state
            .containers
            .iter()
            .any(|c| c.name.trim_start_matches('/') == name)
        {
            return Err(RuntimeError::NameConflict(format!(
                "the container name \"/{name}\" is already in use"
            )));
        }
        let id = state.unique_id(name);
        state.containers.push(FakeContainer {
            id: id.clone(),
            name: format!("/{name}"),
            image: body.image.clone().unwrap_or_default(),
            running: false,
            body: Some(body),
        });
        Ok(id)
    }

    async fn start_container(&self, id: &ContainerID) -> Result<(), RuntimeError> {
        self.record(Call::Start(id.clone()));
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = state.start_failure.clone() {
            return Err(RuntimeError::StartFailed(reason));
        }
        let container = state
            .containers
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| RuntimeError::NotFound(id.clone()))?;
        container.running = true;
        Ok(())
    }

    async fn stop_container(
        &self,
        id: &ContainerID,
        _grace_seconds: i32,
    ) -> Result<(), RuntimeError> {
        self.record(Call::Stop(id.clone()));
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = state.stop_failure.clone() {
            return Err(server_error(&reason));
        }
        if let Some(container) = state.containers.iter_mut().find(|c| &c.id == id) {
            container.running = false;
        }
        Ok(())
    }

    async fn remove_container(
        &self,
        id: &ContainerID,
        _force: bool,
        _remove_volumes: bool,
    ) -> Result<(), RuntimeError> {
        self.record(Call::Remove(id.clone()));
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.remove_failure {
            return Err(server_error(reason));
        }
        let before = state.containers.len();
        state.containers.retain(|c| &c.id != id);
        if state.containers.len() == before {
            return Err(RuntimeError::NotFound(id.clone()));
        }
        Ok(())
    }
}

pub(crate) struct FakeResolver {
    address: Option<IpAddr>,
}

impl FakeResolver {
    pub(crate) fn resolving(address: &str) -> Self {
        Self {
            address: address.parse().ok(),
        }
    }

    pub(crate) fn unresolvable() -> Self {
        Self { address: None }
    }
}

#[async_trait]
impl HostResolver for FakeResolver {
    async fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        match self.address {
            Some(address) => Ok(vec![address]),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("failed to lookup address information for {host}"),
            )),
        }
    }
}
