//! Creates and starts desired containers that have no running counterpart.
use crate::config::ContainerConfiguration;
use crate::error::{ConvergeError, Operation, Result};
use crate::runtime::{ContainerID, ContainerRuntime, HostResolver, PullRequest};
use bollard::models::{ContainerCreateBody, HostConfig};
use log::{debug, info, warn};

pub const DEFAULT_DISCOVERY_NAME: &str = "skydns.services.dev.docker";
pub const DEFAULT_SEARCH_DOMAIN: &str = "services.dev.docker";

/// DNS server injected into launched containers when its name resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDiscovery {
    pub name: String,
    pub search_domain: String,
}

impl Default for ServiceDiscovery {
    fn default() -> Self {
        Self {
            name: DEFAULT_DISCOVERY_NAME.to_string(),
            search_domain: DEFAULT_SEARCH_DOMAIN.to_string(),
        }
    }
}

pub struct Launcher<'a> {
    runtime: &'a dyn ContainerRuntime,
    resolver: &'a dyn HostResolver,
    discovery: Option<&'a ServiceDiscovery>,
}

impl<'a> Launcher<'a> {
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        resolver: &'a dyn HostResolver,
        discovery: Option<&'a ServiceDiscovery>,
    ) -> Self {
        Self {
            runtime,
            resolver,
            discovery,
        }
    }

    pub async fn launch(&self, desired: &ContainerConfiguration) -> Result<ContainerID> {
        self.ensure_image(desired.image()).await?;

        let mut host_config = desired.host_config.clone();
        self.inject_dns(&mut host_config).await;

        info!("creating container {} from {}", desired.name, desired.image());
        let body = create_body(desired, host_config)?;
        let id = self
            .runtime
            .create_container(&desired.name, body)
            .await
            .map_err(ConvergeError::operation(Operation::Create, &desired.name))?;

        self.runtime
            .start_container(&id)
            .await
            .map_err(ConvergeError::operation(Operation::Start, &desired.name))?;
        info!("container {} started as {id}", desired.name);
        Ok(id)
    }

    async fn ensure_image(&self, reference: &str) -> Result<()> {
        let image = self
            .runtime
            .inspect_image(reference)
            .await
            .map_err(ConvergeError::operation(Operation::InspectImage, reference))?;
        if image.is_some() {
            debug!("image {reference} already present");
            return Ok(());
        }

        let request = pull_request(reference)?;
        info!("pulling image {reference}");
        debug!("{request:?}");
        self.runtime
            .pull_image(&request, &mut std::io::stderr())
            .await
            .map_err(ConvergeError::operation(Operation::Pull, reference))
    }

    async fn inject_dns(&self, host_config: &mut HostConfig) {
        let Some(discovery) = self.discovery else {
            return;
        };
        match self.resolver.resolve(&discovery.name).await {
            Ok(addresses) => match addresses.first() {
                Some(address) => {
                    debug!("using {address} from {} as dns server", discovery.name);
                    host_config.dns = Some(vec![address.to_string()]);
                    host_config.dns_search = Some(vec![discovery.search_domain.clone()]);
                }
                None => warn!("{} resolved to no addresses", discovery.name),
            },
            Err(e) => warn!("cannot resolve {}: {e}, launching without it", discovery.name),
        }
    }
}

/// Split `reference` at the first `/` (registry) and the last `:` (tag) of the rest.
///
/// A reference without a tag pulls `latest`; one pinned by digest pulls that digest.
pub fn pull_request(reference: &str) -> Result<PullRequest> {
    let malformed = |reason: &str| ConvergeError::ImageReferenceMalformed {
        reference: reference.to_string(),
        reason: reason.to_string(),
    };

    let (registry, remainder) = match reference.split_once('/') {
        Some((registry, remainder)) => (Some(registry), remainder),
        None => (None, reference),
    };
    let (repository, tag) = match remainder.split_once('@') {
        Some(pinned) => pinned,
        None => remainder.rsplit_once(':').unwrap_or((remainder, "latest")),
    };

    if registry.is_some_and(str::is_empty) {
        return Err(malformed("empty registry"));
    }
    if repository.is_empty() {
        return Err(malformed("empty repository"));
    }
    if tag.is_empty() {
        return Err(malformed("empty tag"));
    }

    Ok(PullRequest {
        registry: registry.map(str::to_string),
        repository: match registry {
            Some(registry) => format!("{registry}/{repository}"),
            None => repository.to_string(),
        },
        tag: tag.to_string(),
    })
}

/// Carry the whole desired runtime configuration into the create request.
///
/// Both models share the engine's field names, so every field of the desired
/// configuration reaches the engine, including ones added to the models later.
fn create_body(
    desired: &ContainerConfiguration,
    host_config: HostConfig,
) -> Result<ContainerCreateBody> {
    let config = serde_json::to_value(&desired.config)?;
    let mut body: ContainerCreateBody = serde_json::from_value(config)?;
    body.host_config = Some(host_config);
    Ok(body)
}
