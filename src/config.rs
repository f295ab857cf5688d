//! Desired state of a host.
use crate::error::{ConvergeError, Result};
use bollard::models::{ContainerConfig, HostConfig};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Health check attached to a desired container. Carried through, never executed here.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContainerCheck {
    #[serde(rename = "Type")]
    pub kind: String,
    pub url: String,
    pub dummy_result: bool,
    pub expect_http_status: String,
    pub expect_string: String,
}

/// One container the host should be running.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfiguration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: ContainerConfig,
    #[serde(default)]
    pub host_config: HostConfig,
    #[serde(default)]
    pub checks: Vec<ContainerCheck>,
}

impl ContainerConfiguration {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ContainerConfig {
                image: Some(image.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.hostname = Some(hostname.into());
        self
    }

    pub fn image(&self) -> &str {
        self.config.image.as_deref().unwrap_or_default()
    }

    /// Empty when the configuration does not pin a hostname.
    pub fn hostname(&self) -> &str {
        self.config.hostname.as_deref().unwrap_or_default()
    }
}

/// Full desired state for one host.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct MachineConfiguration {
    #[serde(default)]
    pub containers: BTreeMap<String, ContainerConfiguration>,
    /// Image names (without tag) this host is the only legitimate runner of.
    #[serde(default)]
    pub authoritative_names: BTreeSet<String>,
}

impl MachineConfiguration {
    pub fn from_json(document: &str) -> Result<Self> {
        let mut configuration: MachineConfiguration = serde_json::from_str(document)?;
        configuration.normalize()?;
        debug!(
            "loaded {} desired containers, {} authoritative images",
            configuration.containers.len(),
            configuration.authoritative_names.len()
        );
        Ok(configuration)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let document = std::fs::read_to_string(path).map_err(|e| {
            ConvergeError::ConfigInvalid(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&document)
    }

    pub fn with_container(mut self, container: ContainerConfiguration) -> Self {
        self.containers.insert(container.name.clone(), container);
        self
    }

    pub fn with_authoritative(mut self, image_name: impl Into<String>) -> Self {
        self.authoritative_names.insert(image_name.into());
        self
    }

    pub fn is_authoritative(&self, image_name: &str) -> bool {
        self.authoritative_names.contains(image_name)
    }

    fn normalize(&mut self) -> Result<()> {
        for (key, container) in self.containers.iter_mut() {
            if container.name.is_empty() {
                container.name = key.clone();
            } else if &container.name != key {
                return Err(ConvergeError::ConfigInvalid(format!(
                    "container `{key}` declares a different name `{}`",
                    container.name
                )));
            }
            if container.image().is_empty() {
                return Err(ConvergeError::ConfigInvalid(format!(
                    "container `{key}` has no image"
                )));
            }
        }
        Ok(())
    }
}
