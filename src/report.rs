use crate::runtime::ContainerID;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedContainer {
    pub name: String,
    pub image: String,
    pub id: ContainerID,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedContainer {
    pub name: String,
    pub image: String,
    pub id: ContainerID,
}

/// Anomalies a pass reports without acting on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// More than one container matches a desired container.
    AmbiguousMatch {
        name: String,
        container_ids: Vec<ContainerID>,
    },
    /// The single matching container is not running. It is left alone.
    NotRunning { name: String, id: ContainerID },
    /// A leftover container's image has no tag, so its authority could not be decided.
    MalformedImage {
        name: String,
        id: ContainerID,
        image: String,
    },
}

impl Display for Observation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Observation::AmbiguousMatch {
                name,
                container_ids,
            } => write!(
                f,
                "ambiguous: {} containers match {name} ({})",
                container_ids.len(),
                container_ids.join(", ")
            ),
            Observation::NotRunning { name, id } => {
                write!(f, "not running: {name} matches stopped container {id}")
            }
            Observation::MalformedImage { name, id, image } => write!(
                f,
                "malformed image reference: {name} ({id}) runs `{image}` which has no tag"
            ),
        }
    }
}

/// What one convergence pass did and found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub launched: Vec<LaunchedContainer>,
    pub satisfied: Vec<String>,
    pub removed: Vec<RemovedContainer>,
    pub observations: Vec<Observation>,
}

impl PassReport {
    /// Nothing had to change and nothing looked wrong.
    pub fn is_converged(&self) -> bool {
        self.launched.is_empty() && self.removed.is_empty() && self.observations.is_empty()
    }

    pub fn ambiguous(&self) -> impl Iterator<Item = &Observation> {
        self.observations
            .iter()
            .filter(|o| matches!(o, Observation::AmbiguousMatch { .. }))
    }
}

impl Display for PassReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} launched, {} satisfied, {} removed, {} observations",
            self.launched.len(),
            self.satisfied.len(),
            self.removed.len(),
            self.observations.len()
        )?;
        for container in &self.launched {
            writeln!(
                f,
                "  launched {} ({}) as {}",
                container.name, container.image, container.id
            )?;
        }
        for name in &self.satisfied {
            writeln!(f, "  satisfied {name}")?;
        }
        for container in &self.removed {
            writeln!(
                f,
                "  removed {} ({}) {}",
                container.name, container.image, container.id
            )?;
        }
        for observation in &self.observations {
            writeln!(f, "  {observation}")?;
        }
        Ok(())
    }
}
