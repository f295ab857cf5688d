//! Identity comparison between observed containers and a desired container.
use crate::config::ContainerConfiguration;
use crate::snapshot::ObservedContainer;

/// Whether `observed` is an instance of `desired`.
///
/// Identity is the image reference (tag included), the hostname when the
/// desired configuration pins one, and the container name. Checks stop at
/// the first mismatch. Environment variables are not compared.
pub fn is_match(observed: &ObservedContainer, desired: &ContainerConfiguration) -> bool {
    if observed.image() != desired.image() {
        return false;
    }
    if !desired.hostname().is_empty() && observed.hostname() != desired.hostname() {
        return false;
    }
    observed.name() == desired.name
}

/// Split `existing` into the containers matching `desired` and the rest, both in input order.
pub fn find_matching(
    existing: Vec<ObservedContainer>,
    desired: &ContainerConfiguration,
) -> (Vec<ObservedContainer>, Vec<ObservedContainer>) {
    existing
        .into_iter()
        .partition(|observed| is_match(observed, desired))
}
