//! Network name to chain client resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::NetworkName;
use crate::observability::metrics;

/// Pre-built clients keyed by network, with a default for unknown names.
#[derive(Debug)]
pub struct NetworkSelector<C> {
    clients: BTreeMap<NetworkName, Arc<C>>,
    default_network: NetworkName,
    default_client: Arc<C>,
}

impl<C> NetworkSelector<C> {
    /// The default network always resolves, so it is supplied up front.
    pub fn new(default_network: NetworkName, default_client: Arc<C>) -> Self {
        let mut clients = BTreeMap::new();
        clients.insert(default_network, Arc::clone(&default_client));
        Self {
            clients,
            default_network,
            default_client,
        }
    }

    /// Register a client. Replacing the default network's client is ignored.
    pub fn insert(&mut self, network: NetworkName, client: Arc<C>) {
        if network != self.default_network {
            self.clients.insert(network, client);
        }
    }

    pub fn default_network(&self) -> NetworkName {
        self.default_network
    }

    /// Resolve a network name, falling back to the default network.
    ///
    /// Never fails. Unknown or unconfigured names are logged and counted.
    pub fn resolve(&self, requested: &str) -> (NetworkName, Arc<C>) {
        if let Some(resolved) = self.resolve_strict(requested) {
            return resolved;
        }

        tracing::warn!(
            requested = %requested,
            fallback = %self.default_network,
            "No client for network, falling back to default"
        );
        metrics::record_network_fallback(requested);
        (self.default_network, Arc::clone(&self.default_client))
    }

    /// Resolve a network name without fallback.
    pub fn resolve_strict(&self, requested: &str) -> Option<(NetworkName, Arc<C>)> {
        let network: NetworkName = requested.parse().ok()?;
        self.clients
            .get(&network)
            .map(|client| (network, Arc::clone(client)))
    }

    /// All configured networks and their clients.
    pub fn iter(&self) -> impl Iterator<Item = (NetworkName, &Arc<C>)> {
        self.clients.iter().map(|(network, client)| (*network, client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> NetworkSelector<&'static str> {
        let mut selector = NetworkSelector::new(NetworkName::Astar, Arc::new("astar-client"));
        selector.insert(NetworkName::Shiden, Arc::new("shiden-client"));
        selector
    }

    #[test]
    fn test_resolve_known_network() {
        let (network, client) = selector().resolve("shiden");
        assert_eq!(network, NetworkName::Shiden);
        assert_eq!(*client, "shiden-client");
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let selector = selector();

        let (network, client) = selector.resolve("shidn");
        assert_eq!(network, NetworkName::Astar);
        assert_eq!(*client, "astar-client");

        // Known name without a configured client also falls back.
        let (network, _) = selector.resolve("shibuya");
        assert_eq!(network, NetworkName::Astar);
    }

    #[test]
    fn test_resolve_strict_rejects_unknown() {
        let selector = selector();
        assert!(selector.resolve_strict("shidn").is_none());
        assert!(selector.resolve_strict("shibuya").is_none());
        assert!(selector.resolve_strict("astar").is_some());
    }

    #[test]
    fn test_iter_lists_networks() {
        let networks: Vec<_> = selector().iter().map(|(n, _)| n).collect();
        assert_eq!(networks, vec![NetworkName::Astar, NetworkName::Shiden]);
    }
}
