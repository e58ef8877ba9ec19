//! The closed catalog of service names the registry accepts (§3: "`serviceName`
//! is drawn from a closed catalog of allowed names").

use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    allowed: HashSet<String>,
}

impl ServiceCatalog {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { allowed: names.into_iter().map(Into::into).collect() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.allowed.contains(name)
    }
}

impl Default for ServiceCatalog {
    /// A reasonable default catalog for this platform's own services. Real
    /// deployments load their catalog from configuration (§10.3) rather
    /// than relying on this default.
    fn default() -> Self {
        Self::new([
            "financial-scrapper-service",
            "order-gateway-service",
            "wallet-ledger-service",
            "notification-service",
            "market-data-service",
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_contains_known_names() {
        let catalog = ServiceCatalog::default();
        assert!(catalog.contains("financial-scrapper-service"));
        assert!(!catalog.contains("made-up-service"));
    }
}
