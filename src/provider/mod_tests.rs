// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `provider/mod.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::dnssd::{names_equal, ServiceInstance};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubAdvertiser {
        zone: String,
    }

    #[async_trait]
    impl Advertiser for StubAdvertiser {
        fn id(&self) -> &str {
            &self.zone
        }

        fn zone_name(&self) -> &str {
            &self.zone
        }

        async fn advertise(&self, _: &ServiceInstance) -> Result<ChangeSet, ProviderError> {
            Ok(ChangeSet::default())
        }

        async fn unadvertise(&self, _: &ServiceInstance) -> Result<ChangeSet, ProviderError> {
            Ok(ChangeSet::default())
        }
    }

    struct StubProvider {
        id: String,
        zones: Vec<String>,
        fail: bool,
        lookups: AtomicUsize,
    }

    impl StubProvider {
        fn new(id: &str, zones: &[&str]) -> Self {
            Self {
                id: id.to_string(),
                zones: zones.iter().map(ToString::to_string).collect(),
                fail: false,
                lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn id(&self) -> &str {
            &self.id
        }

        fn describe(&self) -> &str {
            "stub"
        }

        async fn advertiser_by_domain(
            &self,
            domain: &str,
        ) -> Result<Option<Box<dyn Advertiser>>, ProviderError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::UnknownProvider(self.id.clone()));
            }
            Ok(self
                .zones
                .iter()
                .find(|z| names_equal(z, domain))
                .map(|z| Box::new(StubAdvertiser { zone: z.clone() }) as Box<dyn Advertiser>))
        }

        async fn advertiser_by_id(&self, id: &str) -> Result<Box<dyn Advertiser>, ProviderError> {
            Ok(Box::new(StubAdvertiser {
                zone: id.to_string(),
            }))
        }
    }

    #[tokio::test]
    async fn test_first_matching_provider_wins() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(StubProvider::new("a", &["example.org"])),
            Arc::new(StubProvider::new("b", &["example.com"])),
            Arc::new(StubProvider::new("c", &["example.com"])),
        ]);

        let resolved = registry.resolve_domain("example.com").await.unwrap().unwrap();
        assert_eq!(resolved.provider.id(), "b");
        assert_eq!(resolved.advertiser.id(), "example.com");
    }

    #[tokio::test]
    async fn test_no_match_is_none() {
        let registry = ProviderRegistry::new(vec![Arc::new(StubProvider::new("a", &["example.org"]))]);
        assert!(registry.resolve_domain("example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_registry_resolves_nothing() {
        let registry = ProviderRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.resolve_domain("example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_provider_error_stops_lookup() {
        let mut failing = StubProvider::new("a", &[]);
        failing.fail = true;
        let later = Arc::new(StubProvider::new("b", &["example.com"]));

        let registry = ProviderRegistry::new(vec![Arc::new(failing), later.clone()]);

        assert!(registry.resolve_domain("example.com").await.is_err());
        assert_eq!(later.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_get_and_iterate_in_order() {
        let mut registry = ProviderRegistry::new(vec![Arc::new(StubProvider::new("a", &[]))]);
        registry.push(Arc::new(StubProvider::new("b", &[])));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("b").map(|p| p.id().to_string()), Some("b".to_string()));
        assert!(registry.get("missing").is_none());

        let ids: Vec<&str> = registry.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(format!("{registry:?}"), "[\"a\", \"b\"]");
    }
}
