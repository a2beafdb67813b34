// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `provider/dnsimple/mod.rs`

#[cfg(test)]
mod tests {
    use super::super::fake::{FakeDnsimple, ACCOUNT_ID};
    use super::super::*;
    use crate::dnssd::RecordType;
    use crate::provider::conformance;
    use reqwest::StatusCode;
    use std::sync::Arc;

    fn provider(fake: &Arc<FakeDnsimple>) -> DnsimpleProvider {
        DnsimpleProvider::new(&ACCOUNT_ID.to_string(), fake.clone())
    }

    #[test]
    fn test_identity() {
        let provider = provider(&Arc::new(FakeDnsimple::default()));
        assert_eq!(provider.id(), "dnsimple/1010");
        assert_eq!(provider.describe(), "DNSimple");
    }

    #[tokio::test]
    async fn test_resolves_exact_zone() {
        let fake = Arc::new(FakeDnsimple::with_zone("example.com"));
        let advertiser = provider(&fake)
            .advertiser_by_domain("example.com.")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(advertiser.id(), "1010/example.com");
        assert_eq!(advertiser.zone_name(), "example.com");
    }

    #[tokio::test]
    async fn test_resolves_ancestor_zone() {
        let fake = Arc::new(FakeDnsimple::with_zone("example.com"));
        let advertiser = provider(&fake)
            .advertiser_by_domain("services.Example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(advertiser.id(), "1010/example.com");
    }

    #[tokio::test]
    async fn test_unhosted_domain() {
        let fake = Arc::new(FakeDnsimple::with_zone("example.com"));
        let found = provider(&fake).advertiser_by_domain("example.net").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_transient() {
        let fake = Arc::new(FakeDnsimple::with_zone("example.com"));
        fake.fail_with(StatusCode::BAD_GATEWAY);

        let err = provider(&fake)
            .advertiser_by_domain("example.com")
            .await
            .err()
            .unwrap();
        assert!(err.is_transient());
        assert_eq!(err.status_reason(), "ProviderUnavailable");
    }

    #[tokio::test]
    async fn test_advertiser_by_id() {
        let fake = Arc::new(FakeDnsimple::with_zone("example.com"));
        let advertiser = provider(&fake)
            .advertiser_by_id("1010/example.com")
            .await
            .unwrap();
        assert_eq!(advertiser.zone_name(), "example.com");
    }

    #[tokio::test]
    async fn test_advertiser_by_malformed_id() {
        let fake = Arc::new(FakeDnsimple::with_zone("example.com"));
        for id in ["example.com", "/example.com", "1010/", "2020/example.com"] {
            let err = provider(&fake).advertiser_by_id(id).await.err().unwrap();
            assert!(
                matches!(err, ProviderError::InvalidAdvertiserId(_)),
                "{id}: {err}"
            );
        }
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_advertiser_by_id_for_removed_zone() {
        let fake = Arc::new(FakeDnsimple::with_zone("example.com"));
        let err = provider(&fake)
            .advertiser_by_id("1010/example.org")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::ZoneNotFound { .. }));
    }

    #[tokio::test]
    async fn test_advertiser_conformance() {
        let fake = Arc::new(FakeDnsimple::with_zone("example.com"));
        let advertiser = provider(&fake)
            .advertiser_by_domain("example.com")
            .await
            .unwrap()
            .unwrap();

        conformance::run(advertiser.as_ref(), "example.com").await;

        let ptr = fake.records("example.com", "_http._tcp", RecordType::PTR);
        assert_eq!(ptr.len(), 1);
        assert_eq!(ptr[0].content, "instance-2._http._tcp.example.com");
        assert!(fake
            .records("example.com", "instance-1._http._tcp", RecordType::SRV)
            .is_empty());
    }

    #[tokio::test]
    async fn test_advertiser_conformance_in_subdomain() {
        let fake = Arc::new(FakeDnsimple::with_zone("example.com"));
        let advertiser = provider(&fake)
            .advertiser_by_domain("dev.example.com")
            .await
            .unwrap()
            .unwrap();

        conformance::run(advertiser.as_ref(), "dev.example.com").await;

        let srv = fake.records("example.com", "instance-2._http._tcp.dev", RecordType::SRV);
        assert_eq!(srv.len(), 1);
        assert_eq!(srv[0].content, "0 443 host.dev.example.com");
        assert_eq!(srv[0].priority, Some(0));
    }
}
