// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::constants::UNADVERTISE_FINALIZER;
    use crate::crd::{DNSSDServiceInstance, DNSSDServiceInstanceSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    const OTHER_FINALIZER: &str = "example.com/cleanup";

    fn instance(finalizers: Option<Vec<String>>) -> DNSSDServiceInstance {
        DNSSDServiceInstance {
            metadata: ObjectMeta {
                name: Some("printer".to_string()),
                namespace: Some("default".to_string()),
                finalizers,
                ..Default::default()
            },
            spec: DNSSDServiceInstanceSpec {
                name: "Office Printer".to_string(),
                service: "_ipp._tcp".to_string(),
                domain: "example.com".to_string(),
                target_host: "printer.example.com".to_string(),
                target_port: 631,
                priority: 0,
                weight: 0,
                attributes: vec![],
                ttl: None,
            },
            status: None,
        }
    }

    #[test]
    fn test_has_finalizer() {
        assert!(!has_finalizer(&instance(None), UNADVERTISE_FINALIZER));
        assert!(!has_finalizer(
            &instance(Some(vec![OTHER_FINALIZER.to_string()])),
            UNADVERTISE_FINALIZER
        ));
        assert!(has_finalizer(
            &instance(Some(vec![UNADVERTISE_FINALIZER.to_string()])),
            UNADVERTISE_FINALIZER
        ));
    }

    #[test]
    fn test_with_finalizer_appends_once() {
        let added = with_finalizer(None, UNADVERTISE_FINALIZER).unwrap();
        assert_eq!(added, vec![UNADVERTISE_FINALIZER]);

        let existing = vec![OTHER_FINALIZER.to_string()];
        let added = with_finalizer(Some(existing.as_slice()), UNADVERTISE_FINALIZER).unwrap();
        assert_eq!(added, vec![OTHER_FINALIZER, UNADVERTISE_FINALIZER]);

        assert!(with_finalizer(Some(added.as_slice()), UNADVERTISE_FINALIZER).is_none());
    }

    #[test]
    fn test_without_finalizer_keeps_others() {
        let existing = vec![OTHER_FINALIZER.to_string(), UNADVERTISE_FINALIZER.to_string()];
        let removed = without_finalizer(Some(existing.as_slice()), UNADVERTISE_FINALIZER).unwrap();
        assert_eq!(removed, vec![OTHER_FINALIZER]);

        assert!(without_finalizer(Some(removed.as_slice()), UNADVERTISE_FINALIZER).is_none());
        assert!(without_finalizer(None, UNADVERTISE_FINALIZER).is_none());
    }

    #[test]
    fn test_removing_last_finalizer_sends_empty_list() {
        let existing = vec![UNADVERTISE_FINALIZER.to_string()];
        let removed = without_finalizer(Some(existing.as_slice()), UNADVERTISE_FINALIZER).unwrap();

        assert_eq!(
            finalizers_patch(&removed),
            serde_json::json!({ "metadata": { "finalizers": [] } })
        );
    }
}
