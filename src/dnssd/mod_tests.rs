// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `dnssd/mod.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::DNSSDServiceInstanceSpec;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn instance() -> ServiceInstance {
        ServiceInstance {
            name: "web".to_string(),
            service_type: "_http._tcp".to_string(),
            domain: "example.com".to_string(),
            target_host: "host.example.com".to_string(),
            target_port: 8080,
            priority: 10,
            weight: 20,
            attributes: vec![],
            ttl: Duration::from_secs(60),
        }
    }

    fn spec() -> DNSSDServiceInstanceSpec {
        DNSSDServiceInstanceSpec {
            name: "web".to_string(),
            service: "_http._tcp".to_string(),
            domain: "example.com".to_string(),
            target_host: "host.example.com".to_string(),
            target_port: 8080,
            priority: 0,
            weight: 0,
            attributes: vec![],
            ttl: None,
        }
    }

    #[test]
    fn test_instance_and_enumeration_names() {
        let instance = instance();
        assert_eq!(instance.instance_name(), "web._http._tcp.example.com");
        assert_eq!(instance.enumeration_domain(), "_http._tcp.example.com");
    }

    #[test]
    fn test_names_strip_trailing_dot_from_domain() {
        let mut instance = instance();
        instance.domain = "example.com.".to_string();
        assert_eq!(instance.instance_name(), "web._http._tcp.example.com");
    }

    #[test]
    fn test_escape_instance_label() {
        assert_eq!(escape_instance_label("Office Printer"), "Office\\032Printer");
        assert_eq!(escape_instance_label("a.b"), "a\\.b");
        assert_eq!(escape_instance_label("back\\slash"), "back\\\\slash");
        assert_eq!(escape_instance_label("Café"), "Caf\\195\\169");
        assert_eq!(escape_instance_label("plain-label_1"), "plain-label_1");
    }

    #[test]
    fn test_attributes_encode_flags_and_pairs_in_order() {
        let attrs = Attributes::new()
            .with_pair("path", b"/api")
            .with_flag("secure")
            .with_pair("empty", b"");

        assert_eq!(
            attrs.to_segments(),
            vec![b"path=/api".to_vec(), b"secure".to_vec(), b"empty=".to_vec()]
        );
    }

    #[test]
    fn test_validate_accepts_well_formed_instance() {
        assert_eq!(instance().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let mut instance = instance();
        instance.name = String::new();
        assert_eq!(
            instance.validate(),
            Err(ValidationError::EmptyField { field: "name" })
        );
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let mut instance = instance();
        instance.target_port = 0;
        assert_eq!(instance.validate(), Err(ValidationError::InvalidPort));
    }

    #[test]
    fn test_validate_rejects_bad_service_types() {
        for bad in ["http._tcp", "_http._sctp", "_http", "__._tcp", "_h.t._tcp", "_averyveryverylongname._tcp"] {
            let mut instance = instance();
            instance.service_type = bad.to_string();
            assert!(
                matches!(
                    instance.validate(),
                    Err(ValidationError::InvalidServiceType(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_invalid_domain() {
        let mut instance = instance();
        instance.domain = "bad..example.com".to_string();
        assert!(matches!(
            instance.validate(),
            Err(ValidationError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_attribute_key() {
        let mut instance = instance();
        instance.attributes = vec![Attributes::new().with_pair("a=b", b"c")];
        assert_eq!(
            instance.validate(),
            Err(ValidationError::InvalidAttributeKey("a=b".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_oversized_attribute() {
        let mut instance = instance();
        instance.attributes = vec![Attributes::new().with_pair("k", &[b'x'; 254])];
        assert_eq!(
            instance.validate(),
            Err(ValidationError::AttributeTooLong {
                key: "k".to_string(),
                len: 256
            })
        );
    }

    #[test]
    fn test_from_spec_defaults_ttl() {
        let instance = ServiceInstance::try_from(&spec()).unwrap();
        assert_eq!(instance.ttl, Duration::from_secs(60));

        let mut zero = spec();
        zero.ttl = Some(0);
        let instance = ServiceInstance::try_from(&zero).unwrap();
        assert_eq!(instance.ttl_secs(), 60);

        let mut custom = spec();
        custom.ttl = Some(300);
        let instance = ServiceInstance::try_from(&custom).unwrap();
        assert_eq!(instance.ttl_secs(), 300);
    }

    #[test]
    fn test_from_spec_empty_value_becomes_flag() {
        let mut spec = spec();
        spec.attributes = vec![BTreeMap::from([
            ("color".to_string(), String::new()),
            ("rp".to_string(), "ipp/print".to_string()),
        ])];

        let instance = ServiceInstance::try_from(&spec).unwrap();
        assert_eq!(
            instance.attributes,
            vec![Attributes::new().with_flag("color").with_pair("rp", b"ipp/print")]
        );
    }

    #[test]
    fn test_from_spec_propagates_validation_error() {
        let mut spec = spec();
        spec.target_host = String::new();
        assert_eq!(
            ServiceInstance::try_from(&spec),
            Err(ValidationError::EmptyField {
                field: "targetHost"
            })
        );
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("Example.COM.").unwrap(), "example.com");
        assert_eq!(normalize_domain(" example.com ").unwrap(), "example.com");
        assert!(normalize_domain("").is_err());
        assert!(normalize_domain(".").is_err());
    }

    #[test]
    fn test_domain_ancestors_most_specific_first() {
        assert_eq!(
            domain_ancestors("A.Example.COM.").unwrap(),
            vec!["a.example.com", "example.com", "com"]
        );
    }

    #[test]
    fn test_names_equal_ignores_case_and_trailing_dot() {
        assert!(names_equal("Host.Example.com.", "host.example.com"));
        assert!(!names_equal("host.example.com", "host.example.org"));
    }

    #[test]
    fn test_relative_name() {
        assert_eq!(
            relative_name("_http._tcp.example.com", "example.com").as_deref(),
            Some("_http._tcp")
        );
        assert_eq!(
            relative_name("web._http._tcp.Example.com.", "example.com").as_deref(),
            Some("web._http._tcp")
        );
        assert_eq!(relative_name("example.com", "example.com").as_deref(), Some(""));
        assert_eq!(relative_name("xexample.com", "example.com"), None);
        assert_eq!(relative_name("example.org", "example.com"), None);
        assert_eq!(relative_name("web\\.example.com", "example.com"), None);
    }

    #[test]
    fn test_fqdn_appends_single_dot() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
    }
}
