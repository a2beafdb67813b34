// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use super::super::*;

    fn parse(args: &[&str]) -> Settings {
        Settings::try_parse_from(std::iter::once("dnssd-operator").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]);

        assert_eq!(settings.metrics_address(), "0.0.0.0:8080");
        assert_eq!(settings.timeouts(), Timeouts::default());
        assert!(settings.build_registry().unwrap().is_empty());
    }

    #[test]
    fn test_providers_are_registered_in_fixed_order() {
        let settings = parse(&[
            "--dnsimple-account-id",
            "1010",
            "--dnsimple-token",
            "secret",
            "--clouddns-project",
            "my-project",
            "--clouddns-access-token",
            "ya29.token",
        ]);

        let registry = settings.build_registry().unwrap();
        let ids: Vec<&str> = registry.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["clouddns/my-project", "dnsimple/1010"]);
    }

    #[test]
    fn test_dnsimple_requires_token() {
        let settings = parse(&["--dnsimple-account-id", "1010"]);
        let err = settings.build_registry().unwrap_err();
        assert!(err.to_string().contains("DNSIMPLE_TOKEN"));
    }

    #[test]
    fn test_clouddns_without_token_uses_metadata_server() {
        let settings = parse(&["--clouddns-project", "my-project", "--clouddns-access-token", " "]);
        assert_eq!(settings.clouddns_token_url, CLOUDDNS_METADATA_TOKEN_URL);

        let tokens = settings.clouddns_token().unwrap();
        assert!(format!("{tokens:?}").starts_with("MetadataToken"));
        assert_eq!(settings.build_registry().unwrap().len(), 1);
    }

    #[test]
    fn test_clouddns_fixed_token_is_not_logged() {
        let settings = parse(&["--clouddns-project", "my-project", "--clouddns-access-token", "ya29.token"]);

        let tokens = settings.clouddns_token().unwrap();
        assert_eq!(format!("{tokens:?}"), "StaticToken(..)");
    }

    #[test]
    fn test_invalid_token_url() {
        let settings = parse(&["--clouddns-project", "my-project", "--clouddns-token-url", "metadata"]);
        let err = settings.build_registry().unwrap_err();
        assert!(format!("{err:#}").contains("CLOUDDNS_TOKEN_URL"));
    }

    #[test]
    fn test_invalid_api_url() {
        let settings = parse(&[
            "--dnsimple-account-id",
            "1010",
            "--dnsimple-token",
            "secret",
            "--dnsimple-api-url",
            "not a url",
        ]);
        let err = settings.build_registry().unwrap_err();
        assert!(format!("{err:#}").contains("DNSimple"));
    }

    #[test]
    fn test_timeouts_from_flags() {
        let settings = parse(&["--advertise-timeout-secs", "90", "--status-timeout-secs", "5"]);
        let timeouts = settings.timeouts();

        assert_eq!(timeouts.advertise, Duration::from_secs(90));
        assert_eq!(timeouts.status_write, Duration::from_secs(5));
    }
}
