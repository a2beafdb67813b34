// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::dnssd::ValidationError;
    use crate::provider::http::ApiError;
    use reqwest::{Method, StatusCode};

    const STATUS_TRUE: &str = "True";
    const STATUS_FALSE: &str = "False";

    fn target() -> AdvertiserRef {
        AdvertiserRef {
            provider_id: "clouddns/my-project".to_string(),
            provider_description: "Google Cloud DNS".to_string(),
            advertiser_id: "101".to_string(),
        }
    }

    fn ready(status: &DNSSDServiceInstanceStatus) -> &Condition {
        find_condition(&status.conditions, CONDITION_TYPE_READY).unwrap()
    }

    fn api_error(status: StatusCode) -> ProviderError {
        ProviderError::Api {
            operation: "list",
            record_type: "SRV",
            zone: "example.com.".to_string(),
            source: ApiError::Status {
                method: Method::GET,
                url: "https://dns.test/rrsets".to_string(),
                status,
                message: "boom".to_string(),
            },
        }
    }

    #[test]
    fn test_create_condition_basic() {
        let condition = create_condition("Ready", STATUS_TRUE, "InstanceUpdated", "done");

        assert_eq!(condition.r#type, "Ready");
        assert_eq!(condition.status, STATUS_TRUE);
        assert_eq!(condition.reason.as_deref(), Some("InstanceUpdated"));
        assert_eq!(condition.message.as_deref(), Some("done"));
        assert!(condition.last_transition_time.is_some());
    }

    #[test]
    fn test_update_condition_keeps_transition_time_for_same_status() {
        let mut conditions = vec![Condition {
            r#type: "Ready".to_string(),
            status: STATUS_FALSE.to_string(),
            reason: Some("Advertising".to_string()),
            message: Some("old".to_string()),
            last_transition_time: Some("2025-01-01T00:00:00+00:00".to_string()),
        }];

        update_condition_in_memory(&mut conditions, "Ready", STATUS_FALSE, "Unadvertising", "new");
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
        assert_eq!(conditions[0].message.as_deref(), Some("new"));

        update_condition_in_memory(&mut conditions, "Ready", STATUS_TRUE, "InstanceUpdated", "ok");
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn test_conditions_equal_ignores_timestamps() {
        let a = vec![create_condition("Ready", STATUS_TRUE, "R", "m")];
        let mut b = a.clone();
        b[0].last_transition_time = Some("1970-01-01T00:00:00+00:00".to_string());
        assert!(conditions_equal(&a, &b));

        b[0].message = Some("other".to_string());
        assert!(!conditions_equal(&a, &b));
        assert!(!conditions_equal(&a, &[]));
    }

    #[test]
    fn test_pending_clears_provider_identity() {
        let previous = advertised(&target(), AdvertiseResult::InstanceAlreadyAdvertised, Some(1), None);
        let status = pending("example.org", Some(2), Some(&previous));

        assert_eq!(status.status, Some(AdvertisementStatus::Pending));
        assert!(status.provider_id.is_empty());
        assert!(status.advertiser_id.is_empty());
        assert_eq!(status.observed_generation, Some(2));
        assert_eq!(ready(&status).status, STATUS_FALSE);
        assert_eq!(ready(&status).reason.as_deref(), Some("NoProviderForDomain"));
        assert!(status.message.unwrap().contains("example.org"));
    }

    #[test]
    fn test_advertising_is_unknown() {
        let status = advertising(&target(), Some(3), None);
        assert_eq!(status.status, Some(AdvertisementStatus::Advertising));
        assert_eq!(status.provider_id, "clouddns/my-project");
        assert_eq!(ready(&status).status, "Unknown");
    }

    #[test]
    fn test_advertised_reason_follows_result() {
        let cases = [
            (AdvertiseResult::AdvertisedNewInstance, "NewInstanceAdvertised"),
            (AdvertiseResult::UpdatedExistingInstance, "InstanceUpdated"),
            (AdvertiseResult::InstanceAlreadyAdvertised, "InstanceUnchanged"),
        ];

        for (result, reason) in cases {
            let status = advertised(&target(), result, Some(4), None);
            assert_eq!(status.status, Some(AdvertisementStatus::Advertised));
            assert_eq!(status.provider_description, "Google Cloud DNS");
            assert_eq!(status.advertiser_id, "101");
            assert_eq!(ready(&status).status, STATUS_TRUE);
            assert_eq!(ready(&status).reason.as_deref(), Some(reason));
        }
    }

    #[test]
    fn test_advertise_error_uses_error_reason() {
        let status = advertise_error(
            Some(&target()),
            &api_error(StatusCode::TOO_MANY_REQUESTS),
            Some(5),
            None,
        );

        assert_eq!(status.status, Some(AdvertisementStatus::AdvertiseError));
        assert_eq!(ready(&status).reason.as_deref(), Some("ProviderRateLimited"));
        assert!(status.message.unwrap().contains("list SRV"));
    }

    #[test]
    fn test_rejected_instance_keeps_recorded_identity() {
        let previous = advertised(&target(), AdvertiseResult::AdvertisedNewInstance, Some(1), None);
        let error = ProviderError::InvalidInstance(ValidationError::InvalidPort);

        let status = advertise_error(None, &error, Some(2), Some(&previous));

        assert_eq!(status.advertiser_id, "101");
        assert_eq!(status.provider_id, "clouddns/my-project");
        assert_eq!(ready(&status).reason.as_deref(), Some("InvalidInstance"));
    }

    #[test]
    fn test_unadvertise_states_keep_generation() {
        let previous = advertised(&target(), AdvertiseResult::AdvertisedNewInstance, Some(7), None);

        let removing = unadvertising(&target(), Some(&previous));
        assert_eq!(removing.status, Some(AdvertisementStatus::Unadvertising));
        assert_eq!(removing.observed_generation, Some(7));

        let failed = unadvertise_error(&target(), &api_error(StatusCode::BAD_GATEWAY), Some(&removing));
        assert_eq!(failed.status, Some(AdvertisementStatus::UnadvertiseError));
        assert_eq!(ready(&failed).reason.as_deref(), Some("ProviderUnavailable"));

        let done = unadvertised(&target(), "records removed", Some(&failed));
        assert_eq!(done.status, Some(AdvertisementStatus::Unadvertised));
        assert_eq!(done.message.as_deref(), Some("records removed"));
        assert_eq!(done.conditions.len(), 1);
    }

    #[test]
    fn test_recorded_identity() {
        assert!(AdvertiserRef::recorded(None).is_none());

        let pending = pending("example.com", Some(1), None);
        assert!(AdvertiserRef::recorded(Some(&pending)).is_none());

        let advertised = advertised(&target(), AdvertiseResult::AdvertisedNewInstance, Some(1), None);
        assert_eq!(AdvertiserRef::recorded(Some(&advertised)), Some(target()));
    }

    #[test]
    fn test_status_changed() {
        let first = advertised(&target(), AdvertiseResult::InstanceAlreadyAdvertised, Some(1), None);
        let mut again = advertised(&target(), AdvertiseResult::InstanceAlreadyAdvertised, Some(1), Some(&first));
        again.conditions[0].last_transition_time = Some("2030-01-01T00:00:00+00:00".to_string());

        assert!(status_changed(None, &first));
        assert!(!status_changed(Some(&first), &again));

        let next_generation = advertised(&target(), AdvertiseResult::InstanceAlreadyAdvertised, Some(2), Some(&first));
        assert!(status_changed(Some(&first), &next_generation));
    }
}
