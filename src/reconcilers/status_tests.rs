// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        Condition, ConditionType, OIDCMiddlewareClient, OIDCMiddlewareClientSpec,
        OIDCMiddlewareClientStatus,
    };
    use crate::reconcilers::status::{
        conditions_equal, create_condition, find_condition, is_condition_true,
        status_changed, update_condition_in_memory, with_condition, with_gateway,
    };

    const FIXED_TIME: &str = "2025-01-01T00:00:00+00:00";

    fn client_with_status(status: Option<OIDCMiddlewareClientStatus>) -> OIDCMiddlewareClient {
        let mut client = OIDCMiddlewareClient::new(
            "grafana",
            OIDCMiddlewareClientSpec {
                display_name: None,
                uri: "https://grafana.example.com".to_string(),
                allowed_groups: vec![],
                header_mapping: None,
            },
        );
        client.metadata.namespace = Some("team-a".to_string());
        client.status = status;
        client
    }

    fn fixed(condition_type: &str, status: &str) -> Condition {
        Condition {
            r#type: condition_type.to_string(),
            status: status.to_string(),
            reason: Some("Reason".to_string()),
            message: Some("message".to_string()),
            last_transition_time: Some(FIXED_TIME.to_string()),
        }
    }

    #[test]
    fn test_create_condition_basic() {
        let condition = create_condition(ConditionType::Ready, false, "Pending", "waiting");

        assert_eq!(condition.r#type, "Ready");
        assert_eq!(condition.status, "False");
        assert_eq!(condition.reason.as_deref(), Some("Pending"));
        assert_eq!(condition.message.as_deref(), Some("waiting"));

        let timestamp = condition.last_transition_time.unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());
    }

    #[test]
    fn test_find_condition_by_type() {
        let conditions = vec![fixed("Claimed", "True"), fixed("Ready", "False")];

        let ready = find_condition(&conditions, ConditionType::Ready).unwrap();
        assert_eq!(ready.status, "False");
        assert!(find_condition(&[], ConditionType::Claimed).is_none());
    }

    #[test]
    fn test_is_condition_true() {
        let conditions = vec![fixed("Claimed", "True"), fixed("Ready", "False")];

        assert!(is_condition_true(&conditions, ConditionType::Claimed));
        assert!(!is_condition_true(&conditions, ConditionType::Ready));
        assert!(!is_condition_true(&[], ConditionType::Ready));
    }

    #[test]
    fn test_update_condition_preserves_time_when_status_unchanged() {
        let mut conditions = vec![fixed("Ready", "False")];

        update_condition_in_memory(
            &mut conditions,
            ConditionType::Ready,
            false,
            "StillPending",
            "still waiting",
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].reason.as_deref(), Some("StillPending"));
        assert_eq!(conditions[0].last_transition_time.as_deref(), Some(FIXED_TIME));
    }

    #[test]
    fn test_update_condition_bumps_time_on_transition() {
        let mut conditions = vec![fixed("Ready", "False")];

        update_condition_in_memory(&mut conditions, ConditionType::Ready, true, "Done", "done");

        assert_eq!(conditions[0].status, "True");
        assert_ne!(conditions[0].last_transition_time.as_deref(), Some(FIXED_TIME));
    }

    #[test]
    fn test_update_condition_appends_new_type() {
        let mut conditions = vec![fixed("Claimed", "True")];

        update_condition_in_memory(&mut conditions, ConditionType::Ready, false, "Pending", "");

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].r#type, "Claimed");
        assert_eq!(conditions[1].r#type, "Ready");
    }

    #[test]
    fn test_with_condition_does_not_mutate_input() {
        let client = client_with_status(None);

        let next = with_condition(&client, ConditionType::Claimed, true, "Claimed", "mine");

        assert!(client.status.is_none());
        assert!(is_condition_true(next.conditions(), ConditionType::Claimed));
    }

    #[test]
    fn test_with_condition_replaces_same_type() {
        let client = client_with_status(Some(OIDCMiddlewareClientStatus {
            gateway: Some("gw".to_string()),
            conditions: vec![fixed("Claimed", "True"), fixed("Ready", "False")],
        }));

        let next = with_condition(&client, ConditionType::Ready, true, "Provisioned", "ok");

        assert_eq!(next.conditions().len(), 2);
        assert!(is_condition_true(next.conditions(), ConditionType::Ready));
        assert_eq!(next.gateway(), Some("gw"));
    }

    #[test]
    fn test_conditions_equal_ignores_time_and_order() {
        let mut a = fixed("Claimed", "True");
        a.last_transition_time = None;
        let b = fixed("Ready", "False");

        assert!(conditions_equal(
            &[a.clone(), b.clone()],
            &[b.clone(), fixed("Claimed", "True")]
        ));
        assert!(!conditions_equal(&[a.clone()], &[a.clone(), b.clone()]));
        assert!(!conditions_equal(&[b], &[fixed("Ready", "True")]));
    }

    #[test]
    fn test_with_gateway_sets_owner() {
        let client = client_with_status(None);

        let next = with_gateway(&client, "gw");

        assert_eq!(next.gateway(), Some("gw"));
        assert!(client.gateway().is_none());
    }

    #[test]
    fn test_status_changed_ignores_transition_time() {
        let current = OIDCMiddlewareClientStatus {
            gateway: Some("gw".to_string()),
            conditions: vec![fixed("Claimed", "True")],
        };
        let mut desired = current.clone();
        desired.conditions[0].last_transition_time = Some("2030-01-01T00:00:00+00:00".to_string());

        assert!(!status_changed(Some(&current), &desired));
    }

    #[test]
    fn test_status_changed_detects_gateway_and_conditions() {
        let current = OIDCMiddlewareClientStatus {
            gateway: Some("gw".to_string()),
            conditions: vec![fixed("Claimed", "True")],
        };

        let mut other_gateway = current.clone();
        other_gateway.gateway = Some("gw-2".to_string());
        assert!(status_changed(Some(&current), &other_gateway));

        let mut more_conditions = current.clone();
        more_conditions.conditions.push(fixed("Ready", "False"));
        assert!(status_changed(Some(&current), &more_conditions));

        assert!(status_changed(None, &current));
    }
}
