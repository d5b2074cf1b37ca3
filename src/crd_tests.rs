// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::constants::{API_GROUP, API_GROUP_VERSION, API_VERSION, KIND_OIDC_MIDDLEWARE_CLIENT};
    use crate::crd::*;
    use kube::{CustomResourceExt, Resource};
    use serde_json::json;

    fn client(namespace: &str, name: &str) -> OIDCMiddlewareClient {
        let mut client = OIDCMiddlewareClient::new(
            name,
            OIDCMiddlewareClientSpec {
                display_name: None,
                uri: "https://app.example.com".to_string(),
                allowed_groups: vec![],
                header_mapping: None,
            },
        );
        client.metadata.namespace = Some(namespace.to_string());
        client
    }

    #[test]
    fn test_crd_identity() {
        assert_eq!(OIDCMiddlewareClient::group(&()), API_GROUP);
        assert_eq!(OIDCMiddlewareClient::version(&()), API_VERSION);
        assert_eq!(OIDCMiddlewareClient::api_version(&()), API_GROUP_VERSION);
        assert_eq!(OIDCMiddlewareClient::kind(&()), KIND_OIDC_MIDDLEWARE_CLIENT);
        assert_eq!(OIDCMiddlewareClient::plural(&()), "oidcmiddlewareclients");
    }

    #[test]
    fn test_crd_is_namespaced_with_status() {
        let crd = OIDCMiddlewareClient::crd();
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.names.short_names, Some(vec!["omc".to_string()]));

        let version = &crd.spec.versions[0];
        assert!(version
            .subresources
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .is_some());
    }

    #[test]
    fn test_client_id_joins_namespace_and_name() {
        assert_eq!(client("team-a", "grafana").client_id(), "team-a-grafana");
    }

    #[test]
    fn test_gateway_treats_empty_as_unclaimed() {
        let mut c = client("team-a", "grafana");
        assert!(c.gateway().is_none());

        c.status = Some(OIDCMiddlewareClientStatus {
            gateway: Some(String::new()),
            conditions: vec![],
        });
        assert!(c.gateway().is_none());

        c.status = Some(OIDCMiddlewareClientStatus {
            gateway: Some("gw-0".to_string()),
            conditions: vec![],
        });
        assert_eq!(c.gateway(), Some("gw-0"));
    }

    #[test]
    fn test_conditions_empty_without_status() {
        assert!(client("team-a", "grafana").conditions().is_empty());
    }

    #[test]
    fn test_spec_deserializes_camel_case() {
        let spec: OIDCMiddlewareClientSpec = serde_json::from_value(json!({
            "displayName": "Grafana",
            "uri": "https://grafana.example.com",
            "allowedGroups": ["admins"],
            "headerMapping": {"user": "X-User"}
        }))
        .unwrap();

        assert_eq!(spec.display_name.as_deref(), Some("Grafana"));
        assert_eq!(spec.allowed_groups, vec!["admins"]);

        let mapping = spec.header_mapping.unwrap();
        assert_eq!(mapping.user, "X-User");
        assert_eq!(mapping.groups, "Remote-Groups");
    }

    #[test]
    fn test_header_mapping_defaults() {
        let names = client("team-a", "grafana").header_mapping().header_names();
        assert_eq!(
            names,
            vec!["Remote-User", "Remote-Name", "Remote-Email", "Remote-Groups"]
        );
    }

    #[test]
    fn test_condition_type_names() {
        assert_eq!(ConditionType::Claimed.as_str(), "Claimed");
        assert_eq!(ConditionType::Ready.to_string(), "Ready");
    }

    #[test]
    fn test_middleware_spec_serializes_traefik_shape() {
        let spec = MiddlewareSpec {
            forward_auth: ForwardAuth {
                address: "http://oidc-gateway.auth.svc.cluster.local:3000/forward-auth/x"
                    .to_string(),
                trust_forward_header: true,
                auth_response_headers: vec!["Remote-User".to_string()],
            },
        };

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "forwardAuth": {
                    "address": "http://oidc-gateway.auth.svc.cluster.local:3000/forward-auth/x",
                    "trustForwardHeader": true,
                    "authResponseHeaders": ["Remote-User"]
                }
            })
        );
    }
}
