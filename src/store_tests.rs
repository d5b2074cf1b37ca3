// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `store.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{HeaderMapping, OIDCMiddlewareClient, OIDCMiddlewareClientSpec};
    use crate::store::{store_key, ClientRecord, ClientStore, MemoryClientStore};

    fn client() -> OIDCMiddlewareClient {
        let mut client = OIDCMiddlewareClient::new(
            "grafana",
            OIDCMiddlewareClientSpec {
                display_name: Some("Grafana".to_string()),
                uri: "https://grafana.example.com".to_string(),
                allowed_groups: vec!["admins".to_string()],
                header_mapping: None,
            },
        );
        client.metadata.namespace = Some("team-a".to_string());
        client
    }

    #[test]
    fn test_store_key_prefix() {
        assert_eq!(store_key("team-a-grafana"), "oidc:Client:team-a-grafana");
    }

    #[test]
    fn test_record_from_client() {
        let record = ClientRecord::from_client(&client(), "gw-1");

        assert_eq!(record.client_id, "team-a-grafana");
        assert_eq!(record.namespace, "team-a");
        assert_eq!(record.name, "grafana");
        assert_eq!(record.display_name.as_deref(), Some("Grafana"));
        assert_eq!(record.allowed_groups, vec!["admins".to_string()]);
        assert_eq!(record.header_mapping, HeaderMapping::default());
        assert_eq!(record.gateway, "gw-1");
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let value = serde_json::to_value(ClientRecord::from_client(&client(), "gw-1")).unwrap();

        assert_eq!(value["clientId"], "team-a-grafana");
        assert_eq!(value["allowedGroups"][0], "admins");
        assert_eq!(value["headerMapping"]["user"], "Remote-User");
    }

    #[tokio::test]
    async fn test_memory_store_upsert_find_destroy() {
        let store = MemoryClientStore::new();
        let record = ClientRecord::from_client(&client(), "gw-1");

        assert!(store.find("team-a-grafana").await.unwrap().is_none());

        store.upsert("team-a-grafana", &record).await.unwrap();
        assert_eq!(
            store.find("team-a-grafana").await.unwrap(),
            Some(record.clone())
        );

        store.destroy("team-a-grafana").await.unwrap();
        assert!(store.find("team-a-grafana").await.unwrap().is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_memory_store_upsert_overwrites() {
        let store = MemoryClientStore::new();
        let first = ClientRecord::from_client(&client(), "gw-1");
        let mut second = first.clone();
        second.uri = "https://grafana2.example.com".to_string();

        store.upsert("team-a-grafana", &first).await.unwrap();
        store.upsert("team-a-grafana", &second).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.find("team-a-grafana").await.unwrap().unwrap().uri,
            "https://grafana2.example.com"
        );
    }

    #[tokio::test]
    async fn test_memory_store_destroy_absent_is_ok() {
        let store = MemoryClientStore::new();
        assert!(store.destroy("missing").await.is_ok());
    }
}
