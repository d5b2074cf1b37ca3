// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

use kube::{
    api::{Api, DeleteParams, PostParams},
    client::Client,
};
use oidc_gateway_operator::crd::{OIDCMiddlewareClient, OIDCMiddlewareClientSpec};
use serde_json::json;

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Create a test namespace
pub async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<k8s_openapi::api::core::v1::Namespace> = Api::all(client.clone());

    let ns = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": {
                "test": "integration",
                "managed-by": "oidc-gateway-test"
            }
        }
    }))?;

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => {
            println!("Created test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("Test namespace already exists: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Cleanup test namespace
pub async fn cleanup_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<k8s_openapi::api::core::v1::Namespace> = Api::all(client.clone());

    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            println!("Deleted test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            println!("Test namespace already deleted: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Create an `OIDCMiddlewareClient` and return it as stored by the API server
pub async fn create_oidc_client(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<OIDCMiddlewareClient, Box<dyn std::error::Error>> {
    let api: Api<OIDCMiddlewareClient> = Api::namespaced(client.clone(), namespace);

    let mut resource = OIDCMiddlewareClient::new(
        name,
        OIDCMiddlewareClientSpec {
            display_name: Some(name.to_string()),
            uri: format!("https://{name}.example.com"),
            allowed_groups: vec!["admins".to_string()],
            header_mapping: None,
        },
    );
    resource.metadata.namespace = Some(namespace.to_string());

    let created = api.create(&PostParams::default(), &resource).await?;
    println!("Created OIDCMiddlewareClient: {namespace}/{name}");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a Kubernetes cluster"]
    async fn test_get_kube_client() {
        let client = get_kube_client_or_skip().await;
        if client.is_some() {
            println!("Successfully connected to Kubernetes cluster");
        }
    }
}
