// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Traefik `Middleware` provisioning.
//!
//! Every claimed client gets a `forwardAuth` middleware with the same name and
//! namespace. Traefik sends each request for the protected route to the gateway's
//! forward-auth endpoint and copies the identity headers from the response onto the
//! upstream request.
//!
//! The spec is a pure function of the client and the gateway's routing identity, so
//! provisioning is idempotent: re-applying an unchanged client yields the same spec.
//! Middlewares are never deleted and carry no owner reference.

use crate::cluster::ClusterApi;
use crate::constants::{CLUSTER_DNS_SUFFIX, FORWARD_AUTH_PATH_PREFIX, KIND_MIDDLEWARE};
use crate::crd::{ForwardAuth, MiddlewareSpec, OIDCMiddlewareClient};
use crate::errors::ProvisionError;
use crate::labels::{
    CLIENT_ID_ANNOTATION, GATEWAY_ANNOTATION, K8S_MANAGED_BY, K8S_PART_OF,
    MANAGED_BY_OIDC_GATEWAY, PART_OF_OIDC_GATEWAY,
};
use crate::metrics;
use kube::api::{ApiResource, DynamicObject};
use kube::ResourceExt;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the gateway serves forward-auth requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayRouting {
    /// Gateway deployment (and service) name
    pub deployment: String,
    /// Namespace the gateway runs in
    pub namespace: String,
    /// Service port
    pub port: u16,
}

impl GatewayRouting {
    /// Forward-auth URL for a client id.
    #[must_use]
    pub fn forward_auth_address(&self, client_id: &str) -> String {
        format!(
            "http://{}.{}.{CLUSTER_DNS_SUFFIX}:{}{FORWARD_AUTH_PATH_PREFIX}/{client_id}",
            self.deployment, self.namespace, self.port
        )
    }
}

/// Compute the middleware spec for a client.
#[must_use]
pub fn build_middleware_spec(
    client: &OIDCMiddlewareClient,
    routing: &GatewayRouting,
) -> MiddlewareSpec {
    MiddlewareSpec {
        forward_auth: ForwardAuth {
            address: routing.forward_auth_address(&client.client_id()),
            trust_forward_header: true,
            auth_response_headers: client.header_mapping().header_names(),
        },
    }
}

/// Creates or updates the middleware of a client.
pub struct MiddlewareProvisioner {
    cluster: Arc<dyn ClusterApi>,
    routing: GatewayRouting,
    resource: ApiResource,
    gateway: String,
}

impl MiddlewareProvisioner {
    #[must_use]
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        routing: GatewayRouting,
        resource: ApiResource,
        gateway: impl Into<String>,
    ) -> Self {
        Self {
            cluster,
            routing,
            resource,
            gateway: gateway.into(),
        }
    }

    /// Routing identity written into every middleware.
    #[must_use]
    pub fn routing(&self) -> &GatewayRouting {
        &self.routing
    }

    /// Build the desired middleware object for a client.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Encode`] if the spec cannot be serialized.
    pub fn desired(&self, client: &OIDCMiddlewareClient) -> Result<DynamicObject, ProvisionError> {
        let client_id = client.client_id();
        let spec = serde_json::to_value(build_middleware_spec(client, &self.routing)).map_err(
            |source| ProvisionError::Encode {
                client_id: client_id.clone(),
                source,
            },
        )?;

        let mut middleware = DynamicObject::new(&client.name_any(), &self.resource)
            .within(&client.namespace().unwrap_or_default())
            .data(json!({ "spec": spec }));

        middleware.metadata.labels = Some(BTreeMap::from([
            (K8S_MANAGED_BY.to_string(), MANAGED_BY_OIDC_GATEWAY.to_string()),
            (K8S_PART_OF.to_string(), PART_OF_OIDC_GATEWAY.to_string()),
        ]));
        middleware.metadata.annotations = Some(BTreeMap::from([
            (CLIENT_ID_ANNOTATION.to_string(), client_id),
            (GATEWAY_ANNOTATION.to_string(), self.gateway.clone()),
        ]));

        Ok(middleware)
    }

    /// Create the middleware if absent, otherwise overwrite it with the desired spec.
    ///
    /// No retry: a failure is returned and the next watch delivery tries again.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] if reading or writing the middleware fails.
    pub async fn ensure(
        &self,
        client: &OIDCMiddlewareClient,
    ) -> Result<DynamicObject, ProvisionError> {
        let namespace = client.namespace().unwrap_or_default();
        let name = client.name_any();
        let desired = self.desired(client)?;

        let existing = self.cluster.get_middleware(&namespace, &name).await?;

        let applied = if existing.is_some() {
            debug!(namespace = %namespace, name = %name, "{KIND_MIDDLEWARE} exists, patching");
            let patched = self.cluster.patch_middleware(&desired).await?;
            metrics::record_middleware_operation("patch");
            info!("Patched {KIND_MIDDLEWARE} {namespace}/{name}");
            patched
        } else {
            debug!(namespace = %namespace, name = %name, "{KIND_MIDDLEWARE} absent, creating");
            let created = self.cluster.create_middleware(&desired).await?;
            metrics::record_middleware_operation("create");
            info!("Created {KIND_MIDDLEWARE} {namespace}/{name}");
            created
        };

        Ok(applied)
    }
}

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod middleware_tests;
