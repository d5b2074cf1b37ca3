// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes API seam used by the claim coordinator and the middleware provisioner.
//!
//! [`ClusterApi`] narrows the API server down to the four calls the operator makes.
//! [`KubeClusterApi`] implements it on top of a `kube::Client`; tests substitute an
//! in-memory fake to drive concurrent replicas deterministically.
//!
//! # Optimistic Concurrency
//!
//! Status writes are merge patches of the status subresource that carry
//! `metadata.resourceVersion`. The API server rejects the write with HTTP 409 when the
//! object changed since that version was observed, which surfaces as
//! [`StatusPatchError::Conflict`]. This is the only mechanism that arbitrates
//! ownership between gateway replicas.
//!
//! Middleware writes are not version guarded.

use crate::constants::{FIELD_MANAGER, KIND_MIDDLEWARE};
use crate::crd::{OIDCMiddlewareClient, OIDCMiddlewareClientStatus};
use crate::errors::{ClusterError, StatusPatchError};
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Cluster operations the operator depends on.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Replace the status of `client`, conditioned on `expected_version`.
    ///
    /// Returns the object as stored after the write.
    ///
    /// # Errors
    ///
    /// [`StatusPatchError::Conflict`] when the object moved past `expected_version`,
    /// [`StatusPatchError::Api`] for any other failure.
    async fn replace_client_status(
        &self,
        client: &OIDCMiddlewareClient,
        expected_version: &str,
        status: &OIDCMiddlewareClientStatus,
    ) -> Result<OIDCMiddlewareClient, StatusPatchError>;

    /// Fetch a middleware, `None` if it does not exist.
    async fn get_middleware(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, ClusterError>;

    /// Create a middleware.
    async fn create_middleware(&self, middleware: &DynamicObject)
        -> Result<DynamicObject, ClusterError>;

    /// Overwrite the operator-owned fields of an existing middleware.
    async fn patch_middleware(&self, middleware: &DynamicObject)
        -> Result<DynamicObject, ClusterError>;
}

/// [`ClusterApi`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
    middleware_resource: ApiResource,
}

impl KubeClusterApi {
    #[must_use]
    pub fn new(client: Client, middleware_resource: ApiResource) -> Self {
        Self {
            client,
            middleware_resource,
        }
    }

    fn middlewares(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.middleware_resource)
    }

    fn identify(middleware: &DynamicObject) -> Result<(String, String), ClusterError> {
        let name = middleware
            .metadata
            .name
            .clone()
            .ok_or(ClusterError::IncompleteObject {
                kind: KIND_MIDDLEWARE.to_string(),
                field: "name",
            })?;
        let namespace = middleware
            .metadata
            .namespace
            .clone()
            .ok_or(ClusterError::IncompleteObject {
                kind: KIND_MIDDLEWARE.to_string(),
                field: "namespace",
            })?;
        Ok((namespace, name))
    }

    fn api_error(
        operation: &'static str,
        namespace: &str,
        name: &str,
        source: kube::Error,
    ) -> ClusterError {
        ClusterError::Api {
            operation,
            kind: KIND_MIDDLEWARE.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn replace_client_status(
        &self,
        client: &OIDCMiddlewareClient,
        expected_version: &str,
        status: &OIDCMiddlewareClientStatus,
    ) -> Result<OIDCMiddlewareClient, StatusPatchError> {
        let namespace = client.namespace().unwrap_or_default();
        let name = client.name_any();

        if expected_version.is_empty() {
            return Err(StatusPatchError::MissingResourceVersion { namespace, name });
        }

        let api: Api<OIDCMiddlewareClient> = Api::namespaced(self.client.clone(), &namespace);
        let patch = json!({
            "metadata": { "resourceVersion": expected_version },
            "status": status,
        });

        debug!(
            namespace = %namespace,
            name = %name,
            expected_version = %expected_version,
            gateway = ?status.gateway,
            "Writing OIDCMiddlewareClient status"
        );

        match api
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(StatusPatchError::Conflict {
                namespace,
                name,
                expected_version: expected_version.to_string(),
            }),
            Err(source) => Err(StatusPatchError::Api {
                namespace,
                name,
                source,
            }),
        }
    }

    async fn get_middleware(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, ClusterError> {
        match self.middlewares(namespace).get(name).await {
            Ok(middleware) => Ok(Some(middleware)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(Self::api_error("get", namespace, name, e)),
        }
    }

    async fn create_middleware(
        &self,
        middleware: &DynamicObject,
    ) -> Result<DynamicObject, ClusterError> {
        let (namespace, name) = Self::identify(middleware)?;
        self.middlewares(&namespace)
            .create(
                &PostParams {
                    field_manager: Some(FIELD_MANAGER.to_string()),
                    ..PostParams::default()
                },
                middleware,
            )
            .await
            .map_err(|e| Self::api_error("create", &namespace, &name, e))
    }

    async fn patch_middleware(
        &self,
        middleware: &DynamicObject,
    ) -> Result<DynamicObject, ClusterError> {
        let (namespace, name) = Self::identify(middleware)?;
        self.middlewares(&namespace)
            .patch(
                &name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(middleware),
            )
            .await
            .map_err(|e| Self::api_error("patch", &namespace, &name, e))
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
