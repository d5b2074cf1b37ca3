// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for reconciler tests.
//!
//! [`FakeCluster`] keeps clients and middlewares in memory and enforces the same
//! resource version precondition on status writes that the API server does, so
//! several coordinators can race against one instance.

use crate::cluster::ClusterApi;
use crate::constants::{DEFAULT_MIDDLEWARE_API_GROUP, DEFAULT_MIDDLEWARE_API_VERSION};
use crate::crd::{OIDCMiddlewareClient, OIDCMiddlewareClientSpec, OIDCMiddlewareClientStatus};
use crate::errors::{ClusterError, StatusPatchError};
use crate::reconcilers::middleware::GatewayRouting;
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::Mutex;

pub const TEST_NAMESPACE: &str = "team-a";

pub fn sample_client(name: &str) -> OIDCMiddlewareClient {
    let mut client = OIDCMiddlewareClient::new(
        name,
        OIDCMiddlewareClientSpec {
            display_name: Some(format!("{name} app")),
            uri: format!("https://{name}.example.com"),
            allowed_groups: vec!["admins".to_string()],
            header_mapping: None,
        },
    );
    client.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    client.metadata.uid = Some(format!("uid-{name}"));
    client
}

pub fn middleware_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(
            DEFAULT_MIDDLEWARE_API_GROUP,
            DEFAULT_MIDDLEWARE_API_VERSION,
            "Middleware",
        ),
        "middlewares",
    )
}

pub fn routing() -> GatewayRouting {
    GatewayRouting {
        deployment: "oidc-gateway".to_string(),
        namespace: "auth".to_string(),
        port: 3000,
    }
}

pub fn kube_api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("fake {reason}"),
        reason: reason.to_string(),
        code,
    })
}

#[derive(Default)]
struct FakeState {
    clients: HashMap<String, OIDCMiddlewareClient>,
    middlewares: HashMap<String, DynamicObject>,
    next_version: u64,
    status_writes: usize,
    status_writes_in_flight: usize,
    peak_status_writes_in_flight: usize,
    middleware_creates: usize,
    middleware_patches: usize,
    fail_middleware: bool,
}

impl FakeState {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// In-memory [`ClusterApi`].
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a client as the API server would, assigning a fresh resource version.
    pub fn insert_client(&self, mut client: OIDCMiddlewareClient) -> OIDCMiddlewareClient {
        let mut state = self.state.lock().unwrap();
        client.metadata.resource_version = Some(state.bump());
        state.clients.insert(
            key(&client.namespace().unwrap_or_default(), &client.name_any()),
            client.clone(),
        );
        client
    }

    pub fn client(&self, name: &str) -> Option<OIDCMiddlewareClient> {
        let state = self.state.lock().unwrap();
        state.clients.get(&key(TEST_NAMESPACE, name)).cloned()
    }

    pub fn middleware(&self, name: &str) -> Option<DynamicObject> {
        let state = self.state.lock().unwrap();
        state.middlewares.get(&key(TEST_NAMESPACE, name)).cloned()
    }

    pub fn set_fail_middleware(&self, fail: bool) {
        self.state.lock().unwrap().fail_middleware = fail;
    }

    pub fn status_writes(&self) -> usize {
        self.state.lock().unwrap().status_writes
    }

    /// Highest number of status writes that were pending at the same time.
    pub fn peak_status_writes_in_flight(&self) -> usize {
        self.state.lock().unwrap().peak_status_writes_in_flight
    }

    pub fn middleware_creates(&self) -> usize {
        self.state.lock().unwrap().middleware_creates
    }

    pub fn middleware_patches(&self) -> usize {
        self.state.lock().unwrap().middleware_patches
    }

    fn middleware_failure(operation: &'static str, middleware: &DynamicObject) -> ClusterError {
        ClusterError::Api {
            operation,
            kind: "Middleware".to_string(),
            namespace: middleware.namespace().unwrap_or_default(),
            name: middleware.name_any(),
            source: kube_api_error(500, "InternalError"),
        }
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn replace_client_status(
        &self,
        client: &OIDCMiddlewareClient,
        expected_version: &str,
        status: &OIDCMiddlewareClientStatus,
    ) -> Result<OIDCMiddlewareClient, StatusPatchError> {
        let namespace = client.namespace().unwrap_or_default();
        let name = client.name_any();

        {
            let mut state = self.state.lock().unwrap();
            state.status_writes_in_flight += 1;
            state.peak_status_writes_in_flight = state
                .peak_status_writes_in_flight
                .max(state.status_writes_in_flight);
        }
        // Let concurrent writers reach this point before the version check.
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        state.status_writes_in_flight -= 1;

        let Some(current) = state.clients.get(&key(&namespace, &name)).cloned() else {
            return Err(StatusPatchError::Api {
                namespace,
                name,
                source: kube_api_error(404, "NotFound"),
            });
        };

        if current.metadata.resource_version.as_deref() != Some(expected_version) {
            return Err(StatusPatchError::Conflict {
                namespace,
                name,
                expected_version: expected_version.to_string(),
            });
        }

        let mut updated = current;
        updated.status = Some(status.clone());
        updated.metadata.resource_version = Some(state.bump());
        state.status_writes += 1;
        state
            .clients
            .insert(key(&namespace, &name), updated.clone());
        Ok(updated)
    }

    async fn get_middleware(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, ClusterError> {
        let state = self.state.lock().unwrap();
        if state.fail_middleware {
            return Err(ClusterError::Api {
                operation: "get",
                kind: "Middleware".to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                source: kube_api_error(500, "InternalError"),
            });
        }
        Ok(state.middlewares.get(&key(namespace, name)).cloned())
    }

    async fn create_middleware(
        &self,
        middleware: &DynamicObject,
    ) -> Result<DynamicObject, ClusterError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_middleware {
            return Err(Self::middleware_failure("create", middleware));
        }
        let mut created = middleware.clone();
        created.metadata.resource_version = Some(state.bump());
        state.middleware_creates += 1;
        state.middlewares.insert(
            key(&middleware.namespace().unwrap_or_default(), &middleware.name_any()),
            created.clone(),
        );
        Ok(created)
    }

    async fn patch_middleware(
        &self,
        middleware: &DynamicObject,
    ) -> Result<DynamicObject, ClusterError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_middleware {
            return Err(Self::middleware_failure("patch", middleware));
        }
        let mut patched = middleware.clone();
        patched.metadata.resource_version = Some(state.bump());
        state.middleware_patches += 1;
        state.middlewares.insert(
            key(&middleware.namespace().unwrap_or_default(), &middleware.name_any()),
            patched.clone(),
        );
        Ok(patched)
    }
}
