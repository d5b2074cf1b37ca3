// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for `OIDCMiddlewareClient` resources.
//!
//! # Reconciliation Architecture
//!
//! Every gateway replica runs the same loop over the shared watch stream:
//!
//! 1. **Claim** - Write this replica's identity into `status.gateway`, guarded by the
//!    observed resource version. The first writer wins, every other replica gets a
//!    conflict and leaves the client alone.
//! 2. **Provision** - On the next update the owner creates or patches the Traefik
//!    `Middleware` and records the client in the de-dup store.
//! 3. **Status** - Progress is reported through the `Claimed` and `Ready` conditions.
//!
//! # Modules
//!
//! - [`oidcmiddlewareclient`] - [`ClaimCoordinator`], the event handler loop
//! - [`middleware`] - [`MiddlewareProvisioner`], the Traefik middleware writer
//! - [`status`] - Pure condition and status helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use oidc_gateway_operator::cluster::KubeClusterApi;
//! use oidc_gateway_operator::reconcilers::{ClaimCoordinator, GatewayRouting, MiddlewareProvisioner};
//! use oidc_gateway_operator::store::MemoryClientStore;
//! use kube::api::{ApiResource, GroupVersionKind};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn example(client: kube::Client) {
//! let resource = ApiResource::from_gvk_with_plural(
//!     &GroupVersionKind::gvk("traefik.io", "v1alpha1", "Middleware"),
//!     "middlewares",
//! );
//! let cluster = Arc::new(KubeClusterApi::new(client, resource.clone()));
//! let routing = GatewayRouting {
//!     deployment: "oidc-gateway".to_string(),
//!     namespace: "auth".to_string(),
//!     port: 3000,
//! };
//! let provisioner = MiddlewareProvisioner::new(cluster.clone(), routing, resource, "oidc-gateway-0");
//! let coordinator = ClaimCoordinator::new(
//!     "oidc-gateway-0",
//!     cluster,
//!     Arc::new(MemoryClientStore::new()),
//!     provisioner,
//!     Duration::from_secs(1),
//! );
//! # }
//! ```

pub mod middleware;
pub mod oidcmiddlewareclient;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use middleware::{GatewayRouting, MiddlewareProvisioner};
pub use oidcmiddlewareclient::{ClaimCoordinator, ClientState, ReconcileOutcome};
