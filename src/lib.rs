// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # OIDC Gateway Operator
//!
//! A Kubernetes operator that runs inside every replica of an OIDC gateway and
//! turns `OIDCMiddlewareClient` resources into Traefik forward-auth middleware.
//!
//! ## Overview
//!
//! Several gateway replicas watch the same resources. Exactly one of them claims
//! each client by writing its identity into `status.gateway` with an optimistic
//! concurrency check on the resource version; losers observe the conflict and back
//! off. The owner then:
//!
//! - Creates or patches the `Middleware` pointing Traefik at the gateway's
//!   forward-auth endpoint
//! - Records the client in the shared de-dup store (Redis or in-memory)
//! - Reports progress through the `Claimed` and `Ready` conditions
//!
//! ## Modules
//!
//! - [`crd`] - The `OIDCMiddlewareClient` custom resource and middleware payload
//! - [`watch`] - Watch stream translated into created/updated/deleted events
//! - [`filter`] - Namespace scoping of watch events
//! - [`reconcilers`] - Claim coordination, status conditions and middleware provisioning
//! - [`cluster`] - Kubernetes API seam used by the reconcilers
//! - [`store`] - De-dup store of claimed clients
//! - [`config`] - Command-line and environment configuration
//! - [`metrics`] - Prometheus metrics and the health endpoint
//!
//! ## Example
//!
//! ```rust,no_run
//! use oidc_gateway_operator::crd::{OIDCMiddlewareClient, OIDCMiddlewareClientSpec};
//!
//! let mut client = OIDCMiddlewareClient::new(
//!     "grafana",
//!     OIDCMiddlewareClientSpec {
//!         display_name: Some("Grafana".to_string()),
//!         uri: "https://grafana.example.com".to_string(),
//!         allowed_groups: vec!["admins".to_string()],
//!         header_mapping: None,
//!     },
//! );
//! client.metadata.namespace = Some("monitoring".to_string());
//!
//! assert_eq!(client.client_id(), "monitoring-grafana");
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod crd;
pub mod errors;
pub mod filter;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;
pub mod store;
pub mod watch;

#[cfg(test)]
mod crd_tests;
