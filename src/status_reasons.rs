// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard status condition reasons for `OIDCMiddlewareClient` resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status.
//!
//! # Condition Types
//!
//! - `Claimed` - set to `True` by the replica that owns the client. Never set to `False`.
//! - `Ready` - `False` while the middleware is pending, `True` once the middleware and
//!   the de-dup record are in place. The identity provider only serves clients that
//!   are ready.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   gateway: oidc-gateway-7d9c6
//!   conditions:
//!     - type: Claimed
//!       status: "True"
//!       reason: Claimed
//!       message: "Claimed by gateway oidc-gateway-7d9c6"
//!     - type: Ready
//!       status: "True"
//!       reason: MiddlewareProvisioned
//!       message: "Middleware default/grafana provisioned"
//! ```

/// The client is owned by the gateway recorded in `status.gateway`.
pub const REASON_CLAIMED: &str = "Claimed";

/// The client is claimed but its middleware has not been provisioned yet.
pub const REASON_MIDDLEWARE_PENDING: &str = "MiddlewarePending";

/// The middleware and the de-dup record are in place.
pub const REASON_MIDDLEWARE_PROVISIONED: &str = "MiddlewareProvisioned";

/// Message for the `Claimed` condition.
#[must_use]
pub fn claimed_message(gateway: &str) -> String {
    format!("Claimed by gateway {gateway}")
}

/// Message for `Ready=False` while provisioning is pending.
#[must_use]
pub fn pending_message(gateway: &str) -> String {
    format!("Waiting for gateway {gateway} to provision the middleware")
}

/// Message for `Ready=True`.
#[must_use]
pub fn provisioned_message(namespace: &str, name: &str) -> String {
    format!("Middleware {namespace}/{name} provisioned")
}

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
