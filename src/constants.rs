// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the OIDC gateway operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `OIDCMiddlewareClient` CRD
pub const API_GROUP: &str = "codemowers.cloud";

/// API version for the `OIDCMiddlewareClient` CRD
pub const API_VERSION: &str = "v1beta1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "codemowers.cloud/v1beta1";

/// Kind name for `OIDCMiddlewareClient` resource
pub const KIND_OIDC_MIDDLEWARE_CLIENT: &str = "OIDCMiddlewareClient";

/// Default API group of the Traefik `Middleware` CRD
pub const DEFAULT_MIDDLEWARE_API_GROUP: &str = "traefik.io";

/// Default API version of the Traefik `Middleware` CRD
pub const DEFAULT_MIDDLEWARE_API_VERSION: &str = "v1alpha1";

/// Kind name for the Traefik `Middleware` resource
pub const KIND_MIDDLEWARE: &str = "Middleware";

/// Plural resource name for the Traefik `Middleware` resource
pub const MIDDLEWARE_PLURAL: &str = "middlewares";

/// Field manager used for server-side apply of derived resources
pub const FIELD_MANAGER: &str = "oidc-gateway";

// ============================================================================
// Gateway Constants
// ============================================================================

/// Default deployment name of the gateway
pub const DEFAULT_DEPLOYMENT_NAME: &str = "oidc-gateway";

/// Default namespace when `POD_NAMESPACE` is not provided
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default HTTP port the gateway serves forward-auth requests on
pub const DEFAULT_GATEWAY_PORT: u16 = 3000;

/// Path prefix of the forward-auth endpoint on the gateway
pub const FORWARD_AUTH_PATH_PREFIX: &str = "/forward-auth";

/// Cluster DNS suffix used when addressing the gateway service
pub const CLUSTER_DNS_SUFFIX: &str = "svc.cluster.local";

/// Default forwarded header carrying the user identifier
pub const DEFAULT_USER_HEADER: &str = "Remote-User";

/// Default forwarded header carrying the display name
pub const DEFAULT_NAME_HEADER: &str = "Remote-Name";

/// Default forwarded header carrying the e-mail address
pub const DEFAULT_EMAIL_HEADER: &str = "Remote-Email";

/// Default forwarded header carrying the group list
pub const DEFAULT_GROUPS_HEADER: &str = "Remote-Groups";

// ============================================================================
// Reconciliation Timing Constants
// ============================================================================

/// Delay before acting on an update event (1 second).
///
/// A status write that immediately follows creation can transiently 404
/// while the object is still propagating.
pub const UPDATE_SETTLE_DELAY_MILLIS: u64 = 1000;

// ============================================================================
// De-dup Store Constants
// ============================================================================

/// Key prefix for client records in the de-dup store
pub const CLIENT_STORE_KEY_PREFIX: &str = "oidc:Client:";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Thread name for Tokio worker threads
pub const TOKIO_THREAD_NAME: &str = "oidc-gateway-operator";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address (address:port) for the metrics HTTP server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_SERVER_PATH: &str = "/healthz";
