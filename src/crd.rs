// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for OIDC middleware clients.
//!
//! # Resource Types
//!
//! - [`OIDCMiddlewareClient`] - A downstream application protected by the gateway
//!   through a Traefik forward-auth middleware
//!
//! The Traefik `Middleware` kind is not owned by this crate. Its group and version
//! are configurable, so it is handled as a dynamic object; [`MiddlewareSpec`] only
//! describes the part of its spec the operator writes.
//!
//! # Example: Declaring a client
//!
//! ```rust,no_run
//! use oidc_gateway_operator::crd::{HeaderMapping, OIDCMiddlewareClient, OIDCMiddlewareClientSpec};
//!
//! let client = OIDCMiddlewareClient::new(
//!     "grafana",
//!     OIDCMiddlewareClientSpec {
//!         display_name: Some("Grafana".to_string()),
//!         uri: "https://grafana.example.com".to_string(),
//!         allowed_groups: vec!["codemowers:admins".to_string()],
//!         header_mapping: Some(HeaderMapping::default()),
//!     },
//! );
//! ```

use crate::constants::{
    DEFAULT_EMAIL_HEADER, DEFAULT_GROUPS_HEADER, DEFAULT_NAME_HEADER, DEFAULT_USER_HEADER,
};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the identity headers the gateway returns to the reverse proxy.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMapping {
    /// Header carrying the authenticated user identifier.
    #[serde(default = "default_user_header")]
    pub user: String,

    /// Header carrying the user's display name.
    #[serde(default = "default_name_header")]
    pub name: String,

    /// Header carrying the user's e-mail address.
    #[serde(default = "default_email_header")]
    pub email: String,

    /// Header carrying the comma separated group list.
    #[serde(default = "default_groups_header")]
    pub groups: String,
}

fn default_user_header() -> String {
    DEFAULT_USER_HEADER.to_string()
}

fn default_name_header() -> String {
    DEFAULT_NAME_HEADER.to_string()
}

fn default_email_header() -> String {
    DEFAULT_EMAIL_HEADER.to_string()
}

fn default_groups_header() -> String {
    DEFAULT_GROUPS_HEADER.to_string()
}

impl Default for HeaderMapping {
    fn default() -> Self {
        Self {
            user: default_user_header(),
            name: default_name_header(),
            email: default_email_header(),
            groups: default_groups_header(),
        }
    }
}

impl HeaderMapping {
    /// Header names in the order they are forwarded to the upstream application.
    #[must_use]
    pub fn header_names(&self) -> Vec<String> {
        vec![
            self.user.clone(),
            self.name.clone(),
            self.email.clone(),
            self.groups.clone(),
        ]
    }
}

/// `OIDCMiddlewareClient` declares an application that sits behind the gateway.
///
/// Exactly one gateway replica claims each client by writing its identity into
/// `status.gateway`; that replica provisions the matching Traefik middleware.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "codemowers.cloud",
    version = "v1beta1",
    kind = "OIDCMiddlewareClient",
    namespaced,
    shortname = "omc",
    derive = "PartialEq",
    doc = "OIDCMiddlewareClient declares an application protected by the OIDC gateway. The owning gateway replica provisions a Traefik forward-auth Middleware with the same name and namespace.",
    printcolumn = r#"{"name":"Gateway","type":"string","jsonPath":".status.gateway"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[kube(status = "OIDCMiddlewareClientStatus")]
#[serde(rename_all = "camelCase")]
pub struct OIDCMiddlewareClientSpec {
    /// Human readable name shown on the consent screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Absolute URL of the protected application.
    pub uri: String,

    /// Groups allowed through the middleware. Empty means any authenticated user.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_groups: Vec<String>,

    /// Forwarded identity header names. Defaults to the `Remote-*` headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_mapping: Option<HeaderMapping>,
}

/// `OIDCMiddlewareClient` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OIDCMiddlewareClientStatus {
    /// Identity of the gateway replica that owns this client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    /// Reconciliation conditions, at most one per type.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition: Claimed or Ready.
    pub r#type: String,

    /// Status of the condition: True or False.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Condition types written by the claim coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConditionType {
    /// The client is owned by the gateway named in `status.gateway`.
    Claimed,
    /// The middleware is provisioned and the client is usable by the identity provider.
    Ready,
}

impl ConditionType {
    /// Wire name of the condition type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ConditionType::Claimed => "Claimed",
            ConditionType::Ready => "Ready",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OIDCMiddlewareClient {
    /// External key of the client: `<namespace>-<name>`.
    #[must_use]
    pub fn client_id(&self) -> String {
        format!(
            "{}-{}",
            self.namespace().unwrap_or_default(),
            self.name_any()
        )
    }

    /// Gateway identity recorded in status, if any. Empty strings count as unclaimed.
    #[must_use]
    pub fn gateway(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.gateway.as_deref())
            .filter(|gateway| !gateway.is_empty())
    }

    /// Conditions recorded in status.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.conditions.as_slice())
    }

    /// Header mapping with defaults applied.
    #[must_use]
    pub fn header_mapping(&self) -> HeaderMapping {
        self.spec.header_mapping.clone().unwrap_or_default()
    }
}

/// Spec of the Traefik `Middleware` written for each client.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareSpec {
    pub forward_auth: ForwardAuth,
}

/// Traefik `forwardAuth` middleware configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForwardAuth {
    /// Gateway endpoint Traefik asks before forwarding a request.
    pub address: String,

    /// Trust `X-Forwarded-*` headers from the incoming request.
    pub trust_forward_header: bool,

    /// Headers copied from the gateway's response onto the forwarded request.
    pub auth_response_headers: Vec<String>,
}
