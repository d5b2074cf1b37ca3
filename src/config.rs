// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every option can be given as a command-line flag or through the environment, so
//! the operator can be configured from a Deployment manifest with the downward API:
//!
//! ```yaml
//! env:
//!   - name: GATEWAY_NAME
//!     valueFrom:
//!       fieldRef:
//!         fieldPath: metadata.name
//!   - name: POD_NAMESPACE
//!     valueFrom:
//!       fieldRef:
//!         fieldPath: metadata.namespace
//! ```

use crate::constants::{
    DEFAULT_DEPLOYMENT_NAME, DEFAULT_GATEWAY_PORT, DEFAULT_METRICS_BIND_ADDRESS,
    DEFAULT_MIDDLEWARE_API_GROUP, DEFAULT_MIDDLEWARE_API_VERSION, DEFAULT_NAMESPACE,
    KIND_MIDDLEWARE, MIDDLEWARE_PLURAL, UPDATE_SETTLE_DELAY_MILLIS,
};
use crate::reconcilers::middleware::GatewayRouting;
use clap::Parser;
use kube::api::{ApiResource, GroupVersionKind};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Clone, Debug)]
#[command(name = "oidc-gateway-operator")]
#[command(
    about = "Claims OIDCMiddlewareClient resources for this gateway replica and provisions their Traefik middleware",
    long_about = None
)]
pub struct OperatorConfig {
    /// Identity of this gateway replica. Defaults to the deployment name.
    #[arg(long, env = "GATEWAY_NAME")]
    pub gateway_name: Option<String>,

    /// Gateway deployment (and service) name
    #[arg(long, env = "DEPLOYMENT_NAME", default_value = DEFAULT_DEPLOYMENT_NAME)]
    pub deployment_name: String,

    /// Namespace the gateway runs in
    #[arg(long = "namespace", env = "POD_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Namespace to watch. Defaults to the gateway's own namespace.
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Watch clients in all namespaces
    #[arg(long, env = "CLUSTER_WIDE_WATCH", default_value_t = false)]
    pub cluster_wide_watch: bool,

    /// Port the gateway serves forward-auth requests on
    #[arg(long, env = "GATEWAY_PORT", default_value_t = DEFAULT_GATEWAY_PORT)]
    pub gateway_port: u16,

    /// API group of the Traefik Middleware CRD
    #[arg(long, env = "MIDDLEWARE_API_GROUP", default_value = DEFAULT_MIDDLEWARE_API_GROUP)]
    pub middleware_api_group: String,

    /// API version of the Traefik Middleware CRD
    #[arg(long, env = "MIDDLEWARE_API_VERSION", default_value = DEFAULT_MIDDLEWARE_API_VERSION)]
    pub middleware_api_version: String,

    /// Redis URI of the de-dup store. Without it, records are kept in memory.
    #[arg(long, env = "REDIS_URI")]
    pub redis_uri: Option<String>,

    /// Delay before acting on update events, in milliseconds
    #[arg(long, env = "SETTLE_DELAY_MS", default_value_t = UPDATE_SETTLE_DELAY_MILLIS)]
    pub settle_delay_ms: u64,

    /// Bind address of the metrics and health server
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,
}

impl OperatorConfig {
    /// Identity written into `status.gateway`.
    #[must_use]
    pub fn gateway_identity(&self) -> String {
        self.gateway_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.deployment_name.clone())
    }

    /// Namespace to watch, `None` for all namespaces.
    #[must_use]
    pub fn watch_namespace(&self) -> Option<String> {
        if self.cluster_wide_watch {
            return None;
        }
        Some(
            self.watch_namespace
                .clone()
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| self.namespace.clone()),
        )
    }

    /// API resource of the Traefik `Middleware` kind.
    #[must_use]
    pub fn middleware_api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(
            &GroupVersionKind::gvk(
                &self.middleware_api_group,
                &self.middleware_api_version,
                KIND_MIDDLEWARE,
            ),
            MIDDLEWARE_PLURAL,
        )
    }

    /// Where the gateway serves forward-auth requests.
    #[must_use]
    pub fn routing(&self) -> GatewayRouting {
        GatewayRouting {
            deployment: self.deployment_name.clone(),
            namespace: self.namespace.clone(),
            port: self.gateway_port,
        }
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
