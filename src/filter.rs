// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Event scoping predicates for the resource watch.
//!
//! The watch adapter hands every decoded object to an [`EventFilter`] and drops the
//! event when the filter rejects it. The operator scopes events with a
//! [`NamespaceFilter`] when it watches a single namespace, and with [`AcceptAll`]
//! when cluster-wide watching is enabled.
//!
//! # Example
//!
//! ```rust,no_run
//! use oidc_gateway_operator::filter::{EventFilter, NamespaceFilter};
//! use oidc_gateway_operator::crd::OIDCMiddlewareClient;
//!
//! # fn example(client: &OIDCMiddlewareClient) {
//! let filter = NamespaceFilter::new("team-a");
//! if filter.accepts(client) {
//!     // handle the event
//! }
//! # }
//! ```

use kube::ResourceExt;

/// Decides whether an event for `T` is in scope.
pub trait EventFilter<T>: Send + Sync {
    /// True when the event should be delivered.
    fn accepts(&self, object: &T) -> bool;
}

/// Accepts objects whose namespace equals the configured namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceFilter {
    namespace: String,
}

impl NamespaceFilter {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// The namespace this filter accepts.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl<T: ResourceExt> EventFilter<T> for NamespaceFilter {
    fn accepts(&self, object: &T) -> bool {
        object.namespace().as_deref() == Some(self.namespace.as_str())
    }
}

/// Accepts every object.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl<T> EventFilter<T> for AcceptAll {
    fn accepts(&self, _object: &T) -> bool {
        true
    }
}

impl<T, F: EventFilter<T> + ?Sized> EventFilter<T> for Box<F> {
    fn accepts(&self, object: &T) -> bool {
        (**self).accepts(object)
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod filter_tests;
