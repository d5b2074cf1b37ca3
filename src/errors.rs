// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the claim coordinator and its collaborators.
//!
//! The taxonomy separates the failures the coordinator must tell apart:
//!
//! - a resource version conflict on a status write (another replica committed first),
//!   which is expected and absorbed
//! - transient API, network or store failures, which are logged and left for the next
//!   watch delivery
//! - malformed resource payloads, which fail a single event without stopping the watch
//!
//! Every error exposes a `category()` used as the `error_type` metrics label.

use thiserror::Error;

/// A watched object could not be turned into a domain object.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload did not match the resource schema
    #[error("malformed {kind} payload for {name}: {source}")]
    InvalidPayload {
        /// Kind being decoded
        kind: &'static str,
        /// Object name as reported by the watch, or `<unknown>`
        name: String,
        /// Underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// A required metadata field was absent
    #[error("{kind} {name} is missing metadata field {field}")]
    MissingField {
        /// Kind being decoded
        kind: &'static str,
        /// Object name as reported by the watch, or `<unknown>`
        name: String,
        /// Name of the missing field
        field: &'static str,
    },

    /// `spec.uri` is not an absolute URL
    #[error("{namespace}/{name} has an invalid uri '{uri}': {source}")]
    InvalidUri {
        /// Object namespace
        namespace: String,
        /// Object name
        name: String,
        /// The rejected value
        uri: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },
}

impl DecodeError {
    /// Metrics label for this error.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        "decode"
    }
}

/// Failure writing a client's status subresource.
#[derive(Error, Debug)]
pub enum StatusPatchError {
    /// The object changed since the expected resource version was observed.
    ///
    /// Another writer committed first. Callers cede and stop acting on the client.
    #[error("resource version conflict writing status of {namespace}/{name} (expected {expected_version})")]
    Conflict {
        /// Client namespace
        namespace: String,
        /// Client name
        name: String,
        /// Resource version the write was conditioned on
        expected_version: String,
    },

    /// The snapshot carries no resource version to condition the write on
    #[error("{namespace}/{name} has no resource version, refusing unconditional status write")]
    MissingResourceVersion {
        /// Client namespace
        namespace: String,
        /// Client name
        name: String,
    },

    /// Transport, validation or any other API failure
    #[error("failed to write status of {namespace}/{name}: {source}")]
    Api {
        /// Client namespace
        namespace: String,
        /// Client name
        name: String,
        /// Underlying API error
        #[source]
        source: kube::Error,
    },
}

impl StatusPatchError {
    /// True when the failure means another writer won.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, StatusPatchError::Conflict { .. })
    }

    /// Metrics label for this error.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            StatusPatchError::Conflict { .. } => "conflict",
            StatusPatchError::MissingResourceVersion { .. } => "validation",
            StatusPatchError::Api { .. } => "api",
        }
    }
}

/// Failure reading or writing a derived middleware object.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// The API call failed
    #[error("{operation} {kind} {namespace}/{name} failed: {source}")]
    Api {
        /// Operation attempted (`get`, `create`, `patch`)
        operation: &'static str,
        /// Resource kind
        kind: String,
        /// Object namespace
        namespace: String,
        /// Object name
        name: String,
        /// Underlying API error
        #[source]
        source: kube::Error,
    },

    /// The object handed to the API had no name or namespace
    #[error("{kind} object is missing {field}")]
    IncompleteObject {
        /// Resource kind
        kind: String,
        /// Missing metadata field
        field: &'static str,
    },
}

impl ClusterError {
    /// Metrics label for this error.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            ClusterError::Api { .. } => "api",
            ClusterError::IncompleteObject { .. } => "validation",
        }
    }
}

/// Failure talking to the de-dup store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing Redis server failed or was unreachable
    #[error("client store backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// A stored record could not be encoded or decoded
    #[error("client store record for {client_id} is not valid JSON: {source}")]
    Serialization {
        /// Key of the record
        client_id: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Metrics label for this error.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            StoreError::Backend(_) => "store",
            StoreError::Serialization { .. } => "serialization",
        }
    }
}

/// Failure provisioning a client's middleware.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Reading or writing the middleware failed
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// The computed spec could not be serialized
    #[error("failed to encode middleware spec for {client_id}: {source}")]
    Encode {
        /// Client the spec was computed for
        client_id: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },
}

impl ProvisionError {
    /// Metrics label for this error.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            ProvisionError::Cluster(err) => err.category(),
            ProvisionError::Encode { .. } => "serialization",
        }
    }
}

/// Failure handling one watch event.
///
/// Never terminates the watch loop; the loop logs it and relies on the next
/// delivery to converge.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Status(#[from] StatusPatchError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Metrics label for this error.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            ReconcileError::Status(err) => err.category(),
            ReconcileError::Provision(err) => err.category(),
            ReconcileError::Store(err) => err.category(),
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
