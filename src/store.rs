// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! De-dup store of provisioned clients.
//!
//! The identity provider looks clients up by client id. The owning gateway mirrors
//! every provisioned client into this store and removes it when the client is
//! deleted. The store is never consulted to decide ownership; `status.gateway` on the
//! custom resource is the only source of truth for that.
//!
//! # Backends
//!
//! - [`RedisClientStore`] - JSON values under `oidc:Client:<clientId>`, shared by all
//!   gateway replicas
//! - [`MemoryClientStore`] - process-local map, used when no Redis URI is configured

use crate::constants::CLIENT_STORE_KEY_PREFIX;
use crate::crd::{HeaderMapping, OIDCMiddlewareClient};
use crate::errors::StoreError;
use async_trait::async_trait;
use kube::ResourceExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Snapshot of a client as seen by the identity provider.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub client_id: String,
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub allowed_groups: Vec<String>,
    pub header_mapping: HeaderMapping,
    /// Gateway that provisioned the client
    pub gateway: String,
}

impl ClientRecord {
    /// Build the record for `client` as provisioned by `gateway`.
    #[must_use]
    pub fn from_client(client: &OIDCMiddlewareClient, gateway: &str) -> Self {
        Self {
            client_id: client.client_id(),
            namespace: client.namespace().unwrap_or_default(),
            name: client.name_any(),
            display_name: client.spec.display_name.clone(),
            uri: client.spec.uri.clone(),
            allowed_groups: client.spec.allowed_groups.clone(),
            header_mapping: client.header_mapping(),
            gateway: gateway.to_string(),
        }
    }
}

/// Key/value mirror of provisioned clients, keyed by client id.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Look up a client record.
    async fn find(&self, client_id: &str) -> Result<Option<ClientRecord>, StoreError>;

    /// Insert or overwrite a client record.
    async fn upsert(&self, client_id: &str, record: &ClientRecord) -> Result<(), StoreError>;

    /// Remove a client record. Removing an absent record is not an error.
    async fn destroy(&self, client_id: &str) -> Result<(), StoreError>;
}

/// Storage key for a client id.
#[must_use]
pub fn store_key(client_id: &str) -> String {
    format!("{CLIENT_STORE_KEY_PREFIX}{client_id}")
}

/// Redis-backed store shared by all gateway replicas.
#[derive(Clone)]
pub struct RedisClientStore {
    connection: ConnectionManager,
}

impl RedisClientStore {
    /// Connect to the Redis server at `uri` (e.g. `redis://redis:6379/0`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the URI is invalid or the server is unreachable.
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(uri)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl ClientStore for RedisClientStore {
    async fn find(&self, client_id: &str) -> Result<Option<ClientRecord>, StoreError> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.get(store_key(client_id)).await?;

        value
            .map(|json| {
                serde_json::from_str(&json).map_err(|source| StoreError::Serialization {
                    client_id: client_id.to_string(),
                    source,
                })
            })
            .transpose()
    }

    async fn upsert(&self, client_id: &str, record: &ClientRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record).map_err(|source| StoreError::Serialization {
            client_id: client_id.to_string(),
            source,
        })?;

        let mut connection = self.connection.clone();
        let () = connection.set(store_key(client_id), json).await?;
        debug!(client_id = %client_id, "Upserted client record in Redis");
        Ok(())
    }

    async fn destroy(&self, client_id: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let () = connection.del(store_key(client_id)).await?;
        debug!(client_id = %client_id, "Removed client record from Redis");
        Ok(())
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryClientStore {
    records: RwLock<HashMap<String, ClientRecord>>,
}

impl MemoryClientStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn find(&self, client_id: &str) -> Result<Option<ClientRecord>, StoreError> {
        Ok(self.records.read().await.get(&store_key(client_id)).cloned())
    }

    async fn upsert(&self, client_id: &str, record: &ClientRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(store_key(client_id), record.clone());
        Ok(())
    }

    async fn destroy(&self, client_id: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(&store_key(client_id));
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
