// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `OIDCMiddlewareClient` claim coordinator.
//!
//! Every gateway replica runs one coordinator against the same set of clients. The
//! replicas never talk to each other; they race on the status subresource of each
//! client instead. A replica claims an unclaimed client by writing its own identity
//! into `status.gateway` with the resource version it observed. The API server lets
//! exactly one such write through, every other replica gets a conflict and cedes.
//!
//! # State Machine
//!
//! ```text
//!                  claim (expected version)
//!   Unclaimed ─────────────────────────────────▶ ClaimedByMe { ready: false }
//!       │                                              │
//!       │ conflict / foreign echo                      │ update: ensure
//!       ▼                                              │ middleware, upsert store
//!   ClaimedByOther(id)                                 ▼
//!   (never mutated here)                      ClaimedByMe { ready: true }
//!
//!   delete while ClaimedByMe: remove the de-dup record
//! ```
//!
//! # Event Handling
//!
//! - **created**: claim if unclaimed, mark `Ready=False` if already mine but not in
//!   the store, ignore if owned by another replica
//! - **updated**: after the settle delay, claim if unclaimed, provision if mine,
//!   ignore otherwise
//! - **deleted**: remove the de-dup record if mine; the middleware is left in place
//!
//! Every status write sets `gateway` to this replica and `Claimed=True`, and is
//! skipped when the result would equal the current status.

use crate::cluster::ClusterApi;
use crate::crd::{ConditionType, OIDCMiddlewareClient};
use crate::errors::ReconcileError;
use crate::metrics;
use crate::reconcilers::middleware::MiddlewareProvisioner;
use crate::reconcilers::status::{
    is_condition_true, status_changed, with_condition, with_gateway,
};
use crate::status_reasons::{
    claimed_message, pending_message, provisioned_message, REASON_CLAIMED,
    REASON_MIDDLEWARE_PENDING, REASON_MIDDLEWARE_PROVISIONED,
};
use crate::store::{ClientRecord, ClientStore};
use crate::watch::{object_key, WatchEvent};
use futures::{Stream, StreamExt};
use kube::ResourceExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Ownership of a client as seen by this replica.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// No gateway recorded.
    Unclaimed,
    /// Owned by another replica.
    ClaimedByOther(String),
    /// Owned by this replica.
    ClaimedByMe { ready: bool },
}

/// What handling one event did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This replica won the claim.
    Claimed,
    /// Another replica committed first, or the echoed object names another owner.
    ClaimLost,
    /// Already mine on creation, marked `Ready=False` for provisioning.
    MarkedNotReady,
    /// Already mine and present in the store.
    AlreadyReconciled,
    /// Owned by another replica, nothing done.
    OwnedByOther,
    /// Middleware, store record and `Ready=True` are in place.
    Provisioned,
    /// The client changed while this event was handled; a newer event follows.
    Superseded,
    /// De-dup record removed after deletion.
    Purged,
    /// Deletion of a client this replica does not own.
    Ignored,
}

impl ReconcileOutcome {
    /// Metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ReconcileOutcome::Claimed => "claimed",
            ReconcileOutcome::ClaimLost => "claim_lost",
            ReconcileOutcome::MarkedNotReady => "marked_not_ready",
            ReconcileOutcome::AlreadyReconciled => "already_reconciled",
            ReconcileOutcome::OwnedByOther => "owned_by_other",
            ReconcileOutcome::Provisioned => "provisioned",
            ReconcileOutcome::Superseded => "superseded",
            ReconcileOutcome::Purged => "purged",
            ReconcileOutcome::Ignored => "ignored",
        }
    }
}

/// Claims clients for one gateway replica and provisions the ones it owns.
pub struct ClaimCoordinator {
    gateway: String,
    cluster: Arc<dyn ClusterApi>,
    store: Arc<dyn ClientStore>,
    provisioner: MiddlewareProvisioner,
    settle_delay: Duration,
}

impl ClaimCoordinator {
    #[must_use]
    pub fn new(
        gateway: impl Into<String>,
        cluster: Arc<dyn ClusterApi>,
        store: Arc<dyn ClientStore>,
        provisioner: MiddlewareProvisioner,
        settle_delay: Duration,
    ) -> Self {
        Self {
            gateway: gateway.into(),
            cluster,
            store,
            provisioner,
            settle_delay,
        }
    }

    /// Identity of this replica.
    #[must_use]
    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Classify a client against this replica's identity.
    #[must_use]
    pub fn client_state(&self, client: &OIDCMiddlewareClient) -> ClientState {
        match client.gateway() {
            None => ClientState::Unclaimed,
            Some(owner) if owner == self.gateway => ClientState::ClaimedByMe {
                ready: is_condition_true(client.conditions(), ConditionType::Ready),
            },
            Some(owner) => ClientState::ClaimedByOther(owner.to_string()),
        }
    }

    /// Consume watch events one at a time until the stream ends.
    ///
    /// Failures are logged and counted per event; the next delivery of the same
    /// client retries.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = WatchEvent<OIDCMiddlewareClient>>,
    {
        let mut events = std::pin::pin!(events);

        info!(gateway = %self.gateway, "Claim coordinator started");

        while let Some(event) = events.next().await {
            let kind = event.kind();
            let key = object_key(event.object());
            let start = Instant::now();

            match self.handle(event).await {
                Ok(outcome) => {
                    debug!(event = kind, client = %key, outcome = outcome.as_str(), "Event handled");
                    metrics::record_reconciliation(kind, outcome.as_str(), start.elapsed());
                }
                Err(e) => {
                    error!(event = kind, client = %key, error = %e, "Failed to handle event");
                    metrics::record_reconciliation(kind, "error", start.elapsed());
                    metrics::record_error(e.category());
                }
            }
        }

        warn!(gateway = %self.gateway, "Watch stream ended, claim coordinator stopping");
    }

    /// Handle a single watch event.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] for API, store and provisioning failures. Version
    /// conflicts are not errors.
    pub async fn handle(
        &self,
        event: WatchEvent<OIDCMiddlewareClient>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match event {
            WatchEvent::Created(client) => self.on_create(&client).await,
            WatchEvent::Updated(client) => self.on_update(&client).await,
            WatchEvent::Deleted(client) => self.on_delete(&client).await,
        }
    }

    async fn on_create(
        &self,
        client: &OIDCMiddlewareClient,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match self.client_state(client) {
            ClientState::ClaimedByMe { .. } => {
                if self.store.find(&client.client_id()).await?.is_some() {
                    return Ok(ReconcileOutcome::AlreadyReconciled);
                }
                match self.mark_pending(client).await? {
                    Some(_) => Ok(ReconcileOutcome::MarkedNotReady),
                    None => Ok(ReconcileOutcome::Superseded),
                }
            }
            ClientState::Unclaimed => self.claim(client).await,
            ClientState::ClaimedByOther(owner) => {
                debug!(client = %object_key(client), owner = %owner, "Client owned by another gateway");
                Ok(ReconcileOutcome::OwnedByOther)
            }
        }
    }

    async fn on_update(
        &self,
        client: &OIDCMiddlewareClient,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        // Status writes immediately after creation can 404 while the object propagates.
        tokio::time::sleep(self.settle_delay).await;

        match self.client_state(client) {
            ClientState::ClaimedByMe { ready } => {
                if ready {
                    debug!(client = %object_key(client), "Client already ready, re-asserting");
                }
                self.provision(client).await
            }
            ClientState::Unclaimed => self.claim(client).await,
            ClientState::ClaimedByOther(owner) => {
                debug!(client = %object_key(client), owner = %owner, "Client owned by another gateway");
                Ok(ReconcileOutcome::OwnedByOther)
            }
        }
    }

    async fn on_delete(
        &self,
        client: &OIDCMiddlewareClient,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if !matches!(self.client_state(client), ClientState::ClaimedByMe { .. }) {
            return Ok(ReconcileOutcome::Ignored);
        }

        let client_id = client.client_id();
        self.store.destroy(&client_id).await?;
        info!(client_id = %client_id, "Removed de-dup record of deleted client");
        Ok(ReconcileOutcome::Purged)
    }

    async fn claim(
        &self,
        client: &OIDCMiddlewareClient,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(echoed) = self.write_status(client, client.clone(), "claim").await? else {
            return Ok(ReconcileOutcome::ClaimLost);
        };

        if echoed.gateway() != Some(self.gateway.as_str()) {
            info!(
                client = %object_key(client),
                owner = ?echoed.gateway(),
                "Claim echoed with another owner, ceding"
            );
            return Ok(ReconcileOutcome::ClaimLost);
        }

        info!(client = %object_key(client), gateway = %self.gateway, "Claimed client");
        // A conflict here only means the client moved on; the claim itself stands.
        self.mark_pending(&echoed).await?;
        Ok(ReconcileOutcome::Claimed)
    }

    async fn mark_pending(
        &self,
        client: &OIDCMiddlewareClient,
    ) -> Result<Option<OIDCMiddlewareClient>, ReconcileError> {
        let desired = with_condition(
            client,
            ConditionType::Ready,
            false,
            REASON_MIDDLEWARE_PENDING,
            &pending_message(&self.gateway),
        );
        self.write_status(client, desired, "pending").await
    }

    async fn provision(
        &self,
        client: &OIDCMiddlewareClient,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let namespace = client.namespace().unwrap_or_default();
        let name = client.name_any();
        let client_id = client.client_id();

        self.provisioner.ensure(client).await?;

        self.store
            .upsert(&client_id, &ClientRecord::from_client(client, &self.gateway))
            .await?;
        debug!(client_id = %client_id, "Upserted de-dup record");

        let desired = with_condition(
            client,
            ConditionType::Ready,
            true,
            REASON_MIDDLEWARE_PROVISIONED,
            &provisioned_message(&namespace, &name),
        );
        match self.write_status(client, desired, "ready").await? {
            Some(_) => Ok(ReconcileOutcome::Provisioned),
            None => Ok(ReconcileOutcome::Superseded),
        }
    }

    /// Write `desired`'s status, with this replica as owner, conditioned on the
    /// resource version of `observed`.
    ///
    /// Returns the stored object, `observed` itself when nothing changed, or `None`
    /// when another writer committed first.
    async fn write_status(
        &self,
        observed: &OIDCMiddlewareClient,
        desired: OIDCMiddlewareClient,
        stage: &'static str,
    ) -> Result<Option<OIDCMiddlewareClient>, ReconcileError> {
        let desired = with_condition(
            &with_gateway(&desired, &self.gateway),
            ConditionType::Claimed,
            true,
            REASON_CLAIMED,
            &claimed_message(&self.gateway),
        );
        let Some(status) = desired.status.as_ref() else {
            return Ok(Some(observed.clone()));
        };

        if !status_changed(observed.status.as_ref(), status) {
            debug!(client = %object_key(observed), stage, "Status unchanged, skipping write");
            return Ok(Some(observed.clone()));
        }

        let expected_version = observed.resource_version().unwrap_or_default();
        match self
            .cluster
            .replace_client_status(observed, &expected_version, status)
            .await
        {
            Ok(updated) => Ok(Some(updated)),
            Err(e) if e.is_conflict() => {
                debug!(
                    client = %object_key(observed),
                    stage,
                    expected_version = %expected_version,
                    "Status write lost to a concurrent writer"
                );
                metrics::record_claim_conflict(stage);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "oidcmiddlewareclient_tests.rs"]
mod oidcmiddlewareclient_tests;
