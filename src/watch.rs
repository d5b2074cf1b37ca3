// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource watch adapter.
//!
//! Turns the `kube` watcher protocol (`Init` / `InitApply` / `InitDone` / `Apply` /
//! `Delete`) into a stream of typed [`WatchEvent`]s with created, updated and
//! deleted semantics.
//!
//! # Architecture
//!
//! ```text
//! watcher(Api<DynamicObject>)          re-list + watch, resumed with backoff
//!        │
//!        ▼
//! EventTracker::observe                 Created / Updated / Deleted
//!        │
//!        ▼
//! decode (DynamicObject -> T)           malformed objects dropped, counted
//!        │
//!        ▼
//! EventFilter::accepts                  out-of-scope objects dropped
//! ```
//!
//! Objects are watched as [`DynamicObject`]s and decoded per event so that a single
//! malformed object fails only its own event instead of the whole list.

use crate::constants::KIND_OIDC_MIDDLEWARE_CLIENT;
use crate::crd::OIDCMiddlewareClient;
use crate::errors::DecodeError;
use crate::filter::EventFilter;
use crate::metrics;
use futures::{future, stream, Stream, StreamExt};
use kube::api::DynamicObject;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, ResourceExt};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// A typed change notification for one object.
#[derive(Clone, Debug, PartialEq)]
pub enum WatchEvent<K> {
    /// First sighting of the object.
    Created(K),
    /// Any later sighting, including re-deliveries of an unchanged object.
    Updated(K),
    /// The object is gone. Carries its last known state.
    Deleted(K),
}

impl<K> WatchEvent<K> {
    /// The object carried by the event.
    pub fn object(&self) -> &K {
        match self {
            WatchEvent::Created(obj) | WatchEvent::Updated(obj) | WatchEvent::Deleted(obj) => obj,
        }
    }

    /// Lowercase event name, used for logging and metrics labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            WatchEvent::Created(_) => "created",
            WatchEvent::Updated(_) => "updated",
            WatchEvent::Deleted(_) => "deleted",
        }
    }

    /// Convert the carried object, keeping the event kind.
    ///
    /// # Errors
    ///
    /// Returns the conversion error unchanged.
    pub fn try_map<U, E>(self, f: impl FnOnce(K) -> Result<U, E>) -> Result<WatchEvent<U>, E> {
        Ok(match self {
            WatchEvent::Created(obj) => WatchEvent::Created(f(obj)?),
            WatchEvent::Updated(obj) => WatchEvent::Updated(f(obj)?),
            WatchEvent::Deleted(obj) => WatchEvent::Deleted(f(obj)?),
        })
    }
}

/// `namespace/name` key of an object.
pub fn object_key<K: ResourceExt>(obj: &K) -> String {
    match obj.namespace() {
        Some(namespace) => format!("{namespace}/{}", obj.name_any()),
        None => obj.name_any(),
    }
}

/// Classifies raw watcher events against the set of objects seen so far.
#[derive(Debug)]
pub struct EventTracker<K> {
    known: HashMap<String, K>,
    relist: Option<HashSet<String>>,
}

impl<K> Default for EventTracker<K> {
    fn default() -> Self {
        Self {
            known: HashMap::new(),
            relist: None,
        }
    }
}

impl<K: ResourceExt + Clone> EventTracker<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently known.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Translate one watcher event into zero or more typed events.
    pub fn observe(&mut self, event: watcher::Event<K>) -> Vec<WatchEvent<K>> {
        match event {
            watcher::Event::Init => {
                self.relist = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(obj) => {
                if let Some(seen) = self.relist.as_mut() {
                    seen.insert(object_key(&obj));
                }
                self.apply(obj)
            }
            watcher::Event::Apply(obj) => self.apply(obj),
            watcher::Event::Delete(obj) => {
                self.known.remove(&object_key(&obj));
                vec![WatchEvent::Deleted(obj)]
            }
            watcher::Event::InitDone => self.finish_relist(),
        }
    }

    fn apply(&mut self, obj: K) -> Vec<WatchEvent<K>> {
        let key = object_key(&obj);
        match self.known.insert(key, obj.clone()) {
            None => vec![WatchEvent::Created(obj)],
            Some(previous) if previous.uid().is_some() && previous.uid() != obj.uid() => {
                // Same name, new object: the old one was deleted while we were not watching
                vec![WatchEvent::Deleted(previous), WatchEvent::Created(obj)]
            }
            Some(_) => vec![WatchEvent::Updated(obj)],
        }
    }

    fn finish_relist(&mut self) -> Vec<WatchEvent<K>> {
        let Some(seen) = self.relist.take() else {
            return Vec::new();
        };

        let mut vanished: Vec<String> = self
            .known
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect();
        vanished.sort();

        vanished
            .into_iter()
            .filter_map(|key| self.known.remove(&key))
            .map(WatchEvent::Deleted)
            .collect()
    }
}

/// Watch `api` and yield decoded, filtered events.
///
/// The stream never ends on its own: watch failures are logged, counted and resumed
/// by the watcher's backoff.
pub fn watch_resources<T, D, F>(
    api: Api<DynamicObject>,
    config: watcher::Config,
    decode: D,
    filter: F,
) -> impl Stream<Item = WatchEvent<T>> + Send
where
    T: Send + 'static,
    D: Fn(DynamicObject) -> Result<T, DecodeError> + Send + 'static,
    F: EventFilter<T> + 'static,
{
    translate_events(watcher(api, config).default_backoff(), decode, filter)
}

/// Classify, decode and filter a raw watcher stream.
pub fn translate_events<S, T, D, F>(
    events: S,
    decode: D,
    filter: F,
) -> impl Stream<Item = WatchEvent<T>> + Send
where
    S: Stream<Item = Result<watcher::Event<DynamicObject>, watcher::Error>> + Send + 'static,
    T: Send + 'static,
    D: Fn(DynamicObject) -> Result<T, DecodeError> + Send + 'static,
    F: EventFilter<T> + 'static,
{
    let mut tracker = EventTracker::<DynamicObject>::new();

    events
        .filter_map(|result| {
            future::ready(match result {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(error = %e, "Watch stream failed, resubscribing");
                    metrics::record_error("watch");
                    None
                }
            })
        })
        .flat_map(move |event| stream::iter(tracker.observe(event)))
        .filter_map(move |event| {
            let kind = event.kind();
            let key = object_key(event.object());
            let decoded = match event.try_map(&decode) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!(event = kind, object = %key, error = %e, "Dropping undecodable object");
                    metrics::record_error(e.category());
                    return future::ready(None);
                }
            };

            if !filter.accepts(decoded.object()) {
                debug!(event = kind, object = %key, "Event out of scope, skipping");
                return future::ready(None);
            }

            metrics::record_watch_event(kind);
            future::ready(Some(decoded))
        })
}

/// Decode a watched object into an [`OIDCMiddlewareClient`].
///
/// # Errors
///
/// Returns [`DecodeError`] when the payload does not match the schema, the object has no
/// namespace, or `spec.uri` is not an absolute URL.
pub fn decode_client(obj: DynamicObject) -> Result<OIDCMiddlewareClient, DecodeError> {
    let name = obj
        .metadata
        .name
        .clone()
        .unwrap_or_else(|| "<unknown>".to_string());

    let value = serde_json::to_value(&obj).map_err(|source| DecodeError::InvalidPayload {
        kind: KIND_OIDC_MIDDLEWARE_CLIENT,
        name: name.clone(),
        source,
    })?;
    let client: OIDCMiddlewareClient =
        serde_json::from_value(value).map_err(|source| DecodeError::InvalidPayload {
            kind: KIND_OIDC_MIDDLEWARE_CLIENT,
            name: name.clone(),
            source,
        })?;

    if client.metadata.name.is_none() {
        return Err(DecodeError::MissingField {
            kind: KIND_OIDC_MIDDLEWARE_CLIENT,
            name,
            field: "name",
        });
    }
    let Some(namespace) = client.namespace() else {
        return Err(DecodeError::MissingField {
            kind: KIND_OIDC_MIDDLEWARE_CLIENT,
            name,
            field: "namespace",
        });
    };

    if let Err(source) = url::Url::parse(&client.spec.uri) {
        return Err(DecodeError::InvalidUri {
            namespace,
            name,
            uri: client.spec.uri.clone(),
            source,
        });
    }

    Ok(client)
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod watch_tests;
