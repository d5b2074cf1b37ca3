// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `OIDCMiddlewareClient` resources.
//!
//! This module provides utility functions for creating and managing Kubernetes
//! status conditions following the standard conventions.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (`Claimed` or `Ready`)
//! - `status`: "True" or "False"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed
//!
//! # Example
//!
//! ```rust,no_run
//! use oidc_gateway_operator::crd::ConditionType;
//! use oidc_gateway_operator::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     ConditionType::Claimed,
//!     true,
//!     "Claimed",
//!     "Claimed by gateway oidc-gateway"
//! );
//! assert_eq!(condition.status, "True");
//! ```

use crate::crd::{Condition, ConditionType, OIDCMiddlewareClient, OIDCMiddlewareClientStatus};
use chrono::Utc;

/// Wire value of a boolean condition status.
#[must_use]
pub const fn condition_status(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Create a new condition with the current timestamp.
///
/// # Arguments
///
/// * `condition_type` - The condition type
/// * `status` - `true` for "True", `false` for "False"
/// * `reason` - A programmatic identifier in `CamelCase`
/// * `message` - A human-readable explanation
#[must_use]
pub fn create_condition(
    condition_type: ConditionType,
    status: bool,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.as_str().to_string(),
        status: condition_status(status).to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition(
    conditions: &[Condition],
    condition_type: ConditionType,
) -> Option<&Condition> {
    conditions
        .iter()
        .find(|c| c.r#type == condition_type.as_str())
}

/// True when the condition of the given type is present with status "True".
#[must_use]
pub fn is_condition_true(conditions: &[Condition], condition_type: ConditionType) -> bool {
    find_condition(conditions, condition_type).is_some_and(|c| c.status == condition_status(true))
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// Preserves `lastTransitionTime` if the status hasn't changed, or sets a new
/// timestamp if it has. Conditions of other types are left untouched.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: ConditionType,
    status: bool,
    reason: &str,
    message: &str,
) {
    let status = condition_status(status);

    if let Some(existing) = conditions
        .iter_mut()
        .find(|c| c.r#type == condition_type.as_str())
    {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(Condition {
            r#type: condition_type.as_str().to_string(),
            status: status.to_string(),
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            last_transition_time: Some(Utc::now().to_rfc3339()),
        });
    }
}

/// Return a copy of `client` with the condition applied, replacing any condition of
/// the same type. The input snapshot is not modified.
#[must_use]
pub fn with_condition(
    client: &OIDCMiddlewareClient,
    condition_type: ConditionType,
    status: bool,
    reason: &str,
    message: &str,
) -> OIDCMiddlewareClient {
    let mut next = client.clone();
    let next_status = next.status.get_or_insert_with(OIDCMiddlewareClientStatus::default);
    update_condition_in_memory(
        &mut next_status.conditions,
        condition_type,
        status,
        reason,
        message,
    );
    next
}

/// Compare two condition lists to check if they are semantically equal.
///
/// Ignores `lastTransitionTime` and ordering; compares type, status, reason and message.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        current.iter().any(|curr_cond| {
            curr_cond.r#type == new_cond.r#type
                && curr_cond.status == new_cond.status
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

/// Return a copy of `client` with `status.gateway` set to `gateway`.
#[must_use]
pub fn with_gateway(client: &OIDCMiddlewareClient, gateway: &str) -> OIDCMiddlewareClient {
    let mut next = client.clone();
    next.status
        .get_or_insert_with(OIDCMiddlewareClientStatus::default)
        .gateway = Some(gateway.to_string());
    next
}

/// Check whether `desired` differs semantically from `current`.
///
/// Compares the owning gateway and the conditions, ignoring transition times. A
/// missing current status always counts as a change.
#[must_use]
pub fn status_changed(
    current: Option<&OIDCMiddlewareClientStatus>,
    desired: &OIDCMiddlewareClientStatus,
) -> bool {
    match current {
        None => true,
        Some(current) => {
            current.gateway != desired.gateway
                || !conditions_equal(&current.conditions, &desired.conditions)
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
