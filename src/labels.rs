// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants applied to resources created by the operator.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

/// Value for `app.kubernetes.io/managed-by` on derived middleware objects
pub const MANAGED_BY_OIDC_GATEWAY: &str = "oidc-gateway";

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_OIDC_GATEWAY: &str = "oidc-gateway";

// ============================================================================
// Operator-Specific Annotations
// ============================================================================

// Client identifiers and gateway identities may exceed the 63 character
// label value limit, so they are carried as annotations.

/// Annotation carrying the client identifier a middleware was derived from
pub const CLIENT_ID_ANNOTATION: &str = "codemowers.cloud/client-id";

/// Annotation carrying the gateway identity that provisioned a middleware
pub const GATEWAY_ANNOTATION: &str = "codemowers.cloud/gateway";
