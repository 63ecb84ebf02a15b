//! Metric names and recorders for authorization decisions.
//!
//! Recording goes through the `metrics` facade; installing an exporter is
//! left to the host application.

use metrics::{counter, describe_counter};
use std::sync::Once;

use crate::rbac::models::{Operation, ResourceId};

pub const AUTHZ_DECISIONS_TOTAL: &str = "lectern_authz_decisions_total";
pub const AUTHZ_INTERNAL_ERRORS_TOTAL: &str = "lectern_authz_internal_errors_total";
pub const ERRORS_TOTAL: &str = "lectern_errors_total";
pub const CACHE_REFRESH_TOTAL: &str = "lectern_permission_cache_refresh_total";

static DESCRIBED: Once = Once::new();

/// Register descriptions with the installed recorder. Safe to call repeatedly.
pub fn describe_metrics() {
    DESCRIBED.call_once(|| {
        describe_counter!(
            AUTHZ_DECISIONS_TOTAL,
            "Authorization decisions by resource, operation and outcome"
        );
        describe_counter!(
            AUTHZ_INTERNAL_ERRORS_TOTAL,
            "Authorization checks that failed internally and were denied"
        );
        describe_counter!(ERRORS_TOTAL, "Errors by code and category");
        describe_counter!(
            CACHE_REFRESH_TOTAL,
            "Permission cache recomputations on user record reads"
        );
    });
}

/// Authorization counters.
pub struct AuthzMetrics;

impl AuthzMetrics {
    pub fn decision(resource: ResourceId, operation: Operation, allowed: bool) {
        counter!(
            AUTHZ_DECISIONS_TOTAL,
            "resource" => resource.as_str(),
            "operation" => operation.as_str(),
            "outcome" => if allowed { "allow" } else { "deny" },
        )
        .increment(1);
    }

    pub fn internal_error(resource: ResourceId) {
        counter!(AUTHZ_INTERNAL_ERRORS_TOTAL, "resource" => resource.as_str()).increment(1);
    }

    pub fn cache_refresh() {
        counter!(CACHE_REFRESH_TOTAL).increment(1);
    }
}
