//! Error classification logic

/// Derive a standard error class from an HTTP status and, when present,
/// the provider's `error.type`.
///
/// The provider type wins when it is recognized; the status code is the
/// fallback. Classes follow the usual set: `invalid_request`,
/// `authentication`, `permission_denied`, `not_found`, `request_too_large`,
/// `rate_limited`, `server_error`, `overloaded`, `timeout`, `unknown`.
pub(crate) fn class_from_status(status: u16, provider_type: Option<&str>) -> &'static str {
    if let Some(class) = provider_type.and_then(class_from_provider_type) {
        return class;
    }
    match status {
        400 | 422 => "invalid_request",
        401 => "authentication",
        403 => "permission_denied",
        404 => "not_found",
        408 => "timeout",
        413 => "request_too_large",
        429 => "rate_limited",
        503 | 529 => "overloaded",
        500..=599 => "server_error",
        _ => "unknown",
    }
}

fn class_from_provider_type(t: &str) -> Option<&'static str> {
    Some(match t {
        "invalid_request_error" => "invalid_request",
        "authentication_error" => "authentication",
        "permission_error" => "permission_denied",
        "not_found_error" => "not_found",
        "request_too_large" => "request_too_large",
        "rate_limit_error" => "rate_limited",
        "api_error" => "server_error",
        "overloaded_error" => "overloaded",
        "timeout_error" => "timeout",
        _ => return None,
    })
}

/// Transient classes. Reported on the error for the caller's benefit; the
/// bridge itself never retries.
pub(crate) fn is_retryable_class(class: &str) -> bool {
    matches!(
        class,
        "rate_limited" | "overloaded" | "server_error" | "timeout"
    )
}
