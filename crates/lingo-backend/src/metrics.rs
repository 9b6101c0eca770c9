//! Metric names emitted by backend implementations.

/// Wall time of each HTTP translation call.
pub const REQUEST_DURATION_SECONDS: &str = "backend_request_duration_seconds";
/// Failed HTTP translation calls, labelled by `category`.
pub const ERRORS_TOTAL: &str = "backend_errors_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_prefixed_and_snake_case() {
        for name in [REQUEST_DURATION_SECONDS, ERRORS_TOTAL] {
            assert!(name.starts_with("backend_"), "{name}");
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{name}");
        }
    }
}
