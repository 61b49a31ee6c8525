//! Shared error conventions.

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for user-facing failure states.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
