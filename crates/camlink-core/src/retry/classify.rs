//! Classify errors as retryable by signature match against their text.

/// Signature patterns considered transient by default: connection-level
/// failures plus the retryable 5xx family. Matched case-insensitively as
/// substrings of the error's `Display` output.
pub const DEFAULT_RETRYABLE_SIGNATURES: &[&str] = &[
    "connection refused",
    "econnrefused",
    "connection reset",
    "econnreset",
    "broken pipe",
    "epipe",
    "timed out",
    "timeout",
    "dns error",
    "failed to lookup address",
    "http 500",
    "http 502",
    "http 503",
    "http 504",
];

/// True if any signature matches the error text (case-insensitive substring).
pub fn is_retryable(signatures: &[String], error_text: &str) -> bool {
    let text = error_text.to_lowercase();
    signatures.iter().any(|sig| text.contains(&sig.to_lowercase()))
}
