//! Token estimation utilities

/// Characters per token assumed when no divisor is configured.
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Estimate token count as `ceil(chars / divisor)`.
///
/// Counts Unicode scalar values, not bytes. A zero divisor is treated as 1;
/// configuration validation rejects it before it gets here.
pub fn estimate_tokens(text: &str, divisor: usize) -> usize {
    let chars = text.chars().count();
    chars.div_ceil(divisor.max(1))
}
