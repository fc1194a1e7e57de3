//! Decoding parameters for text generation

/// Default cap on generated tokens
pub const DEFAULT_MAX_TOKENS: u32 = 768;

/// Decoding parameters passed with every generation request
///
/// `temperature == 0.0` asks the provider for greedy-leaning decoding. The
/// provider may still be nondeterministic, so callers must never assume a
/// retried prompt produces identical output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature (0.0 = deterministic-leaning)
    pub temperature: f32,

    /// Hard cap on generated length
    pub max_tokens: u32,
}

impl GenerationParams {
    /// Create parameters with explicit values
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }

    /// Greedy decoding with the given token cap
    pub fn deterministic(max_tokens: u32) -> Self {
        Self::new(0.0, max_tokens)
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::deterministic(DEFAULT_MAX_TOKENS)
    }
}
