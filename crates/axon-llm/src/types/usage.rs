use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Token usage reported by a provider for one completion turn
///
/// Forms a monoid under element-wise addition with [`TokenUsage::ZERO`] as
/// the identity; the tool loop folds per-turn usage into a running total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt
    #[serde(default)]
    pub input_tokens: u32,
    /// Tokens generated in the completion
    #[serde(default)]
    pub output_tokens: u32,
    /// Tokens served from a provider-side prompt cache
    #[serde(default)]
    pub cache_read_tokens: u32,
    /// Tokens written to a provider-side prompt cache
    #[serde(default)]
    pub cache_write_tokens: u32,
    /// Tokens spent on internal deliberation
    #[serde(default)]
    pub thinking_tokens: u32,
}

impl TokenUsage {
    /// The additive identity
    pub const ZERO: Self = Self {
        input_tokens: 0,
        output_tokens: 0,
        cache_read_tokens: 0,
        cache_write_tokens: 0,
        thinking_tokens: 0,
    };

    /// Total billable tokens: input + output + thinking
    ///
    /// Cache tokens are excluded: providers already report them inside the
    /// input/output figures they bill against.
    pub const fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens + self.thinking_tokens
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            input_tokens: self.input_tokens + rhs.input_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
            cache_read_tokens: self.cache_read_tokens + rhs.cache_read_tokens,
            cache_write_tokens: self.cache_write_tokens + rhs.cache_write_tokens,
            thinking_tokens: self.thinking_tokens + rhs.thinking_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for TokenUsage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}
