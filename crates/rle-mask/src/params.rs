use serde::{Deserialize, Serialize};

/// How a segment whose run lengths do not sum to `height * width` is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SumPolicy {
    /// Reject the segment with [`RleMaskError::MalformedSegment`](crate::RleMaskError).
    #[default]
    Strict,
    /// Ignore runs past the end of the mask; leave uncovered trailing pixels as they were.
    Lenient,
}

/// Options controlling mask decoding.
///
/// Defaults reject any segment whose runs do not cover the mask exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DecodeOptions {
    #[serde(default)]
    pub sum_policy: SumPolicy,
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self {
            sum_policy: SumPolicy::Strict,
        }
    }

    pub fn lenient() -> Self {
        Self {
            sum_policy: SumPolicy::Lenient,
        }
    }
}
