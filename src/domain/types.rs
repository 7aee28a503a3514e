/// Single prediction as returned by the hosted classifier, before any
/// normalization. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub label: String,
    pub score: f64,
}

/// One taxonomy emotion with its confidence in [0, 1]. The only
/// classification shape the rest of the app sees.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEmotion {
    pub emotion: String,
    pub confidence: f64,
}
