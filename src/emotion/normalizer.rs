use std::collections::HashMap;

use thiserror::Error;

use crate::domain::{RawPrediction, ScoredEmotion};

/// Forces a taxonomy outcome when the trigger substring appears in the raw
/// text, bypassing the statistical result. Patches known model blind spots.
#[derive(Debug, Clone)]
pub struct OverrideRule {
    pub trigger: String,
    pub emotion: String,
    pub confidence: f64,
}

/// Static normalization tables, built once from [`AppConfig`] at startup and
/// never mutated afterwards.
///
/// [`AppConfig`]: crate::config::AppConfig
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Raw classifier label (matched case-insensitively) → taxonomy member.
    pub label_map: HashMap<String, String>,
    /// Checked in order; the first matching trigger wins.
    pub overrides: Vec<OverrideRule>,
    /// Taxonomy member used for unmapped labels and for the caller-side
    /// fallback when classification fails outright.
    pub default_emotion: String,
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("classifier output contained no usable prediction")]
    InvalidClassifierOutput,
}

/// Maps heterogeneous classifier output onto the fixed emotion taxonomy.
/// Pure function of (text, predictions, config); no side effects.
pub struct Normalizer {
    label_map: HashMap<String, String>,
    overrides: Vec<OverrideRule>,
    default_emotion: String,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let label_map = config
            .label_map
            .into_iter()
            .map(|(label, emotion)| (label.to_lowercase(), emotion))
            .collect();
        let overrides = config
            .overrides
            .into_iter()
            .map(|mut rule| {
                rule.trigger = rule.trigger.to_lowercase();
                rule
            })
            .collect();
        Self {
            label_map,
            overrides,
            default_emotion: config.default_emotion,
        }
    }

    /// Returns the forced outcome if any override trigger appears in `text`.
    /// Callers may use this to skip the classifier call entirely.
    pub fn override_for(&self, text: &str) -> Option<ScoredEmotion> {
        let lowered = text.to_lowercase();
        self.overrides
            .iter()
            .find(|rule| lowered.contains(&rule.trigger))
            .map(|rule| ScoredEmotion {
                emotion: rule.emotion.clone(),
                confidence: rule.confidence,
            })
    }

    /// Resolves exactly one (emotion, confidence) pair for a submission.
    ///
    /// Overrides win over the statistical result. Otherwise the
    /// highest-scoring prediction is selected (first entry wins ties, in the
    /// order the classifier returned them), its label is looked up
    /// case-insensitively in the mapping table, and unmapped labels fall back
    /// to the default emotion with the original confidence preserved.
    pub fn normalize(
        &self,
        text: &str,
        predictions: &[RawPrediction],
    ) -> Result<ScoredEmotion, NormalizeError> {
        if let Some(hit) = self.override_for(text) {
            return Ok(hit);
        }

        let best = predictions
            .iter()
            .reduce(|best, candidate| {
                if candidate.score > best.score {
                    candidate
                } else {
                    best
                }
            })
            .ok_or(NormalizeError::InvalidClassifierOutput)?;

        // NaN fails this check as well.
        if !(0.0..=1.0).contains(&best.score) {
            return Err(NormalizeError::InvalidClassifierOutput);
        }

        let emotion = match self.label_map.get(&best.label.to_lowercase()) {
            Some(mapped) => mapped.clone(),
            None => {
                tracing::debug!(
                    target: "emotion",
                    label = %best.label,
                    "unmapped classifier label, using default emotion"
                );
                self.default_emotion.clone()
            }
        };

        Ok(ScoredEmotion {
            emotion,
            confidence: best.score,
        })
    }

    /// Outcome callers store when the classifier is unavailable or its output
    /// is invalid: the default emotion with zero confidence.
    pub fn fallback(&self) -> ScoredEmotion {
        ScoredEmotion {
            emotion: self.default_emotion.clone(),
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: &str, score: f64) -> RawPrediction {
        RawPrediction {
            label: label.to_string(),
            score,
        }
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(NormalizerConfig {
            label_map: [("joy".to_string(), "happy".to_string())].into_iter().collect(),
            overrides: vec![OverrideRule {
                trigger: "love".to_string(),
                emotion: "love".to_string(),
                confidence: 1.0,
            }],
            default_emotion: "neutral".to_string(),
        })
    }

    #[test]
    fn override_trigger_wins_over_predictions() {
        let n = normalizer();
        let out = n
            .normalize("I love you so much", &[prediction("anger", 0.99)])
            .unwrap();
        assert_eq!(out.emotion, "love");
        assert_eq!(out.confidence, 1.0);
    }

    #[test]
    fn override_matches_case_insensitively() {
        let n = normalizer();
        let out = n.override_for("LOVE is all you need").unwrap();
        assert_eq!(out.emotion, "love");
    }

    #[test]
    fn selects_maximal_score_and_maps_label() {
        let n = normalizer();
        let out = n
            .normalize(
                "what a day",
                &[prediction("joy", 0.8), prediction("anger", 0.2)],
            )
            .unwrap();
        assert_eq!(out.emotion, "happy");
        assert_eq!(out.confidence, 0.8);
    }

    #[test]
    fn ties_resolve_to_first_entry() {
        let n = normalizer();
        let out = n
            .normalize(
                "hmm",
                &[prediction("joy", 0.5), prediction("anger", 0.5)],
            )
            .unwrap();
        assert_eq!(out.emotion, "happy");
    }

    #[test]
    fn unmapped_label_falls_back_to_default_with_original_confidence() {
        let n = normalizer();
        let out = n
            .normalize("huh", &[prediction("surprise", 0.9)])
            .unwrap();
        assert_eq!(out.emotion, "neutral");
        assert_eq!(out.confidence, 0.9);
    }

    #[test]
    fn label_lookup_is_case_insensitive() {
        let n = normalizer();
        let out = n.normalize("ok", &[prediction("JOY", 0.7)]).unwrap();
        assert_eq!(out.emotion, "happy");
    }

    #[test]
    fn empty_output_is_invalid() {
        let n = normalizer();
        assert!(matches!(
            n.normalize("text", &[]),
            Err(NormalizeError::InvalidClassifierOutput)
        ));
    }

    #[test]
    fn out_of_range_score_is_invalid() {
        let n = normalizer();
        assert!(n.normalize("text", &[prediction("joy", 1.5)]).is_err());
        assert!(n.normalize("text", &[prediction("joy", -0.1)]).is_err());
        assert!(n.normalize("text", &[prediction("joy", f64::NAN)]).is_err());
    }

    #[test]
    fn fallback_is_default_emotion_with_zero_confidence() {
        let n = normalizer();
        let out = n.fallback();
        assert_eq!(out.emotion, "neutral");
        assert_eq!(out.confidence, 0.0);
    }
}
