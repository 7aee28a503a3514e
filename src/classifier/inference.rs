use serde::{Deserialize, Serialize};

use crate::domain::RawPrediction;

use super::ClassifierError;

#[derive(Debug, Serialize)]
pub struct InferenceRequest<'a> {
    pub inputs: &'a str,
    pub options: InferenceOptions,
}

#[derive(Debug, Serialize)]
pub struct InferenceOptions {
    pub wait_for_model: bool,
}

pub fn build_request(text: &str) -> InferenceRequest<'_> {
    InferenceRequest {
        inputs: text,
        options: InferenceOptions {
            wait_for_model: true,
        },
    }
}

/// Text-classification hosts answer in several shapes depending on model and
/// pipeline version: `[[{label, score}, ...]]`, `[{label, score}, ...]`, or a
/// single `{label}` object with the score omitted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferencePayload {
    Ranked(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Single(LabelScore),
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct InferenceFailure {
    error: String,
}

pub fn parse_payload(body: &str) -> Result<Vec<RawPrediction>, ClassifierError> {
    let payload: InferencePayload = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(err) => {
            // Hosts report model-side failures as `{"error": "..."}`.
            if let Ok(failure) = serde_json::from_str::<InferenceFailure>(body) {
                return Err(ClassifierError::InvalidOutput(failure.error));
            }
            return Err(ClassifierError::InvalidOutput(err.to_string()));
        }
    };

    let entries = match payload {
        InferencePayload::Ranked(groups) => groups.into_iter().flatten().collect(),
        InferencePayload::Flat(entries) => entries,
        InferencePayload::Single(entry) => vec![entry],
    };

    Ok(entries
        .into_iter()
        .map(|entry| RawPrediction {
            label: entry.label,
            // A bare-label classifier asserts its single answer.
            score: entry.score.unwrap_or(1.0),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranked_payload() {
        let body = r#"[[{"label":"joy","score":0.8},{"label":"anger","score":0.2}]]"#;
        let predictions = parse_payload(body).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].label, "joy");
        assert_eq!(predictions[0].score, 0.8);
    }

    #[test]
    fn parses_flat_payload() {
        let body = r#"[{"label":"sadness","score":0.9}]"#;
        let predictions = parse_payload(body).unwrap();
        assert_eq!(predictions[0].label, "sadness");
        assert_eq!(predictions[0].score, 0.9);
    }

    #[test]
    fn parses_single_label_without_score() {
        let body = r#"{"label":"joy"}"#;
        let predictions = parse_payload(body).unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].score, 1.0);
    }

    #[test]
    fn host_error_body_becomes_invalid_output() {
        let body = r#"{"error":"model emotion-distilbert is currently loading"}"#;
        let err = parse_payload(body).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidOutput(msg) if msg.contains("loading")));
    }

    #[test]
    fn garbage_body_becomes_invalid_output() {
        assert!(matches!(
            parse_payload("not json"),
            Err(ClassifierError::InvalidOutput(_))
        ));
        assert!(matches!(
            parse_payload(r#"{"labels": []}"#),
            Err(ClassifierError::InvalidOutput(_))
        ));
    }
}
