use std::sync::Arc;

use thiserror::Error;

use crate::{
    classifier::{Classifier, ClassifierError},
    domain::ScoredEmotion,
    emotion::Normalizer,
    store::{EmotionCount, JournalEntry, NewEntry, RecordStore, StoreError},
};

/// One submission pipeline: reject empty input, resolve an emotion, append
/// the record. Collaborators are injected so the whole flow runs against
/// fakes in tests.
pub struct JournalService {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn RecordStore>,
    normalizer: Normalizer,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Blank or whitespace-only text; rejected before any collaborator call.
    #[error("journal entry is empty")]
    EmptyInput,
    /// The append failed even after the retry. The text was not persisted
    /// and the user must be told.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct SubmitOutcome {
    pub scored: ScoredEmotion,
    /// Present when the entry was stored with the fallback emotion because
    /// the classifier failed or answered nonsense.
    pub degraded: Option<ClassifierError>,
}

impl JournalService {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn RecordStore>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            classifier,
            store,
            normalizer,
        }
    }

    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome, SubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyInput);
        }

        let (scored, degraded) = match self.normalizer.override_for(text) {
            // A trigger already decides the outcome; the model's answer
            // would be discarded anyway, so skip the remote call.
            Some(hit) => (hit, None),
            None => match self.classifier.classify(text).await {
                Ok(predictions) => match self.normalizer.normalize(text, &predictions) {
                    Ok(scored) => (scored, None),
                    Err(err) => {
                        tracing::warn!(
                            target: "journal",
                            error = %err,
                            "classifier output rejected; storing fallback"
                        );
                        (
                            self.normalizer.fallback(),
                            Some(ClassifierError::InvalidOutput(err.to_string())),
                        )
                    }
                },
                Err(err) => {
                    tracing::warn!(
                        target: "journal",
                        error = %err,
                        "classification failed; storing fallback"
                    );
                    (self.normalizer.fallback(), Some(err))
                }
            },
        };

        let entry = NewEntry {
            text: text.to_string(),
            emotion: scored.emotion.clone(),
            confidence: scored.confidence,
        };
        self.store.append(&entry).await?;

        Ok(SubmitOutcome { scored, degraded })
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>, StoreError> {
        self.store.recent(limit).await
    }

    pub async fn distribution(&self) -> Result<Vec<EmotionCount>, StoreError> {
        self.store.distribution().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        domain::RawPrediction,
        emotion::{NormalizerConfig, OverrideRule},
    };

    struct FakeClassifier {
        calls: AtomicUsize,
        /// `None` simulates a failing classifier.
        predictions: Option<Vec<RawPrediction>>,
    }

    impl FakeClassifier {
        fn answering(predictions: Vec<RawPrediction>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                predictions: Some(predictions),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                predictions: None,
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Classifier for FakeClassifier {
        fn classify<'a>(
            &'a self,
            _text: &'a str,
        ) -> BoxFuture<'a, Result<Vec<RawPrediction>, ClassifierError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                self.predictions
                    .clone()
                    .ok_or_else(|| ClassifierError::InvalidOutput("model offline".to_string()))
            })
        }
    }

    struct FakeStore {
        entries: Mutex<Vec<NewEntry>>,
        fail: bool,
    }

    impl FakeStore {
        fn working() -> Arc<Self> {
            Arc::new(Self {
                entries: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                entries: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn stored(&self) -> Vec<NewEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    impl RecordStore for FakeStore {
        fn append<'a>(&'a self, entry: &'a NewEntry) -> BoxFuture<'a, Result<(), StoreError>> {
            Box::pin(async move {
                if self.fail {
                    return Err(StoreError::from(sqlx::Error::PoolClosed));
                }
                self.entries.lock().unwrap().push(entry.clone());
                Ok(())
            })
        }

        fn list<'a>(&'a self) -> BoxFuture<'a, Result<Vec<JournalEntry>, StoreError>> {
            Box::pin(async move { Ok(Vec::new()) })
        }

        fn recent<'a>(
            &'a self,
            _limit: usize,
        ) -> BoxFuture<'a, Result<Vec<JournalEntry>, StoreError>> {
            Box::pin(async move { Ok(Vec::new()) })
        }

        fn distribution<'a>(&'a self) -> BoxFuture<'a, Result<Vec<EmotionCount>, StoreError>> {
            Box::pin(async move { Ok(Vec::new()) })
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

    fn prediction(label: &str, score: f64) -> RawPrediction {
        RawPrediction {
            label: label.to_string(),
            score,
        }
    }

    #[tokio::test]
    async fn empty_input_touches_no_collaborator() {
        let classifier = FakeClassifier::answering(vec![prediction("joy", 0.8)]);
        let store = FakeStore::working();
        let service = JournalService::new(classifier.clone(), store.clone(), normalizer());

        let result = service.submit("   \n ").await;

        assert!(matches!(result, Err(SubmitError::EmptyInput)));
        assert_eq!(classifier.call_count(), 0);
        assert!(store.stored().is_empty());
    }

    #[tokio::test]
    async fn override_trigger_skips_the_model_call() {
        let classifier = FakeClassifier::answering(vec![prediction("anger", 0.99)]);
        let store = FakeStore::working();
        let service = JournalService::new(classifier.clone(), store.clone(), normalizer());

        let outcome = service.submit("I love you so much").await.unwrap();

        assert_eq!(outcome.scored.emotion, "love");
        assert_eq!(outcome.scored.confidence, 1.0);
        assert!(outcome.degraded.is_none());
        assert_eq!(classifier.call_count(), 0);
        assert_eq!(store.stored()[0].emotion, "love");
    }

    #[tokio::test]
    async fn model_result_is_normalized_and_stored() {
        let classifier =
            FakeClassifier::answering(vec![prediction("joy", 0.8), prediction("anger", 0.2)]);
        let store = FakeStore::working();
        let service = JournalService::new(classifier.clone(), store.clone(), normalizer());

        let outcome = service.submit("what a nice day").await.unwrap();

        assert_eq!(outcome.scored.emotion, "happy");
        assert_eq!(outcome.scored.confidence, 0.8);
        assert_eq!(classifier.call_count(), 1);
        let stored = store.stored();
        assert_eq!(stored[0].text, "what a nice day");
        assert_eq!(stored[0].emotion, "happy");
    }

    #[tokio::test]
    async fn classifier_failure_still_persists_the_text_with_fallback() {
        let classifier = FakeClassifier::failing();
        let store = FakeStore::working();
        let service = JournalService::new(classifier, store.clone(), normalizer());

        let outcome = service.submit("rough day").await.unwrap();

        assert_eq!(outcome.scored.emotion, "neutral");
        assert_eq!(outcome.scored.confidence, 0.0);
        assert!(outcome.degraded.is_some());
        let stored = store.stored();
        assert_eq!(stored[0].text, "rough day");
        assert_eq!(stored[0].emotion, "neutral");
        assert_eq!(stored[0].confidence, 0.0);
    }

    #[tokio::test]
    async fn empty_model_output_is_degraded_to_fallback() {
        let classifier = FakeClassifier::answering(Vec::new());
        let store = FakeStore::working();
        let service = JournalService::new(classifier, store.clone(), normalizer());

        let outcome = service.submit("anything").await.unwrap();

        assert_eq!(outcome.scored.emotion, "neutral");
        assert_eq!(outcome.scored.confidence, 0.0);
        assert!(outcome.degraded.is_some());
    }

    #[tokio::test]
    async fn store_failure_surfaces_to_the_caller() {
        let classifier = FakeClassifier::answering(vec![prediction("joy", 0.8)]);
        let store = FakeStore::failing();
        let service = JournalService::new(classifier, store, normalizer());

        let result = service.submit("please save me").await;

        assert!(matches!(result, Err(SubmitError::Store(_))));
    }
}
