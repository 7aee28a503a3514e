use futures::future::BoxFuture;
use reqwest::Client;

use crate::{config::ClassifierConfig, domain::RawPrediction};

use super::{
    inference::{build_request, parse_payload},
    Classifier, ClassifierError,
};

/// Adapter for a hosted text-classification endpoint
/// (`POST {endpoint}/{model}` with an `inputs` body).
#[derive(Clone)]
pub struct HostedClassifier {
    http: Client,
    config: ClassifierConfig,
}

impl HostedClassifier {
    pub fn new(http: Client, config: ClassifierConfig) -> Self {
        Self { http, config }
    }

    fn model_url(&self) -> String {
        format!("{}/{}", self.config.endpoint, self.config.model)
    }

    async fn request(&self, text: &str) -> Result<Vec<RawPrediction>, ClassifierError> {
        let mut request = self
            .http
            .post(self.model_url())
            .timeout(self.config.timeout)
            .json(&build_request(text));
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?.error_for_status()?;
        let body = response.text().await?;
        parse_payload(&body)
    }
}

impl Classifier for HostedClassifier {
    fn classify<'a>(
        &'a self,
        text: &'a str,
    ) -> BoxFuture<'a, Result<Vec<RawPrediction>, ClassifierError>> {
        Box::pin(self.request(text))
    }
}
