pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod schema;

pub use llm::{OcrClient, TransportError};
pub use normalizer::normalize;
pub use schema::{EntityData, ExtractionResult, TableData};

/// Full text-to-result pipeline: model call followed by normalization.
///
/// Transport failures come back as `Err(TransportError)` so the boundary can
/// map them to a distinct response class; everything the model actually said,
/// however malformed, comes back as an `ExtractionResult` (possibly with
/// `success: false` and a diagnostic).
#[derive(Clone)]
pub struct OcrPipeline {
    client: OcrClient,
}

impl OcrPipeline {
    pub fn new(client: OcrClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OcrClient {
        &self.client
    }

    pub async fn process(&self, text: &str) -> Result<ExtractionResult, TransportError> {
        let reply = self.client.send(text).await?;
        Ok(normalizer::normalize(&reply))
    }
}
