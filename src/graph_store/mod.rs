pub mod client;
pub mod records;

pub use client::{GraphClient, GraphConfig, GraphStoreError};
pub use records::NutrientRecord;

/// The store surface the session consumes: two read-only query shapes
/// plus an explicit release. [`GraphClient`] is the production
/// implementation; tests inject their own.
#[allow(async_fn_in_trait)]
pub trait GraphStore {
    async fn fetch_vocabulary(&self) -> Result<Vec<String>, GraphStoreError>;

    async fn fetch_nutrients(&self, labels: &[String])
        -> Result<Vec<NutrientRecord>, GraphStoreError>;

    async fn close(self) -> Result<(), GraphStoreError>;
}

impl GraphStore for GraphClient {
    async fn fetch_vocabulary(&self) -> Result<Vec<String>, GraphStoreError> {
        GraphClient::fetch_vocabulary(self).await
    }

    async fn fetch_nutrients(
        &self,
        labels: &[String],
    ) -> Result<Vec<NutrientRecord>, GraphStoreError> {
        GraphClient::fetch_nutrients(self, labels).await
    }

    async fn close(self) -> Result<(), GraphStoreError> {
        GraphClient::close(self).await
    }
}
