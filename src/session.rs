use crate::composer;
use crate::error::AdvisorError;
use crate::generation::TextGenerator;
use crate::graph_store::{GraphStore, NutrientRecord};
use crate::matcher::{EmbeddingMatcher, LexicalMatcher, SymptomMatcher};
use crate::search::Embedder;

/// Which resolution strategy the session runs with. Exactly one is active
/// for the lifetime of a session; switching means opening a new session.
pub enum MatcherStrategy {
    Embedding(Box<dyn Embedder + Send + Sync>),
    Lexical,
}

/// The full pipeline output for one phrase.
#[derive(Debug)]
pub struct Advice {
    pub labels: Vec<String>,
    pub records: Vec<NutrientRecord>,
    pub answer: String,
}

/// One advisory session: store client, generation client and the chosen
/// matcher, with an explicit open/close lifecycle.
///
/// `open` fetches the vocabulary and builds the matcher; any failure on
/// that path closes the store before the error is returned, so a partial
/// session never escapes. Per-request failures leave the session usable.
pub struct AdvisorSession<S: GraphStore, G: TextGenerator> {
    store: S,
    generation: G,
    matcher: Box<dyn SymptomMatcher>,
}

impl<S: GraphStore, G: TextGenerator> AdvisorSession<S, G> {
    pub async fn open(
        store: S,
        generation: G,
        strategy: MatcherStrategy,
    ) -> Result<Self, AdvisorError> {
        let vocabulary = match store.fetch_vocabulary().await {
            Ok(vocabulary) => vocabulary,
            Err(err) => {
                let _ = store.close().await;
                return Err(err.into());
            }
        };

        let matcher = match build_matcher(strategy, vocabulary) {
            Ok(matcher) => matcher,
            Err(err) => {
                let _ = store.close().await;
                return Err(err);
            }
        };

        Ok(Self {
            store,
            generation,
            matcher,
        })
    }

    /// The canonical labels this session resolves against, in slot order.
    pub fn vocabulary(&self) -> &[String] {
        self.matcher.vocabulary()
    }

    /// Ranked labels for a phrase, most similar first. Purely local.
    pub fn resolve(&self, phrase: &str, top_n: usize) -> Result<Vec<String>, AdvisorError> {
        self.matcher.resolve(phrase, top_n)
    }

    /// Grouped nutrient records for the given labels. An empty label set
    /// and a label with no connected nutrients both yield an empty
    /// sequence, not an error.
    pub async fn fetch_nutrients(
        &self,
        labels: &[String],
    ) -> Result<Vec<NutrientRecord>, AdvisorError> {
        Ok(self.store.fetch_nutrients(labels).await?)
    }

    /// Formats the generation-service prompt. No I/O.
    pub fn compose_prompt(
        &self,
        phrase: &str,
        labels: &[String],
        records: &[NutrientRecord],
    ) -> String {
        composer::compose_prompt(phrase, labels, records)
    }

    /// Runs the whole pipeline: resolve, aggregate, compose, generate.
    pub async fn advise(&self, phrase: &str, top_n: usize) -> Result<Advice, AdvisorError> {
        let labels = self.resolve(phrase, top_n)?;
        let records = self.fetch_nutrients(&labels).await?;
        let prompt = self.compose_prompt(phrase, &labels, &records);
        let answer = self.generation.generate(&prompt).await?;
        Ok(Advice {
            labels,
            records,
            answer,
        })
    }

    /// Ends the session and releases the store.
    pub async fn close(self) -> Result<(), AdvisorError> {
        Ok(self.store.close().await?)
    }
}

fn build_matcher(
    strategy: MatcherStrategy,
    vocabulary: Vec<String>,
) -> Result<Box<dyn SymptomMatcher>, AdvisorError> {
    match strategy {
        MatcherStrategy::Embedding(embedder) => {
            Ok(Box::new(EmbeddingMatcher::new(embedder, vocabulary)?))
        }
        MatcherStrategy::Lexical => Ok(Box::new(LexicalMatcher::new(vocabulary)?)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::generation::GenerationError;
    use crate::graph_store::GraphStoreError;
    use crate::matcher::embedding::test_support::TableEmbedder;

    struct MockStore {
        vocabulary: Vec<String>,
        fail_vocabulary: bool,
        fail_nutrients: bool,
        closed: Arc<AtomicBool>,
    }

    impl MockStore {
        fn new(vocabulary: &[&str], closed: Arc<AtomicBool>) -> Self {
            Self {
                vocabulary: vocabulary.iter().map(|s| s.to_string()).collect(),
                fail_vocabulary: false,
                fail_nutrients: false,
                closed,
            }
        }
    }

    impl GraphStore for MockStore {
        async fn fetch_vocabulary(&self) -> Result<Vec<String>, GraphStoreError> {
            if self.fail_vocabulary {
                return Err(GraphStoreError::MalformedResponse(
                    "injected vocabulary failure".to_string(),
                ));
            }
            Ok(self.vocabulary.clone())
        }

        async fn fetch_nutrients(
            &self,
            labels: &[String],
        ) -> Result<Vec<NutrientRecord>, GraphStoreError> {
            if self.fail_nutrients {
                return Err(GraphStoreError::MalformedResponse(
                    "injected nutrient failure".to_string(),
                ));
            }
            if labels.iter().any(|l| l == "Fatigue") {
                Ok(vec![NutrientRecord {
                    nutrient: "Iron".to_string(),
                    paper_sources: ["doi:10.1000/iron".to_string()].into(),
                    sources: ["Spinach".to_string(), "Red Meat".to_string()].into(),
                    daily_intake: ["18 mg/day".to_string()].into(),
                    benefits: ["Oxygen transport".to_string()].into(),
                }])
            } else {
                Ok(Vec::new())
            }
        }

        async fn close(self) -> Result<(), GraphStoreError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct EchoGenerator;

    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            Ok(format!("generated from {} chars", prompt.len()))
        }
    }

    fn symptom_embedder() -> Box<dyn Embedder + Send + Sync> {
        Box::new(TableEmbedder::new(&[
            ("symptoms of fatigue", &[1.0, 0.0, 0.0]),
            ("symptoms of hair loss", &[0.0, 1.0, 0.0]),
            ("symptoms of night blindness", &[0.0, 0.0, 1.0]),
            (
                "patient describes symptoms: i feel very tired all the time",
                &[0.9, 0.1, 0.0],
            ),
        ]))
    }

    fn mock_vocabulary() -> [&'static str; 3] {
        ["Fatigue", "Hair Loss", "Night Blindness"]
    }

    #[tokio::test]
    async fn test_end_to_end_fatigue_scenario() {
        let closed = Arc::new(AtomicBool::new(false));
        let store = MockStore::new(&mock_vocabulary(), closed.clone());
        let session = AdvisorSession::open(
            store,
            EchoGenerator,
            MatcherStrategy::Embedding(symptom_embedder()),
        )
        .await
        .unwrap();

        let labels = session
            .resolve("I feel very tired all the time", 1)
            .unwrap();
        assert_eq!(labels, vec!["Fatigue"]);

        let records = session.fetch_nutrients(&labels).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].nutrient, "Iron");
        assert!(!records[0].sources.is_empty());
        assert!(!records[0].benefits.is_empty());

        let advice = session
            .advise("I feel very tired all the time", 1)
            .await
            .unwrap();
        assert_eq!(advice.labels, vec!["Fatigue"]);
        assert!(advice.answer.starts_with("generated from"));

        session.close().await.unwrap();
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unknown_label_yields_empty_not_error() {
        let closed = Arc::new(AtomicBool::new(false));
        let store = MockStore::new(&mock_vocabulary(), closed.clone());
        let session =
            AdvisorSession::open(store, EchoGenerator, MatcherStrategy::Lexical)
                .await
                .unwrap();

        let records = session
            .fetch_nutrients(&["Night Blindness".to_string()])
            .await
            .unwrap();
        assert!(records.is_empty());

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_still_closes_on_teardown() {
        let closed = Arc::new(AtomicBool::new(false));
        let mut store = MockStore::new(&mock_vocabulary(), closed.clone());
        store.fail_nutrients = true;
        let session =
            AdvisorSession::open(store, EchoGenerator, MatcherStrategy::Lexical)
                .await
                .unwrap();

        let result = session.fetch_nutrients(&["Fatigue".to_string()]).await;
        assert!(matches!(result, Err(AdvisorError::StoreUnavailable(_))));

        session.close().await.unwrap();
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_open_failure_releases_store() {
        let closed = Arc::new(AtomicBool::new(false));
        let mut store = MockStore::new(&mock_vocabulary(), closed.clone());
        store.fail_vocabulary = true;

        let result =
            AdvisorSession::open(store, EchoGenerator, MatcherStrategy::Lexical).await;
        assert!(matches!(result, Err(AdvisorError::StoreUnavailable(_))));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_vocabulary_aborts_open_and_releases_store() {
        let closed = Arc::new(AtomicBool::new(false));
        let store = MockStore::new(&[], closed.clone());

        let result =
            AdvisorSession::open(store, EchoGenerator, MatcherStrategy::Lexical).await;
        assert!(matches!(result, Err(AdvisorError::EmptyVocabulary)));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_invalid_top_n_is_rejected_locally() {
        let closed = Arc::new(AtomicBool::new(false));
        let store = MockStore::new(&mock_vocabulary(), closed.clone());
        let session =
            AdvisorSession::open(store, EchoGenerator, MatcherStrategy::Lexical)
                .await
                .unwrap();

        let result = session.resolve("tired", 0);
        assert!(matches!(result, Err(AdvisorError::InvalidQueryParameter(_))));

        session.close().await.unwrap();
    }
}
