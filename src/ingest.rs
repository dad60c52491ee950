//! Ingestion pipeline orchestration.
//!
//! Coordinates one upload through a strictly sequential flow:
//!
//! ```text
//! Received → Extracted → Summarized | Degraded → Titled → Persisted | PersistFailed → Responded
//! ```
//!
//! Only extraction is fatal. A failed model call is replaced by
//! [`DEGRADED_SUMMARY`]; a failed insert is logged and the caller still gets
//! the summary and title. The store only ever sees ciphertext; the response
//! carries plaintext.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::config::Config;
use crate::error::{DigestError, Result};
use crate::extract::{detect_content_type, DocumentExtractor, Extractor};
use crate::model::{OllamaClient, Summarizer};
use crate::models::{ExtractedDocument, IngestResponse, DEGRADED_SUMMARY};
use crate::store::{open_store, ConversationStore};
use crate::title::derive_title;

/// A raw upload as received from the transport.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Summarized,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Persisted { id: String },
    PersistFailed,
}

/// Everything a run produced. Only `response` goes back over the wire.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub response: IngestResponse,
    pub summary: SummaryOutcome,
    pub persist: PersistOutcome,
}

impl IngestOutcome {
    pub fn conversation_id(&self) -> Option<&str> {
        match &self.persist {
            PersistOutcome::Persisted { id } => Some(id),
            PersistOutcome::PersistFailed => None,
        }
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    extractor: Arc<dyn Extractor>,
    summarizer: Arc<dyn Summarizer>,
    store: ConversationStore,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        summarizer: Arc<dyn Summarizer>,
        store: ConversationStore,
    ) -> Self {
        Self {
            extractor,
            summarizer,
            store,
        }
    }

    /// Production wiring: PDF/text extractor and the Ollama client.
    pub fn from_config(config: &Config, store: ConversationStore) -> anyhow::Result<Self> {
        let summarizer = OllamaClient::new(&config.model)?;
        Ok(Self::new(
            Arc::new(DocumentExtractor),
            Arc::new(summarizer),
            store,
        ))
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Runs an upload through the whole pipeline. Fails only when nothing
    /// could be extracted.
    pub async fn ingest(&self, upload: Upload) -> Result<IngestOutcome> {
        let filename = upload.filename.clone();
        let extracted = self.extract(upload).await.map_err(|e| {
            tracing::error!(stage = "extract", filename = %filename, error = %e, "extraction failed");
            e
        })?;
        Ok(self.process(extracted).await)
    }

    async fn extract(&self, upload: Upload) -> Result<ExtractedDocument> {
        let extractor = self.extractor.clone();
        tokio::task::spawn_blocking(move || {
            extractor.extract(&upload.bytes, &upload.content_type, &upload.filename)
        })
        .await
        .map_err(|e| DigestError::ExtractionFailed(format!("extractor aborted: {}", e)))?
    }

    /// Runs the stages after extraction. Never fails.
    pub async fn process(&self, doc: ExtractedDocument) -> IngestOutcome {
        tracing::info!(
            filename = %doc.original_filename,
            pages = doc.page_count,
            chars = doc.text.len(),
            "document extracted"
        );

        let (summary, summary_outcome) = match self.summarizer.summarize(&doc.text).await {
            Ok(text) => (text, SummaryOutcome::Summarized),
            Err(e) => {
                tracing::warn!(
                    stage = "summarize",
                    filename = %doc.original_filename,
                    error = %e,
                    "model call failed, using degraded summary"
                );
                (DEGRADED_SUMMARY.to_string(), SummaryOutcome::Degraded)
            }
        };

        // The sentinel is not model output; a degraded run is titled after the file.
        let title_source = match summary_outcome {
            SummaryOutcome::Summarized => summary.as_str(),
            SummaryOutcome::Degraded => "",
        };
        let title = derive_title(title_source, &doc.original_filename);

        let persist = match self
            .store
            .create(
                &summary,
                Some(&doc.original_filename),
                Some(doc.page_count),
                &title,
            )
            .await
        {
            Ok(record) => {
                tracing::info!(id = %record.id, "conversation saved");
                PersistOutcome::Persisted { id: record.id }
            }
            Err(e) => {
                tracing::error!(
                    stage = "persist",
                    filename = %doc.original_filename,
                    error = %e,
                    "conversation not saved, responding anyway"
                );
                PersistOutcome::PersistFailed
            }
        };

        IngestOutcome {
            response: IngestResponse {
                summary,
                title,
                page_count: doc.page_count,
                filename: doc.original_filename,
            },
            summary: summary_outcome,
            persist,
        }
    }
}

/// CLI entry point: ingests a local file and prints the result.
pub async fn run_ingest(config: &Config, path: &Path) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let content_type = detect_content_type(&bytes, &filename, None);

    let store = open_store(config).await?;
    let pipeline = IngestionPipeline::from_config(config, store)?;

    let outcome = pipeline
        .ingest(Upload {
            bytes,
            filename,
            content_type,
        })
        .await?;

    println!("ingest {}", outcome.response.filename);
    println!("  pages: {}", outcome.response.page_count);
    println!("  title: {}", outcome.response.title);
    if outcome.summary == SummaryOutcome::Degraded {
        println!("  summary: degraded (model unavailable)");
    }
    match outcome.conversation_id() {
        Some(id) => println!("  saved as: {}", id),
        None => println!("  saved as: (not saved)"),
    }
    println!();
    println!("{}", outcome.response.summary);

    pipeline.store().pool().close().await;
    Ok(())
}
