//! Quiz generation pipeline.
//!
//! Pipeline flow:
//! PDF bytes → Text Extractor → Chunker → leading sample → Quiz Generator → Quiz
//!
//! K_i: Only the first `sample_chunks` chunks reach the model, so the
//! quiz covers the early part of the document. The material info line
//! says so.

use crate::client::ChatModel;
use crate::document::{extract_text, sample_chunks, TextChunker};
use crate::models::{Config, Quiz, QuizError, Result, Settings};
use crate::quiz::QuizGenerator;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Model-ready sample cut from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    /// Leading chunks joined with a space
    pub sample: String,
    /// Chunks the document split into
    pub total_chunks: usize,
    /// Chunks included in `sample`
    pub sent_chunks: usize,
}

impl Material {
    /// Info banner shown above the quiz.
    pub fn info(&self) -> String {
        format!(
            "Using {} chunks. Sent {} chunk(s) to the model.",
            self.total_chunks, self.sent_chunks
        )
    }
}

/// Output of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct GeneratedQuiz {
    pub quiz: Quiz,
    pub material: Material,
}

/// Extract → chunk → sample → generate.
pub struct QuizPipeline {
    generator: QuizGenerator,
    sample_chunks: usize,
}

impl QuizPipeline {
    /// Create a new pipeline.
    pub fn new(generator: QuizGenerator, sample_chunks: usize) -> Self {
        Self {
            generator,
            sample_chunks: sample_chunks.max(1),
        }
    }

    /// Create a pipeline from configuration.
    pub fn from_config(model: Arc<dyn ChatModel>, config: &Config) -> Self {
        Self::new(
            QuizGenerator::from_config(model, config),
            config.quiz.sample_chunks,
        )
    }

    pub fn generator(&self) -> &QuizGenerator {
        &self.generator
    }

    /// Load a PDF from disk.
    pub fn load_pdf(path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| QuizError::io("reading PDF file", e))
    }

    /// Extract and chunk a PDF into the sample sent to the model.
    ///
    /// B_i(PDF has a text layer) → Result<Material>
    pub fn prepare(&self, pdf: &[u8], settings: &Settings) -> Result<Material> {
        let text = extract_text(pdf)?.require_text()?;
        let chunker = TextChunker::new(settings.chunk_size, settings.chunk_overlap)?;
        let chunks = chunker.split(&text);

        let material = Material {
            sample: sample_chunks(&chunks, self.sample_chunks),
            total_chunks: chunks.len(),
            sent_chunks: chunks.len().min(self.sample_chunks),
        };

        info!(
            chars = text.chars().count(),
            total_chunks = material.total_chunks,
            sent_chunks = material.sent_chunks,
            "Material prepared"
        );
        Ok(material)
    }

    /// Run the whole pipeline.
    pub async fn run(&self, pdf: &[u8], settings: &Settings) -> Result<GeneratedQuiz> {
        let material = self.prepare(pdf, settings)?;
        let quiz = self
            .generator
            .generate(&material.sample, settings.questions_per_level)
            .await?;
        Ok(GeneratedQuiz { quiz, material })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::build_pdf;
    use crate::models::{Letter, ModelSpec, Tier};
    use crate::quiz::generator::tests::FakeChatModel;
    use crate::quiz::parse::tests::quiz_json;

    fn settings(per_level: usize) -> Settings {
        Settings {
            chunk_size: 800,
            chunk_overlap: 100,
            questions_per_level: per_level,
        }
    }

    fn pipeline(fake: Arc<FakeChatModel>) -> QuizPipeline {
        QuizPipeline::new(QuizGenerator::new(fake, ModelSpec::default(), true, 1), 3)
    }

    #[tokio::test]
    async fn test_end_to_end_three_per_tier() {
        let pdf = build_pdf(&[
            Some("The mitochondria is the powerhouse of the cell."),
            None,
            Some("Ribosomes synthesise proteins."),
        ]);
        let fake = Arc::new(FakeChatModel::new(vec![Ok(quiz_json(3, 3, 3).to_string())]));

        let generated = pipeline(fake.clone()).run(&pdf, &settings(3)).await.unwrap();

        for tier in Tier::ALL {
            let questions = generated.quiz.tier(tier);
            assert_eq!(questions.len(), 3);
            for q in questions {
                let letters: Vec<Letter> = q.options.keys().copied().collect();
                assert_eq!(letters, Letter::ALL);
                assert!(Letter::ALL.contains(&q.correct));
            }
        }
        assert_eq!(generated.material.total_chunks, 1);
        assert_eq!(
            generated.material.info(),
            "Using 1 chunks. Sent 1 chunk(s) to the model."
        );

        let requests = fake.requests.lock().unwrap();
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("powerhouse of the cell"));
        assert!(prompt.contains("Ribosomes"));
    }

    #[tokio::test]
    async fn test_pdf_without_text_never_calls_model() {
        let pdf = build_pdf(&[None]);
        let fake = Arc::new(FakeChatModel::new(vec![]));

        let err = pipeline(fake.clone()).run(&pdf, &settings(3)).await.unwrap_err();

        assert!(matches!(err, QuizError::Extraction(_)));
        assert_eq!(fake.calls(), 0);
    }

    #[test]
    fn test_prepare_sends_only_leading_chunks() {
        let long_page = "Osmosis moves water across membranes. ".repeat(30);
        let pdf = build_pdf(&[Some(long_page.as_str()), Some(long_page.as_str())]);
        let fake = Arc::new(FakeChatModel::new(vec![]));
        let small = Settings {
            chunk_size: 200,
            chunk_overlap: 20,
            questions_per_level: 3,
        };

        let material = pipeline(fake).prepare(&pdf, &small).unwrap();

        assert!(material.total_chunks > 3);
        assert_eq!(material.sent_chunks, 3);
        assert!(material.sample.chars().count() <= 3 * 200 + 2);
    }
}
