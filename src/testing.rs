//! Deterministic stand-ins for the embedding service and PDF extraction,
//! plus a generator for small real PDFs.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embedding::EmbeddingProvider;
use crate::extract::{ExtractError, TextExtractor};

pub const TEST_DIMS: usize = 16;

/// Bag-of-words embedding: each lowercase word bumps one of 16 buckets.
pub fn bucket_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; TEST_DIMS];
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
            % TEST_DIMS;
        v[bucket] += 1.0;
    }
    v
}

pub struct CountingProvider {
    embedded: AtomicUsize,
    fail: bool,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self {
            embedded: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            embedded: AtomicUsize::new(0),
            fail: true,
        }
    }

    /// Total texts embedded so far, across all calls.
    pub fn texts_embedded(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    fn model_name(&self) -> &str {
        "test-buckets"
    }
    fn dims(&self) -> Option<usize> {
        Some(TEST_DIMS)
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.fail {
            bail!("embedding service unreachable");
        }
        self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| bucket_embedding(t)).collect())
    }
}

/// Treats document bytes as UTF-8 text.
pub struct Utf8Extractor;

impl TextExtractor for Utf8Extractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        String::from_utf8(bytes.to_vec()).map_err(|e| ExtractError::Pdf(e.to_string()))
    }
}

/// A one-page PDF with each line drawn in Helvetica, top to bottom.
pub fn pdf_with_text(lines: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
        Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("Td", vec![Object::Integer(0), Object::Integer(-16)]));
    }
    operations.push(Operation::new("ET", vec![]));
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let media_box = vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(612),
        Object::Integer(792),
    ];
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => media_box.clone(),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
            "MediaBox" => media_box,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Chat model that always returns the same reply.
pub struct CannedModel(pub &'static str);

#[async_trait]
impl crate::llm::ChatModel for CannedModel {
    fn model_name(&self) -> &str {
        "canned"
    }
    async fn complete(&self, _prompt: &str) -> Result<String, crate::error::ModelError> {
        Ok(self.0.to_string())
    }
}

/// A pipeline over `root/{farm_data_log.json,docs,index}` with fake
/// embeddings, UTF-8 "PDFs", and a canned model reply.
pub fn canned_pipeline(root: &std::path::Path, reply: &'static str) -> crate::assistant::Pipeline {
    use crate::assistant::{FarmAssistant, Pipeline};
    use crate::config::Config;
    use crate::index::DocumentIndexer;
    use crate::prompt::PromptTemplate;
    use crate::retrieve::ContextRetriever;
    use std::sync::Arc;

    let mut config = Config::minimal();
    config.sensors.log_path = root.join("farm_data_log.json");
    config.documents.dir = root.join("docs");
    config.documents.index_dir = root.join("index");

    let indexer = DocumentIndexer::new(&config, Arc::new(CountingProvider::new()))
        .with_extractor(Arc::new(Utf8Extractor));
    let retriever = ContextRetriever::new(&config, indexer);
    let template = PromptTemplate::parse("{sensor_status}\n{rag_context}\n{user_query}")
        .expect("static template parses");
    let assistant = FarmAssistant::new(template, Box::new(CannedModel(reply)));
    Pipeline::new(config, retriever, assistant)
}
