//! Tantivy-based search index module.
//!
//! Provides relevance search over the catalog with field boosting. The index
//! is rebuilt from the installed catalog every time its revision changes.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::errors::AppError;
use crate::models::VehicleRecord;
use crate::sync::InventorySync;

/// Field boost values; make and model dominate.
const BOOST_BRAND: f32 = 10.0;
const BOOST_MODEL: f32 = 9.0;
const BOOST_BODY_TYPE: f32 = 6.0;
const BOOST_FUEL_TYPE: f32 = 5.0;
const BOOST_TRANSMISSION: f32 = 4.0;
const BOOST_DESCRIPTION: f32 = 3.0;

/// Search hit with relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub vehicle_id: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    vehicle_id: Field,
    brand: Field,
    model: Field,
    description: Field,
    fuel_type: Field,
    body_type: Field,
    transmission: Field,
}

/// Tantivy search index for the catalog.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let vehicle_id = schema_builder.add_text_field("vehicle_id", STORED);
        let brand = schema_builder.add_text_field("brand", TEXT | STORED);
        let model = schema_builder.add_text_field("model", TEXT | STORED);
        let description = schema_builder.add_text_field("description", TEXT);
        let fuel_type = schema_builder.add_text_field("fuel_type", TEXT);
        let body_type = schema_builder.add_text_field("body_type", TEXT);
        let transmission = schema_builder.add_text_field("transmission", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            vehicle_id,
            brand,
            model,
            description,
            fuel_type,
            body_type,
            transmission,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Replace the indexed documents with the given catalog.
    pub async fn rebuild(&self, records: &[VehicleRecord]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for record in records {
            writer.add_document(self.create_document(record))?;
        }
        writer.commit()?;

        // Reload reader to see new documents
        self.reader.reload()?;

        tracing::debug!("Search index rebuilt with {} vehicles", records.len());
        Ok(())
    }

    /// Search for vehicles matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let query_parser = QueryParser::for_index(
            &self.index,
            vec![
                self.fields.brand,
                self.fields.model,
                self.fields.description,
                self.fields.fuel_type,
                self.fields.body_type,
                self.fields.transmission,
            ],
        );

        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?;

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();

        let field_queries = [
            (self.fields.brand, BOOST_BRAND),
            (self.fields.model, BOOST_MODEL),
            (self.fields.body_type, BOOST_BODY_TYPE),
            (self.fields.fuel_type, BOOST_FUEL_TYPE),
            (self.fields.transmission, BOOST_TRANSMISSION),
            (self.fields.description, BOOST_DESCRIPTION),
        ];

        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                let boosted = BoostQuery::new(field_query, boost);
                subqueries.push((Occur::Should, Box::new(boosted)));
            }
        }

        // OR across fields
        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        // TopDocs needs a positive limit; never ask for more than the index holds
        let num_docs = searcher.num_docs() as usize;
        if limit == 0 || offset >= num_docs {
            return Ok(Vec::new());
        }
        let fetch = limit.saturating_add(offset).min(num_docs);

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(fetch))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results: Vec<SearchResult> = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let vehicle_id = doc.get_first(self.fields.vehicle_id)?.as_str()?.to_string();
                Some(SearchResult { vehicle_id, score })
            })
            .collect();

        Ok(results)
    }

    fn create_document(&self, record: &VehicleRecord) -> TantivyDocument {
        doc!(
            self.fields.vehicle_id => record.id.clone(),
            self.fields.brand => record.brand.clone(),
            self.fields.model => record.model.clone(),
            self.fields.description => record.description.clone(),
            self.fields.fuel_type => record.fuel_type.as_str().to_string(),
            self.fields.body_type => record.body_type.as_str().to_string(),
            self.fields.transmission => record.transmission.as_str().to_string()
        )
    }
}

/// Keep the index in step with the catalog.
///
/// Rebuilds once for the current revision, then again after every revision
/// change. Runs until the returned handle is aborted.
pub fn spawn_refresher(index: Arc<SearchIndex>, sync: Arc<InventorySync>) -> JoinHandle<()> {
    let mut status = sync.watch();
    tokio::spawn(async move {
        let mut indexed_revision = None;
        loop {
            let revision = status.borrow_and_update().revision_id;
            if indexed_revision != Some(revision) {
                let records = sync.catalog().await;
                match index.rebuild(&records).await {
                    Ok(()) => indexed_revision = Some(revision),
                    Err(e) => tracing::error!("Failed to rebuild search index: {}", e),
                }
            }
            if status.changed().await.is_err() {
                break;
            }
        }
    })
}
