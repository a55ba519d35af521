
use super::{ChunkMetadata, EmbeddingRecord};
use crate::{PaperchatError, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TABLE_NAME: &str = "chunks";
/// Dimension used for the placeholder schema until the first insert
const DEFAULT_VECTOR_DIMENSION: usize = 768;

/// Vector database store using LanceDB for similarity search
pub struct VectorStore {
    connection: Connection,
    vector_dimension: Option<usize>,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk_metadata: ChunkMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the vector store under the configured base directory
    #[inline]
    pub async fn new(config: &Config) -> Result<Self, PaperchatError> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PaperchatError::Database(format!(
                    "Failed to create vector database directory: {}",
                    e
                ))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri).execute().await.map_err(|e| {
            PaperchatError::Database(format!("Failed to connect to LanceDB: {}", e))
        })?;

        let mut store = Self {
            connection,
            vector_dimension: None,
        };
        store.initialize_table().await?;

        info!("Vector store initialized successfully");
        Ok(store)
    }

    /// Create the chunks table if missing, detecting the vector dimension
    /// from an existing table
    async fn initialize_table(&mut self) -> Result<(), PaperchatError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PaperchatError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            match self.detect_existing_vector_dimension().await {
                Ok(dim) => {
                    debug!("Detected existing vector dimension: {}", dim);
                    self.vector_dimension = Some(dim);
                }
                Err(e) => {
                    warn!("Could not detect vector dimension from existing table: {}", e);
                    self.vector_dimension = Some(DEFAULT_VECTOR_DIMENSION);
                }
            }
            return Ok(());
        }

        // Placeholder schema; the table is recreated with the real dimension
        // on the first insert if it differs
        let schema = create_schema(DEFAULT_VECTOR_DIMENSION);
        self.connection
            .create_empty_table(TABLE_NAME, schema)
            .execute()
            .await
            .map_err(|e| PaperchatError::Database(format!("Failed to create table: {}", e)))?;

        self.vector_dimension = Some(DEFAULT_VECTOR_DIMENSION);
        info!(
            "Chunks table created with {} dimensions",
            DEFAULT_VECTOR_DIMENSION
        );
        Ok(())
    }

    async fn detect_existing_vector_dimension(&self) -> Result<usize, PaperchatError> {
        let table = self.open_table().await?;

        let schema = table
            .schema()
            .await
            .map_err(|e| PaperchatError::Database(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(PaperchatError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    async fn open_table(&self) -> Result<lancedb::Table, PaperchatError> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| PaperchatError::Database(format!("Failed to open table: {}", e)))
    }

    /// Store multiple embeddings in a batch
    #[inline]
    pub async fn store_embeddings_batch(
        &mut self,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), PaperchatError> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        debug!("Storing batch of {} embeddings", records.len());

        // Recreate the table if the incoming dimension doesn't match
        let vector_dim = records[0].vector.len();
        if self.vector_dimension != Some(vector_dim) {
            info!(
                "Vector dimension changed from {:?} to {}, recreating table",
                self.vector_dimension, vector_dim
            );
            self.recreate_table_with_dimension(vector_dim).await?;
            self.vector_dimension = Some(vector_dim);
        }

        let record_batch = create_record_batch(&records, vector_dim)?;

        let table = self.open_table().await?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| PaperchatError::Database(format!("Failed to insert embeddings: {}", e)))?;

        info!("Successfully stored {} embeddings", records.len());
        Ok(())
    }

    async fn recreate_table_with_dimension(&self, vector_dim: usize) -> Result<(), PaperchatError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PaperchatError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            self.connection
                .drop_table(TABLE_NAME)
                .await
                .map_err(|e| PaperchatError::Database(format!("Failed to drop table: {}", e)))?;
        }

        let schema = create_schema(vector_dim);
        self.connection
            .create_empty_table(TABLE_NAME, schema)
            .execute()
            .await
            .map_err(|e| {
                PaperchatError::Database(format!(
                    "Failed to create table with new dimensions: {}",
                    e
                ))
            })?;

        Ok(())
    }

    /// Search for the chunks most similar to a query vector.
    ///
    /// Results come back in the order the index returns them, best match
    /// first.
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
        document_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>, PaperchatError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self.open_table().await?;

        let mut query = table
            .vector_search(query_vector)
            .map_err(|e| PaperchatError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit);

        if let Some(document_id) = document_filter {
            query = query.only_if(format!("document_id = '{}'", document_id));
        }

        let mut results = query
            .execute()
            .await
            .map_err(|e| PaperchatError::Database(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Vec::new();
        while let Some(batch) = results.try_next().await.map_err(|e| {
            PaperchatError::Database(format!("Failed to read result stream: {}", e))
        })? {
            search_results.extend(parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results", search_results.len());
        Ok(search_results)
    }

    /// Delete all embeddings belonging to a document.
    ///
    /// Re-ingestion calls this first so a document's entries are replaced
    /// rather than accumulated.
    #[inline]
    pub async fn delete_document_embeddings(
        &mut self,
        document_id: &str,
    ) -> Result<(), PaperchatError> {
        debug!("Deleting embeddings for document: {}", document_id);

        let table = self.open_table().await?;
        let predicate = format!("document_id = '{}'", document_id);
        table.delete(&predicate).await.map_err(|e| {
            PaperchatError::Database(format!("Failed to delete document embeddings: {}", e))
        })?;

        info!("Deleted embeddings for document: {}", document_id);
        Ok(())
    }

    /// Compact the table after a large insert
    #[inline]
    pub async fn optimize(&mut self) -> Result<(), PaperchatError> {
        debug!("Optimizing vector database");

        let table = self.open_table().await?;
        table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| PaperchatError::Database(format!("Failed to optimize table: {}", e)))?;

        info!("Vector database optimization completed");
        Ok(())
    }

    /// Get the total number of embeddings stored
    #[inline]
    pub async fn count_embeddings(&self) -> Result<u64, PaperchatError> {
        let table = self.open_table().await?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| PaperchatError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Number of embeddings stored for one document
    #[inline]
    pub async fn count_document_embeddings(
        &self,
        document_id: &str,
    ) -> Result<u64, PaperchatError> {
        let table = self.open_table().await?;

        let predicate = format!("document_id = '{}'", document_id);
        let count = table
            .count_rows(Some(predicate))
            .await
            .map_err(|e| PaperchatError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }
}

/// Schema of the chunks table for a given vector dimension
fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("chunk_id", DataType::Utf8, false),
        Field::new("document_id", DataType::Utf8, false),
        Field::new("document_title", DataType::Utf8, false),
        Field::new("source_url", DataType::Utf8, false),
        Field::new("page_number", DataType::UInt32, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("token_count", DataType::UInt32, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn create_record_batch(
    records: &[EmbeddingRecord],
    vector_dim: usize,
) -> Result<RecordBatch, PaperchatError> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut chunk_ids = Vec::with_capacity(len);
    let mut document_ids = Vec::with_capacity(len);
    let mut document_titles = Vec::with_capacity(len);
    let mut source_urls = Vec::with_capacity(len);
    let mut page_numbers = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut token_counts = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * vector_dim);

    for record in records {
        if record.vector.len() != vector_dim {
            return Err(PaperchatError::Database(format!(
                "Inconsistent vector dimensions in batch: expected {}, got {}",
                vector_dim,
                record.vector.len()
            )));
        }

        ids.push(record.id.as_str());
        flat_values.extend_from_slice(&record.vector);
        chunk_ids.push(record.metadata.chunk_id.as_str());
        document_ids.push(record.metadata.document_id.as_str());
        document_titles.push(record.metadata.document_title.as_str());
        source_urls.push(record.metadata.source_url.as_str());
        page_numbers.push(record.metadata.page_number);
        contents.push(record.metadata.content.as_str());
        token_counts.push(record.metadata.token_count);
        chunk_indices.push(record.metadata.chunk_index);
        created_ats.push(record.metadata.created_at.as_str());
    }

    let values_array = Float32Array::from(flat_values);
    let item_field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(item_field, vector_dim as i32, Arc::new(values_array), None)
            .map_err(|e| {
                PaperchatError::Database(format!("Failed to create vector array: {}", e))
            })?;

    let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(chunk_ids)),
        Arc::new(StringArray::from(document_ids)),
        Arc::new(StringArray::from(document_titles)),
        Arc::new(StringArray::from(source_urls)),
        Arc::new(UInt32Array::from(page_numbers)),
        Arc::new(StringArray::from(contents)),
        Arc::new(UInt32Array::from(token_counts)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(create_schema(vector_dim), arrays)
        .map_err(|e| PaperchatError::Database(format!("Failed to create record batch: {}", e)))
}

fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a StringArray, PaperchatError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PaperchatError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| PaperchatError::Database(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, PaperchatError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PaperchatError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| PaperchatError::Database(format!("Invalid {} column type", name)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, PaperchatError> {
    let chunk_ids = string_column(batch, "chunk_id")?;
    let document_ids = string_column(batch, "document_id")?;
    let document_titles = string_column(batch, "document_title")?;
    let source_urls = string_column(batch, "source_url")?;
    let contents = string_column(batch, "content")?;
    let created_ats = string_column(batch, "created_at")?;
    let page_numbers = u32_column(batch, "page_number")?;
    let token_counts = u32_column(batch, "token_count")?;
    let chunk_indices = u32_column(batch, "chunk_index")?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut search_results = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let chunk_metadata = ChunkMetadata {
            chunk_id: chunk_ids.value(row).to_string(),
            document_id: document_ids.value(row).to_string(),
            document_title: document_titles.value(row).to_string(),
            source_url: source_urls.value(row).to_string(),
            page_number: page_numbers.value(row),
            content: contents.value(row).to_string(),
            token_count: token_counts.value(row),
            chunk_index: chunk_indices.value(row),
            created_at: created_ats.value(row).to_string(),
        };

        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        // Convert distance to similarity score (higher is better)
        let similarity_score = 1.0 - distance;

        search_results.push(SearchResult {
            chunk_metadata,
            similarity_score,
            distance,
        });
    }

    Ok(search_results)
}
