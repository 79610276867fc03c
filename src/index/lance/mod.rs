
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Neighbor, VectorIndex};
use crate::{Result, WingmanError};

const TABLE_NAME: &str = "catalog";
const POSITION_COLUMN: &str = "position";
const VECTOR_COLUMN: &str = "vector";
const DISTANCE_COLUMN: &str = "_distance";

/// Exact squared-L2 nearest-neighbour index stored as a LanceDB table.
///
/// Each row carries the vector's position in the side-car arrays, so results can be joined back
/// to catalog metadata without relying on storage order.
pub struct LanceIndex {
    table: Table,
    dimension: usize,
    rows: usize,
}

impl LanceIndex {
    /// Write `vectors` to a fresh index at `path`, replacing any existing one
    #[inline]
    pub async fn create(path: &Path, vectors: &[Vec<f32>]) -> Result<Self> {
        let dimension = vectors
            .first()
            .map(Vec::len)
            .filter(|dim| *dim > 0)
            .ok_or_else(|| {
                WingmanError::Catalog("Cannot build an index without vectors".to_string())
            })?;

        if let Some((position, vector)) = vectors
            .iter()
            .enumerate()
            .find(|(_, vector)| vector.len() != dimension)
        {
            debug!("Vector {} has unexpected dimension", position);
            return Err(WingmanError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        if path.exists() {
            info!("Removing existing index at {}", path.display());
            std::fs::remove_dir_all(path)?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let connection = connect(path).await?;
        let schema = create_schema(dimension);

        let table = connection
            .create_empty_table(TABLE_NAME, Arc::clone(&schema))
            .execute()
            .await
            .map_err(|e| database_error("Failed to create index table", &e))?;

        let batch = create_record_batch(schema, vectors, dimension)?;
        let batch_schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), batch_schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| database_error("Failed to insert vectors", &e))?;

        info!(
            "Created index with {} vectors of dimension {} at {}",
            vectors.len(),
            dimension,
            path.display()
        );

        Ok(Self {
            table,
            dimension,
            rows: vectors.len(),
        })
    }

    /// Open an index previously written by [`LanceIndex::create`]
    #[inline]
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WingmanError::IndexUnavailable(format!(
                "Index not found at {}",
                path.display()
            )));
        }

        let connection = connect(path).await?;
        let table = connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| unavailable("Failed to open index table", &e))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| unavailable("Failed to read index schema", &e))?;

        let dimension = schema
            .fields()
            .iter()
            .find(|field| field.name() == VECTOR_COLUMN)
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                WingmanError::IndexUnavailable(
                    "Index table has no fixed-size vector column".to_string(),
                )
            })?;

        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| unavailable("Failed to count index rows", &e))?;

        debug!(
            "Opened index at {} ({} rows, dimension {})",
            path.display(),
            rows,
            dimension
        );

        Ok(Self {
            table,
            dimension,
            rows,
        })
    }

    fn parse_batch(batch: &RecordBatch) -> Result<Vec<Neighbor>> {
        let positions = batch
            .column_by_name(POSITION_COLUMN)
            .and_then(|col| col.as_any().downcast_ref::<UInt32Array>())
            .ok_or_else(|| {
                WingmanError::IndexUnavailable("Missing or invalid position column".to_string())
            })?;

        let distances = batch
            .column_by_name(DISTANCE_COLUMN)
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>())
            .ok_or_else(|| {
                WingmanError::IndexUnavailable("Missing or invalid distance column".to_string())
            })?;

        Ok((0..batch.num_rows())
            .map(|row| Neighbor {
                distance: if distances.is_null(row) {
                    0.0
                } else {
                    distances.value(row).max(0.0)
                },
                position: positions.value(row) as usize,
            })
            .collect())
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.rows
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(WingmanError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if k == 0 || self.rows == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching index for {} nearest neighbours", k);

        let stream = self
            .table
            .vector_search(query)
            .map_err(|e| unavailable("Failed to create vector search", &e))?
            .column(VECTOR_COLUMN)
            .distance_type(DistanceType::L2)
            .limit(k)
            .execute()
            .await
            .map_err(|e| unavailable("Failed to execute search", &e))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| unavailable("Failed to read search results", &e))?;

        let mut neighbors = Vec::with_capacity(k);
        for batch in &batches {
            neighbors.extend(Self::parse_batch(batch)?);
        }
        neighbors.truncate(k);

        debug!("Index returned {} neighbours", neighbors.len());
        Ok(neighbors)
    }
}

async fn connect(path: &Path) -> Result<Connection> {
    let uri = format!("file://{}", path.display());
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| unavailable("Failed to connect to LanceDB", &e))
}

fn create_schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(POSITION_COLUMN, DataType::UInt32, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                dimension as i32,
            ),
            false,
        ),
    ]))
}

fn create_record_batch(
    schema: Arc<Schema>,
    vectors: &[Vec<f32>],
    dimension: usize,
) -> Result<RecordBatch> {
    let positions = (0..vectors.len())
        .map(u32::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| WingmanError::Catalog("Too many catalog fields to index".to_string()))?;

    let flat_values: Vec<f32> = vectors.iter().flatten().copied().collect();
    let item_field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array = FixedSizeListArray::try_new(
        item_field,
        dimension as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| database_error("Failed to create vector array", &e))?;

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(UInt32Array::from(positions)),
            Arc::new(vector_array),
        ],
    )
    .map_err(|e| database_error("Failed to create record batch", &e))
}

fn unavailable(context: &str, error: &dyn std::fmt::Display) -> WingmanError {
    WingmanError::IndexUnavailable(format!("{}: {}", context, error))
}

fn database_error(context: &str, error: &dyn std::fmt::Display) -> WingmanError {
    WingmanError::Other(anyhow::anyhow!("{}: {}", context, error))
}
