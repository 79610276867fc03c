// Catalog metadata store
// Loads the nested databases > tables > fields catalog and flattens it into one record per field


use anyhow::Context;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::{Result, WingmanError};

/// Number of sample values included in the embedding text
const EMBEDDED_SAMPLE_VALUES: usize = 3;

/// A single catalog field together with the descriptions of its table and database.
///
/// One `CatalogField` corresponds to exactly one vector in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogField {
    pub database_name: String,
    #[serde(default)]
    pub database_description: String,
    pub table_name: String,
    #[serde(default)]
    pub table_description: String,
    pub field_name: String,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub business_description: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sample_values: Vec<String>,
}

impl CatalogField {
    /// Render the text that gets embedded for this field at index build time
    #[inline]
    pub fn embedding_text(&self) -> String {
        let mut lines = vec![
            format!(
                "Database: {} - {}",
                self.database_name, self.database_description
            ),
            format!("Table: {} - {}", self.table_name, self.table_description),
        ];

        if self.business_name.is_empty() {
            lines.push(format!("Field: {}", self.field_name));
        } else {
            lines.push(format!(
                "Field: {} ({})",
                self.field_name, self.business_name
            ));
        }

        if !self.business_description.is_empty() {
            lines.push(format!("Description: {}", self.business_description));
        }

        if !self.data_type.is_empty() {
            match self.length {
                Some(length) => lines.push(format!("Type: {}({})", self.data_type, length)),
                None => lines.push(format!("Type: {}", self.data_type)),
            }
        }

        if !self.tags.is_empty() {
            lines.push(format!("Tags: {}", self.tags.iter().join(", ")));
        }

        if !self.sample_values.is_empty() {
            lines.push(format!(
                "Sample values: {}",
                self.sample_values
                    .iter()
                    .take(EMBEDDED_SAMPLE_VALUES)
                    .join(", ")
            ));
        }

        lines.join("\n")
    }
}

/// The raw, nested catalog as it is authored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub databases: Vec<CatalogDatabase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDatabase {
    #[serde(alias = "database_code")]
    pub database_name: String,
    #[serde(default)]
    pub database_description: String,
    #[serde(default)]
    pub tables: Vec<CatalogTable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTable {
    pub table_name: String,
    #[serde(default)]
    pub table_description: String,
    #[serde(default)]
    pub fields: Vec<RawField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    pub field_name: String,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub business_description: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sample_values: Vec<String>,
}

impl Catalog {
    /// Load a catalog from a JSON file
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading catalog from {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;

        let catalog = Self::from_json(&content)?;
        info!(
            "Loaded catalog with {} databases and {} fields",
            catalog.databases.len(),
            catalog.field_count()
        );
        Ok(catalog)
    }

    #[inline]
    pub fn from_json(content: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(content)
            .map_err(|e| WingmanError::Catalog(format!("Failed to parse catalog: {}", e)))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reject catalogs with entries that cannot be addressed by name
    #[inline]
    pub fn validate(&self) -> Result<()> {
        for database in &self.databases {
            if database.database_name.trim().is_empty() {
                return Err(WingmanError::Catalog(
                    "Database name cannot be empty".to_string(),
                ));
            }

            for table in &database.tables {
                if table.table_name.trim().is_empty() {
                    return Err(WingmanError::Catalog(format!(
                        "Table name cannot be empty in database '{}'",
                        database.database_name
                    )));
                }

                if let Some(field) = table.fields.iter().find(|f| f.field_name.trim().is_empty())
                {
                    return Err(WingmanError::Catalog(format!(
                        "Field name cannot be empty in table '{}.{}' (business name: '{}')",
                        database.database_name, table.table_name, field.business_name
                    )));
                }
            }
        }

        Ok(())
    }

    #[inline]
    pub fn field_count(&self) -> usize {
        self.databases
            .iter()
            .flat_map(|db| &db.tables)
            .map(|table| table.fields.len())
            .sum()
    }

    /// Flatten the catalog into one record per field, in document order
    #[inline]
    pub fn fields(&self) -> Vec<CatalogField> {
        let mut fields = Vec::with_capacity(self.field_count());

        for database in &self.databases {
            for table in &database.tables {
                for field in &table.fields {
                    fields.push(CatalogField {
                        database_name: database.database_name.clone(),
                        database_description: database.database_description.clone(),
                        table_name: table.table_name.clone(),
                        table_description: table.table_description.clone(),
                        field_name: field.field_name.clone(),
                        business_name: field.business_name.clone(),
                        business_description: field.business_description.clone(),
                        data_type: field.data_type.clone(),
                        length: field.length,
                        tags: field.tags.iter().unique().cloned().collect(),
                        sample_values: field.sample_values.clone(),
                    });
                }
            }
        }

        fields
    }
}
