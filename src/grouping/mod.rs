// Result grouper
// Folds a ranked hit list into database -> table -> fields, in order of first appearance


use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::search::SearchHit;

/// Hits grouped by database and table.
///
/// Databases, tables and fields appear in the order they were first seen in the ranked hits,
/// so the grouping preserves relevance order rather than sorting by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedResults {
    databases: Vec<DatabaseGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseGroup {
    pub name: String,
    pub tables: Vec<TableGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGroup {
    pub name: String,
    pub fields: Vec<String>,
}

impl GroupedResults {
    #[inline]
    pub fn databases(&self) -> &[DatabaseGroup] {
        &self.databases
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    #[inline]
    pub fn database(&self, name: &str) -> Option<&DatabaseGroup> {
        self.databases.iter().find(|db| db.name == name)
    }

    /// Field names recorded for `database.table`
    #[inline]
    pub fn fields(&self, database: &str, table: &str) -> Option<&[String]> {
        self.database(database)?
            .table(table)
            .map(|t| t.fields.as_slice())
    }

    /// Append `field` under `database.table`, creating both groups on first sight.
    ///
    /// Repeated field names are kept so the grouping mirrors the raw results.
    #[inline]
    pub fn push(&mut self, database: &str, table: &str, field: &str) {
        let db_index = match self.databases.iter().position(|db| db.name == database) {
            Some(index) => index,
            None => {
                self.databases.push(DatabaseGroup {
                    name: database.to_string(),
                    tables: Vec::new(),
                });
                self.databases.len() - 1
            }
        };
        let db = &mut self.databases[db_index];

        let table_index = match db.tables.iter().position(|t| t.name == table) {
            Some(index) => index,
            None => {
                db.tables.push(TableGroup {
                    name: table.to_string(),
                    fields: Vec::new(),
                });
                db.tables.len() - 1
            }
        };

        db.tables[table_index].fields.push(field.to_string());
    }
}

impl DatabaseGroup {
    #[inline]
    pub fn table(&self, name: &str) -> Option<&TableGroup> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Group ranked hits by database and table
#[inline]
pub fn group(hits: &[SearchHit]) -> GroupedResults {
    let mut grouped = GroupedResults::default();
    for hit in hits {
        grouped.push(
            &hit.metadata.database_name,
            &hit.metadata.table_name,
            &hit.metadata.field_name,
        );
    }
    grouped
}

// Serialized as nested maps, e.g. {"sales": {"orders": ["customer_id"]}}, in first-seen order.

impl Serialize for GroupedResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.databases.len()))?;
        for db in &self.databases {
            map.serialize_entry(&db.name, db)?;
        }
        map.end()
    }
}

impl Serialize for DatabaseGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for table in &self.tables {
            map.serialize_entry(&table.name, &table.fields)?;
        }
        map.end()
    }
}
