//! Canonical data model for cross-modal payloads.
//!
//! Every payload crossing a pipeline boundary is one of three shapes:
//! - [`GraphPayload`]: nodes and edges with arbitrary property maps
//! - [`TablePayload`]: rows over named columns with inferred column types
//! - [`VectorPayload`]: a dense 2-D numeric array, one row per entity
//!
//! [`DataPayload`] is the tagged union over the three; [`ConversionResult`]
//! is the value object every conversion call produces.

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical data formats at pipeline boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// Nodes and edges with property maps.
    Graph,
    /// Rows over named columns.
    Table,
    /// Dense 2-D numeric array.
    Vector,
}

impl DataFormat {
    /// Get the format name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Graph => "graph",
            DataFormat::Table => "table",
            DataFormat::Vector => "vector",
        }
    }

    /// All formats, in canonical order.
    pub fn all() -> [DataFormat; 3] {
        [DataFormat::Graph, DataFormat::Table, DataFormat::Vector]
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DataFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "graph" => Ok(DataFormat::Graph),
            "table" => Ok(DataFormat::Table),
            "vector" => Ok(DataFormat::Vector),
            _ => {
                let known: Vec<&str> = DataFormat::all().iter().map(|f| f.as_str()).collect();
                Err(format!(
                    "Unknown data format: {} (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            }
        }
    }
}

/// A node in a graph payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique node identifier.
    pub id: String,
    /// Optional node label (entity type).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Arbitrary node properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A directed edge in a graph payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relationship type.
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Optional edge weight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Arbitrary edge properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Graph payload: ordered node and edge sequences.
///
/// Edges referencing unknown node ids are tolerated (upstream extraction is
/// noisy); the converter flags them as warnings rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
    /// Ordered nodes.
    pub nodes: Vec<GraphNode>,
    /// Ordered edges.
    pub edges: Vec<GraphEdge>,
}

/// Inferred column type for table payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// All non-null cells parse as numbers.
    Numeric,
    /// Repeated string values from a small domain.
    Categorical,
    /// Mostly-unique string values (keys, ids).
    Identifier,
}

/// Table payload: rows over uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
    /// Column names, unique within the table.
    pub columns: Vec<String>,
    /// Rows; each row has exactly `columns.len()` cells (null for missing).
    pub rows: Vec<Vec<Value>>,
}

/// Vector payload: one row per entity, fixed embedding width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPayload {
    /// The dense numeric array (rows x dimension).
    pub data: Array2<f64>,
    /// Optional per-row entity ids, aligned with array rows.
    #[serde(default)]
    pub row_ids: Vec<String>,
}

impl GraphNode {
    /// Create a node with just an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            properties: Map::new(),
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

impl GraphEdge {
    /// Create an edge between two node ids.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_type: edge_type.into(),
            weight: None,
            properties: Map::new(),
        }
    }

    /// Set the weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

impl GraphPayload {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the graph has neither nodes nor edges.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Ids of edge endpoints that reference no existing node.
    pub fn dangling_references(&self) -> Vec<String> {
        let known: std::collections::HashSet<&str> =
            self.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut dangling = Vec::new();
        for edge in &self.edges {
            if !known.contains(edge.source.as_str()) {
                dangling.push(edge.source.clone());
            }
            if !known.contains(edge.target.as_str()) {
                dangling.push(edge.target.clone());
            }
        }
        dangling.sort();
        dangling.dedup();
        dangling
    }
}

impl TablePayload {
    /// Create a table from columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Infer the type of one column from its non-null cells.
    ///
    /// Numeric wins when every non-null cell is a number; otherwise the
    /// column is an identifier when values are mostly unique, categorical
    /// when they repeat.
    pub fn infer_column_type(&self, index: usize) -> ColumnType {
        let cells: Vec<&Value> = self
            .rows
            .iter()
            .filter_map(|row| row.get(index))
            .filter(|v| !v.is_null())
            .collect();

        if cells.is_empty() {
            return ColumnType::Categorical;
        }

        if cells.iter().all(|v| v.is_number()) {
            return ColumnType::Numeric;
        }

        let distinct: std::collections::HashSet<String> =
            cells.iter().map(|v| v.to_string()).collect();
        // Mostly-unique string columns are treated as identifier columns.
        if distinct.len() * 2 > cells.len() {
            ColumnType::Identifier
        } else {
            ColumnType::Categorical
        }
    }

    /// True when column names are unique.
    pub fn columns_unique(&self) -> bool {
        let distinct: std::collections::HashSet<&str> =
            self.columns.iter().map(|c| c.as_str()).collect();
        distinct.len() == self.columns.len()
    }
}

impl VectorPayload {
    /// Create a payload from a dense array.
    pub fn new(data: Array2<f64>) -> Self {
        Self {
            data,
            row_ids: Vec::new(),
        }
    }

    /// Attach per-row entity ids.
    pub fn with_row_ids(mut self, row_ids: Vec<String>) -> Self {
        self.row_ids = row_ids;
        self
    }

    /// True when the array has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Number of rows (entities).
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    /// Embedding dimension.
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// True when every cell is finite (no NaN/Inf).
    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Tagged union over the three payload shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "payload", rename_all = "snake_case")]
pub enum DataPayload {
    /// Graph payload.
    Graph(GraphPayload),
    /// Table payload.
    Table(TablePayload),
    /// Vector payload.
    Vector(VectorPayload),
}

impl DataPayload {
    /// The format tag of this payload.
    pub fn format(&self) -> DataFormat {
        match self {
            DataPayload::Graph(_) => DataFormat::Graph,
            DataPayload::Table(_) => DataFormat::Table,
            DataPayload::Vector(_) => DataFormat::Vector,
        }
    }

    /// Borrow as a graph, if this is one.
    pub fn as_graph(&self) -> Option<&GraphPayload> {
        match self {
            DataPayload::Graph(g) => Some(g),
            _ => None,
        }
    }

    /// Borrow as a table, if this is one.
    pub fn as_table(&self) -> Option<&TablePayload> {
        match self {
            DataPayload::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Borrow as a vector payload, if this is one.
    pub fn as_vector(&self) -> Option<&VectorPayload> {
        match self {
            DataPayload::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Entity count: nodes for graphs, rows for tables and vectors.
    pub fn entity_count(&self) -> usize {
        match self {
            DataPayload::Graph(g) => g.nodes.len(),
            DataPayload::Table(t) => t.rows.len(),
            DataPayload::Vector(v) => v.nrows(),
        }
    }
}

/// Timing and size bookkeeping for one conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionMetadata {
    /// Wall-clock duration of the conversion in milliseconds.
    pub duration_ms: u64,
    /// Entity count before conversion.
    pub source_entities: usize,
    /// Entity count after conversion.
    pub target_entities: usize,
    /// When the conversion finished.
    pub completed_at: DateTime<Utc>,
}

/// Result of one conversion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// The converted payload.
    pub data: DataPayload,
    /// Declared source format.
    pub source_format: DataFormat,
    /// Requested target format.
    pub target_format: DataFormat,
    /// Fraction of semantic content judged preserved, in [0, 1].
    pub preservation_score: f64,
    /// Timing and size bookkeeping.
    pub conversion_metadata: ConversionMetadata,
    /// The output payload passes the same structural validation applied to
    /// inputs. False for degenerate outputs that cannot feed a further
    /// conversion, such as an empty table built from an empty graph.
    pub validation_passed: bool,
    /// Preservation cleared the configured semantic-integrity threshold.
    pub semantic_integrity: bool,
    /// Human-readable warnings accumulated during conversion.
    pub warnings: Vec<String>,
}
