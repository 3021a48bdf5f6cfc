//! Cross-modal conversion engine.
//!
//! [`CrossModalConverter`] converts a payload between the three canonical
//! formats, scoring how much semantic content each conversion preserved.
//! Dispatch is an explicit match over the nine `(source, target)` pairs;
//! identity conversion is a defined no-op that still runs through scoring.

mod graph_table;
mod graph_vector;
mod metrics;
mod table_vector;

pub use metrics::{AtomicMetrics, MetricsSink, NoopMetrics};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ThresholdConfig;
use crate::error::{ConversionError, ConvertResult};
use crate::model::{
    ConversionMetadata, ConversionResult, DataFormat, DataPayload, VectorPayload,
};
use crate::provider::CapabilityProvider;

/// Bounded attempts against the embedding provider before the structural
/// fallback kicks in.
const EMBED_ATTEMPTS: u32 = 2;

/// Which table view to produce from a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    /// One row per node.
    Nodes,
    /// One row per edge (the default view).
    #[default]
    Edges,
}

impl std::fmt::Display for TableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableType::Nodes => write!(f, "nodes"),
            TableType::Edges => write!(f, "edges"),
        }
    }
}

impl std::str::FromStr for TableType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nodes" => Ok(TableType::Nodes),
            "edges" => Ok(TableType::Edges),
            _ => Err(format!("Unknown table type: {}", s)),
        }
    }
}

/// How to vectorize a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorMethod {
    /// Deterministic per-node structural features (degree, clustering, ...).
    #[default]
    GraphFeatures,
    /// Node text passed through the embedding provider.
    Embedding,
}

impl std::str::FromStr for VectorMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "graph_features" | "graph-features" => Ok(VectorMethod::GraphFeatures),
            "embedding" => Ok(VectorMethod::Embedding),
            _ => Err(format!("Unknown vector method: {}", s)),
        }
    }
}

/// Per-call conversion knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Table view for GRAPH -> TABLE.
    #[serde(default)]
    pub table_type: TableType,
    /// Edge-source column for TABLE -> GRAPH.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
    /// Edge-target column for TABLE -> GRAPH.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
    /// Relationship-type column for TABLE -> GRAPH.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_column: Option<String>,
    /// Vectorization method for GRAPH -> VECTOR.
    #[serde(default)]
    pub vector_method: VectorMethod,
    /// Cosine threshold above which VECTOR -> GRAPH synthesizes edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
}

impl ConversionOptions {
    /// Set the table view.
    pub fn with_table_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    /// Set the edge-source column.
    pub fn with_source_column(mut self, column: impl Into<String>) -> Self {
        self.source_column = Some(column.into());
        self
    }

    /// Set the edge-target column.
    pub fn with_target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Set the relationship-type column.
    pub fn with_type_column(mut self, column: impl Into<String>) -> Self {
        self.type_column = Some(column.into());
        self
    }

    /// Set the vectorization method.
    pub fn with_vector_method(mut self, method: VectorMethod) -> Self {
        self.vector_method = method;
        self
    }

    /// Set the similarity threshold for synthesized edges.
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    /// Infer sensible options for converting `data` to `target`.
    ///
    /// A table produced by the edges view carries `source`/`target`/`type`
    /// columns; reuse them on the way back to a graph. Otherwise the first
    /// two columns are taken as edge endpoints.
    pub fn infer(data: &DataPayload, target: DataFormat) -> Self {
        let DataPayload::Table(table) = data else {
            return Self::default();
        };
        if target != DataFormat::Graph {
            return Self::default();
        }

        let mut options = Self::default();
        if table.column_index("source").is_some() && table.column_index("target").is_some() {
            options = options.with_source_column("source").with_target_column("target");
            if table.column_index("type").is_some() {
                options = options.with_type_column("type");
            }
        } else if table.columns.len() >= 2 {
            options = options
                .with_source_column(table.columns[0].clone())
                .with_target_column(table.columns[1].clone());
        }
        options
    }
}

/// Intermediate result of one pair-specific conversion.
pub(crate) struct ConversionOutcome {
    pub data: DataPayload,
    pub preservation_score: f64,
    pub warnings: Vec<String>,
}

/// Converter between the three canonical formats.
#[derive(Clone)]
pub struct CrossModalConverter {
    provider: Option<Arc<dyn CapabilityProvider>>,
    metrics: Arc<dyn MetricsSink>,
    thresholds: ThresholdConfig,
}

impl CrossModalConverter {
    /// Create a converter with no provider, a no-op metrics sink, and
    /// default thresholds.
    pub fn new() -> Self {
        Self {
            provider: None,
            metrics: Arc::new(NoopMetrics),
            thresholds: ThresholdConfig::default(),
        }
    }

    /// Attach an embedding/LLM capability provider.
    pub fn with_provider(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Attach a metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Override the threshold configuration.
    pub fn with_thresholds(mut self, thresholds: ThresholdConfig) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// The configured semantic-integrity threshold.
    pub fn semantic_integrity_threshold(&self) -> f64 {
        self.thresholds.semantic_integrity
    }

    /// Convert `data` from `source_format` to `target_format`.
    ///
    /// Malformed input fails fast with [`ConversionError`]; conversions
    /// whose preservation falls below the hard integrity floor fail with
    /// [`ConversionError::IntegrityFloor`]. Provider hiccups during
    /// embedding are retried and then fall back to the structural encoding,
    /// recorded in `warnings` - they never escape this call.
    pub async fn convert_data(
        &self,
        data: &DataPayload,
        source_format: DataFormat,
        target_format: DataFormat,
        options: &ConversionOptions,
    ) -> ConvertResult<ConversionResult> {
        let start = Instant::now();
        let source_entities = data.entity_count();

        self.validate_input(data, source_format)?;

        let mut outcome = if source_format == target_format {
            // Identity conversion: defined no-op, trivially lossless.
            ConversionOutcome {
                data: data.clone(),
                preservation_score: 1.0,
                warnings: Vec::new(),
            }
        } else {
            self.dispatch(data, source_format, target_format, options)
                .await?
        };

        let needs_repair =
            matches!(&outcome.data, DataPayload::Vector(v) if !v.all_finite());
        if needs_repair {
            Self::repair_non_finite(&mut outcome);
        }

        let preservation_score = outcome.preservation_score.clamp(0.0, 1.0);
        if preservation_score < self.thresholds.integrity_floor {
            return Err(ConversionError::IntegrityFloor {
                score: preservation_score,
                floor: self.thresholds.integrity_floor,
                source_format,
                target_format,
            });
        }

        let duration = start.elapsed();
        self.metrics
            .record_conversion(source_format, target_format, duration);

        let semantic_integrity = preservation_score >= self.thresholds.semantic_integrity;
        // Degenerate outputs (an empty table from an empty graph, say) are
        // flagged here: they succeeded, but cannot feed a further conversion.
        let validation_passed = self.validate_input(&outcome.data, target_format).is_ok();

        info!(
            source = %source_format,
            target = %target_format,
            preservation = preservation_score,
            duration_ms = duration.as_millis(),
            warnings = outcome.warnings.len(),
            "Conversion completed"
        );

        Ok(ConversionResult {
            source_format,
            target_format,
            preservation_score,
            conversion_metadata: ConversionMetadata {
                duration_ms: duration.as_millis() as u64,
                source_entities,
                target_entities: outcome.data.entity_count(),
                completed_at: Utc::now(),
            },
            validation_passed,
            semantic_integrity,
            warnings: outcome.warnings,
            data: outcome.data,
        })
    }

    /// Structural validation of the input payload.
    ///
    /// Empty graphs are valid-but-trivial; empty tables and vectors are
    /// rejected because the caller almost certainly passed the wrong
    /// object.
    fn validate_input(&self, data: &DataPayload, source_format: DataFormat) -> ConvertResult<()> {
        let actual = data.format();
        if actual != source_format {
            return Err(ConversionError::FormatMismatch {
                declared: source_format,
                actual,
            });
        }

        match data {
            DataPayload::Graph(_) => Ok(()),
            DataPayload::Table(table) => {
                if !table.columns_unique() {
                    return Err(ConversionError::MalformedPayload {
                        format: DataFormat::Table,
                        message: "duplicate column names".to_string(),
                    });
                }
                if let Some(bad) = table
                    .rows
                    .iter()
                    .position(|row| row.len() != table.columns.len())
                {
                    return Err(ConversionError::MalformedPayload {
                        format: DataFormat::Table,
                        message: format!(
                            "row {} has {} cells, expected {}",
                            bad,
                            table.rows[bad].len(),
                            table.columns.len()
                        ),
                    });
                }
                if table.is_empty() {
                    return Err(ConversionError::EmptyPayload {
                        format: DataFormat::Table,
                    });
                }
                Ok(())
            }
            DataPayload::Vector(vector) => {
                if vector.is_empty() {
                    return Err(ConversionError::EmptyPayload {
                        format: DataFormat::Vector,
                    });
                }
                Ok(())
            }
        }
    }

    async fn dispatch(
        &self,
        data: &DataPayload,
        source_format: DataFormat,
        target_format: DataFormat,
        options: &ConversionOptions,
    ) -> ConvertResult<ConversionOutcome> {
        // Input format already validated against the payload variant.
        match (data, target_format) {
            (DataPayload::Graph(graph), DataFormat::Table) => {
                graph_table::graph_to_table(graph, options)
            }
            (DataPayload::Graph(graph), DataFormat::Vector) => match options.vector_method {
                VectorMethod::GraphFeatures => graph_vector::graph_to_feature_vectors(graph),
                VectorMethod::Embedding => self.graph_to_embeddings(graph).await,
            },
            (DataPayload::Table(table), DataFormat::Graph) => {
                graph_table::table_to_graph(table, options)
            }
            (DataPayload::Table(table), DataFormat::Vector) => {
                table_vector::table_to_vector(table)
            }
            (DataPayload::Vector(vector), DataFormat::Graph) => {
                graph_vector::vector_to_graph(vector, options)
            }
            (DataPayload::Vector(vector), DataFormat::Table) => {
                table_vector::vector_to_table(vector)
            }
            _ => unreachable!(
                "identity pair {} -> {} handled before dispatch",
                source_format, target_format
            ),
        }
    }

    /// Embed node texts through the provider, falling back to the
    /// structural encoding when the provider is absent or keeps failing.
    async fn graph_to_embeddings(
        &self,
        graph: &crate::model::GraphPayload,
    ) -> ConvertResult<ConversionOutcome> {
        let Some(provider) = &self.provider else {
            let mut outcome = graph_vector::graph_to_feature_vectors(graph)?;
            outcome.warnings.push(
                "no embedding provider configured; used structural feature encoding".to_string(),
            );
            return Ok(outcome);
        };

        if graph.nodes.is_empty() {
            return graph_vector::graph_to_feature_vectors(graph);
        }

        let texts = graph_vector::node_texts(graph);
        let mut last_error = None;

        for attempt in 1..=EMBED_ATTEMPTS {
            match provider.generate_text_embeddings(&texts).await {
                Ok(matrix) => {
                    debug!(
                        rows = matrix.nrows(),
                        dim = matrix.ncols(),
                        attempt,
                        "Embedding provider returned matrix"
                    );
                    let row_ids = graph.nodes.iter().map(|n| n.id.clone()).collect();
                    let preservation_score = graph_vector::score_embedding_rows(&matrix);
                    let mut warnings = Vec::new();
                    if preservation_score < 1.0 {
                        warnings.push(format!(
                            "{:.0}% of embedding rows are degenerate (zero or non-finite)",
                            (1.0 - preservation_score) * 100.0
                        ));
                    }
                    return Ok(ConversionOutcome {
                        data: DataPayload::Vector(
                            VectorPayload::new(matrix).with_row_ids(row_ids),
                        ),
                        preservation_score,
                        warnings,
                    });
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts = EMBED_ATTEMPTS,
                        "Embedding provider call failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        let provider_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown provider error".to_string());
        let mut outcome = graph_vector::graph_to_feature_vectors(graph)?;
        outcome.warnings.push(format!(
            "embedding provider failed after {} attempts ({}); fell back to structural feature encoding",
            EMBED_ATTEMPTS, provider_error
        ));
        Ok(outcome)
    }

    /// Zero-fill non-finite cells in a vector outcome, recording the repair.
    fn repair_non_finite(outcome: &mut ConversionOutcome) {
        if let DataPayload::Vector(vector) = &mut outcome.data {
            let mut repaired = 0usize;
            for value in vector.data.iter_mut() {
                if !value.is_finite() {
                    *value = 0.0;
                    repaired += 1;
                }
            }
            outcome
                .warnings
                .push(format!("{} non-finite value(s) zero-filled", repaired));
        }
    }
}

impl Default for CrossModalConverter {
    fn default() -> Self {
        Self::new()
    }
}
