//! Heuristic analysis-mode selection.
//!
//! [`ModeSelectionService`] picks the analysis mode best suited to a
//! research question and a description of the data. Local keyword and
//! structure heuristics handle the obvious cases; an optional LLM provider
//! refines ambiguous ones. Selection never fails: when nothing clears the
//! confidence floor the service falls back to a safe default so the
//! orchestrator always receives an actionable mode.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::model::{DataFormat, DataPayload};
use crate::provider::CapabilityProvider;

/// Default minimum confidence for a heuristic or LLM recommendation to be
/// accepted without falling back.
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.55;

/// The closed set of analysis modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Graph-only analysis.
    GraphAnalysis,
    /// Table-only analysis.
    TableAnalysis,
    /// Vector-only analysis.
    VectorAnalysis,
    /// Graph and table combined.
    HybridGraphTable,
    /// Table and vector combined.
    HybridTableVector,
    /// All three formats.
    ComprehensiveMultimodal,
}

impl AnalysisMode {
    /// The mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::GraphAnalysis => "graph_analysis",
            AnalysisMode::TableAnalysis => "table_analysis",
            AnalysisMode::VectorAnalysis => "vector_analysis",
            AnalysisMode::HybridGraphTable => "hybrid_graph_table",
            AnalysisMode::HybridTableVector => "hybrid_table_vector",
            AnalysisMode::ComprehensiveMultimodal => "comprehensive_multimodal",
        }
    }

    /// The data formats this mode analyzes, in execution order.
    pub fn formats(&self) -> Vec<DataFormat> {
        match self {
            AnalysisMode::GraphAnalysis => vec![DataFormat::Graph],
            AnalysisMode::TableAnalysis => vec![DataFormat::Table],
            AnalysisMode::VectorAnalysis => vec![DataFormat::Vector],
            AnalysisMode::HybridGraphTable => vec![DataFormat::Graph, DataFormat::Table],
            AnalysisMode::HybridTableVector => vec![DataFormat::Table, DataFormat::Vector],
            AnalysisMode::ComprehensiveMultimodal => {
                vec![DataFormat::Graph, DataFormat::Table, DataFormat::Vector]
            }
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "graph_analysis" => Ok(AnalysisMode::GraphAnalysis),
            "table_analysis" => Ok(AnalysisMode::TableAnalysis),
            "vector_analysis" => Ok(AnalysisMode::VectorAnalysis),
            "hybrid_graph_table" => Ok(AnalysisMode::HybridGraphTable),
            "hybrid_table_vector" => Ok(AnalysisMode::HybridTableVector),
            "comprehensive_multimodal" => Ok(AnalysisMode::ComprehensiveMultimodal),
            _ => Err(format!("Unknown analysis mode: {}", s)),
        }
    }
}

/// Rough execution cost class, advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceClass {
    /// Sub-second, fits comfortably in memory.
    Light,
    /// Seconds; may call the embedding provider.
    Moderate,
    /// Multi-format workload with several conversions.
    Heavy,
}

impl std::fmt::Display for PerformanceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PerformanceClass::Light => "light",
            PerformanceClass::Moderate => "moderate",
            PerformanceClass::Heavy => "heavy",
        };
        write!(f, "{}", s)
    }
}

/// Advisory cost projection for a selected mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatedPerformance {
    /// Projected execution time class.
    pub time_class: PerformanceClass,
    /// Projected memory class.
    pub memory_class: PerformanceClass,
}

/// Description of the data a mode is being selected for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataContext {
    /// Approximate serialized payload size in bytes.
    pub data_size: usize,
    /// Free-text hints about the kinds of data present.
    #[serde(default)]
    pub data_types: Vec<String>,
    /// Number of entities (nodes or rows).
    pub entity_count: usize,
    /// Number of relationships (edges), zero for non-graph data.
    pub relationship_count: usize,
    /// Whether temporal fields were detected.
    pub has_temporal_data: bool,
    /// Whether spatial fields were detected.
    pub has_spatial_data: bool,
    /// Whether the structure looks hierarchical.
    pub has_hierarchical_structure: bool,
}

impl DataContext {
    /// Describe a payload: counts plus detected structural hints.
    pub fn from_payload(data: &DataPayload) -> Self {
        let data_size = serde_json::to_vec(data).map(|v| v.len()).unwrap_or(0);
        let entity_count = data.entity_count();

        let (relationship_count, names, edge_types) = match data {
            DataPayload::Graph(g) => {
                let names: Vec<String> = g
                    .nodes
                    .iter()
                    .flat_map(|n| n.properties.keys().cloned())
                    .collect();
                let edge_types: Vec<String> =
                    g.edges.iter().map(|e| e.edge_type.to_lowercase()).collect();
                (g.edges.len(), names, edge_types)
            }
            DataPayload::Table(t) => (0, t.columns.clone(), Vec::new()),
            DataPayload::Vector(_) => (0, Vec::new(), Vec::new()),
        };

        let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        let has_temporal_data = lowered.iter().any(|n| {
            n.contains("date") || n.contains("time") || n.contains("year") || n.contains("month")
        });
        let has_spatial_data = lowered.iter().any(|n| {
            n.contains("lat") || n.contains("lon") || n.contains("geo") || n.contains("location")
        });
        let has_hierarchical_structure = edge_types.iter().any(|t| {
            t.contains("parent") || t.contains("child") || t.contains("contains") || t.contains("part_of")
        });

        let data_types = match data {
            DataPayload::Graph(_) => vec!["graph".to_string()],
            DataPayload::Table(_) => vec!["table".to_string()],
            DataPayload::Vector(_) => vec!["vector".to_string()],
        };

        Self {
            data_size,
            data_types,
            entity_count,
            relationship_count,
            has_temporal_data,
            has_spatial_data,
            has_hierarchical_structure,
        }
    }
}

/// Outcome of mode selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeSelectionResult {
    /// The selected mode.
    pub primary_mode: AnalysisMode,
    /// Lower-ranked candidate modes, best first.
    pub secondary_modes: Vec<AnalysisMode>,
    /// Confidence in the primary mode (0.0-1.0).
    pub confidence: f64,
    /// Explanation for audit and debugging, not for machine parsing.
    pub reasoning: String,
    /// Named steps the orchestrator should expect to execute.
    pub workflow_steps: Vec<String>,
    /// Advisory cost projection.
    pub estimated_performance: EstimatedPerformance,
    /// True when the safe default was used instead of a ranked candidate.
    pub fallback_used: bool,
}

/// Structured completion shape requested from the LLM provider.
#[derive(Debug, Deserialize)]
struct ModeSuggestion {
    primary_mode: String,
    confidence: f64,
    reasoning: String,
    #[serde(default)]
    secondary_modes: Vec<String>,
}

/// Mode selector over a research question and data context.
#[derive(Clone)]
pub struct ModeSelectionService {
    provider: Option<Arc<dyn CapabilityProvider>>,
    confidence_floor: f64,
}

impl ModeSelectionService {
    /// Create a selector with no provider and the default confidence floor.
    pub fn new() -> Self {
        Self {
            provider: None,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
        }
    }

    /// Attach an LLM provider for ambiguous questions.
    pub fn with_provider(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Override the confidence floor.
    pub fn with_confidence_floor(mut self, floor: f64) -> Self {
        self.confidence_floor = floor;
        self
    }

    /// Select the best analysis mode for `research_question` over data
    /// described by `context`. Never fails: ambiguity resolves to a safe
    /// default with `fallback_used = true`.
    pub async fn select_optimal_mode(
        &self,
        research_question: &str,
        context: &DataContext,
    ) -> ModeSelectionResult {
        debug!(
            question_len = research_question.len(),
            entities = context.entity_count,
            relationships = context.relationship_count,
            "Selecting analysis mode"
        );

        let ranked = rank_candidates(research_question, context);
        if let Some((mode, confidence, reasoning)) = ranked.first() {
            if *confidence >= self.confidence_floor {
                let secondary = ranked.iter().skip(1).map(|(m, _, _)| *m).collect();
                info!(
                    mode = %mode,
                    confidence,
                    source = "heuristics",
                    "Mode selected via heuristics"
                );
                return self.build_result(*mode, secondary, *confidence, reasoning.clone(), false, context);
            }
        }

        if let Some(provider) = &self.provider {
            match self.ask_provider(provider, research_question, context).await {
                Ok(result) => return result,
                Err(e) => {
                    warn!(error = %e, "LLM mode suggestion unusable, using fallback");
                }
            }
        }

        let fallback = if context.relationship_count > 0 {
            AnalysisMode::HybridGraphTable
        } else {
            AnalysisMode::TableAnalysis
        };
        info!(mode = %fallback, source = "fallback", "Mode selected via safe default");
        self.build_result(
            fallback,
            vec![],
            self.confidence_floor,
            "No candidate cleared the confidence floor; using the safe default for this data shape"
                .to_string(),
            true,
            context,
        )
    }

    /// Build a selection result honoring the caller's explicit mode choice.
    /// Returns `None` when no preference was given.
    pub fn from_preference(
        &self,
        preferred: &[AnalysisMode],
        context: &DataContext,
    ) -> Option<ModeSelectionResult> {
        let (&primary, rest) = preferred.split_first()?;
        Some(self.build_result(
            primary,
            rest.to_vec(),
            1.0,
            "Caller-preferred mode".to_string(),
            false,
            context,
        ))
    }

    async fn ask_provider(
        &self,
        provider: &Arc<dyn CapabilityProvider>,
        research_question: &str,
        context: &DataContext,
    ) -> Result<ModeSelectionResult, String> {
        let prompt = format!(
            "Recommend an analysis mode for this research question.\n\n\
             Question: {}\n\n\
             Data: {} entities, {} relationships, ~{} bytes. \
             Temporal: {}. Spatial: {}. Hierarchical: {}.\n\n\
             Answer with one of: graph_analysis, table_analysis, vector_analysis, \
             hybrid_graph_table, hybrid_table_vector, comprehensive_multimodal.",
            research_question,
            context.entity_count,
            context.relationship_count,
            context.data_size,
            context.has_temporal_data,
            context.has_spatial_data,
            context.has_hierarchical_structure,
        );
        let schema = json!({
            "type": "object",
            "required": ["primary_mode", "confidence", "reasoning"],
            "properties": {
                "primary_mode": { "type": "string" },
                "confidence": { "type": "number" },
                "reasoning": { "type": "string" },
                "secondary_modes": { "type": "array", "items": { "type": "string" } }
            }
        });

        let value = provider
            .generate_structured_completion(&prompt, &schema)
            .await
            .map_err(|e| e.to_string())?;
        let suggestion: ModeSuggestion =
            serde_json::from_value(value).map_err(|e| format!("unparseable suggestion: {}", e))?;

        let primary: AnalysisMode = suggestion.primary_mode.parse()?;
        if suggestion.confidence < self.confidence_floor {
            return Err(format!(
                "suggested confidence {:.2} below floor {:.2}",
                suggestion.confidence, self.confidence_floor
            ));
        }

        let secondary = suggestion
            .secondary_modes
            .iter()
            .filter_map(|s| s.parse().ok())
            .filter(|m| *m != primary)
            .collect();

        info!(
            mode = %primary,
            confidence = suggestion.confidence,
            source = "provider",
            "Mode selected via LLM provider"
        );
        Ok(self.build_result(
            primary,
            secondary,
            suggestion.confidence.clamp(0.0, 1.0),
            suggestion.reasoning,
            false,
            context,
        ))
    }

    fn build_result(
        &self,
        primary_mode: AnalysisMode,
        secondary_modes: Vec<AnalysisMode>,
        confidence: f64,
        reasoning: String,
        fallback_used: bool,
        context: &DataContext,
    ) -> ModeSelectionResult {
        let workflow_steps = workflow_steps_for(primary_mode);
        let estimated_performance = estimate_performance(primary_mode, context);
        ModeSelectionResult {
            primary_mode,
            secondary_modes,
            confidence,
            reasoning,
            workflow_steps,
            estimated_performance,
            fallback_used,
        }
    }
}

impl Default for ModeSelectionService {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyword and structure heuristics, ranked best first.
fn rank_candidates(
    research_question: &str,
    context: &DataContext,
) -> Vec<(AnalysisMode, f64, String)> {
    let question = research_question.to_lowercase();

    let graph_hits = count_hits(
        &question,
        &[
            "relationship", "network", "connect", "path", "centrality", "communit",
            "influence", "link", "neighbor",
        ],
    );
    let table_hits = count_hits(
        &question,
        &[
            "aggregate", "count", "average", "trend", "statistic", "distribution",
            "summar", "frequen", "per year", "over time",
        ],
    );
    let vector_hits = count_hits(
        &question,
        &[
            "similar", "embedding", "cluster", "semantic", "nearest", "alike",
        ],
    );

    let mut scores: Vec<(AnalysisMode, f64, String)> = Vec::new();

    // Structure boosts: relationships favor graph work, temporal fields
    // favor tabular work.
    let graph_boost = if context.relationship_count > 0 { 0.1 } else { 0.0 };
    let table_boost = if context.has_temporal_data { 0.1 } else { 0.0 };

    if graph_hits > 0 && table_hits > 0 {
        scores.push((
            AnalysisMode::HybridGraphTable,
            confidence_for(graph_hits + table_hits) + graph_boost,
            "Question mixes relationship and statistical language".to_string(),
        ));
    }
    if table_hits > 0 && vector_hits > 0 {
        scores.push((
            AnalysisMode::HybridTableVector,
            confidence_for(table_hits + vector_hits),
            "Question mixes statistical and similarity language".to_string(),
        ));
    }
    if graph_hits > 0 && table_hits > 0 && vector_hits > 0 {
        scores.push((
            AnalysisMode::ComprehensiveMultimodal,
            confidence_for(graph_hits + table_hits + vector_hits),
            "Question spans all three analysis styles".to_string(),
        ));
    }
    if graph_hits > 0 {
        scores.push((
            AnalysisMode::GraphAnalysis,
            confidence_for(graph_hits) + graph_boost,
            "Question asks about relationships or network structure".to_string(),
        ));
    }
    if table_hits > 0 {
        scores.push((
            AnalysisMode::TableAnalysis,
            confidence_for(table_hits) + table_boost,
            "Question asks for aggregates or statistics".to_string(),
        ));
    }
    if vector_hits > 0 {
        scores.push((
            AnalysisMode::VectorAnalysis,
            confidence_for(vector_hits),
            "Question asks about similarity or semantic structure".to_string(),
        ));
    }

    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (_, confidence, _) in &mut scores {
        *confidence = confidence.min(0.95);
    }
    scores
}

fn count_hits(question: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| question.contains(*k)).count()
}

fn confidence_for(hits: usize) -> f64 {
    0.55 + 0.1 * hits as f64
}

fn workflow_steps_for(mode: AnalysisMode) -> Vec<String> {
    let mut steps = Vec::new();
    for format in mode.formats() {
        steps.push(format!("convert_to_{}", format));
        steps.push(format!("validate_{}", format));
    }
    steps.push("aggregate_results".to_string());
    steps
}

fn estimate_performance(mode: AnalysisMode, context: &DataContext) -> EstimatedPerformance {
    let breadth = mode.formats().len();
    let time_class = match (breadth, context.entity_count) {
        (1, n) if n < 10_000 => PerformanceClass::Light,
        (1, _) | (2, _) => PerformanceClass::Moderate,
        _ => PerformanceClass::Heavy,
    };
    let memory_class = if context.data_size > 50_000_000 {
        PerformanceClass::Heavy
    } else if context.data_size > 1_000_000 {
        PerformanceClass::Moderate
    } else {
        PerformanceClass::Light
    };
    EstimatedPerformance {
        time_class,
        memory_class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphEdge, GraphNode, GraphPayload};
    use crate::provider::{MockCapabilityProvider, StubProvider};

    fn graph_context() -> DataContext {
        DataContext {
            data_size: 4_096,
            data_types: vec!["graph".to_string()],
            entity_count: 100,
            relationship_count: 250,
            ..DataContext::default()
        }
    }

    fn flat_context() -> DataContext {
        DataContext {
            data_size: 2_048,
            data_types: vec!["table".to_string()],
            entity_count: 500,
            relationship_count: 0,
            ..DataContext::default()
        }
    }

    #[tokio::test]
    async fn test_relationship_question_selects_graph_analysis() {
        let service = ModeSelectionService::new();
        let result = service
            .select_optimal_mode(
                "Which entities have the most influence in the collaboration network?",
                &graph_context(),
            )
            .await;
        assert_eq!(result.primary_mode, AnalysisMode::GraphAnalysis);
        assert!(!result.fallback_used);
        assert!(result.confidence >= DEFAULT_CONFIDENCE_FLOOR);
    }

    #[tokio::test]
    async fn test_statistical_question_selects_table_analysis() {
        let service = ModeSelectionService::new();
        let result = service
            .select_optimal_mode(
                "What is the average publication count and its distribution?",
                &flat_context(),
            )
            .await;
        assert_eq!(result.primary_mode, AnalysisMode::TableAnalysis);
        assert!(!result.fallback_used);
    }

    #[tokio::test]
    async fn test_similarity_question_selects_vector_analysis() {
        let service = ModeSelectionService::new();
        let result = service
            .select_optimal_mode(
                "Find documents semantically similar to this abstract",
                &flat_context(),
            )
            .await;
        assert_eq!(result.primary_mode, AnalysisMode::VectorAnalysis);
    }

    #[tokio::test]
    async fn test_mixed_question_selects_hybrid_mode() {
        let service = ModeSelectionService::new();
        let result = service
            .select_optimal_mode(
                "Compute the average degree distribution across the network of relationships",
                &graph_context(),
            )
            .await;
        assert_eq!(result.primary_mode, AnalysisMode::HybridGraphTable);
        assert!(!result.secondary_modes.is_empty());
    }

    #[tokio::test]
    async fn test_vague_question_falls_back_with_relationships() {
        let service = ModeSelectionService::new();
        let result = service
            .select_optimal_mode("Tell me something interesting", &graph_context())
            .await;
        assert!(result.fallback_used);
        assert_eq!(result.primary_mode, AnalysisMode::HybridGraphTable);
    }

    #[tokio::test]
    async fn test_vague_question_falls_back_without_relationships() {
        let service = ModeSelectionService::new();
        let result = service
            .select_optimal_mode("Tell me something interesting", &flat_context())
            .await;
        assert!(result.fallback_used);
        assert_eq!(result.primary_mode, AnalysisMode::TableAnalysis);
    }

    #[tokio::test]
    async fn test_provider_suggestion_used_when_parseable() {
        let mut mock = MockCapabilityProvider::new();
        mock.expect_generate_structured_completion()
            .times(1)
            .returning(|_, _| {
                Ok(serde_json::json!({
                    "primary_mode": "vector_analysis",
                    "confidence": 0.9,
                    "reasoning": "semantic retrieval question",
                    "secondary_modes": ["table_analysis"]
                }))
            });

        let service = ModeSelectionService::new().with_provider(Arc::new(mock));
        let result = service
            .select_optimal_mode("Tell me something interesting", &flat_context())
            .await;
        assert_eq!(result.primary_mode, AnalysisMode::VectorAnalysis);
        assert_eq!(result.secondary_modes, vec![AnalysisMode::TableAnalysis]);
        assert!(!result.fallback_used);
    }

    #[tokio::test]
    async fn test_unusable_provider_output_never_raises() {
        // The stub returns JSON that does not match ModeSuggestion.
        let service = ModeSelectionService::new().with_provider(Arc::new(StubProvider::default()));
        let result = service
            .select_optimal_mode("Tell me something interesting", &graph_context())
            .await;
        assert!(result.fallback_used);
        assert_eq!(result.primary_mode, AnalysisMode::HybridGraphTable);
    }

    #[tokio::test]
    async fn test_low_confidence_provider_suggestion_rejected() {
        let mut mock = MockCapabilityProvider::new();
        mock.expect_generate_structured_completion().returning(|_, _| {
            Ok(serde_json::json!({
                "primary_mode": "graph_analysis",
                "confidence": 0.2,
                "reasoning": "not sure"
            }))
        });

        let service = ModeSelectionService::new().with_provider(Arc::new(mock));
        let result = service
            .select_optimal_mode("Tell me something interesting", &flat_context())
            .await;
        assert!(result.fallback_used);
        assert_eq!(result.primary_mode, AnalysisMode::TableAnalysis);
    }

    #[test]
    fn test_data_context_from_graph_payload() {
        let data = DataPayload::Graph(GraphPayload {
            nodes: vec![
                GraphNode::new("1").with_property("start_date", serde_json::json!("2020-01-01")),
                GraphNode::new("2"),
            ],
            edges: vec![GraphEdge::new("1", "2", "PARENT_OF")],
        });
        let context = DataContext::from_payload(&data);
        assert_eq!(context.entity_count, 2);
        assert_eq!(context.relationship_count, 1);
        assert!(context.has_temporal_data);
        assert!(context.has_hierarchical_structure);
        assert!(!context.has_spatial_data);
        assert!(context.data_size > 0);
    }

    #[test]
    fn test_mode_formats() {
        assert_eq!(AnalysisMode::GraphAnalysis.formats(), vec![DataFormat::Graph]);
        assert_eq!(AnalysisMode::ComprehensiveMultimodal.formats().len(), 3);
    }

    #[test]
    fn test_mode_parse_round_trip() {
        for mode in [
            AnalysisMode::GraphAnalysis,
            AnalysisMode::TableAnalysis,
            AnalysisMode::VectorAnalysis,
            AnalysisMode::HybridGraphTable,
            AnalysisMode::HybridTableVector,
            AnalysisMode::ComprehensiveMultimodal,
        ] {
            assert_eq!(mode.as_str().parse::<AnalysisMode>().unwrap(), mode);
        }
        assert!("unknown".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn test_workflow_steps_cover_mode_formats() {
        let steps = workflow_steps_for(AnalysisMode::HybridGraphTable);
        assert!(steps.iter().any(|s| s == "convert_to_graph"));
        assert!(steps.iter().any(|s| s == "validate_table"));
        assert_eq!(steps.last().map(String::as_str), Some("aggregate_results"));
    }

    #[test]
    fn test_estimate_performance_scales_with_breadth() {
        let context = flat_context();
        let light = estimate_performance(AnalysisMode::TableAnalysis, &context);
        let heavy = estimate_performance(AnalysisMode::ComprehensiveMultimodal, &context);
        assert_eq!(light.time_class, PerformanceClass::Light);
        assert_eq!(heavy.time_class, PerformanceClass::Heavy);
    }
}
