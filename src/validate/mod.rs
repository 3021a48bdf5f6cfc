//! Multi-level conversion validation.
//!
//! [`CrossModalValidator`] scores a finished conversion (or a full
//! round-trip chain of conversions) with a suite of named checks. Each
//! [`ValidationLevel`] runs a strict superset of the previous level's
//! checks. A broken check is recorded as a failed test inside the report;
//! it never escapes as an error.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::convert::{ConversionOptions, CrossModalConverter};
use crate::error::ValidationError;
use crate::model::{ConversionResult, DataFormat, DataPayload, GraphPayload};

/// Budget for a single conversion before the performance-regression check
/// starts deducting.
const PERF_BUDGET_MS: u64 = 1_000;

/// How thorough a validation run is. Each level includes everything the
/// previous level checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    /// Structural checks only: entity counts, no corrupted values.
    Basic,
    /// Adds preservation-threshold and semantic-integrity checks.
    #[default]
    Standard,
    /// Adds statistical-distribution and performance-regression checks.
    Comprehensive,
}

impl ValidationLevel {
    /// Minimum `overall_score` for a report at this level to pass.
    pub fn pass_threshold(&self) -> f64 {
        match self {
            ValidationLevel::Basic => 0.6,
            ValidationLevel::Standard => 0.7,
            ValidationLevel::Comprehensive => 0.75,
        }
    }

    /// The level name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::Basic => "basic",
            ValidationLevel::Standard => "standard",
            ValidationLevel::Comprehensive => "comprehensive",
        }
    }
}

impl std::fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(ValidationLevel::Basic),
            "standard" => Ok(ValidationLevel::Standard),
            "comprehensive" => Ok(ValidationLevel::Comprehensive),
            _ => Err(format!("Unknown validation level: {}", s)),
        }
    }
}

/// Outcome of one named check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Check name, stable across releases (used for recommendations).
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Check score in [0, 1].
    pub score: f64,
    /// Optional human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Critical checks veto `overall_passed` when they fail.
    pub critical: bool,
}

impl TestResult {
    fn passed(name: &str, score: f64, critical: bool) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            score,
            detail: None,
            critical,
        }
    }

    fn failed(name: &str, score: f64, detail: String, critical: bool) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            score,
            detail: Some(detail),
            critical,
        }
    }
}

/// Timing bookkeeping for one validation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationPerformance {
    /// Wall-clock time of the validation itself, in milliseconds.
    pub validation_duration_ms: u64,
    /// Conversions executed by this validation (round trips only).
    pub conversions_executed: usize,
    /// Total time spent inside those conversions, in milliseconds.
    pub conversion_duration_ms: u64,
}

/// Scored outcome of a validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the run as a whole passed.
    pub overall_passed: bool,
    /// Mean of individual check scores, in [0, 1].
    pub overall_score: f64,
    /// Number of checks executed.
    pub total_tests: usize,
    /// Number of checks that passed.
    pub passed_tests: usize,
    /// Number of checks that failed.
    pub failed_tests: usize,
    /// Ordered per-check outcomes.
    pub test_results: Vec<TestResult>,
    /// Timing bookkeeping.
    pub performance_metrics: ValidationPerformance,
    /// Heuristic advice derived from failed checks.
    pub recommendations: Vec<String>,
    /// Level this report was produced at.
    pub validation_level: ValidationLevel,
}

impl ValidationReport {
    fn from_tests(
        tests: Vec<TestResult>,
        level: ValidationLevel,
        performance: ValidationPerformance,
        score_cap: Option<f64>,
    ) -> Self {
        let total_tests = tests.len();
        let passed_tests = tests.iter().filter(|t| t.passed).count();
        let failed_tests = total_tests - passed_tests;

        let mean = if total_tests == 0 {
            0.0
        } else {
            tests.iter().map(|t| t.score).sum::<f64>() / total_tests as f64
        };
        // Round trips cannot score above the weakest hop in the chain.
        let overall_score = match score_cap {
            Some(cap) => mean.min(cap),
            None => mean,
        }
        .clamp(0.0, 1.0);

        let critical_failure = tests.iter().any(|t| t.critical && !t.passed);
        let overall_passed = overall_score >= level.pass_threshold() && !critical_failure;

        let recommendations = recommend(&tests);

        Self {
            overall_passed,
            overall_score,
            total_tests,
            passed_tests,
            failed_tests,
            test_results: tests,
            performance_metrics: performance,
            recommendations,
            validation_level: level,
        }
    }
}

/// Validator over conversion results and round-trip chains.
pub struct CrossModalValidator {
    converter: CrossModalConverter,
}

impl CrossModalValidator {
    /// Create a validator that drives `converter` for round trips.
    pub fn new(converter: CrossModalConverter) -> Self {
        Self { converter }
    }

    /// Validate one finished conversion against its original payload.
    pub fn validate_cross_modal_conversion(
        &self,
        original: &DataPayload,
        converted: &ConversionResult,
        source_format: DataFormat,
        target_format: DataFormat,
        level: ValidationLevel,
    ) -> ValidationReport {
        let start = Instant::now();
        let tests = self.run_checks(original, converted, target_format, level);
        let performance = ValidationPerformance {
            validation_duration_ms: start.elapsed().as_millis() as u64,
            ..ValidationPerformance::default()
        };
        let report = ValidationReport::from_tests(tests, level, performance, None);

        info!(
            source = %source_format,
            target = %target_format,
            level = %level,
            passed = report.overall_passed,
            score = report.overall_score,
            "Conversion validated"
        );
        report
    }

    /// Run `format_sequence` as successive conversions starting from
    /// `original`, then compare the final payload against the original.
    ///
    /// The chain's minimum preservation score caps `overall_score`:
    /// round-tripping cannot manufacture information.
    pub async fn validate_round_trip_integrity(
        &self,
        original: &DataPayload,
        format_sequence: &[DataFormat],
        level: ValidationLevel,
    ) -> ValidationReport {
        let start = Instant::now();
        let mut tests = Vec::new();
        let mut performance = ValidationPerformance::default();

        let chain = match self.run_chain(original, format_sequence, &mut performance).await {
            Ok(chain) => chain,
            Err(e) => {
                warn!(error = %e, "Round-trip chain did not complete");
                tests.push(TestResult::failed(
                    "conversion_chain_completed",
                    0.0,
                    e.to_string(),
                    true,
                ));
                performance.validation_duration_ms = start.elapsed().as_millis() as u64;
                return ValidationReport::from_tests(tests, level, performance, Some(0.0));
            }
        };

        tests.push(TestResult::passed("conversion_chain_completed", 1.0, true));

        let min_preservation = chain
            .results
            .iter()
            .map(|r| r.preservation_score)
            .fold(1.0_f64, f64::min);

        if let Some(last) = chain.results.last() {
            tests.extend(self.run_checks(original, last, last.target_format, level));
        }

        performance.validation_duration_ms = start.elapsed().as_millis() as u64;
        let report =
            ValidationReport::from_tests(tests, level, performance, Some(min_preservation));

        info!(
            hops = format_sequence.len(),
            level = %level,
            passed = report.overall_passed,
            score = report.overall_score,
            min_preservation,
            "Round trip validated"
        );
        report
    }

    async fn run_chain(
        &self,
        original: &DataPayload,
        format_sequence: &[DataFormat],
        performance: &mut ValidationPerformance,
    ) -> Result<ChainOutcome, ValidationError> {
        if format_sequence.is_empty() {
            return Err(ValidationError::BadSequence {
                message: "format sequence is empty".to_string(),
            });
        }

        let mut current = original.clone();
        let mut results = Vec::with_capacity(format_sequence.len());

        for &target in format_sequence {
            let source = current.format();
            let options = ConversionOptions::infer(&current, target);
            let result = self
                .converter
                .convert_data(&current, source, target, &options)
                .await
                .map_err(|e| ValidationError::CheckFailed {
                    check: "conversion_chain_completed".to_string(),
                    message: format!("{} -> {}: {}", source, target, e),
                })?;

            performance.conversions_executed += 1;
            performance.conversion_duration_ms += result.conversion_metadata.duration_ms;
            debug!(
                source = %source,
                target = %target,
                preservation = result.preservation_score,
                "Round-trip hop completed"
            );
            current = result.data.clone();
            results.push(result);
        }

        Ok(ChainOutcome { results })
    }

    fn run_checks(
        &self,
        original: &DataPayload,
        converted: &ConversionResult,
        target_format: DataFormat,
        level: ValidationLevel,
    ) -> Vec<TestResult> {
        let mut tests = Vec::new();

        // BASIC: structural checks.
        tests.push(check_entity_counts(original, converted, target_format));
        if let (DataPayload::Graph(orig), DataPayload::Graph(conv)) = (original, &converted.data) {
            tests.push(check_edge_counts(orig, conv));
        }
        tests.push(check_no_corrupted_values(&converted.data));

        if level >= ValidationLevel::Standard {
            tests.push(check_preservation_threshold(
                converted,
                self.converter.semantic_integrity_threshold(),
            ));
            tests.push(check_semantic_integrity_flag(
                converted,
                self.converter.semantic_integrity_threshold(),
            ));
            tests.push(check_property_fidelity(original, &converted.data));
        }

        if level >= ValidationLevel::Comprehensive {
            tests.push(check_statistical_distribution(original, &converted.data));
            tests.push(check_performance_regression(converted));
        }

        tests
    }
}

struct ChainOutcome {
    results: Vec<ConversionResult>,
}

/// Expected entity count of the converted payload, when the pair defines
/// one. Table -> graph synthesizes nodes from endpoint values, so no fixed
/// expectation exists there.
fn expected_entities(original: &DataPayload, target_format: DataFormat) -> Option<Vec<usize>> {
    match (original, target_format) {
        (DataPayload::Graph(g), DataFormat::Table) => {
            // Either table view is acceptable.
            Some(vec![g.nodes.len(), g.edges.len()])
        }
        (DataPayload::Graph(g), _) => Some(vec![g.nodes.len()]),
        (DataPayload::Table(_), DataFormat::Graph) => None,
        (DataPayload::Table(t), _) => Some(vec![t.rows.len()]),
        (DataPayload::Vector(v), _) => Some(vec![v.nrows()]),
    }
}

fn check_entity_counts(
    original: &DataPayload,
    converted: &ConversionResult,
    target_format: DataFormat,
) -> TestResult {
    let name = "node_count_preserved";
    let actual = converted.data.entity_count();

    let Some(expected) = expected_entities(original, target_format) else {
        return TestResult::passed(name, 1.0, true);
    };

    if expected.contains(&actual) {
        return TestResult::passed(name, 1.0, true);
    }

    let closest = expected
        .iter()
        .copied()
        .min_by_key(|e| e.abs_diff(actual))
        .unwrap_or(0);
    let score = if closest.max(actual) == 0 {
        1.0
    } else {
        closest.min(actual) as f64 / closest.max(actual) as f64
    };
    TestResult::failed(
        name,
        score,
        format!("expected {} entities, found {}", closest, actual),
        true,
    )
}

fn check_edge_counts(original: &GraphPayload, converted: &GraphPayload) -> TestResult {
    let name = "edge_count_preserved";
    let (orig, conv) = (original.edges.len(), converted.edges.len());
    if orig == conv {
        return TestResult::passed(name, 1.0, false);
    }
    let score = if orig.max(conv) == 0 {
        1.0
    } else {
        orig.min(conv) as f64 / orig.max(conv) as f64
    };
    TestResult::failed(
        name,
        score,
        format!("expected {} edges, found {}", orig, conv),
        false,
    )
}

fn check_no_corrupted_values(data: &DataPayload) -> TestResult {
    let name = "no_corrupted_values";
    let problem = match data {
        DataPayload::Graph(g) => g
            .nodes
            .iter()
            .position(|n| n.id.is_empty())
            .map(|i| format!("node {} has an empty id", i)),
        DataPayload::Table(t) => t
            .rows
            .iter()
            .position(|row| row.len() != t.columns.len())
            .map(|i| format!("row {} does not match the column count", i)),
        DataPayload::Vector(v) => {
            if v.all_finite() {
                None
            } else {
                Some("vector payload contains non-finite values".to_string())
            }
        }
    };

    match problem {
        None => TestResult::passed(name, 1.0, true),
        Some(detail) => TestResult::failed(name, 0.0, detail, true),
    }
}

fn check_preservation_threshold(converted: &ConversionResult, threshold: f64) -> TestResult {
    let name = "preservation_threshold";
    let score = converted.preservation_score;
    if score >= threshold {
        TestResult::passed(name, score, false)
    } else {
        TestResult::failed(
            name,
            score,
            format!("preservation {:.3} below threshold {:.3}", score, threshold),
            false,
        )
    }
}

fn check_semantic_integrity_flag(converted: &ConversionResult, threshold: f64) -> TestResult {
    let name = "semantic_integrity_flag";
    let expected = converted.preservation_score >= threshold;
    if converted.semantic_integrity == expected {
        TestResult::passed(name, 1.0, false)
    } else {
        TestResult::failed(
            name,
            0.0,
            format!(
                "flag is {} but preservation {:.3} implies {}",
                converted.semantic_integrity, converted.preservation_score, expected
            ),
            false,
        )
    }
}

/// Fraction of the original's named content (property keys or columns)
/// still present in the converted payload.
fn check_property_fidelity(original: &DataPayload, converted: &DataPayload) -> TestResult {
    let name = "property_fidelity";
    let original_names = named_content(original);
    if original_names.is_empty() {
        return TestResult::passed(name, 1.0, false);
    }
    let converted_names = named_content(converted);
    let retained = original_names
        .iter()
        .filter(|n| converted_names.contains(*n))
        .count();
    let score = retained as f64 / original_names.len() as f64;

    if retained == original_names.len() {
        TestResult::passed(name, score, false)
    } else {
        let missing: Vec<&str> = original_names
            .iter()
            .filter(|n| !converted_names.contains(*n))
            .map(String::as_str)
            .collect();
        TestResult::failed(
            name,
            score,
            format!("missing from converted payload: {}", missing.join(", ")),
            false,
        )
    }
}

fn named_content(data: &DataPayload) -> std::collections::BTreeSet<String> {
    match data {
        DataPayload::Graph(g) => g
            .nodes
            .iter()
            .flat_map(|n| n.properties.keys().cloned())
            .chain(g.edges.iter().flat_map(|e| e.properties.keys().cloned()))
            .collect(),
        DataPayload::Table(t) => t.columns.iter().cloned().collect(),
        // Dense arrays carry no named content of their own.
        DataPayload::Vector(_) => std::collections::BTreeSet::new(),
    }
}

fn check_statistical_distribution(original: &DataPayload, converted: &DataPayload) -> TestResult {
    let name = "statistical_distribution_match";
    let orig = numeric_samples(original);
    let conv = numeric_samples(converted);
    if orig.is_empty() || conv.is_empty() {
        return TestResult::passed(name, 1.0, false);
    }

    let score = distribution_similarity(&orig, &conv);
    if score >= 0.8 {
        TestResult::passed(name, score, false)
    } else {
        TestResult::failed(
            name,
            score,
            format!(
                "numeric distributions diverge (similarity {:.3}): mean {:.3} vs {:.3}",
                score,
                mean(&orig),
                mean(&conv)
            ),
            false,
        )
    }
}

fn check_performance_regression(converted: &ConversionResult) -> TestResult {
    let name = "performance_regression";
    let duration = converted.conversion_metadata.duration_ms;
    if duration <= PERF_BUDGET_MS {
        TestResult::passed(name, 1.0, false)
    } else {
        let score = PERF_BUDGET_MS as f64 / duration as f64;
        TestResult::failed(
            name,
            score,
            format!("conversion took {}ms (budget {}ms)", duration, PERF_BUDGET_MS),
            false,
        )
    }
}

fn numeric_samples(data: &DataPayload) -> Vec<f64> {
    match data {
        DataPayload::Graph(g) => g
            .nodes
            .iter()
            .flat_map(|n| n.properties.values())
            .chain(g.edges.iter().flat_map(|e| e.properties.values()))
            .filter_map(serde_json::Value::as_f64)
            .chain(g.edges.iter().filter_map(|e| e.weight))
            .filter(|v| v.is_finite())
            .collect(),
        DataPayload::Table(t) => t
            .rows
            .iter()
            .flatten()
            .filter_map(serde_json::Value::as_f64)
            .filter(|v| v.is_finite())
            .collect(),
        DataPayload::Vector(v) => v.data.iter().copied().filter(|v| v.is_finite()).collect(),
    }
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn std_dev(samples: &[f64], mean: f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    var.sqrt()
}

/// Similarity in [0, 1] of two samples' mean and spread.
fn distribution_similarity(a: &[f64], b: &[f64]) -> f64 {
    let (mean_a, mean_b) = (mean(a), mean(b));
    let (std_a, std_b) = (std_dev(a, mean_a), std_dev(b, mean_b));

    let mean_sim = 1.0 - ((mean_a - mean_b).abs() / (mean_a.abs().max(mean_b.abs()) + 1.0)).min(1.0);
    let std_sim = 1.0 - ((std_a - std_b).abs() / (std_a.max(std_b) + 1.0)).min(1.0);
    (mean_sim + std_sim) / 2.0
}

/// Heuristic advice keyed off which checks failed.
fn recommend(tests: &[TestResult]) -> Vec<String> {
    let mut recommendations = Vec::new();
    for test in tests.iter().filter(|t| !t.passed) {
        let advice = match test.name.as_str() {
            "property_fidelity" => {
                "Low property fidelity: consider graph-to-vector via the embedding method for richer semantic retention"
            }
            "node_count_preserved" => {
                "Entity counts diverged: verify the source/target column options for table conversions"
            }
            "preservation_threshold" => {
                "Preservation below threshold: choose a less lossy target format or enrich the source payload"
            }
            "statistical_distribution_match" => {
                "Numeric distributions shifted: review zero-filled cells and dropped columns"
            }
            "performance_regression" => {
                "Conversion exceeded its time budget: consider aggressive workflow optimization"
            }
            "conversion_chain_completed" => {
                "The round-trip chain aborted: check the format sequence and conversion options"
            }
            "no_corrupted_values" => {
                "Corrupted values detected in the converted payload: inspect the source data for non-finite numbers"
            }
            _ => continue,
        };
        recommendations.push(advice.to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphEdge, GraphNode, TablePayload};
    use serde_json::json;

    fn chain_graph() -> DataPayload {
        DataPayload::Graph(GraphPayload {
            nodes: vec![
                GraphNode::new("1").with_label("Entity"),
                GraphNode::new("2").with_label("Entity"),
                GraphNode::new("3").with_label("Entity"),
            ],
            edges: vec![
                GraphEdge::new("1", "2", "RELATES"),
                GraphEdge::new("2", "3", "RELATES"),
            ],
        })
    }

    fn validator() -> CrossModalValidator {
        CrossModalValidator::new(CrossModalConverter::new())
    }

    #[tokio::test]
    async fn test_validate_clean_conversion_passes() {
        let converter = CrossModalConverter::new();
        let original = chain_graph();
        let converted = converter
            .convert_data(
                &original,
                DataFormat::Graph,
                DataFormat::Table,
                &ConversionOptions::default(),
            )
            .await
            .unwrap();

        let report = validator().validate_cross_modal_conversion(
            &original,
            &converted,
            DataFormat::Graph,
            DataFormat::Table,
            ValidationLevel::Standard,
        );
        assert!(report.overall_passed);
        assert_eq!(
            report.passed_tests + report.failed_tests,
            report.total_tests
        );
        assert!(report.overall_score >= 0.0 && report.overall_score <= 1.0);
    }

    #[tokio::test]
    async fn test_levels_are_strict_supersets() {
        let converter = CrossModalConverter::new();
        let original = chain_graph();
        let converted = converter
            .convert_data(
                &original,
                DataFormat::Graph,
                DataFormat::Table,
                &ConversionOptions::default(),
            )
            .await
            .unwrap();

        let v = validator();
        let basic = v.validate_cross_modal_conversion(
            &original,
            &converted,
            DataFormat::Graph,
            DataFormat::Table,
            ValidationLevel::Basic,
        );
        let standard = v.validate_cross_modal_conversion(
            &original,
            &converted,
            DataFormat::Graph,
            DataFormat::Table,
            ValidationLevel::Standard,
        );
        let comprehensive = v.validate_cross_modal_conversion(
            &original,
            &converted,
            DataFormat::Graph,
            DataFormat::Table,
            ValidationLevel::Comprehensive,
        );
        assert!(basic.total_tests < standard.total_tests);
        assert!(standard.total_tests < comprehensive.total_tests);

        let basic_names: Vec<&str> =
            basic.test_results.iter().map(|t| t.name.as_str()).collect();
        for name in &basic_names {
            assert!(standard.test_results.iter().any(|t| t.name == *name));
        }
    }

    #[tokio::test]
    async fn test_round_trip_graph_table_graph_passes_standard() {
        let original = chain_graph();
        let report = validator()
            .validate_round_trip_integrity(
                &original,
                &[DataFormat::Table, DataFormat::Graph],
                ValidationLevel::Standard,
            )
            .await;
        assert!(report.overall_passed, "report: {:?}", report);
        assert!(report
            .test_results
            .iter()
            .any(|t| t.name == "node_count_preserved" && t.passed));
        assert_eq!(report.performance_metrics.conversions_executed, 2);
    }

    #[tokio::test]
    async fn test_round_trip_score_capped_by_weakest_hop() {
        // The categorical column is dropped on the way to vectors, so the
        // chain's weakest hop scores 2/3; the report cannot score higher.
        let original = DataPayload::Table(TablePayload::new(
            vec!["name".into(), "x".into(), "y".into()],
            vec![
                vec![json!("a"), json!(1.0), json!(2.0)],
                vec![json!("b"), json!(3.0), json!(4.0)],
            ],
        ));
        let report = validator()
            .validate_round_trip_integrity(
                &original,
                &[DataFormat::Vector, DataFormat::Table],
                ValidationLevel::Standard,
            )
            .await;
        assert!(report.overall_score <= 2.0 / 3.0 + 1e-9);
    }

    #[tokio::test]
    async fn test_failed_chain_is_reported_not_raised() {
        // Empty table input makes the first hop fail.
        let original = DataPayload::Table(TablePayload::new(vec!["a".into()], vec![]));
        let report = validator()
            .validate_round_trip_integrity(
                &original,
                &[DataFormat::Vector, DataFormat::Table],
                ValidationLevel::Basic,
            )
            .await;
        assert!(!report.overall_passed);
        assert_eq!(report.overall_score, 0.0);
        assert!(report
            .test_results
            .iter()
            .any(|t| t.name == "conversion_chain_completed" && !t.passed));
        assert!(!report.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_empty_sequence_is_a_failed_report() {
        let report = validator()
            .validate_round_trip_integrity(&chain_graph(), &[], ValidationLevel::Basic)
            .await;
        assert!(!report.overall_passed);
        assert_eq!(report.failed_tests, 1);
    }

    #[test]
    fn test_corrupted_vector_fails_critical_check() {
        let mut data = ndarray::Array2::from_elem((2, 2), 1.0);
        data[[0, 0]] = f64::NAN;
        let payload = DataPayload::Vector(crate::model::VectorPayload::new(data));
        let result = check_no_corrupted_values(&payload);
        assert!(!result.passed);
        assert!(result.critical);
    }

    #[test]
    fn test_distribution_similarity_identical_samples() {
        let samples = vec![1.0, 2.0, 3.0, 4.0];
        assert!((distribution_similarity(&samples, &samples) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_distribution_similarity_divergent_samples() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![100.0, 200.0, 300.0];
        assert!(distribution_similarity(&a, &b) < 0.5);
    }

    #[test]
    fn test_validation_level_ordering() {
        assert!(ValidationLevel::Basic < ValidationLevel::Standard);
        assert!(ValidationLevel::Standard < ValidationLevel::Comprehensive);
        assert_eq!(
            "comprehensive".parse::<ValidationLevel>().unwrap(),
            ValidationLevel::Comprehensive
        );
    }

    #[test]
    fn test_recommendations_only_for_failures() {
        let tests = vec![
            TestResult::passed("node_count_preserved", 1.0, true),
            TestResult::failed(
                "property_fidelity",
                0.4,
                "missing: weight".to_string(),
                false,
            ),
        ];
        let recs = recommend(&tests);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("property fidelity") || recs[0].contains("Low property"));
    }
}
