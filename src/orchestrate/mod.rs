//! Workflow orchestration.
//!
//! [`CrossModalOrchestrator`] ties the subsystem together: it selects an
//! analysis mode for a research question, plans a workflow of conversion
//! and validation steps, executes it with per-step timeouts, and
//! aggregates everything into one [`AnalysisResult`].
//!
//! Failure policy: input validation errors raise synchronously (they are
//! programmer errors), everything after that returns a result. A failed
//! secondary step reduces `workflow_efficiency` and adds a recommendation;
//! only losing the primary result flips `success` to false.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::convert::{ConversionOptions, CrossModalConverter, VectorMethod};
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::model::{ConversionResult, DataFormat, DataPayload};
use crate::provider::CapabilityProvider;
use crate::select::{AnalysisMode, DataContext, ModeSelectionResult, ModeSelectionService};
use crate::validate::{CrossModalValidator, ValidationLevel, ValidationReport};
use crate::workflow::{
    OptimizedWorkflow, StepAction, WorkflowOptimizationLevel, WorkflowState, WorkflowStep,
};

/// Default per-step timeout when none is configured.
const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(60);

/// One orchestrated analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// The research question driving mode selection. Must be non-empty.
    pub research_question: String,
    /// The source payload.
    pub data: DataPayload,
    /// Declared format of `data`.
    pub source_format: DataFormat,
    /// Caller-preferred modes; the first one wins when present.
    #[serde(default)]
    pub preferred_modes: Vec<AnalysisMode>,
    /// Validation thoroughness.
    #[serde(default)]
    pub validation_level: ValidationLevel,
    /// Workflow pruning/concurrency level.
    #[serde(default)]
    pub optimization_level: WorkflowOptimizationLevel,
}

impl AnalysisRequest {
    /// Create a request with default validation and optimization levels.
    pub fn new(
        research_question: impl Into<String>,
        data: DataPayload,
        source_format: DataFormat,
    ) -> Self {
        Self {
            research_question: research_question.into(),
            data,
            source_format,
            preferred_modes: Vec::new(),
            validation_level: ValidationLevel::default(),
            optimization_level: WorkflowOptimizationLevel::default(),
        }
    }

    /// Prefer specific analysis modes.
    pub fn with_preferred_modes(mut self, modes: Vec<AnalysisMode>) -> Self {
        self.preferred_modes = modes;
        self
    }

    /// Set the validation level.
    pub fn with_validation_level(mut self, level: ValidationLevel) -> Self {
        self.validation_level = level;
        self
    }

    /// Set the optimization level.
    pub fn with_optimization_level(mut self, level: WorkflowOptimizationLevel) -> Self {
        self.optimization_level = level;
        self
    }
}

/// Terminal status of one executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step produced its result.
    Success,
    /// The step ran and failed (or timed out).
    Failed,
    /// The step never ran because a dependency failed.
    Skipped,
}

/// Record of one step's execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Step identifier from the plan.
    pub step_id: String,
    /// Terminal status.
    pub status: StepStatus,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Error detail for failed/skipped steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated timing and step accounting for one analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisPerformance {
    /// Total analysis duration in milliseconds.
    pub total_duration_ms: u64,
    /// Steps in the plan.
    pub steps_planned: usize,
    /// Steps that produced their result.
    pub steps_completed: usize,
    /// Steps that ran and failed.
    pub steps_failed: usize,
    /// Steps skipped because a dependency failed.
    pub steps_skipped: usize,
    /// Per-step records in plan order.
    pub step_outcomes: Vec<StepOutcome>,
}

/// Aggregated outcome of one orchestrated analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// False only when the primary result could not be produced.
    pub success: bool,
    /// Unique per invocation.
    pub workflow_id: Uuid,
    /// The mode the analysis ran under.
    pub selected_mode: AnalysisMode,
    /// Full mode-selection outcome, for audit.
    pub mode_selection: ModeSelectionResult,
    /// Terminal workflow state.
    pub state: WorkflowState,
    /// Every produced payload, keyed by format.
    pub converted_data: BTreeMap<DataFormat, DataPayload>,
    /// Validation reports, keyed by the validated format.
    pub validation_results: BTreeMap<DataFormat, ValidationReport>,
    /// Timing and step accounting.
    pub performance_metrics: AnalysisPerformance,
    /// Total analysis duration in milliseconds.
    pub execution_time_ms: u64,
    /// completed / planned steps, in [0, 1].
    pub workflow_efficiency: f64,
    /// Advice accumulated from failed steps and validation reports.
    pub recommendations: Vec<String>,
    /// The conversion result for the mode's primary format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_result: Option<ConversionResult>,
    /// Remaining conversion results in format order.
    pub secondary_results: Vec<ConversionResult>,
}

/// Top-level coordinator for cross-modal analyses.
#[derive(Clone)]
pub struct CrossModalOrchestrator {
    converter: CrossModalConverter,
    selector: ModeSelectionService,
    step_timeout: Duration,
    vector_method: VectorMethod,
}

impl CrossModalOrchestrator {
    /// Create an orchestrator with default components and no provider.
    pub fn new() -> Self {
        Self {
            converter: CrossModalConverter::new(),
            selector: ModeSelectionService::new(),
            step_timeout: DEFAULT_STEP_TIMEOUT,
            vector_method: VectorMethod::default(),
        }
    }

    /// Wire converter thresholds, the confidence floor, and the step
    /// timeout from configuration; attach `provider` to both the converter
    /// and the mode selector when present.
    pub fn from_config(config: &Config, provider: Option<Arc<dyn CapabilityProvider>>) -> Self {
        let mut converter = CrossModalConverter::new().with_thresholds(config.thresholds.clone());
        let mut selector =
            ModeSelectionService::new().with_confidence_floor(config.thresholds.mode_confidence_floor);
        if let Some(provider) = provider {
            converter = converter.with_provider(Arc::clone(&provider));
            selector = selector.with_provider(provider);
        }
        Self {
            converter,
            selector,
            step_timeout: Duration::from_millis(config.thresholds.step_timeout_ms),
            vector_method: VectorMethod::default(),
        }
    }

    /// Replace the converter (injects metrics sinks and providers).
    pub fn with_converter(mut self, converter: CrossModalConverter) -> Self {
        self.converter = converter;
        self
    }

    /// Replace the mode selector.
    pub fn with_selector(mut self, selector: ModeSelectionService) -> Self {
        self.selector = selector;
        self
    }

    /// Override the per-step timeout.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Choose how graph payloads are vectorized.
    pub fn with_vector_method(mut self, method: VectorMethod) -> Self {
        self.vector_method = method;
        self
    }

    /// Run one full analysis.
    ///
    /// Raises [`OrchestrationError`] only for input-validation failures;
    /// anything that goes wrong later is reported inside the returned
    /// [`AnalysisResult`].
    pub async fn orchestrate_analysis(
        &self,
        request: AnalysisRequest,
    ) -> OrchestrationResult<AnalysisResult> {
        let start = Instant::now();
        self.validate_request(&request)?;

        let context = DataContext::from_payload(&request.data);
        let selection = match self
            .selector
            .from_preference(&request.preferred_modes, &context)
        {
            Some(selection) => selection,
            None => {
                self.selector
                    .select_optimal_mode(&request.research_question, &context)
                    .await
            }
        };

        let plan = OptimizedWorkflow::plan(
            selection.primary_mode,
            request.source_format,
            request.optimization_level,
        );
        info!(
            workflow_id = %plan.workflow_id,
            mode = %selection.primary_mode,
            steps = plan.planned_steps(),
            optimization = %request.optimization_level,
            "Workflow planned"
        );

        let mut exec = Execution::default();
        self.execute_plan(&request, &plan, &mut exec).await;
        self.mark_unreached_skipped(&plan, &mut exec);

        Ok(self.aggregate(request, selection, plan, exec, start))
    }

    fn validate_request(&self, request: &AnalysisRequest) -> OrchestrationResult<()> {
        if request.research_question.trim().is_empty() {
            return Err(OrchestrationError::InvalidRequest {
                message: "research question cannot be empty".to_string(),
            });
        }
        let actual = request.data.format();
        if actual != request.source_format {
            return Err(OrchestrationError::InvalidRequest {
                message: format!(
                    "data is a {} payload but source_format declares {}",
                    actual, request.source_format
                ),
            });
        }
        Ok(())
    }

    async fn execute_plan(
        &self,
        request: &AnalysisRequest,
        plan: &OptimizedWorkflow,
        exec: &mut Execution,
    ) {
        loop {
            let ready: Vec<WorkflowStep> = plan
                .ready_steps(&exec.completed, &exec.done)
                .into_iter()
                .cloned()
                .collect();
            if ready.is_empty() {
                break;
            }

            let concurrent =
                request.optimization_level >= WorkflowOptimizationLevel::Aggressive;
            let (converts, validates): (Vec<WorkflowStep>, Vec<WorkflowStep>) = ready
                .into_iter()
                .partition(|s| matches!(s.action, StepAction::Convert { .. }));

            if concurrent && converts.len() > 1 {
                self.run_converts_concurrently(request, converts, exec).await;
            } else {
                for step in converts {
                    self.run_convert_step(request, &step, exec).await;
                }
            }

            // Validation is pure CPU work over already-produced results;
            // it runs inline even in concurrent waves.
            for step in validates {
                self.run_validate_step(request, &step, exec);
            }
        }
    }

    async fn run_convert_step(
        &self,
        request: &AnalysisRequest,
        step: &WorkflowStep,
        exec: &mut Execution,
    ) {
        let StepAction::Convert { target_format } = step.action else {
            return;
        };
        let step_start = Instant::now();
        let outcome = self.convert_with_timeout(request, target_format).await;
        let duration_ms = step_start.elapsed().as_millis() as u64;
        exec.record_conversion(step, target_format, outcome, duration_ms);
    }

    async fn run_converts_concurrently(
        &self,
        request: &AnalysisRequest,
        steps: Vec<WorkflowStep>,
        exec: &mut Execution,
    ) {
        debug!(steps = steps.len(), "Batching independent conversions");
        let mut handles: Vec<(WorkflowStep, DataFormat, JoinHandle<StepRun>)> = Vec::new();
        for step in steps {
            let StepAction::Convert { target_format } = step.action else {
                continue;
            };
            let converter = self.converter.clone();
            let data = request.data.clone();
            let source_format = request.source_format;
            let timeout = self.step_timeout;
            let vector_method = self.vector_method;
            let handle = tokio::spawn(async move {
                let step_start = Instant::now();
                let options =
                    ConversionOptions::infer(&data, target_format).with_vector_method(vector_method);
                let result = match tokio::time::timeout(
                    timeout,
                    converter.convert_data(&data, source_format, target_format, &options),
                )
                .await
                {
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(format!("step timed out after {}ms", timeout.as_millis())),
                };
                StepRun {
                    result,
                    duration_ms: step_start.elapsed().as_millis() as u64,
                }
            });
            handles.push((step, target_format, handle));
        }

        // Results merge in spawn (plan) order, not completion order.
        for (step, target_format, handle) in handles {
            let run = match handle.await {
                Ok(run) => run,
                Err(e) => StepRun {
                    result: Err(format!("conversion task panicked: {}", e)),
                    duration_ms: 0,
                },
            };
            exec.record_conversion(&step, target_format, run.result, run.duration_ms);
        }
    }

    async fn convert_with_timeout(
        &self,
        request: &AnalysisRequest,
        target_format: DataFormat,
    ) -> Result<ConversionResult, String> {
        let options = ConversionOptions::infer(&request.data, target_format)
            .with_vector_method(self.vector_method);
        match tokio::time::timeout(
            self.step_timeout,
            self.converter
                .convert_data(&request.data, request.source_format, target_format, &options),
        )
        .await
        {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "step timed out after {}ms",
                self.step_timeout.as_millis()
            )),
        }
    }

    fn run_validate_step(
        &self,
        request: &AnalysisRequest,
        step: &WorkflowStep,
        exec: &mut Execution,
    ) {
        let StepAction::Validate { format } = step.action else {
            return;
        };
        let step_start = Instant::now();

        let Some(converted) = exec.conversion_results.get(&format) else {
            exec.done.insert(step.step_id.clone());
            exec.outcomes.push(StepOutcome {
                step_id: step.step_id.clone(),
                status: StepStatus::Failed,
                duration_ms: 0,
                error: Some(format!("no conversion result for {}", format)),
            });
            return;
        };

        let validator = CrossModalValidator::new(self.converter.clone());
        let report = validator.validate_cross_modal_conversion(
            &request.data,
            converted,
            request.source_format,
            format,
            request.validation_level,
        );
        exec.validation_results.insert(format, report);
        exec.completed.insert(step.step_id.clone());
        exec.done.insert(step.step_id.clone());
        exec.outcomes.push(StepOutcome {
            step_id: step.step_id.clone(),
            status: StepStatus::Success,
            duration_ms: step_start.elapsed().as_millis() as u64,
            error: None,
        });
    }

    fn mark_unreached_skipped(&self, plan: &OptimizedWorkflow, exec: &mut Execution) {
        for step in &plan.steps {
            if exec.done.contains(&step.step_id) {
                continue;
            }
            let missing: Vec<&str> = step
                .depends_on
                .iter()
                .filter(|d| !exec.completed.contains(*d))
                .map(String::as_str)
                .collect();
            warn!(step_id = %step.step_id, missing = ?missing, "Step skipped");
            exec.done.insert(step.step_id.clone());
            exec.outcomes.push(StepOutcome {
                step_id: step.step_id.clone(),
                status: StepStatus::Skipped,
                duration_ms: 0,
                error: Some(format!("dependencies did not complete: {}", missing.join(", "))),
            });
        }
    }

    fn aggregate(
        &self,
        request: AnalysisRequest,
        selection: ModeSelectionResult,
        plan: OptimizedWorkflow,
        mut exec: Execution,
        start: Instant,
    ) -> AnalysisResult {
        let primary_format = selection.primary_mode.formats()[0];
        let primary_result = exec.conversion_results.remove(&primary_format);
        let secondary_results: Vec<ConversionResult> =
            exec.conversion_results.into_values().collect();

        let steps_planned = plan.planned_steps();
        let steps_completed = exec
            .outcomes
            .iter()
            .filter(|o| o.status == StepStatus::Success)
            .count();
        let steps_failed = exec
            .outcomes
            .iter()
            .filter(|o| o.status == StepStatus::Failed)
            .count();
        let steps_skipped = exec
            .outcomes
            .iter()
            .filter(|o| o.status == StepStatus::Skipped)
            .count();

        let workflow_efficiency = if steps_planned == 0 {
            0.0
        } else {
            (steps_completed as f64 / steps_planned as f64).clamp(0.0, 1.0)
        };

        let success = primary_result.is_some();
        let state = if !success {
            WorkflowState::Failed
        } else if steps_failed + steps_skipped > 0 {
            WorkflowState::PartiallyCompleted
        } else {
            WorkflowState::Completed
        };

        let mut recommendations = Vec::new();
        for outcome in exec
            .outcomes
            .iter()
            .filter(|o| o.status != StepStatus::Success)
        {
            let detail = outcome.error.as_deref().unwrap_or("unknown failure");
            recommendations.push(format!(
                "Step '{}' did not complete: {}",
                outcome.step_id, detail
            ));
        }
        for report in exec.validation_results.values() {
            recommendations.extend(report.recommendations.iter().cloned());
        }
        recommendations.dedup();

        // Outcomes keep plan order regardless of completion order.
        let order: BTreeMap<&str, usize> = plan
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.step_id.as_str(), i))
            .collect();
        exec.outcomes
            .sort_by_key(|o| order.get(o.step_id.as_str()).copied().unwrap_or(usize::MAX));

        let total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            workflow_id = %plan.workflow_id,
            state = %state,
            efficiency = workflow_efficiency,
            duration_ms = total_duration_ms,
            question_len = request.research_question.len(),
            "Analysis finished"
        );

        AnalysisResult {
            success,
            workflow_id: plan.workflow_id,
            selected_mode: selection.primary_mode,
            mode_selection: selection,
            state,
            converted_data: exec.converted_data,
            validation_results: exec.validation_results,
            performance_metrics: AnalysisPerformance {
                total_duration_ms,
                steps_planned,
                steps_completed,
                steps_failed,
                steps_skipped,
                step_outcomes: exec.outcomes,
            },
            execution_time_ms: total_duration_ms,
            workflow_efficiency,
            recommendations,
            primary_result,
            secondary_results,
        }
    }
}

impl Default for CrossModalOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one spawned conversion task.
struct StepRun {
    result: Result<ConversionResult, String>,
    duration_ms: u64,
}

/// Per-invocation accumulation buffers; never shared between calls.
#[derive(Default)]
struct Execution {
    converted_data: BTreeMap<DataFormat, DataPayload>,
    conversion_results: BTreeMap<DataFormat, ConversionResult>,
    validation_results: BTreeMap<DataFormat, ValidationReport>,
    completed: HashSet<String>,
    done: HashSet<String>,
    outcomes: Vec<StepOutcome>,
}

impl Execution {
    fn record_conversion(
        &mut self,
        step: &WorkflowStep,
        target_format: DataFormat,
        result: Result<ConversionResult, String>,
        duration_ms: u64,
    ) {
        self.done.insert(step.step_id.clone());
        match result {
            Ok(conversion) => {
                self.converted_data
                    .insert(target_format, conversion.data.clone());
                self.conversion_results.insert(target_format, conversion);
                self.completed.insert(step.step_id.clone());
                self.outcomes.push(StepOutcome {
                    step_id: step.step_id.clone(),
                    status: StepStatus::Success,
                    duration_ms,
                    error: None,
                });
            }
            Err(error) => {
                warn!(step_id = %step.step_id, error = %error, "Conversion step failed");
                self.outcomes.push(StepOutcome {
                    step_id: step.step_id.clone(),
                    status: StepStatus::Failed,
                    duration_ms,
                    error: Some(error),
                });
            }
        }
    }
}
