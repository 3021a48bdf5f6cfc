//! Workflow planning types.
//!
//! An [`OptimizedWorkflow`] is the planning-time shape of one orchestrated
//! analysis: an ordered list of conversion and validation steps with
//! explicit dependencies. Pruning decisions (what the optimization level
//! skips) happen here, at plan time; execution never drops a step on its
//! own.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::DataFormat;
use crate::select::AnalysisMode;

/// How aggressively a workflow plan is trimmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowOptimizationLevel {
    /// Keep every planned step.
    Basic,
    /// Keep every planned step, sequential execution.
    #[default]
    Standard,
    /// Prune secondary validations and run independent steps concurrently.
    Aggressive,
}

impl std::fmt::Display for WorkflowOptimizationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowOptimizationLevel::Basic => "basic",
            WorkflowOptimizationLevel::Standard => "standard",
            WorkflowOptimizationLevel::Aggressive => "aggressive",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for WorkflowOptimizationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(WorkflowOptimizationLevel::Basic),
            "standard" => Ok(WorkflowOptimizationLevel::Standard),
            "aggressive" => Ok(WorkflowOptimizationLevel::Aggressive),
            _ => Err(format!("Unknown optimization level: {}", s)),
        }
    }
}

/// Lifecycle of one workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Planned but not started.
    Planned,
    /// Currently executing.
    Running,
    /// Every step succeeded.
    Completed,
    /// Primary steps succeeded, at least one secondary step failed.
    PartiallyCompleted,
    /// The primary result could not be produced.
    Failed,
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowState::Planned => "planned",
            WorkflowState::Running => "running",
            WorkflowState::Completed => "completed",
            WorkflowState::PartiallyCompleted => "partially_completed",
            WorkflowState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// What one workflow step does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    /// Convert the source payload to `target_format`.
    Convert {
        /// Format to produce.
        target_format: DataFormat,
    },
    /// Validate the conversion that produced `format`.
    Validate {
        /// Format whose conversion is validated.
        format: DataFormat,
    },
}

/// One atomic conversion or validation within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique step identifier within the workflow.
    pub step_id: String,
    /// What the step does.
    pub action: StepAction,
    /// Steps that must complete first.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Required steps decide overall success; optional steps only reduce
    /// workflow efficiency when they fail.
    pub required: bool,
}

impl WorkflowStep {
    /// Create a required step.
    pub fn new(step_id: impl Into<String>, action: StepAction) -> Self {
        Self {
            step_id: step_id.into(),
            action,
            depends_on: Vec::new(),
            required: true,
        }
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, step_id: impl Into<String>) -> Self {
        self.depends_on.push(step_id.into());
        self
    }

    /// Mark the step optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A planned, possibly pruned workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedWorkflow {
    /// Unique per invocation.
    pub workflow_id: Uuid,
    /// Ordered steps.
    pub steps: Vec<WorkflowStep>,
    /// Level the plan was built at.
    pub optimization_level: WorkflowOptimizationLevel,
    /// Format the source payload arrives in.
    pub source_format: DataFormat,
    /// Id of the step that produces the primary result.
    pub primary_step_id: String,
}

impl OptimizedWorkflow {
    /// Plan a workflow for `mode` over data arriving in `source_format`.
    ///
    /// The mode's first format is the primary target. Every format gets a
    /// conversion step (identity conversions included, so the result map
    /// always carries every requested format) and a validation step gated
    /// on it. `Aggressive` prunes validations of non-primary formats;
    /// the primary conversion and its validation are never pruned.
    pub fn plan(
        mode: AnalysisMode,
        source_format: DataFormat,
        optimization_level: WorkflowOptimizationLevel,
    ) -> Self {
        let formats = mode.formats();
        let primary_format = formats[0];
        let primary_step_id = format!("convert_to_{}", primary_format);

        let mut steps = Vec::with_capacity(formats.len() * 2);
        for format in &formats {
            let is_primary = *format == primary_format;
            let convert_id = format!("convert_to_{}", format);

            let mut convert = WorkflowStep::new(
                convert_id.clone(),
                StepAction::Convert {
                    target_format: *format,
                },
            );
            if !is_primary {
                convert = convert.optional();
            }
            steps.push(convert);

            if !is_primary && optimization_level >= WorkflowOptimizationLevel::Aggressive {
                continue;
            }
            steps.push(
                WorkflowStep::new(
                    format!("validate_{}", format),
                    StepAction::Validate { format: *format },
                )
                .with_dependency(convert_id)
                .optional(),
            );
        }

        Self {
            workflow_id: Uuid::new_v4(),
            steps,
            optimization_level,
            source_format,
            primary_step_id,
        }
    }

    /// Steps whose dependencies are all in `completed`, excluding steps in
    /// `done` (already executed or skipped).
    pub fn ready_steps<'a>(
        &'a self,
        completed: &std::collections::HashSet<String>,
        done: &std::collections::HashSet<String>,
    ) -> Vec<&'a WorkflowStep> {
        self.steps
            .iter()
            .filter(|s| !done.contains(&s.step_id))
            .filter(|s| s.depends_on.iter().all(|d| completed.contains(d)))
            .collect()
    }

    /// Number of planned steps.
    pub fn planned_steps(&self) -> usize {
        self.steps.len()
    }
}
