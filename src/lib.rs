//! # Crossmodal Analytics
//!
//! A cross-modal analysis engine that converts research data between three
//! canonical representations - property graphs, tables, and dense vector
//! arrays - while scoring how much semantic content each conversion
//! preserved.
//!
//! ## Components
//!
//! - **Converter**: pairwise conversions between the formats, each with a
//!   conversion-specific preservation score and explicit warnings for lossy
//!   steps
//! - **Validator**: multi-level integrity checks over single conversions
//!   and full round-trip chains
//! - **Mode selection**: keyword/structure heuristics (optionally refined
//!   by an LLM provider) that pick the analysis mode for a research
//!   question, with a fallback that never fails
//! - **Orchestrator**: plans and executes a workflow of conversion and
//!   validation steps with per-step timeouts and partial-failure tolerance
//!
//! ## Example
//!
//! ```ignore
//! use crossmodal_analytics::{
//!     AnalysisRequest, CrossModalOrchestrator, DataFormat, DataPayload,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let data: DataPayload = serde_json::from_str(&std::fs::read_to_string("graph.json")?)?;
//!     let orchestrator = CrossModalOrchestrator::new();
//!     let request = AnalysisRequest::new(
//!         "Which entities are most connected?",
//!         data,
//!         DataFormat::Graph,
//!     );
//!     let result = orchestrator.orchestrate_analysis(request).await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management.
pub mod config;
/// Format conversion engine and preservation scoring.
pub mod convert;
/// Error types and result aliases.
pub mod error;
/// Canonical payload model shared by every component.
pub mod model;
/// Workflow orchestration.
pub mod orchestrate;
/// Embedding/LLM capability providers.
pub mod provider;
/// Analysis-mode selection.
pub mod select;
/// Conversion and round-trip validation.
pub mod validate;
/// Workflow planning types.
pub mod workflow;

pub use config::Config;
pub use convert::{ConversionOptions, CrossModalConverter};
pub use error::{AppError, AppResult};
pub use model::{ConversionResult, DataFormat, DataPayload};
pub use orchestrate::{AnalysisRequest, AnalysisResult, CrossModalOrchestrator};
pub use select::{AnalysisMode, ModeSelectionService};
pub use validate::{CrossModalValidator, ValidationLevel, ValidationReport};
pub use workflow::{OptimizedWorkflow, WorkflowOptimizationLevel};
