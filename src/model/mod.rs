//! Data model shared across the engine: process state, phase payloads,
//! termination results, failure records, telemetry projections, executor
//! task types, and the queue message shape.

pub mod activity;
pub mod failure;
pub mod phase;
pub mod process;
pub mod queue;
pub mod task;
pub mod termination;

pub use activity::{ActivityEntry, AgentRecord, ProcessActivitySnapshot, ProcessStatus};
pub use failure::{
    build_hard_termination_failure, build_system_failure, extract_input_files, summarize_input_context,
    EscalationLevel, FailureContext, InputContext,
};
pub use phase::{
    AnalysisPayload, DesignPayload, DocumentationPayload, FileConversionStatus, PhasePayload, PhaseResult, YamlPayload,
};
pub use process::{Phase, ProcessState};
pub use queue::{DeliveryMetadata, MigrationRequest, QueueMessage};
pub use task::{TaskConfig, TaskResult, TaskStatus};
pub use termination::{SelectionDecision, TerminationKind, TerminationResult};
