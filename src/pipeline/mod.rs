/*!
 * Rating and cleaning pipeline for bookwash documents.
 *
 * The pipeline processes documents in up to two passes:
 * 1. **Rating Pass**: classify chapters and flag the ones above target
 * 2. **Cleaning Pass**: revise flagged chapters with escalating aggression,
 *    verify the result and store the differences as change blocks
 */

pub mod cleaning_pass;
pub mod escalation;
pub mod orchestrator;
pub mod rating_pass;

// Re-export types used externally
pub use escalation::EscalationPolicy;
pub use orchestrator::{
    BookwashPipeline, ChapterOutcome, ChapterState, Checkpoint, PipelineConfig, PipelineMode, PipelinePhase,
    PipelineProgress, PipelineResult,
};
