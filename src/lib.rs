/*!
 * # bookwash - AI-assisted content rating and cleaning for books
 *
 * Books are stored in the line-oriented bookwash format: metadata, chapters of
 * paragraphs, per-chapter content ratings and reviewable change blocks.
 *
 * ## Features
 *
 * - Rate each chapter for language, sexual content and violence (G to X)
 * - Rewrite chapters above the configured targets with escalating aggression
 * - Verify rewrites by re-rating them, bounded by an iteration limit
 * - Align original and rewritten paragraphs into change blocks with reasons
 * - Accept or reject individual changes and export any view as plain text
 * - Providers: Ollama, OpenAI, Anthropic and LM Studio
 *
 * ## Architecture
 *
 * - `bookwash`: the document model, parser and writer
 * - `alignment`: paragraph alignment and change-reason detection
 * - `providers`: clients for the LLM APIs
 * - `service`: the rating/rewriting service with pacing, retries and fallback
 * - `pipeline`: the rating and cleaning passes
 * - `container`: conversion between documents and packaged book text
 * - `app_config`, `app_controller`, `file_utils`: the application layer
 * - `errors`: error types shared across modules
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod alignment;
pub mod app_config;
pub mod app_controller;
pub mod bookwash;
pub mod container;
pub mod errors;
pub mod file_utils;
pub mod pipeline;
pub mod providers;
pub mod service;

// Re-export main types for easier usage
pub use app_config::Config;
pub use bookwash::{Chapter, Document, Rating, Targets};
pub use errors::{AppError, FormatError, ProviderError, ServiceError};
pub use pipeline::{BookwashPipeline, PipelineMode};
pub use service::{ContentClient, ContentService};
