//! Workflow model and local synthesis for PromptFlow.
//!
//! This crate provides:
//!
//! - **Workflow model**: nodes, connection maps and the generation result in
//!   the workflow engine's import format, via [`workflow::WorkflowResult`].
//! - **Archetype dispatch**: a prioritized rule list mapping prompt keywords
//!   to fixed graph shapes, via [`archetype::Archetype`].
//! - **Metadata derivation**: name, description, setup time and numbered
//!   setup instructions, via [`metadata`].
//! - **Synthesis strategy**: the [`synthesizer::Synthesizer`] trait and the
//!   deterministic [`synthesizer::LocalSynthesizer`].

pub mod archetype;
pub mod error;
pub mod metadata;
pub mod synthesizer;
pub mod workflow;

pub use archetype::{ARCHETYPE_RULES, Archetype, ArchetypeRule, Graph};
pub use error::{IntentError, Result};
pub use synthesizer::{LocalSynthesizer, SynthesisRequest, Synthesizer};
pub use workflow::{
    ConnectionTarget, Connections, MAIN_PORT, NodeOutputs, TriggerKind, WorkflowJson,
    WorkflowNode, WorkflowResult,
};
