//! Remote synthesis and generation orchestration for PromptFlow.
//!
//! ## Architecture
//!
//! ```text
//!              ┌──────────────────────┐
//!  request ───>│ WorkflowOrchestrator │───> WorkflowResult (+ stored id)
//!              └───┬──────────┬───────┘
//!        remote?   │          │ fallback / no key
//!       ┌──────────┴──┐   ┌───┴──────────────┐
//!       │ Remote      │   │ LocalSynthesizer │
//!       │ Synthesizer │   │ (catalog rules)  │
//!       └──────┬──────┘   └──────────────────┘
//!              │
//!       ┌──────┴──────┐
//!       │  LlmClient  │  OpenAI / OpenRouter
//!       └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`llm`] -- chat-completions client and wire types.
//! - [`config`] -- provider selection and remote settings.
//! - [`remote`] -- the model-backed [`promptflow_intent::Synthesizer`].
//! - [`enhancer`] -- prompt enhancement, remote or local.
//! - [`orchestrator`] -- path selection, fallback and persistence.
//! - [`error`] -- agent error types.

pub mod config;
pub mod enhancer;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod remote;

pub use config::{RemoteOverrides, RemoteProvider, RemoteSettings};
pub use enhancer::{PromptEnhancer, enhance_locally};
pub use error::{AgentError, Result};
pub use llm::{ChatRequest, ChatResponse, LlmClient, LlmClientConfig, Message, Role};
pub use orchestrator::{Generation, SynthesisSource, WorkflowOrchestrator};
pub use remote::{RemoteSynthesizer, parse_workflow_reply};
