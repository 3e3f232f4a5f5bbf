//! # Coursewright
//!
//! Builds course modules from a topic with three cooperating LLM roles.
//!
//! This library provides:
//! - A research/judge feedback loop with a bounded iteration budget
//! - Role adapters over an OpenAI-compatible completion service and web search
//! - An HTTP API with request/response and SSE streaming entry points
//!
//! ## Architecture
//!
//! 1. The researcher gathers search results and summarizes findings
//! 2. The judge returns a structured pass/fail verdict with feedback
//! 3. Failing feedback goes back to the researcher until the budget is spent
//! 4. The content builder turns the accepted findings into Markdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use coursewright::{agents::Roles, config::Config, pipeline::Orchestrator};
//!
//! let config = Config::from_env()?;
//! let roles = Roles::from_config(&config)?;
//! let orchestrator = Orchestrator::new(roles, config.pipeline.clone());
//! let outcome = orchestrator.run_topic("History of the Roman aqueducts").await?;
//! println!("{}", outcome.document.as_markdown());
//! ```

pub mod agents;
pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod pipeline;
pub mod retry;
pub mod tools;

pub use config::Config;
pub use error::{ErrorKind, PipelineError};
