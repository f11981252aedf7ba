//! # pam-orchestrator
//!
//! Multi-provider AI request orchestrator: selects among candidate completion
//! backends per request, tracks rolling health, isolates degraded providers behind
//! per-provider circuit breakers and fails over along a strictly ordered, bounded
//! candidate list.
//!
//! ## Overview
//!
//! A request flows through four stages: the [`registry`] holds the static provider
//! definitions, the [`selector`] orders the eligible ones by strategy (priority,
//! cost, latency or capability match) using [`health`] and [`circuit`] snapshots,
//! and the [`executor`] walks that list, attempting each provider at most once
//! under a mandatory per-call timeout. Exhaustion is a terminal error; the
//! orchestrator never fabricates a response.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Messages, capabilities, responses |
//! | [`registry`] | Static provider definitions and lookup |
//! | [`health`] | Rolling per-provider outcome counters |
//! | [`circuit`] | Per-provider circuit breaker state machine |
//! | [`selector`] | Strategy-based candidate ordering |
//! | [`executor`] | Bounded failover execution |
//! | [`adapters`] | HTTP adapter for OpenAI-compatible APIs |
//! | [`config`] | YAML startup configuration |
//! | [`orchestrator`] | Facade wiring everything together |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pam_orchestrator::{Message, Orchestrator, OrchestratorConfig, RequestContext};
//!
//! #[tokio::main]
//! async fn main() -> pam_orchestrator::Result<()> {
//!     let config = OrchestratorConfig::from_file("providers.yaml")?;
//!     let orchestrator = Orchestrator::from_config(&config)?;
//!
//!     let ctx = RequestContext::new(vec![
//!         Message::system("You are PAM, a travel assistant for RV travelers."),
//!         Message::user("Plan a week on the Great Ocean Road."),
//!     ]);
//!     let response = orchestrator.execute(&ctx).await?;
//!     println!("[{}] {}", response.provider, response.content);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod circuit;
pub mod config;
pub mod error;
pub mod executor;
pub mod health;
pub mod orchestrator;
pub mod registry;
pub mod selector;
pub mod types;

pub use adapters::HttpProviderAdapter;
pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState};
pub use config::{OrchestratorConfig, ProviderConfig};
pub use error::Error;
pub use executor::{Completion, ProviderAdapter, RequestExecutor};
pub use health::{HealthMonitor, HealthSnapshot};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, ProviderStatus};
pub use registry::{ProviderCapabilities, ProviderRegistry, ProviderSpec};
pub use selector::{RequestContext, SelectionStrategy, Selector};
pub use types::{AiResponse, Capability, Message, MessageRole, TokenUsage};

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, Error>;
