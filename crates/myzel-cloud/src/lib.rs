//! Myzel reconciliation engine
//!
//! Callers declare the resources an application should have; the engine
//! compares them with the recorded deployment and issues create, update and
//! delete calls so that the cloud matches the declaration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              App (name, env, resources)          │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                  myzel-cloud                     │
//! │  ┌──────────────┐  ┌──────────────────────────┐ │
//! │  │  Reconciler  │  │ Session (incremental)    │ │
//! │  └──────┬───────┘  └────────────┬─────────────┘ │
//! │  ┌──────▼───────┐  ┌────────────▼─────────────┐ │
//! │  │  Diff Engine │  │ State Store (app_*.yaml) │ │
//! │  └──────┬───────┘  └──────────────────────────┘ │
//! │  ┌──────▼──────────────────────────────────────┐│
//! │  │ Registry: tag ⟷ trait Resource + ResourceKind││
//! │  └─────────────────────────────────────────────┘│
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │ local provider│ │ cloud adapters│
//! └───────────────┘ └───────────────┘
//! ```
//!
//! Resources are applied one at a time, in declaration order. There is no
//! dependency graph and no multi-resource rollback.

pub mod action;
pub mod app;
pub mod diff;
pub mod error;
pub mod reconciler;
pub mod registry;
pub mod resource;
pub mod retry;
pub mod session;
pub mod state;

// Re-exports
pub use action::{Action, ActionType, Plan, PlanSummary};
pub use app::{App, Environment};
pub use diff::{DiffResult, UpdateEntry, compute_diff};
pub use error::{CloudError, Result};
pub use reconciler::Reconciler;
pub use registry::{DEFAULT_DESTROY_PRIORITY, RegistryBuilder, ResourceRegistry};
pub use resource::{
    BoxFuture, ConfigEq, DeployedResource, Resource, ResourceKind, downcast, same_config,
};
pub use retry::{RetryConfig, wait_until};
pub use session::Session;
pub use state::{
    DeploymentProgress, ReplacedResource, ResourceMapping, StateDocument, StateStore,
};
