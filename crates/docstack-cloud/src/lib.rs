//! docstack cloud primitives
//!
//! Provider-neutral building blocks for declaring infrastructure: resources,
//! deferred values, the dependency graph, deployment plans, template rendering
//! and the lookup context the builder reads external values from.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  docstack CLI                    │
//! │             (docstack synth / plan)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               docstack-topology                  │
//! │   names → secret → network → compute → storage   │
//! │   → database → service → edge → dns              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                docstack-cloud                    │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │ResourceGraph │  │ LookupSource │             │
//! │  └──────┬───────┘  └──────────────┘             │
//! │  ┌──────▼───────┐  ┌──────────────┐             │
//! │  │   Template   │  │     Plan     │             │
//! │  └──────────────┘  └──────────────┘             │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod graph;
pub mod lookup;
pub mod plan;
pub mod resource;
pub mod template;
pub mod value;

// Re-exports
pub use error::{CloudError, Result};
pub use graph::{Output, ResourceGraph};
pub use lookup::{ContextManager, LookupContext, LookupSource, ParameterEntry, VpcAttributes};
pub use plan::{Plan, PlanSummary, Step};
pub use resource::{DeletionPolicy, Resource};
pub use template::{Template, TemplateFormat, TemplateOutput, TemplateResource};
pub use value::{Deferred, Expr, Pseudo};
