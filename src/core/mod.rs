//! 核心编排层：错误分类、查询、工作目录、结果分类、回退状态机与构建

pub mod builder;
pub mod classifier;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod query;
pub mod scope;

pub use builder::{create_orchestrator, OrchestratorBuilder};
pub use classifier::OutcomeClassifier;
pub use error::{ErrorClass, FailureReason, ProviderError, ProviderErrorKind, ScopeError, SetupError};
pub use orchestrator::FallbackOrchestrator;
pub use outcome::{DeliveredTrack, FinalOutcome, OrchestrationSignal, ProviderResult};
pub use query::Query;
pub use scope::{OwnedScope, WorkingScope};
