//! xAPI statement model and the cmi5 statement builder

mod builder;
mod score;
mod types;
pub mod vocabulary;

pub use builder::{AdditionalProperties, StatementBuilder, append_provided_properties};
pub use types::{
    Activity, ActivityDefinition, Context, ContextActivities, LanguageMap, Score, Statement,
    StatementResult, Verb,
};
