//! Search criteria and request documents.

pub mod condition;
pub mod query;

pub use condition::{Condition, ConditionSet, JoinOperator};
pub use query::{SearchQuery, Sort, WORKFLOW_MODE_DRAFT};
