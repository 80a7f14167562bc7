//! Shared library for the post-call survey Lambda functions.
//!
//! This crate provides the survey data model, the record codec, table store
//! access, review task creation and the helpers used by every function.

pub mod auth;
pub mod codec;
pub mod config;
pub mod dynamo;
pub mod error;
pub mod http;
pub mod models;
pub mod report;
pub mod review;
pub mod store;

pub use auth::{extract_user_from_context, validate_token, AdminUser, CognitoClaims};
pub use config::Config;
pub use dynamo::DynamoStore;
pub use error::{Error, Result};
pub use http::ApiResponse;
pub use models::{
    ContactFlowEvent, ContactFlowResponse, SurveyDefinition, SurveyResult, NO_FLAG, RESULT_PREFIX,
};
pub use review::{ConnectTaskService, ReviewTask, TaskService};
pub use store::{scan_all, MemoryStore, Record, ScanFilter, TableStore};
