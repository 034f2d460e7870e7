//! courier-core — configuration, data model, validation, and credential
//! primitives. All other Courier crates depend on this one.

pub mod config;
pub mod model;
pub mod password;
pub mod validation;

pub use model::{
    LoginRequest, LoginResponse, ProcessRequest, ProcessedRecord, RegisterRequest, TaskHandle,
    TaskState, User,
};
pub use validation::FieldErrors;
