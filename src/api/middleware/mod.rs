//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Audit logger: request id, timing, final status
//! 2. Auth validator: bearer token, injects `UserContext`

pub mod audit;
pub mod auth;
