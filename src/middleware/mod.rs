pub mod auth;
pub mod response;

pub use auth::{actor, require_identity, AuthUser};
pub use response::{ApiResponse, ApiResult, TOTAL_COUNT_HEADER};
