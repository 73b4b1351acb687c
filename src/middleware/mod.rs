pub mod auth;
pub mod diagnostics;
pub mod extract;
pub mod response;

pub use auth::require_auth;
pub use diagnostics::error_details;
pub use extract::{parse_id, JsonObject, QueryParams};
pub use response::{ApiResponse, ApiResult};
