//! HTTP API layer

mod routes;
mod handlers;

pub use handlers::{api_error, AddCafeForm, ErrorResponse};
pub use routes::{create_router, ApiDoc, AppState};
