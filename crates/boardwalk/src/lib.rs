// boardwalk: HTTP server fronting a ThingsBoard instance

pub mod error;
pub mod handlers;
pub mod state;
pub mod store;

pub use error::ApiError;
pub use state::AppState;
