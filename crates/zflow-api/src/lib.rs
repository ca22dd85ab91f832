pub mod ai;
pub mod auth;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod users;
pub mod workspaces;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
