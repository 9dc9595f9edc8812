mod api_response;
mod auth_routes;
mod extract;
pub mod config;
mod http_layers;
pub mod metrics;
pub mod server;
mod session;
mod social_routes;
mod spotify_routes;
pub mod state;
mod user_routes;

pub use api_response::{ApiError, ApiResult};
pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use session::{COOKIE_SESSION_TOKEN_KEY, HEADER_SESSION_TOKEN_KEY};
pub use state::ServerState;
