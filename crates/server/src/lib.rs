pub mod api;
pub mod chat;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
