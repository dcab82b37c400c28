pub mod debounce;
pub mod orchestrator;
pub mod session;

pub use debounce::Debouncer;
pub use orchestrator::{
    RequestState, SearchOrchestrator, SearchView, ERROR_FETCHING_MOVIES, NO_MOVIES_FOUND,
};
pub use session::{SearchSession, SessionRepo};
