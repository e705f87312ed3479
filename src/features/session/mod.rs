pub mod handler;
pub mod store;

pub use handler::create_session_router;
pub use store::{SessionRecord, SessionStore};
