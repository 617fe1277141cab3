//! Session context: cookie parsing, session storage and the session
//! middleware that attaches a [`SessionHandle`] to every connection.

pub mod cookies;
pub mod handle;
pub mod middleware;
pub mod store;

pub use handle::SessionHandle;
pub use middleware::{SessionMiddleware, SessionSettings};
pub use store::{MemorySessionStore, SessionKey, SessionRecord, SessionStore};
