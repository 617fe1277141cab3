//! # codblog-gateway
//!
//! Asynchronous entrypoint for the codblog web application.
//!
//! Every inbound connection is classified by protocol and handed to the
//! handler chain registered for it. Plain HTTP goes to the HTTP
//! application; WebSocket connections pass through session resolution and
//! authentication before a URL router picks the consumer for their path.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── Application / ProtocolRouter (dispatch/)
//!     │     ├── http      → HttpApplication (api/)
//!     │     └── websocket → SessionMiddleware (session/)
//!     │                       → AuthMiddleware (auth/)
//!     │                         → UrlRouter → GroupConsumer (ws/)
//!     │
//!     ├── ChannelLayer (domain/)
//!     │
//!     └── Session and user stores: memory or PostgreSQL (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod entrypoint;
pub mod error;
pub mod persistence;
pub mod session;
pub mod ws;
