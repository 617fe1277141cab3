//! Protocol dispatch through the full WebSocket middleware stack.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;

use codblog_gateway::auth::{self, Identity, MemoryUserDirectory, User};
use codblog_gateway::dispatch::{
    ConnectionScope, Handler, PathPattern, ProtocolKind, ProtocolRouter, ScopeField, UrlRouter,
};
use codblog_gateway::entrypoint::websocket_stack;
use codblog_gateway::error::GatewayError;
use codblog_gateway::session::{MemorySessionStore, SessionHandle, SessionSettings};

#[derive(Debug, Clone)]
struct Seen {
    handler: &'static str,
    protocol: String,
    identity: Option<Identity>,
    order: Vec<ScopeField>,
}

#[derive(Debug, Clone)]
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<Seen>>>,
}

#[async_trait]
impl Handler for Recorder {
    async fn handle(&self, scope: ConnectionScope) -> Result<Response, GatewayError> {
        self.log.lock().await.push(Seen {
            handler: self.name,
            protocol: scope.protocol().to_string(),
            identity: scope.user().cloned(),
            order: scope.attachment_order().to_vec(),
        });
        Ok(StatusCode::OK.into_response())
    }
}

struct Fixture {
    router: ProtocolRouter,
    log: Arc<Mutex<Vec<Seen>>>,
    sessions: Arc<MemorySessionStore>,
    users: Arc<MemoryUserDirectory>,
}

fn fixture() -> Fixture {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sessions = Arc::new(MemorySessionStore::new());
    let users = Arc::new(MemoryUserDirectory::new());

    let Ok(chat) = PathPattern::parse("chat") else {
        panic!("valid pattern");
    };
    let urls = UrlRouter::new().route(
        chat,
        Recorder {
            name: "C",
            log: Arc::clone(&log),
        },
    );

    let router = ProtocolRouter::new()
        .route(
            ProtocolKind::Http,
            Recorder {
                name: "H",
                log: Arc::clone(&log),
            },
        )
        .route(
            ProtocolKind::WebSocket,
            websocket_stack(
                urls,
                Arc::clone(&sessions) as _,
                Arc::clone(&users) as _,
                SessionSettings::default(),
            ),
        );

    Fixture {
        router,
        log,
        sessions,
        users,
    }
}

async fn seen(fixture: &Fixture) -> Vec<Seen> {
    fixture.log.lock().await.clone()
}

#[tokio::test]
async fn http_scope_reaches_only_the_http_chain() {
    let fx = fixture();
    let result = fx.router.dispatch(ConnectionScope::new("http", "/chat")).await;
    assert!(result.is_ok());

    let seen = seen(&fx).await;
    assert_eq!(seen.len(), 1);
    let Some(first) = seen.first() else {
        panic!("one invocation expected");
    };
    assert_eq!(first.handler, "H");
    assert_eq!(first.protocol, "http");
    assert!(first.order.is_empty());
}

#[tokio::test]
async fn anonymous_websocket_reaches_chat_consumer() {
    let fx = fixture();
    let result = fx
        .router
        .dispatch(ConnectionScope::new("websocket", "/chat"))
        .await;
    assert!(result.is_ok());

    let seen = seen(&fx).await;
    let Some(first) = seen.first() else {
        panic!("consumer should run");
    };
    assert_eq!(first.handler, "C");
    assert_eq!(first.identity, Some(Identity::Anonymous));
    assert_eq!(
        first.order,
        vec![ScopeField::Session, ScopeField::User, ScopeField::Route]
    );
}

#[tokio::test]
async fn unknown_websocket_path_is_no_route_match() {
    let fx = fixture();
    let result = fx
        .router
        .dispatch(ConnectionScope::new("websocket", "/unknown"))
        .await;
    assert!(matches!(result, Err(GatewayError::NoRouteMatch(path)) if path == "/unknown"));
    assert!(seen(&fx).await.is_empty());
}

#[tokio::test]
async fn unsupported_protocol_invokes_nothing() {
    let fx = fixture();
    let result = fx.router.dispatch(ConnectionScope::new("ftp", "/chat")).await;
    assert!(matches!(result, Err(GatewayError::UnsupportedProtocol(p)) if p == "ftp"));
    assert!(seen(&fx).await.is_empty());
}

#[tokio::test]
async fn session_cookie_authenticates_user() {
    let fx = fixture();
    let ada = User {
        id: 7,
        username: "ada".to_string(),
        is_active: true,
        is_staff: false,
        session_auth_hash: "h7".to_string(),
    };
    fx.users.insert(ada.clone()).await;

    let session = SessionHandle::anonymous(
        Arc::clone(&fx.sessions) as _,
        Duration::from_secs(3_600),
    );
    let Ok(key) = auth::login(&session, &ada).await else {
        panic!("login should persist the session");
    };
    let Ok(cookie) = HeaderValue::from_str(&format!("sessionid={key}")) else {
        panic!("valid cookie header");
    };

    let scope = ConnectionScope::new("websocket", "/chat").with_header(header::COOKIE, cookie);
    assert!(fx.router.dispatch(scope).await.is_ok());

    let seen = seen(&fx).await;
    let Some(first) = seen.first() else {
        panic!("consumer should run");
    };
    assert_eq!(first.identity, Some(Identity::User(ada)));
}

#[tokio::test]
async fn stale_cookie_falls_back_to_anonymous() {
    let fx = fixture();
    let Ok(cookie) = HeaderValue::from_str("sessionid=0123456789abcdefghijklmnopqrstuv") else {
        panic!("valid cookie header");
    };
    let scope = ConnectionScope::new("websocket", "/chat").with_header(header::COOKIE, cookie);
    assert!(fx.router.dispatch(scope).await.is_ok());

    let seen = seen(&fx).await;
    let Some(first) = seen.first() else {
        panic!("consumer should run");
    };
    assert_eq!(first.identity, Some(Identity::Anonymous));
}
