//! Per-connection scope passed through a handler chain.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, FromRequestParts, Request};
use axum::http::header::{SEC_WEBSOCKET_PROTOCOL, UPGRADE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};

use super::pattern::RouteParams;
use crate::auth::Identity;
use crate::error::GatewayError;
use crate::session::SessionHandle;

/// Protocol kinds the route table can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    /// Plain HTTP request/response.
    Http,
    /// WebSocket connection.
    WebSocket,
}

impl ProtocolKind {
    /// Returns the wire tag for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket => "websocket",
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "websocket" => Ok(Self::WebSocket),
            other => Err(GatewayError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Context fields attached to a scope by the handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeField {
    /// The session handle.
    Session,
    /// The resolved identity.
    User,
    /// The matched URL route.
    Route,
}

/// The I/O side of a connection.
pub enum Transport {
    /// No I/O attached; used when dispatching synthetic scopes.
    Detached,
    /// A full HTTP request, body included.
    Http(Request),
    /// A pending WebSocket upgrade.
    WebSocket(WebSocketUpgrade),
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached => f.write_str("Detached"),
            Self::Http(request) => f
                .debug_tuple("Http")
                .field(request.method())
                .field(request.uri())
                .finish(),
            Self::WebSocket(_) => f.write_str("WebSocket"),
        }
    }
}

/// A route selected by the URL router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    /// Pattern source as registered.
    pub pattern: String,
    /// Captured path parameters.
    pub params: RouteParams,
}

/// Per-connection context.
///
/// Built once per inbound connection. The protocol tag and request
/// metadata are fixed at construction; session, user and route are
/// attached by the chain in that order.
#[derive(Debug)]
pub struct ConnectionScope {
    protocol: String,
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    subprotocols: Vec<String>,
    client: Option<SocketAddr>,
    session: Option<SessionHandle>,
    user: Option<Identity>,
    route: Option<MatchedRoute>,
    attached: Vec<ScopeField>,
    transport: Transport,
}

impl ConnectionScope {
    /// Creates a detached scope with the given protocol tag and path.
    #[must_use]
    pub fn new(protocol: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            method: Method::GET,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            subprotocols: Vec::new(),
            client: None,
            session: None,
            user: None,
            route: None,
            attached: Vec::new(),
            transport: Transport::Detached,
        }
    }

    /// Builds a scope from an inbound HTTP request.
    ///
    /// A `GET` carrying `Upgrade: websocket` is classified as a WebSocket
    /// connection and its upgrade is extracted; everything else is HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HandshakeRejected`] if the request asks for
    /// a WebSocket upgrade but the handshake headers are invalid.
    pub async fn from_request(request: Request) -> Result<Self, GatewayError> {
        let protocol = if is_websocket_upgrade(&request) {
            ProtocolKind::WebSocket
        } else {
            ProtocolKind::Http
        };

        let mut scope = Self::new(protocol.as_str(), request.uri().path());
        scope.method = request.method().clone();
        scope.query = request.uri().query().map(str::to_string);
        scope.headers = request.headers().clone();
        scope.subprotocols = parse_subprotocols(&scope.headers);
        scope.client = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        scope.transport = match protocol {
            ProtocolKind::Http => Transport::Http(request),
            ProtocolKind::WebSocket => {
                let (mut parts, _body) = request.into_parts();
                let upgrade =
                    <WebSocketUpgrade as FromRequestParts<()>>::from_request_parts(&mut parts, &())
                        .await
                        .map_err(|rejection| GatewayError::HandshakeRejected(rejection.to_string()))?;
                Transport::WebSocket(upgrade)
            }
        };

        Ok(scope)
    }

    /// Sets the request method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the requested WebSocket subprotocols.
    #[must_use]
    pub fn with_subprotocols(mut self, subprotocols: Vec<String>) -> Self {
        self.subprotocols = subprotocols;
        self
    }

    /// Sets the transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Raw protocol tag as declared by the connection.
    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Request method (always `GET` for WebSocket handshakes).
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path, leading `/` included.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Subprotocols offered in `Sec-WebSocket-Protocol`.
    #[must_use]
    pub fn subprotocols(&self) -> &[String] {
        &self.subprotocols
    }

    /// Remote peer address when served with connect info.
    #[must_use]
    pub fn client(&self) -> Option<SocketAddr> {
        self.client
    }

    /// Session handle, once the session middleware has run.
    #[must_use]
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Resolved identity, once the auth middleware has run.
    #[must_use]
    pub fn user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }

    /// Route matched by the URL router.
    #[must_use]
    pub fn route(&self) -> Option<&MatchedRoute> {
        self.route.as_ref()
    }

    /// Context fields in the order they were attached.
    #[must_use]
    pub fn attachment_order(&self) -> &[ScopeField] {
        &self.attached
    }

    /// Attaches the session handle.
    pub fn attach_session(&mut self, session: SessionHandle) {
        self.session = Some(session);
        self.attached.push(ScopeField::Session);
    }

    /// Attaches the resolved identity.
    pub fn attach_user(&mut self, identity: Identity) {
        self.user = Some(identity);
        self.attached.push(ScopeField::User);
    }

    /// Attaches the matched route.
    pub fn attach_route(&mut self, route: MatchedRoute) {
        self.route = Some(route);
        self.attached.push(ScopeField::Route);
    }

    /// Takes the transport out of the scope, leaving it detached.
    pub fn take_transport(&mut self) -> Transport {
        std::mem::replace(&mut self.transport, Transport::Detached)
    }
}

fn is_websocket_upgrade(request: &Request) -> bool {
    request.method() == Method::GET
        && request
            .headers()
            .get_all(UPGRADE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| {
                value
                    .split(',')
                    .any(|token| token.trim().eq_ignore_ascii_case("websocket"))
            })
}

fn parse_subprotocols(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
