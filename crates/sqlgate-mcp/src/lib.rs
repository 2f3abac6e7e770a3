//! # sqlgate-mcp
//!
//! MCP (Model Context Protocol) surface of the gateway. This crate exposes
//! a remote database to MCP clients over two transports:
//!
//! - **stdio**: line-delimited JSON-RPC with a single implicit session.
//! - **HTTP/SSE**: long-lived streaming sessions established on `/sse`,
//!   with requests delivered on `/messages` and routed back to the
//!   originating session's database target and permission grant.
//!
//! ## Architecture
//!
//! ```text
//! MCP client
//!     │ GET /sse?secret=&db=&permissions=
//!     ▼
//! ┌──────────────────┐
//! │ transport        │ secret gate, grant parsing     (sqlgate-core)
//! │ session registry │ session id ↔ (target, grant)
//! │ dispatch         │ tools/list, tools/call
//! │ pool router      │ per-target pool cache          (sqlgate-adapter-pg)
//! │ executor         │ classify → authorize → tx      (sqlgate-adapter-pg)
//! └────────┬─────────┘
//!          ▼
//!    Upstream Postgres
//! ```
//!
//! Every posted request is dispatched under an explicit [`protocol::RoutingContext`]
//! built from the resolved session, so concurrent sessions bound to
//! different targets never race on shared routing state.

pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;

pub use error::GatewayError;
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, RoutingContext, SseEvent,
    ToolContent, ToolDefinition,
};
pub use server::McpServer;
pub use session::{Session, SessionRegistry};
pub use tools::ToolRegistry;
pub use transport::{HttpServer, TransportState};
