//! HTTP protocol implementation.
//!
//! A small HTTP/1.1 subset: GET and HEAD for static files, conditional
//! retrieval via `If-Modified-Since`, and keep-alive sessions with an idle
//! timeout.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection session state machine
//! - **`parser`**: Parses a request head into a [`request::Request`]
//! - **`request`**: Request representation, method/version/connection helpers
//! - **`conditional`**: `If-Modified-Since` evaluation
//! - **`handler`**: Dispatches a parse result to exactly one response
//! - **`response`**: Status codes, the ordered-header builder and the 200/304/400/404 shapes
//! - **`writer`**: Serializes and writes responses to the client
//! - **`mime`**: Content category from a path suffix
//!
//! # Session State Machine
//!
//! ```text
//!        ┌─────────────┐
//!   ┌──▶ │   Reading   │ ← Wait for a request head (bounded by the idle timeout)
//!   │    └──────┬──────┘
//!   │           │ Head received          (timeout / EOF, nothing buffered ─▶ Closing)
//!   │           │ Partial head at timeout / EOF is dispatched as is
//!   │           ▼
//!   │    ┌──────────────────┐
//!   │    │   Dispatching    │ ← Parse, resolve, build response
//!   │    └──────┬───────────┘
//!   │           ▼
//!   │    ┌──────────────────┐
//!   │    │   Responding     │ ← Write response
//!   │    └──────┬───────────┘
//!   │           ├─ 400/404 or Connection: close → Closing
//!   │           ▼
//!   │    ┌──────────────────┐
//!   └─── │    KeepAlive     │ ← Flush access log
//!        └──────────────────┘
//! ```
//!
//! `Closing` flushes whatever the session still buffers for the access log
//! and shuts the socket down.

pub mod conditional;
pub mod connection;
pub mod handler;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
