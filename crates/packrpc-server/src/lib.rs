//! packrpc Server
//!
//! This crate provides the server half of packrpc: a dispatch engine that
//! routes decoded requests to bound Rust callbacks, an optional per-function
//! result cache, and a thread-per-session TCP serving loop.
//!
//! # Architecture
//!
//! The [`Server`] owns a table mapping function names to type-erased
//! handlers. Each handler knows its own signature: it decodes the request's
//! argument tuple, runs the user callback, and re-encodes the outcome in
//! place. [`Server::dispatch`] is the only entry point a transport needs -
//! bytes in, bytes out, never a panic.
//!
//! Setup (`bind` calls) happens before serving starts and requires
//! `&mut self`; once the server is wrapped in an `Arc` and shared across
//! session threads, the dispatch table is immutable and the result cache is
//! the only mutable shared state, guarded by one lock per bound name.
//!
//! # Main Components
//!
//! - [`Server`] - dispatch table, `bind` / `bind_cached`, `dispatch`
//! - [`FuncCache`] - per-function result cache keyed by request bytes
//! - [`serve`] - blocking TCP accept loop, one thread per session
//!
//! # Example
//!
//! ```
//! use packrpc_common::JsonAdapter;
//! use packrpc_server::Server;
//!
//! let mut server = Server::<JsonAdapter>::new();
//! server.bind("sum", |args: &mut (i64, i64)| Ok(args.0 + args.1));
//!
//! let request = br#"{"func_name": "sum", "args": [2, 3]}"#;
//! let response = server.dispatch(request);
//!
//! let obj: serde_json::Value = serde_json::from_slice(&response).unwrap();
//! assert_eq!(obj["result"], 5);
//! ```

pub mod cache;
pub mod dispatch;
pub mod tcp;

pub use cache::FuncCache;
pub use dispatch::{CallbackError, Server};
pub use tcp::serve;
