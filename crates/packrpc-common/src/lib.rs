//! packrpc Protocol Core
//!
//! This crate provides the protocol layer shared by the packrpc client and
//! server: the typed packed-call data model, the error taxonomy, and the
//! serialization adapters that turn typed calls into wire bytes.
//!
//! # Overview
//!
//! packrpc is a transport-agnostic, serialization-agnostic RPC framework.
//! A process binds plain Rust functions by name; a peer invokes them through
//! a typed client and receives the return value, mutations made to
//! by-reference arguments, or a structured error. This crate contains the
//! pieces both sides agree on:
//!
//! - **Packed calls**: the in-memory record of a single RPC attempt
//!   (function name, argument tuple, result-or-error)
//! - **Error taxonomy**: stable numeric error kinds carried on the wire
//! - **Adapters**: the [`SerialAdapter`] contract plus JSON and MessagePack
//!   implementations
//! - **Framing**: length-prefixed frame helpers used by the TCP transports
//!
//! # Components
//!
//! - [`pack`] - The [`PackedCall`] data model
//! - [`error`] - [`RpcError`], [`ErrorKind`], and the crate [`Result`] alias
//! - [`adapters`] - Serialization adapter contract and implementations
//! - [`transport`] - Length-prefix frame encoding shared by TCP endpoints
//!
//! # Example
//!
//! ```
//! use packrpc_common::{JsonAdapter, PackedCall, SerialAdapter};
//!
//! // A request pack for `sum(2, 3)`, as the client would build it.
//! let pack = PackedCall::<i64, (i64, i64)>::new("sum", (2, 3));
//!
//! let obj = JsonAdapter::serialize_pack(&pack).unwrap();
//! let bytes = JsonAdapter::to_wire(&obj).unwrap();
//!
//! // The wire form parses back to a shape-valid object.
//! assert!(JsonAdapter::from_wire(&bytes).is_some());
//! ```

pub mod adapters;
pub mod error;
pub mod pack;
pub mod transport;

pub use adapters::{CallArgs, JsonAdapter, MessagePackAdapter, RpcValue, SerialAdapter};
pub use error::{ErrorKind, Result, RpcError};
pub use pack::PackedCall;
