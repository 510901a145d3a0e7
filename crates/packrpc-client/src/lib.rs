//! packrpc Client
//!
//! This crate provides the client half of packrpc: a typed, synchronous
//! invocation engine over any transport that can deliver one response frame
//! per request frame.
//!
//! # Overview
//!
//! A [`Client`] pairs a serialization adapter with a [`Transport`]. Each
//! call builds a packed call for the declared signature, ships it through
//! the adapter and transport, and decodes the response back into a typed
//! result - or an [`RpcError`](packrpc_common::RpcError) carrying the error
//! kind the failure was classified under, locally or on the server.
//!
//! Calls are strictly serialized per client instance: `call` does not return
//! until a response arrives or an error is raised.
//!
//! # By-reference arguments
//!
//! Servers may mutate the argument tuple they receive; the mutated values
//! ride back in the response. [`Client::call_mut`] rebinds the caller's own
//! tuple from the response before returning, so the remote mutation lands in
//! local variables exactly as if the function had been called in-process.
//! [`Client::call`] takes the arguments by value and discards the returned
//! tuple.
//!
//! # Usage
//!
//! ```no_run
//! use packrpc_client::{Client, TcpTransport};
//! use packrpc_common::JsonAdapter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = TcpTransport::connect("127.0.0.1:5000")?;
//! let mut client = Client::<JsonAdapter, _>::new(transport);
//!
//! let total: i64 = client.call("sum", (2i64, 3i64))?;
//! assert_eq!(total, 5);
//!
//! // The server increments each element in place.
//! let mut args = (vec![1i64, 2, 3],);
//! client.call_mut::<(), _>("add_one_each_ref", &mut args)?;
//! assert_eq!(args.0, vec![2, 3, 4]);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod transport;

pub use client::Client;
pub use transport::{TcpTransport, Transport};
