//! The typed invocation engine.

use crate::transport::Transport;
use packrpc_common::{CallArgs, PackedCall, Result, RpcError, RpcValue, SerialAdapter};
use std::marker::PhantomData;
use tracing::debug;

/// A synchronous RPC client over an adapter `A` and a transport `T`.
///
/// One in-flight call at a time: both call methods take `&mut self` and do
/// not return until the response has been consumed or an error raised.
pub struct Client<A: SerialAdapter, T: Transport> {
    transport: T,
    _adapter: PhantomData<A>,
}

impl<A: SerialAdapter, T: Transport> Client<A, T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            _adapter: PhantomData,
        }
    }

    /// Calls a remote function with by-value arguments.
    ///
    /// Any server-side mutation of the arguments is discarded; use
    /// [`call_mut`](Client::call_mut) to observe it.
    ///
    /// # Errors
    ///
    /// - `client_send` / `client_receive` when the transport fails
    /// - `client_receive` when the response is not a valid RPC object
    /// - the server's own error kind when the response carries one
    pub fn call<R, Args>(&mut self, func_name: &str, args: Args) -> Result<R>
    where
        R: RpcValue,
        Args: CallArgs<A>,
    {
        let pack = PackedCall::<R, Args>::new(func_name, args);
        let (_args, outcome) = self.round_trip(&pack)?.into_parts();
        outcome
    }

    /// Calls a remote function and rebinds the caller's argument tuple from
    /// the response, making server-side mutations of by-reference parameters
    /// visible locally.
    ///
    /// Rebinding happens before the outcome is inspected, so mutations are
    /// observed even when the call ultimately errors - matching what an
    /// in-process call through `&mut` references would leave behind.
    pub fn call_mut<R, Args>(&mut self, func_name: &str, args: &mut Args) -> Result<R>
    where
        R: RpcValue,
        Args: CallArgs<A> + Clone,
    {
        let pack = PackedCall::<R, Args>::new(func_name, args.clone());
        let (reply_args, outcome) = self.round_trip(&pack)?.into_parts();
        *args = reply_args;
        outcome
    }

    /// Consumes the client, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn round_trip<R, Args>(&mut self, pack: &PackedCall<R, Args>) -> Result<PackedCall<R, Args>>
    where
        R: RpcValue,
        Args: CallArgs<A>,
    {
        debug!(func_name = pack.func_name(), "calling remote function");

        let obj = A::serialize_pack(pack)?;
        let request = A::to_wire(&obj)?;

        self.transport
            .send(&request)
            .map_err(|err| RpcError::client_send(err.to_string()))?;
        let response = self
            .transport
            .receive()
            .map_err(|err| RpcError::client_receive(err.to_string()))?;

        let obj = A::from_wire(&response)
            .ok_or_else(|| RpcError::client_receive("client received invalid RPC object"))?;

        match A::deserialize_pack::<R, Args>(&obj) {
            Ok(reply) => Ok(reply),
            // Error-only responses (e.g. the server could not even parse the
            // request) carry no argument array to rebuild a pack from;
            // surface their error directly.
            Err(err) => Err(A::extract_error(&obj).unwrap_or(err)),
        }
    }
}
