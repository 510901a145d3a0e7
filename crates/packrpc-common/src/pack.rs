//! The packed-call data model.
//!
//! A [`PackedCall`] is the in-memory record of a single RPC attempt: the
//! function name, the positional argument tuple, and either a result or a
//! recorded error. The client builds one per call, the server rebuilds it
//! from the decoded request, fills in the outcome, and both sides hand it to
//! a serialization adapter for the trip across the wire.

use crate::error::{ErrorKind, Result, RpcError};
use serde::de::DeserializeOwned;

/// One RPC attempt, typed by its return value `R` and argument tuple `Args`.
///
/// At most one of the result and the error is ever observable: once an error
/// is recorded, [`into_result`](PackedCall::into_result) returns it instead
/// of any value in the result slot.
///
/// Argument storage is mutable so that server callbacks can write through
/// by-reference parameters; the mutated tuple rides back to the client in the
/// response.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedCall<R, Args> {
    func_name: String,
    args: Args,
    result: Option<R>,
    error: Option<RpcError>,
}

impl<R, Args> PackedCall<R, Args> {
    /// A request pack: arguments only, outcome not yet computed.
    pub fn new(func_name: impl Into<String>, args: Args) -> Self {
        Self::with_result(func_name, None, args)
    }

    /// A pack with an explicit result slot, as rebuilt from a response.
    pub fn with_result(func_name: impl Into<String>, result: Option<R>, args: Args) -> Self {
        let func_name = func_name.into();
        debug_assert!(!func_name.is_empty(), "func_name must be non-empty");
        Self {
            func_name,
            args,
            result,
            error: None,
        }
    }

    pub fn func_name(&self) -> &str {
        &self.func_name
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut Args {
        &mut self.args
    }

    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }

    pub fn set_result(&mut self, value: R) {
        self.result = Some(value);
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }

    /// Records a failure; the pack stops being "ok" and the error wins over
    /// any result previously set.
    pub fn set_error(&mut self, error: RpcError) {
        self.error = Some(error);
    }

    /// Whether the call completed: no error recorded and a result produced.
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }
}

impl<R: DeserializeOwned, Args> PackedCall<R, Args> {
    /// Consumes the pack, yielding the result or the recorded error.
    ///
    /// Unit and optional return values never cross the wire (the `result`
    /// field is simply absent), so an empty result slot is first offered a
    /// null value; only types that genuinely need data then error out.
    pub fn into_result(self) -> Result<R> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match self.result {
            Some(value) => Ok(value),
            None => serde_json::from_value(serde_json::Value::Null)
                .map_err(|_| RpcError::new(ErrorKind::None, "result is not set")),
        }
    }

    /// Splits the pack into its (possibly server-mutated) argument tuple and
    /// the call outcome. The client uses this to rebind by-reference
    /// arguments before surfacing the result.
    pub fn into_parts(self) -> (Args, Result<R>) {
        let args = self.args;
        let outcome = PackedCall {
            func_name: self.func_name,
            args: (),
            result: self.result,
            error: self.error,
        }
        .into_result();
        (args, outcome)
    }
}
