//! Serialization adapters.
//!
//! An adapter is a stateless type that bridges typed [`PackedCall`]s and the
//! byte sequences a transport carries. Two halves make up the bridge: an
//! in-memory *serial form* (the adapter's structured representation of a
//! call) and the *wire form* (its byte encoding). The [`SerialAdapter`]
//! trait is the whole contract; [`JsonAdapter`] and [`MessagePackAdapter`]
//! are the shipped implementations.
//!
//! # Wire object layout
//!
//! Every adapter encodes a packed call as an object with these fields:
//!
//! | Field | Presence | Meaning |
//! |---|---|---|
//! | `func_name` | requests and successful responses | callee name (non-empty) |
//! | `args` | required | positional argument values, in declaration order |
//! | `result` | successful non-void responses | return value |
//! | `except_type` | iff an error is recorded | numeric [`ErrorKind`] code |
//! | `err_mesg` | iff `except_type` is non-zero | human-readable message |
//!
//! # Opting in user types
//!
//! Any type implementing serde's `Serialize` and `Deserialize` participates
//! automatically, as an argument or as a return value; derive both and the
//! round-trip law (`decode(encode(v)) == v`) comes with the derive.

use crate::error::{Result, RpcError};
use crate::pack::PackedCall;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

pub mod json;
pub mod msgpack;
mod tree;

pub use json::JsonAdapter;
pub use msgpack::MessagePackAdapter;

/// Values that can cross the wire: serde-serializable, owned, and sendable
/// between session threads. Blanket-implemented; never implement by hand.
pub trait RpcValue: Serialize + DeserializeOwned + Send + 'static {}

impl<T: Serialize + DeserializeOwned + Send + 'static> RpcValue for T {}

/// The serialization boundary between typed packed calls and wire bytes.
///
/// Adapters are stateless: every method is an associated function. The
/// parser half ([`from_wire`](SerialAdapter::from_wire)) must never panic;
/// malformed or shape-invalid input surfaces as `None`.
pub trait SerialAdapter: Sized + 'static {
    /// The adapter's in-memory structured representation of a call.
    type SerialForm: Clone + fmt::Debug + PartialEq + Send;

    /// Parses wire bytes into a shape-validated serial form.
    ///
    /// Shape validation: an object carrying a non-zero `except_type` must
    /// also carry `err_mesg` (and may be otherwise empty); any other object
    /// must carry a non-empty string `func_name` and an array `args`.
    fn from_wire(bytes: &[u8]) -> Option<Self::SerialForm>;

    /// Encodes a serial form to wire bytes.
    fn to_wire(obj: &Self::SerialForm) -> Result<Vec<u8>>;

    /// A neutral, empty container. Used to answer requests that failed to
    /// parse, where there is no request object to write the error into.
    fn empty_object() -> Self::SerialForm;

    /// Encodes a single value into the serial form's value space.
    fn encode_value<T: Serialize>(value: &T) -> Result<Self::SerialForm>;

    /// Decodes a single value out of the serial form's value space.
    fn decode_value<T: DeserializeOwned>(obj: &Self::SerialForm) -> Result<T>;

    /// Encodes a packed call: name, args in declaration order, and either
    /// the result (when present) or the error fields.
    fn serialize_pack<R, Args>(pack: &PackedCall<R, Args>) -> Result<Self::SerialForm>
    where
        R: RpcValue,
        Args: CallArgs<Self>;

    /// Rebuilds a packed call, validating each argument against the declared
    /// parameter type. A form carrying an error yields a pack with that
    /// error set and no result.
    fn deserialize_pack<R, Args>(obj: &Self::SerialForm) -> Result<PackedCall<R, Args>>
    where
        R: RpcValue,
        Args: CallArgs<Self>;

    /// Reads the callee name out of a request form.
    fn func_name(obj: &Self::SerialForm) -> Result<String>;

    /// Reads the error carried by a form, if any (a zero `except_type`
    /// counts as no error).
    fn extract_error(obj: &Self::SerialForm) -> Option<RpcError>;

    /// Writes an error into a form, replacing any previous error fields.
    fn set_error(obj: &mut Self::SerialForm, error: &RpcError);
}

/// A fixed-arity, heterogeneous argument tuple for some adapter `A`.
///
/// Implemented for tuples of zero through ten [`RpcValue`] elements, which
/// map to wire arrays of matching length with order preserved.
pub trait CallArgs<A: SerialAdapter>: Sized + Send + 'static {
    /// Number of positional arguments in the tuple.
    const ARITY: usize;

    /// Encodes each element, in declaration order.
    fn encode_args(&self) -> Result<Vec<A::SerialForm>>;

    /// Decodes a wire array back into the tuple.
    ///
    /// The array length must equal [`ARITY`](CallArgs::ARITY) exactly;
    /// any mismatch in count or element type is a signature mismatch.
    fn decode_args(items: &[A::SerialForm]) -> Result<Self>;
}

fn decode_arg<A: SerialAdapter, T: DeserializeOwned>(
    item: &A::SerialForm,
    index: usize,
) -> Result<T> {
    A::decode_value(item).map_err(|err| {
        RpcError::signature_mismatch(format!(
            "argument {index}: expected {}: {}",
            std::any::type_name::<T>(),
            err.message()
        ))
    })
}

macro_rules! impl_call_args {
    (@count) => { 0 };
    (@count $head:ident $($tail:ident)*) => { 1 + impl_call_args!(@count $($tail)*) };
    ($($name:ident : $idx:tt),*) => {
        impl<A: SerialAdapter, $($name: RpcValue),*> CallArgs<A> for ($($name,)*) {
            const ARITY: usize = impl_call_args!(@count $($name)*);

            fn encode_args(&self) -> Result<Vec<A::SerialForm>> {
                Ok(vec![$(A::encode_value(&self.$idx)?),*])
            }

            fn decode_args(items: &[A::SerialForm]) -> Result<Self> {
                if items.len() != <Self as CallArgs<A>>::ARITY {
                    return Err(RpcError::signature_mismatch(format!(
                        "argument count mismatch: expected {}, got {}",
                        <Self as CallArgs<A>>::ARITY,
                        items.len()
                    )));
                }
                Ok(($(decode_arg::<A, $name>(&items[$idx], $idx)?,)*))
            }
        }
    };
}

impl_call_args!();
impl_call_args!(T0: 0);
impl_call_args!(T0: 0, T1: 1);
impl_call_args!(T0: 0, T1: 1, T2: 2);
impl_call_args!(T0: 0, T1: 1, T2: 2, T3: 3);
impl_call_args!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4);
impl_call_args!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5);
impl_call_args!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6);
impl_call_args!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7);
impl_call_args!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8);
impl_call_args!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8, T9: 9);
