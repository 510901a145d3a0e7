//! JSON adapter: the serial form is a [`serde_json::Value`] tree and the
//! wire form is UTF-8 JSON text.

use super::{tree, CallArgs, RpcValue, SerialAdapter};
use crate::error::{Result, RpcError};
use crate::pack::PackedCall;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Packed calls as JSON objects, rendered to JSON text on the wire.
pub struct JsonAdapter;

impl SerialAdapter for JsonAdapter {
    type SerialForm = Value;

    fn from_wire(bytes: &[u8]) -> Option<Value> {
        let obj = serde_json::from_slice(bytes).ok()?;
        tree::validate_shape(obj)
    }

    fn to_wire(obj: &Value) -> Result<Vec<u8>> {
        serde_json::to_vec(obj).map_err(|err| RpcError::serialization(err.to_string()))
    }

    fn empty_object() -> Value {
        Value::Object(Map::new())
    }

    fn encode_value<T: Serialize>(value: &T) -> Result<Value> {
        serde_json::to_value(value).map_err(|err| RpcError::serialization(err.to_string()))
    }

    fn decode_value<T: DeserializeOwned>(obj: &Value) -> Result<T> {
        serde_json::from_value(obj.clone())
            .map_err(|err| RpcError::deserialization(err.to_string()))
    }

    fn serialize_pack<R, Args>(pack: &PackedCall<R, Args>) -> Result<Value>
    where
        R: RpcValue,
        Args: CallArgs<Self>,
    {
        tree::serialize_pack::<Self, R, Args>(pack)
    }

    fn deserialize_pack<R, Args>(obj: &Value) -> Result<PackedCall<R, Args>>
    where
        R: RpcValue,
        Args: CallArgs<Self>,
    {
        tree::deserialize_pack::<Self, R, Args>(obj)
    }

    fn func_name(obj: &Value) -> Result<String> {
        tree::func_name(obj)
    }

    fn extract_error(obj: &Value) -> Option<RpcError> {
        tree::extract_error(obj)
    }

    fn set_error(obj: &mut Value, error: &RpcError) {
        tree::set_error(obj, error);
    }
}
