//! Shared object-tree logic for the shipped adapters.
//!
//! Both [`JsonAdapter`](super::JsonAdapter) and
//! [`MessagePackAdapter`](super::MessagePackAdapter) use a JSON-like value
//! tree as their serial form and differ only in how that tree is rendered to
//! bytes. Everything about the object layout lives here once: field names,
//! shape validation, and the pack/unpack transformations.

use crate::error::{ErrorKind, Result, RpcError};
use crate::pack::PackedCall;
use super::{CallArgs, RpcValue, SerialAdapter};
use serde_json::{Map, Value};
use std::any::type_name;

pub(crate) const FUNC_NAME: &str = "func_name";
pub(crate) const ARGS: &str = "args";
pub(crate) const RESULT: &str = "result";
pub(crate) const EXCEPT_TYPE: &str = "except_type";
pub(crate) const ERR_MESG: &str = "err_mesg";

/// Shape validation applied by `from_wire` after a successful parse.
///
/// An object carrying a non-zero `except_type` must also carry `err_mesg`
/// and may be otherwise empty; any other object must carry a non-empty
/// string `func_name` and an array `args`.
pub(crate) fn validate_shape(obj: Value) -> Option<Value> {
    let map = obj.as_object()?;
    if let Some(code) = map.get(EXCEPT_TYPE) {
        let code = code.as_u64()?;
        if code != 0 && !map.contains_key(ERR_MESG) {
            return None;
        }
        return Some(obj);
    }
    match map.get(FUNC_NAME) {
        Some(Value::String(name)) if !name.is_empty() => {}
        _ => return None,
    }
    if !map.get(ARGS).is_some_and(Value::is_array) {
        return None;
    }
    Some(obj)
}

pub(crate) fn serialize_pack<A, R, Args>(pack: &PackedCall<R, Args>) -> Result<Value>
where
    A: SerialAdapter<SerialForm = Value>,
    R: RpcValue,
    Args: CallArgs<A>,
{
    let mut obj = Map::new();
    obj.insert(
        FUNC_NAME.to_owned(),
        Value::String(pack.func_name().to_owned()),
    );
    obj.insert(ARGS.to_owned(), Value::Array(pack.args().encode_args()?));

    if let Some(error) = pack.error() {
        obj.insert(EXCEPT_TYPE.to_owned(), Value::from(error.kind().code()));
        obj.insert(
            ERR_MESG.to_owned(),
            Value::String(error.message().to_owned()),
        );
        return Ok(Value::Object(obj));
    }

    if let Some(result) = pack.result() {
        let encoded = A::encode_value(result)?;
        // Unit and empty-optional results stay off the wire entirely.
        if !encoded.is_null() {
            obj.insert(RESULT.to_owned(), encoded);
        }
    }

    Ok(Value::Object(obj))
}

pub(crate) fn deserialize_pack<A, R, Args>(obj: &Value) -> Result<PackedCall<R, Args>>
where
    A: SerialAdapter<SerialForm = Value>,
    R: RpcValue,
    Args: CallArgs<A>,
{
    let map = obj
        .as_object()
        .ok_or_else(|| RpcError::deserialization("serial form is not an object"))?;

    let func_name = match map.get(FUNC_NAME) {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => return Err(RpcError::deserialization("missing or empty func_name")),
    };

    let items = map
        .get(ARGS)
        .and_then(Value::as_array)
        .ok_or_else(|| RpcError::deserialization("missing args array"))?;
    let args = Args::decode_args(items)?;

    if let Some(error) = extract_error(obj) {
        let mut pack = PackedCall::with_result(func_name, None, args);
        pack.set_error(error);
        return Ok(pack);
    }

    let result = match map.get(RESULT) {
        Some(value) if !value.is_null() => Some(A::decode_value::<R>(value).map_err(|err| {
            RpcError::signature_mismatch(format!(
                "result: expected {}: {}",
                type_name::<R>(),
                err.message()
            ))
        })?),
        _ => None,
    };

    Ok(PackedCall::with_result(func_name, result, args))
}

pub(crate) fn func_name(obj: &Value) -> Result<String> {
    obj.get(FUNC_NAME)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| RpcError::server_receive("request is missing func_name"))
}

pub(crate) fn extract_error(obj: &Value) -> Option<RpcError> {
    let map = obj.as_object()?;
    let code = map.get(EXCEPT_TYPE)?.as_u64()?;
    let kind = ErrorKind::from_code(code)?;
    if kind == ErrorKind::None {
        return None;
    }
    let message = map.get(ERR_MESG).and_then(Value::as_str).unwrap_or_default();
    Some(RpcError::new(kind, message))
}

pub(crate) fn set_error(obj: &mut Value, error: &RpcError) {
    if !obj.is_object() {
        *obj = Value::Object(Map::new());
    }
    if let Some(map) = obj.as_object_mut() {
        map.insert(EXCEPT_TYPE.to_owned(), Value::from(error.kind().code()));
        map.insert(
            ERR_MESG.to_owned(),
            Value::String(error.message().to_owned()),
        );
    }
}
