//! The dispatch engine: name-to-handler table plus the `dispatch` entry
//! point transports call with raw request bytes.

use crate::cache::{CacheRegistry, FuncCache};
use packrpc_common::{CallArgs, PackedCall, RpcError, RpcValue, SerialAdapter};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Failures a bound callback may return; the message is preserved and
/// surfaced to the caller as a `remote_exec` error.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

type Handler<A> = Box<dyn Fn(&mut <A as SerialAdapter>::SerialForm) + Send + Sync>;

/// The server-side dispatch engine for one serialization adapter.
///
/// Functions are registered with [`bind`](Server::bind) or
/// [`bind_cached`](Server::bind_cached) during setup; afterwards the server
/// is shared (typically behind an `Arc`) and [`dispatch`](Server::dispatch)
/// is invoked concurrently by session threads. Registration requires
/// `&mut self`, so the handler table cannot change while requests are being
/// served.
pub struct Server<A: SerialAdapter> {
    dispatch_table: HashMap<String, Handler<A>>,
    cache: CacheRegistry,
}

impl<A: SerialAdapter> Server<A> {
    pub fn new() -> Self {
        Self {
            dispatch_table: HashMap::new(),
            cache: CacheRegistry::default(),
        }
    }

    /// Binds a callback under a name. Rebinding a name replaces the
    /// previous handler.
    ///
    /// The callback receives the decoded argument tuple by `&mut`; any
    /// mutation it makes is serialized back into the response, which is how
    /// by-reference parameters reach the caller again.
    pub fn bind<R, Args, F>(&mut self, func_name: impl Into<String>, callback: F)
    where
        R: RpcValue,
        Args: CallArgs<A>,
        F: Fn(&mut Args) -> std::result::Result<R, CallbackError> + Send + Sync + 'static,
    {
        let func_name = func_name.into();
        self.dispatch_table.insert(
            func_name,
            Box::new(move |obj| {
                if let Err(err) = dispatch_call::<A, R, Args, F>(&callback, obj) {
                    A::set_error(obj, &err);
                }
            }),
        );
    }

    /// Binds a callback whose successful results are cached by request
    /// fingerprint (the exact bytes of the serialized request).
    ///
    /// A repeated identical request is answered from the cache without
    /// running the callback, so only register functions whose result depends
    /// on nothing but their arguments. The cache is append-only for the
    /// lifetime of the server. Unit-returning functions are never cached.
    pub fn bind_cached<R, Args, F>(&mut self, func_name: impl Into<String>, callback: F)
    where
        R: RpcValue + Clone,
        Args: CallArgs<A>,
        F: Fn(&mut Args) -> std::result::Result<R, CallbackError> + Send + Sync + 'static,
    {
        let func_name = func_name.into();
        let cache = self.cache.register::<R>(&func_name);
        self.dispatch_table.insert(
            func_name,
            Box::new(move |obj| {
                if let Err(err) = dispatch_cached_call::<A, R, Args, F>(&callback, &cache, obj) {
                    A::set_error(obj, &err);
                }
            }),
        );
    }

    /// Handles one request: decode, route, run, encode. Total over arbitrary
    /// input - malformed bytes, unknown names, and callback failures all
    /// come back as well-formed error responses, never as a panic.
    pub fn dispatch(&self, bytes: &[u8]) -> Vec<u8> {
        let Some(mut obj) = A::from_wire(bytes) else {
            warn!("received bytes that do not parse to an RPC object");
            let mut err_obj = A::empty_object();
            A::set_error(&mut err_obj, &RpcError::server_receive("invalid RPC object received"));
            return encode_or_empty::<A>(&err_obj);
        };

        let func_name = match A::func_name(&obj) {
            Ok(name) => name,
            Err(err) => {
                A::set_error(&mut obj, &err);
                return encode_or_empty::<A>(&obj);
            }
        };

        debug!(func_name = %func_name, "dispatching request");
        match self.dispatch_table.get(&func_name) {
            Some(handler) => handler(&mut obj),
            None => A::set_error(
                &mut obj,
                &RpcError::func_not_found(format!(
                    "called function \"{func_name}\" is not bound"
                )),
            ),
        }

        encode_or_empty::<A>(&obj)
    }

    /// Whether a handler is bound under the given name.
    pub fn is_bound(&self, func_name: &str) -> bool {
        self.dispatch_table.contains_key(func_name)
    }

    /// The typed cache handle for a `bind_cached` name, if the name was
    /// registered with return type `R`.
    pub fn func_cache<R: Clone + Send + 'static>(&self, func_name: &str) -> Option<Arc<FuncCache<R>>> {
        self.cache.typed(func_name)
    }

    /// Empties every function's result cache.
    pub fn clear_cache(&self) {
        self.cache.clear_all();
    }
}

impl<A: SerialAdapter> Default for Server<A> {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_or_empty<A: SerialAdapter>(obj: &A::SerialForm) -> Vec<u8> {
    match A::to_wire(obj) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to encode response");
            let mut err_obj = A::empty_object();
            A::set_error(&mut err_obj, &RpcError::server_send(err.to_string()));
            A::to_wire(&err_obj).unwrap_or_default()
        }
    }
}

fn dispatch_call<A, R, Args, F>(callback: &F, obj: &mut A::SerialForm) -> packrpc_common::Result<()>
where
    A: SerialAdapter,
    R: RpcValue,
    Args: CallArgs<A>,
    F: Fn(&mut Args) -> std::result::Result<R, CallbackError>,
{
    let mut pack = A::deserialize_pack::<R, Args>(obj)?;
    run_callback(callback, &mut pack)?;
    *obj = A::serialize_pack(&pack)?;
    Ok(())
}

fn dispatch_cached_call<A, R, Args, F>(
    callback: &F,
    cache: &FuncCache<R>,
    obj: &mut A::SerialForm,
) -> packrpc_common::Result<()>
where
    A: SerialAdapter,
    R: RpcValue + Clone,
    Args: CallArgs<A>,
    F: Fn(&mut Args) -> std::result::Result<R, CallbackError>,
{
    let mut pack = A::deserialize_pack::<R, Args>(obj)?;

    // Unit-returning functions have nothing worth caching.
    if TypeId::of::<R>() == TypeId::of::<()>() {
        run_callback(callback, &mut pack)?;
        *obj = A::serialize_pack(&pack)?;
        return Ok(());
    }

    let fingerprint = A::to_wire(obj)?;
    if let Some(cached) = cache.get(&fingerprint) {
        debug!(func_name = pack.func_name(), "result cache hit");
        pack.set_result(cached);
        *obj = A::serialize_pack(&pack)?;
        return Ok(());
    }

    run_callback(callback, &mut pack)?;
    if let Some(result) = pack.result() {
        cache.insert(fingerprint, result.clone());
    }
    *obj = A::serialize_pack(&pack)?;
    Ok(())
}

fn run_callback<R, Args, F>(
    callback: &F,
    pack: &mut PackedCall<R, Args>,
) -> packrpc_common::Result<()>
where
    F: Fn(&mut Args) -> std::result::Result<R, CallbackError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| callback(pack.args_mut()))) {
        Ok(Ok(result)) => {
            pack.set_result(result);
            Ok(())
        }
        Ok(Err(err)) => Err(RpcError::remote_exec(err.to_string())),
        Err(payload) => Err(RpcError::remote_exec(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packrpc_common::JsonAdapter;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn request(func_name: &str, args: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({"func_name": func_name, "args": args})).unwrap()
    }

    fn decode(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    fn sum_server() -> Server<JsonAdapter> {
        let mut server = Server::new();
        server.bind("sum", |args: &mut (i64, i64)| Ok(args.0 + args.1));
        server
    }

    #[test]
    fn test_dispatch_success() {
        let server = sum_server();
        let response = decode(&server.dispatch(&request("sum", json!([2, 3]))));
        assert_eq!(response["result"], 5);
        assert_eq!(response["func_name"], "sum");
        assert_eq!(response.get("except_type"), None);
    }

    #[test]
    fn test_dispatch_unknown_function() {
        let server = sum_server();
        let response = decode(&server.dispatch(&request("unknown_func", json!([]))));
        assert_eq!(response["except_type"], 1);
        assert!(response["err_mesg"]
            .as_str()
            .unwrap()
            .contains("unknown_func"));
    }

    #[test]
    fn test_dispatch_malformed_bytes() {
        let server = sum_server();
        let response = decode(&server.dispatch(&[0xFF, 0xFF, 0xFF]));
        assert_eq!(response["except_type"], 9);
        assert!(!response["err_mesg"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_arity_mismatch() {
        let server = sum_server();
        let response = decode(&server.dispatch(&request("sum", json!([2]))));
        assert_eq!(response["except_type"], 5);
    }

    #[test]
    fn test_dispatch_wrong_arg_type() {
        let server = sum_server();
        let response = decode(&server.dispatch(&request("sum", json!([2, "three"]))));
        assert_eq!(response["except_type"], 5);
    }

    #[test]
    fn test_callback_error_becomes_remote_exec() {
        let mut server = Server::<JsonAdapter>::new();
        server.bind("explode", |_args: &mut ()| -> Result<i64, CallbackError> {
            Err("boom".into())
        });
        let response = decode(&server.dispatch(&request("explode", json!([]))));
        assert_eq!(response["except_type"], 2);
        assert_eq!(response["err_mesg"], "boom");
    }

    #[test]
    fn test_callback_panic_is_trapped() {
        let mut server = Server::<JsonAdapter>::new();
        server.bind("panics", |_args: &mut ()| -> Result<i64, CallbackError> {
            panic!("went sideways")
        });
        let response = decode(&server.dispatch(&request("panics", json!([]))));
        assert_eq!(response["except_type"], 2);
        assert_eq!(response["err_mesg"], "went sideways");
    }

    #[test]
    fn test_handler_mutations_flow_back() {
        let mut server = Server::<JsonAdapter>::new();
        server.bind("add_one_each_ref", |args: &mut (Vec<i64>,)| {
            for n in &mut args.0 {
                *n += 1;
            }
            Ok(())
        });
        let response = decode(&server.dispatch(&request("add_one_each_ref", json!([[1, 2, 3]]))));
        assert_eq!(response["args"], json!([[2, 3, 4]]));
        // Void signature: the result field is structurally absent.
        assert_eq!(response.get("result"), None);
    }

    #[test]
    fn test_rebinding_overwrites() {
        let mut server = sum_server();
        server.bind("sum", |args: &mut (i64, i64)| Ok(args.0 * args.1));
        let response = decode(&server.dispatch(&request("sum", json!([2, 3]))));
        assert_eq!(response["result"], 6);
    }

    #[test]
    fn test_cached_handler_runs_once_for_identical_requests() {
        static CALLS: AtomicU64 = AtomicU64::new(0);

        let mut server = Server::<JsonAdapter>::new();
        server.bind_cached("fib", |args: &mut (u64,)| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            fn fib(n: u64) -> u64 {
                if n < 2 {
                    1
                } else {
                    fib(n - 1) + fib(n - 2)
                }
            }
            Ok(fib(args.0))
        });

        let first = decode(&server.dispatch(&request("fib", json!([30]))));
        let second = decode(&server.dispatch(&request("fib", json!([30]))));
        assert_eq!(first["result"], second["result"]);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);

        // A different argument misses the cache.
        server.dispatch(&request("fib", json!([10])));
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
        assert_eq!(server.func_cache::<u64>("fib").unwrap().len(), 2);
    }

    #[test]
    fn test_clear_cache_forces_reinvocation() {
        static CALLS: AtomicU64 = AtomicU64::new(0);

        let mut server = Server::<JsonAdapter>::new();
        server.bind_cached("double", |args: &mut (u64,)| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(args.0 * 2)
        });

        server.dispatch(&request("double", json!([4])));
        server.clear_cache();
        server.dispatch(&request("double", json!([4])));
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cached_void_skips_the_cache() {
        static CALLS: AtomicU64 = AtomicU64::new(0);

        let mut server = Server::<JsonAdapter>::new();
        server.bind_cached("touch", |_args: &mut (String,)| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        server.dispatch(&request("touch", json!(["f"])));
        server.dispatch(&request("touch", json!(["f"])));
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cached_error_is_not_cached() {
        static CALLS: AtomicU64 = AtomicU64::new(0);

        let mut server = Server::<JsonAdapter>::new();
        server.bind_cached("flaky", |_args: &mut (u64,)| -> Result<u64, CallbackError> {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Err("not yet".into())
        });

        let response = decode(&server.dispatch(&request("flaky", json!([1]))));
        assert_eq!(response["except_type"], 2);
        server.dispatch(&request("flaky", json!([1])));
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
        assert!(server.func_cache::<u64>("flaky").unwrap().is_empty());
    }

    #[test]
    fn test_every_response_parses() {
        let server = sum_server();
        let inputs: &[&[u8]] = &[
            b"",
            &[0xFF, 0xFF, 0xFF],
            b"{}",
            b"[]",
            br#"{"func_name": "", "args": []}"#,
            br#"{"func_name": "sum", "args": [2, 3]}"#,
            br#"{"func_name": "sum", "args": "nope"}"#,
        ];
        for input in inputs {
            let response = server.dispatch(input);
            let obj = JsonAdapter::from_wire(&response)
                .unwrap_or_else(|| panic!("unparseable response for input {input:?}"));
            let has_result = obj.get("result").is_some();
            let has_error = obj
                .get("except_type")
                .and_then(Value::as_u64)
                .is_some_and(|code| code != 0);
            assert!(has_result || has_error);
        }
    }

    #[test]
    fn test_is_bound() {
        let server = sum_server();
        assert!(server.is_bound("sum"));
        assert!(!server.is_bound("difference"));
    }
}
