//! The demo function set served by `packrpc serve`.
//!
//! A grab bag chosen to exercise every corner of the framework: plain value
//! signatures, by-reference mutation, wide tuples, a cached pure function,
//! user-defined serde types, and a pair of functions that persist state to a
//! text file between calls.

use packrpc_common::SerialAdapter;
use packrpc_server::{CallbackError, Server};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// A user-defined argument type with nothing special about it beyond the
/// serde derives, which are all a type needs to cross the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexObject {
    pub id: i32,
    pub name: String,
    pub flag1: bool,
    pub flag2: bool,
    pub vals: Vec<u8>,
}

/// A line on the message bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub body: String,
    pub timestamp: u64,
}

/// File-backed FIFO of [`Message`] lines, one JSON document per line.
///
/// The lock serializes whole read-modify-write cycles; sessions on other
/// threads see either the old file or the new one, never a torn state.
pub struct MessageBus {
    path: Mutex<PathBuf>,
}

impl MessageBus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Mutex::new(path.into()),
        }
    }

    /// Appends one message to the end of the bus.
    pub fn write(&self, message: &Message) -> Result<(), CallbackError> {
        let path = self.lock();
        let mut file = OpenOptions::new().create(true).append(true).open(&*path)?;
        writeln!(file, "{}", serde_json::to_string(message)?)?;
        Ok(())
    }

    /// Pops the oldest message off the front of the bus.
    pub fn read(&self) -> Result<Message, CallbackError> {
        let path = self.lock();
        let reader = BufReader::new(File::open(&*path)?);
        let mut lines = reader.lines();

        let first = lines.next().ok_or("message bus is empty")??;
        let message: Message = serde_json::from_str(&first)?;

        let rest: Vec<String> = lines.collect::<Result<_, _>>()?;
        std::fs::write(&*path, rest.join("\n") + if rest.is_empty() { "" } else { "\n" })?;
        Ok(message)
    }

    /// Truncates the bus.
    pub fn clear(&self) -> Result<(), CallbackError> {
        let path = self.lock();
        File::create(&*path)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PathBuf> {
        self.path
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

pub fn fibonacci(n: u64) -> u64 {
    if n < 2 {
        1
    } else {
        fibonacci(n - 1) + fibonacci(n - 2)
    }
}

pub fn hash_complex(mut cx: ComplexObject) -> String {
    if cx.flag1 {
        cx.vals.reverse();
    }

    let mut hash = String::new();
    for (i, byte) in cx.name.bytes().enumerate() {
        let val = i32::from(cx.vals[i % cx.vals.len()]);
        let acc = if cx.flag2 {
            i32::from(byte) + val
        } else {
            i32::from(byte) - val
        };
        hash.push_str(&format!("{acc:x}"));
    }
    hash
}

/// Binds every demo function on the given server.
pub fn bind_demo_functions<A: SerialAdapter>(server: &mut Server<A>, bus: Arc<MessageBus>) {
    server.bind("sum", |args: &mut (i64, i64)| Ok(args.0 + args.1));

    server.bind("strlen", |args: &mut (String,)| Ok(args.0.len() as u64));

    server.bind("add_one_each", |args: &mut (Vec<i64>,)| {
        Ok(args.0.iter().map(|n| n + 1).collect::<Vec<i64>>())
    });

    server.bind("add_one_each_ref", |args: &mut (Vec<i64>,)| {
        for n in &mut args.0 {
            *n += 1;
        }
        Ok(())
    });

    // Pure and expensive: the poster child for result caching.
    server.bind_cached("fibonacci", |args: &mut (u64,)| Ok(fibonacci(args.0)));

    type Ten = (f64, f64, f64, f64, f64, f64, f64, f64, f64, f64);

    server.bind("average", |args: &mut Ten| {
        let (n1, n2, n3, n4, n5, n6, n7, n8, n9, n10) = *args;
        Ok((n1 + n2 + n3 + n4 + n5 + n6 + n7 + n8 + n9 + n10) / 10.0)
    });

    server.bind("std_dev", |args: &mut Ten| {
        let (n1, n2, n3, n4, n5, n6, n7, n8, n9, n10) = *args;
        let mean_sq = (n1 * n1
            + n2 * n2
            + n3 * n3
            + n4 * n4
            + n5 * n5
            + n6 * n6
            + n7 * n7
            + n8 * n8
            + n9 * n9
            + n10 * n10)
            / 10.0;
        Ok(mean_sq.sqrt())
    });

    server.bind("sqrt_each_ref", |args: &mut Ten| {
        args.0 = args.0.sqrt();
        args.1 = args.1.sqrt();
        args.2 = args.2.sqrt();
        args.3 = args.3.sqrt();
        args.4 = args.4.sqrt();
        args.5 = args.5.sqrt();
        args.6 = args.6.sqrt();
        args.7 = args.7.sqrt();
        args.8 = args.8.sqrt();
        args.9 = args.9.sqrt();
        Ok(())
    });

    server.bind("average_container", |args: &mut (Vec<f64>,)| {
        if args.0.is_empty() {
            return Err(CallbackError::from("cannot average an empty container"));
        }
        Ok(args.0.iter().sum::<f64>() / args.0.len() as f64)
    });

    server.bind("hash_complex", |args: &mut (ComplexObject,)| {
        Ok(hash_complex(args.0.clone()))
    });

    server.bind("hash_complex_ref", |args: &mut (ComplexObject, String)| {
        args.1 = hash_complex(args.0.clone());
        Ok(())
    });

    let write_bus = Arc::clone(&bus);
    server.bind("write_message", move |args: &mut (Message,)| {
        write_bus.write(&args.0)?;
        Ok(())
    });

    let read_bus = Arc::clone(&bus);
    server.bind("read_message", move |_args: &mut ()| read_bus.read());

    server.bind("clear_bus", move |_args: &mut ()| bus.clear());
}

#[cfg(test)]
mod tests {
    use super::*;
    use packrpc_common::JsonAdapter;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static BUS_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_bus() -> Arc<MessageBus> {
        let id = BUS_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("packrpc_test_bus_{}_{id}.txt", std::process::id()));
        Arc::new(MessageBus::new(path))
    }

    fn message(body: &str) -> Message {
        Message {
            from: "alice".to_owned(),
            to: "bob".to_owned(),
            body: body.to_owned(),
            timestamp: 1,
        }
    }

    #[test]
    fn test_bus_is_fifo() {
        let bus = temp_bus();
        bus.clear().unwrap();
        bus.write(&message("first")).unwrap();
        bus.write(&message("second")).unwrap();

        assert_eq!(bus.read().unwrap().body, "first");
        assert_eq!(bus.read().unwrap().body, "second");
        assert!(bus.read().is_err());
    }

    #[test]
    fn test_hash_complex_is_deterministic() {
        let cx = ComplexObject {
            id: 1,
            name: "ab".to_owned(),
            flag1: false,
            flag2: true,
            vals: vec![1, 2],
        };
        // 'a' + 1 = 0x62, 'b' + 2 = 0x64
        assert_eq!(hash_complex(cx.clone()), "6264");
        assert_eq!(hash_complex(cx.clone()), hash_complex(cx));
    }

    #[test]
    fn test_hash_complex_flag1_reverses() {
        let cx = ComplexObject {
            id: 1,
            name: "ab".to_owned(),
            flag1: true,
            flag2: true,
            vals: vec![1, 2],
        };
        // vals reversed to [2, 1]: 'a' + 2 = 0x63, 'b' + 1 = 0x63
        assert_eq!(hash_complex(cx), "6363");
    }

    #[test]
    fn test_demo_functions_dispatch() {
        let mut server = Server::<JsonAdapter>::new();
        let bus = temp_bus();
        bus.clear().unwrap();
        bind_demo_functions(&mut server, bus);

        let request =
            serde_json::to_vec(&json!({"func_name": "average", "args": [1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5, 9.5, 10.5]}))
                .unwrap();
        let response: Value = serde_json::from_slice(&server.dispatch(&request)).unwrap();
        assert_eq!(response["result"], 6.0);

        let request = serde_json::to_vec(&json!({
            "func_name": "write_message",
            "args": [{"from": "a", "to": "b", "body": "hi", "timestamp": 7}]
        }))
        .unwrap();
        let response: Value = serde_json::from_slice(&server.dispatch(&request)).unwrap();
        assert_eq!(response.get("except_type"), None);

        let request = serde_json::to_vec(&json!({"func_name": "read_message", "args": []})).unwrap();
        let response: Value = serde_json::from_slice(&server.dispatch(&request)).unwrap();
        assert_eq!(response["result"]["body"], "hi");

        // Reading an empty bus is a remote_exec failure, not a crash.
        let request = serde_json::to_vec(&json!({"func_name": "read_message", "args": []})).unwrap();
        let response: Value = serde_json::from_slice(&server.dispatch(&request)).unwrap();
        assert_eq!(response["except_type"], 2);
    }
}
