//! # packrpc CLI Entry Point
//!
//! Demo binary for the packrpc framework: serves the demo function set over
//! TCP, or connects to a running server and exercises it.
//!
//! ## Usage
//!
//! ```bash
//! # Serve the demo functions with the JSON adapter
//! packrpc serve -b 127.0.0.1:5000
//!
//! # Same server, MessagePack on the wire
//! packrpc serve -b 127.0.0.1:5001 --format msgpack
//!
//! # Run the demo call sequence against a server
//! packrpc demo 127.0.0.1:5000
//! ```
//!
//! The client and server must agree on the `--format` flag; the wire
//! encodings are not self-describing.

mod functions;

use anyhow::{bail, Context, Result};
use argh::FromArgs;
use functions::{bind_demo_functions, ComplexObject, Message, MessageBus};
use packrpc_client::{Client, TcpTransport};
use packrpc_common::{JsonAdapter, MessagePackAdapter, SerialAdapter};
use packrpc_server::Server;
use std::net::TcpListener;
use std::sync::Arc;

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// packrpc - transport-agnostic, serialization-agnostic RPC
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Demo(DemoArgs),
}

/// Arguments for serving the demo function set.
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// serve the demo functions over TCP
struct ServeArgs {
    /// address to bind the TCP listener to
    #[argh(option, short = 'b', default = "\"127.0.0.1:5000\".into()")]
    bind: String,

    /// wire format: "json" or "msgpack"
    #[argh(option, short = 'f', default = "\"json\".into()")]
    format: String,

    /// path of the message-bus file used by read_message / write_message
    #[argh(option, default = "\"bus.txt\".into()")]
    bus: String,
}

/// Arguments for the demo call sequence.
#[derive(FromArgs)]
#[argh(subcommand, name = "demo")]
/// run the demo call sequence against a server
struct DemoArgs {
    /// address of the server to call
    #[argh(positional)]
    server_address: String,

    /// wire format: "json" or "msgpack" (must match the server)
    #[argh(option, short = 'f', default = "\"json\".into()")]
    format: String,
}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Default to INFO, overridable through RUST_LOG.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Serve(args) => match args.format.as_str() {
            "json" => serve_with::<JsonAdapter>(&args),
            "msgpack" => serve_with::<MessagePackAdapter>(&args),
            other => bail!("unknown wire format '{other}' (expected \"json\" or \"msgpack\")"),
        },
        Commands::Demo(args) => match args.format.as_str() {
            "json" => demo_with::<JsonAdapter>(&args),
            "msgpack" => demo_with::<MessagePackAdapter>(&args),
            other => bail!("unknown wire format '{other}' (expected \"json\" or \"msgpack\")"),
        },
    }
}

fn serve_with<A: SerialAdapter>(args: &ServeArgs) -> Result<()> {
    tracing::info!("Binding demo functions (format: {})", args.format);

    let mut server = Server::<A>::new();
    bind_demo_functions(&mut server, Arc::new(MessageBus::new(&args.bus)));

    let listener = TcpListener::bind(&args.bind)
        .with_context(|| format!("failed to bind {}", args.bind))?;

    packrpc_server::serve(Arc::new(server), listener).context("serving loop failed")
}

fn demo_with<A: SerialAdapter>(args: &DemoArgs) -> Result<()> {
    let transport = TcpTransport::connect(args.server_address.as_str())
        .with_context(|| format!("failed to connect to {}", args.server_address))?;
    let mut client = Client::<A, _>::new(transport);

    let total: i64 = client.call("sum", (2i64, 3i64))?;
    println!("sum(2, 3) = {total}");

    let len: u64 = client.call("strlen", ("hello".to_owned(),))?;
    println!("strlen(\"hello\") = {len}");

    let mut vec_args = (vec![1i64, 2, 3],);
    client.call_mut::<(), _>("add_one_each_ref", &mut vec_args)?;
    println!("add_one_each_ref([1, 2, 3]) -> {:?}", vec_args.0);

    let fib: u64 = client.call("fibonacci", (30u64,))?;
    println!("fibonacci(30) = {fib}");
    let fib_again: u64 = client.call("fibonacci", (30u64,))?;
    println!("fibonacci(30) = {fib_again} (served from the result cache)");

    let avg: f64 = client.call(
        "average",
        (1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0),
    )?;
    println!("average(1..=10) = {avg}");

    let mut roots = (1.0, 4.0, 9.0, 16.0, 25.0, 36.0, 49.0, 64.0, 81.0, 100.0);
    client.call_mut::<(), _>("sqrt_each_ref", &mut roots)?;
    println!("sqrt_each_ref(1, 4, 9, ...) -> ({}, {}, {}, ...)", roots.0, roots.1, roots.2);

    let cx = ComplexObject {
        id: 7,
        name: "demo".to_owned(),
        flag1: true,
        flag2: false,
        vals: vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
    };
    let digest: String = client.call("hash_complex", (cx,))?;
    println!("hash_complex(..) = {digest}");

    client.call::<(), _>("clear_bus", ())?;
    client.call::<(), _>(
        "write_message",
        (Message {
            from: "demo".to_owned(),
            to: "server".to_owned(),
            body: "hello over the bus".to_owned(),
            timestamp: 1,
        },),
    )?;
    let received: Message = client.call("read_message", ())?;
    println!("read_message() = {:?}", received.body);

    Ok(())
}
