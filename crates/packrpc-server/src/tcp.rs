//! Thread-per-session TCP serving loop.
//!
//! Each accepted connection gets its own OS thread running a read-dispatch-
//! write loop: one length-prefixed frame in, one frame out, until the peer
//! hangs up. Requests within a session are answered in arrival order; across
//! sessions there is no ordering guarantee.

use crate::dispatch::Server;
use packrpc_common::transport::{read_frame, write_frame};
use packrpc_common::SerialAdapter;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Accepts connections forever, dispatching each session on its own thread.
///
/// Binding happens before this call; the server is shared read-only among
/// sessions (the result cache synchronizes itself). Returns only if the
/// listener itself fails.
///
/// # Example
///
/// ```no_run
/// use packrpc_common::JsonAdapter;
/// use packrpc_server::Server;
/// use std::net::TcpListener;
/// use std::sync::Arc;
///
/// let mut server = Server::<JsonAdapter>::new();
/// server.bind("sum", |args: &mut (i64, i64)| Ok(args.0 + args.1));
///
/// let listener = TcpListener::bind("127.0.0.1:5000")?;
/// packrpc_server::serve(Arc::new(server), listener)?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn serve<A: SerialAdapter>(server: Arc<Server<A>>, listener: TcpListener) -> io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "serving RPC requests");

    loop {
        let (stream, peer) = listener.accept()?;
        let server = Arc::clone(&server);
        thread::spawn(move || {
            debug!(%peer, "session opened");
            match session(&server, stream) {
                Ok(()) => debug!(%peer, "session closed"),
                Err(err) => warn!(%peer, error = %err, "session ended with error"),
            }
        });
    }
}

/// Runs one session to completion: requests are dispatched in arrival order
/// and every request gets exactly one response frame.
fn session<A: SerialAdapter>(server: &Server<A>, mut stream: TcpStream) -> io::Result<()> {
    loop {
        let request = match read_frame(&mut stream) {
            Ok(frame) => frame,
            // Peer closed between frames: a normal hangup.
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err),
        };

        let response = server.dispatch(&request);
        write_frame(&mut stream, &response)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packrpc_common::JsonAdapter;
    use serde_json::{json, Value};

    fn spawn_sum_server() -> std::net::SocketAddr {
        let mut server = Server::<JsonAdapter>::new();
        server.bind("sum", |args: &mut (i64, i64)| Ok(args.0 + args.1));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || serve(Arc::new(server), listener));
        addr
    }

    #[test]
    fn test_session_round_trip() {
        let addr = spawn_sum_server();
        let mut stream = TcpStream::connect(addr).unwrap();

        let request = serde_json::to_vec(&json!({"func_name": "sum", "args": [2, 3]})).unwrap();
        write_frame(&mut stream, &request).unwrap();

        let response: Value = serde_json::from_slice(&read_frame(&mut stream).unwrap()).unwrap();
        assert_eq!(response["result"], 5);
    }

    #[test]
    fn test_session_survives_malformed_request() {
        let addr = spawn_sum_server();
        let mut stream = TcpStream::connect(addr).unwrap();

        write_frame(&mut stream, &[0xFF, 0xFF, 0xFF]).unwrap();
        let response: Value = serde_json::from_slice(&read_frame(&mut stream).unwrap()).unwrap();
        assert_eq!(response["except_type"], 9);

        // The session is still usable afterwards.
        let request = serde_json::to_vec(&json!({"func_name": "sum", "args": [1, 1]})).unwrap();
        write_frame(&mut stream, &request).unwrap();
        let response: Value = serde_json::from_slice(&read_frame(&mut stream).unwrap()).unwrap();
        assert_eq!(response["result"], 2);
    }

    #[test]
    fn test_concurrent_sessions() {
        let addr = spawn_sum_server();
        let mut handles = Vec::new();
        for n in 0..4i64 {
            handles.push(thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).unwrap();
                let request =
                    serde_json::to_vec(&json!({"func_name": "sum", "args": [n, n]})).unwrap();
                write_frame(&mut stream, &request).unwrap();
                let response: Value =
                    serde_json::from_slice(&read_frame(&mut stream).unwrap()).unwrap();
                assert_eq!(response["result"], json!(n + n));
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
