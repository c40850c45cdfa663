//! Test helpers: an in-process server plus a minimal RESP2 client.
//!
//! The server runs inside the test's tokio runtime, and the harness
//! keeps the `Instance` handle — so tests can pin and advance the
//! virtual clock while talking to the server over real TCP.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use cinder_core::Instance;
use cinder_protocol::{parse_frame, Frame};
use cinder_server::{serve, ServerContext};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct TestServer {
    pub instance: Arc<Instance>,
    addr: SocketAddr,
}

impl TestServer {
    /// Starts a fresh server on a random port.
    pub async fn start() -> Self {
        Self::start_with(Instance::new()).await
    }

    /// Starts a server around a pre-configured instance.
    pub async fn start_with(instance: Instance) -> Self {
        let instance = Arc::new(instance);
        let ctx = Arc::new(ServerContext::new(Arc::clone(&instance)));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = serve(listener, ctx).await;
        });
        Self { instance, addr }
    }

    pub async fn connect(&self) -> TestConn {
        TestConn {
            stream: TcpStream::connect(self.addr).await.unwrap(),
            buf: BytesMut::with_capacity(4 * 1024),
        }
    }
}

pub struct TestConn {
    stream: TcpStream,
    buf: BytesMut,
}

impl TestConn {
    /// Sends one command and returns its reply.
    pub async fn cmd(&mut self, parts: &[&str]) -> Frame {
        let mut out = BytesMut::new();
        Frame::Array(parts.iter().map(|p| Frame::bulk(p.to_string())).collect())
            .serialize(&mut out);
        self.stream.write_all(&out).await.unwrap();
        self.recv().await
    }

    /// Reads the next frame — replies and pub/sub deliveries alike.
    pub async fn recv(&mut self) -> Frame {
        loop {
            if let Some((frame, consumed)) = parse_frame(&self.buf).unwrap() {
                self.buf.advance(consumed);
                return frame;
            }
            let n = self.stream.read_buf(&mut self.buf).await.unwrap();
            assert!(n > 0, "server closed the connection unexpectedly");
        }
    }

    pub async fn get_simple(&mut self, parts: &[&str]) -> String {
        match self.cmd(parts).await {
            Frame::Simple(s) => s,
            other => panic!("expected simple string, got {other:?}"),
        }
    }

    pub async fn get_int(&mut self, parts: &[&str]) -> i64 {
        match self.cmd(parts).await {
            Frame::Integer(n) => n,
            other => panic!("expected integer, got {other:?}"),
        }
    }

    pub async fn get_bulk(&mut self, parts: &[&str]) -> Option<String> {
        match self.cmd(parts).await {
            Frame::Bulk(data) => Some(String::from_utf8(data.to_vec()).unwrap()),
            Frame::NullBulk => None,
            other => panic!("expected bulk or nil, got {other:?}"),
        }
    }

    pub async fn get_error(&mut self, parts: &[&str]) -> String {
        match self.cmd(parts).await {
            Frame::Error(msg) => msg,
            other => panic!("expected error, got {other:?}"),
        }
    }
}

/// Collects an array reply's bulk elements as strings.
pub fn bulk_strings(frame: Frame) -> Vec<String> {
    let Frame::Array(items) = frame else {
        panic!("expected array, got {frame:?}");
    };
    items
        .into_iter()
        .map(|item| match item {
            Frame::Bulk(data) => String::from_utf8(data.to_vec()).unwrap(),
            other => panic!("expected bulk element, got {other:?}"),
        })
        .collect()
}
