//! End-to-end tests for connection basics, strings, and keyspace
//! commands — including deterministic TTL expiry driven through the
//! instance's clock while the server is live.

mod common;

use std::time::{Duration, SystemTime};

use cinder_protocol::Frame;
use common::{bulk_strings, TestServer};

#[tokio::test]
async fn ping_and_echo() {
    let server = TestServer::start().await;
    let mut c = server.connect().await;

    assert_eq!(c.get_simple(&["PING"]).await, "PONG");
    assert_eq!(c.get_bulk(&["PING", "hey"]).await, Some("hey".into()));
    assert_eq!(c.get_bulk(&["ECHO", "hello"]).await, Some("hello".into()));
}

#[tokio::test]
async fn set_get_round_trip() {
    let server = TestServer::start().await;
    let mut c = server.connect().await;

    assert_eq!(c.get_simple(&["SET", "foo", "bar"]).await, "OK");
    assert_eq!(c.get_bulk(&["GET", "foo"]).await, Some("bar".into()));
    assert_eq!(c.get_bulk(&["GET", "missing"]).await, None);
}

#[tokio::test]
async fn del_exists_type() {
    let server = TestServer::start().await;
    let mut c = server.connect().await;

    c.cmd(&["SET", "a", "1"]).await;
    c.cmd(&["LPUSH", "l", "x"]).await;
    assert_eq!(c.get_int(&["EXISTS", "a", "l", "ghost"]).await, 2);
    assert_eq!(c.get_simple(&["TYPE", "a"]).await, "string");
    assert_eq!(c.get_simple(&["TYPE", "l"]).await, "list");
    assert_eq!(c.get_simple(&["TYPE", "ghost"]).await, "none");
    assert_eq!(c.get_int(&["DEL", "a", "l", "ghost"]).await, 2);
    assert_eq!(c.get_int(&["EXISTS", "a"]).await, 0);
}

#[tokio::test]
async fn wrong_type_is_an_error_not_a_crash() {
    let server = TestServer::start().await;
    let mut c = server.connect().await;

    c.cmd(&["LPUSH", "l", "x"]).await;
    let msg = c.get_error(&["GET", "l"]).await;
    assert!(msg.starts_with("WRONGTYPE"));

    // the connection stays healthy afterwards
    assert_eq!(c.get_simple(&["PING"]).await, "PONG");
}

#[tokio::test]
async fn expire_with_clock_travel() {
    // SET foo bar; EXPIRE foo 100; advance 101 seconds; EXISTS → 0
    let server = TestServer::start().await;
    server
        .instance
        .set_time(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000));
    let mut c = server.connect().await;

    c.cmd(&["SET", "foo", "bar"]).await;
    assert_eq!(c.get_int(&["EXPIRE", "foo", "100"]).await, 1);
    assert_eq!(c.get_int(&["TTL", "foo"]).await, 100);

    server.instance.fast_forward(Duration::from_secs(50));
    assert_eq!(c.get_int(&["TTL", "foo"]).await, 50);
    assert_eq!(c.get_int(&["EXISTS", "foo"]).await, 1);

    server.instance.fast_forward(Duration::from_secs(51));
    assert_eq!(c.get_int(&["EXISTS", "foo"]).await, 0);
    assert_eq!(c.get_int(&["TTL", "foo"]).await, -2);
    assert_eq!(c.get_bulk(&["GET", "foo"]).await, None);
}

#[tokio::test]
async fn persist_cancels_expiry() {
    let server = TestServer::start().await;
    server.instance.set_time(SystemTime::UNIX_EPOCH + Duration::from_secs(500));
    let mut c = server.connect().await;

    c.cmd(&["SET", "k", "v", "EX", "10"]).await;
    assert_eq!(c.get_int(&["PERSIST", "k"]).await, 1);
    assert_eq!(c.get_int(&["TTL", "k"]).await, -1);
    server.instance.fast_forward(Duration::from_secs(60));
    assert_eq!(c.get_bulk(&["GET", "k"]).await, Some("v".into()));
}

#[tokio::test]
async fn time_reports_the_pinned_clock() {
    let server = TestServer::start().await;
    server
        .instance
        .set_time(SystemTime::UNIX_EPOCH + Duration::from_secs(12345));
    let mut c = server.connect().await;

    let reply = c.cmd(&["TIME"]).await;
    assert_eq!(bulk_strings(reply), vec!["12345".to_owned(), "0".to_owned()]);
}

#[tokio::test]
async fn select_isolates_databases() {
    let server = TestServer::start().await;
    let mut c = server.connect().await;

    c.cmd(&["SET", "k", "zero"]).await;
    assert_eq!(c.get_simple(&["SELECT", "1"]).await, "OK");
    assert_eq!(c.get_bulk(&["GET", "k"]).await, None);
    c.cmd(&["SET", "k", "one"]).await;

    assert_eq!(c.get_simple(&["SELECT", "0"]).await, "OK");
    assert_eq!(c.get_bulk(&["GET", "k"]).await, Some("zero".into()));
}

#[tokio::test]
async fn move_between_databases() {
    let server = TestServer::start().await;
    let mut c = server.connect().await;

    c.cmd(&["SET", "k", "v"]).await;
    assert_eq!(c.get_int(&["MOVE", "k", "2"]).await, 1);
    assert_eq!(c.get_int(&["EXISTS", "k"]).await, 0);
    c.cmd(&["SELECT", "2"]).await;
    assert_eq!(c.get_bulk(&["GET", "k"]).await, Some("v".into()));
}

#[tokio::test]
async fn keys_and_dbsize() {
    let server = TestServer::start().await;
    let mut c = server.connect().await;

    c.cmd(&["MSET", "user:1", "a", "user:2", "b", "item:1", "c"]).await;
    assert_eq!(c.get_int(&["DBSIZE"]).await, 3);

    let reply = c.cmd(&["KEYS", "user:*"]).await;
    assert_eq!(bulk_strings(reply), vec!["user:1".to_owned(), "user:2".to_owned()]);

    assert_eq!(c.get_simple(&["FLUSHDB"]).await, "OK");
    assert_eq!(c.get_int(&["DBSIZE"]).await, 0);
}

#[tokio::test]
async fn scan_walks_the_keyspace() {
    let server = TestServer::start().await;
    let mut c = server.connect().await;
    for i in 0..20 {
        c.cmd(&["SET", &format!("k{i}"), "v"]).await;
    }

    let mut seen = Vec::new();
    let mut cursor = "0".to_owned();
    loop {
        let reply = c.cmd(&["SCAN", &cursor, "COUNT", "6"]).await;
        let Frame::Array(mut parts) = reply else {
            panic!("expected array");
        };
        let batch = bulk_strings(parts.pop().unwrap());
        let Frame::Bulk(next) = parts.pop().unwrap() else {
            panic!("expected cursor");
        };
        seen.extend(batch);
        cursor = String::from_utf8(next.to_vec()).unwrap();
        if cursor == "0" {
            break;
        }
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 20);
}

#[tokio::test]
async fn rename_and_renamenx() {
    let server = TestServer::start().await;
    let mut c = server.connect().await;

    c.cmd(&["SET", "old", "v"]).await;
    assert_eq!(c.get_simple(&["RENAME", "old", "new"]).await, "OK");
    assert_eq!(c.get_bulk(&["GET", "new"]).await, Some("v".into()));

    let msg = c.get_error(&["RENAME", "ghost", "x"]).await;
    assert!(msg.contains("no such key"));

    c.cmd(&["SET", "taken", "t"]).await;
    assert_eq!(c.get_int(&["RENAMENX", "new", "taken"]).await, 0);
    assert_eq!(c.get_bulk(&["GET", "taken"]).await, Some("t".into()));
}

#[tokio::test]
async fn object_idletime_follows_the_clock() {
    let server = TestServer::start().await;
    server.instance.set_time(SystemTime::UNIX_EPOCH + Duration::from_secs(100));
    let mut c = server.connect().await;

    c.cmd(&["SET", "k", "v"]).await;
    server.instance.fast_forward(Duration::from_secs(42));
    assert_eq!(c.get_int(&["OBJECT", "IDLETIME", "k"]).await, 42);
}

#[tokio::test]
async fn unknown_command_reports_name() {
    let server = TestServer::start().await;
    let mut c = server.connect().await;
    let msg = c.get_error(&["FROBNICATE", "x"]).await;
    assert!(msg.contains("unknown command 'frobnicate'"));
}
