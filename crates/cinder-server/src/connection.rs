//! Per-connection handler.
//!
//! Reads frames, turns each into `(name, argv)`, and routes it:
//! connection-state commands (AUTH, SELECT, transactions, pub/sub)
//! are handled here because they mutate the session; everything else
//! goes through [`commands::prepare`] and the core dispatch boundary.
//! The same loop also pumps pub/sub deliveries and runs the
//! socket-aware side of blocking commands.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use cinder_core::error::mode_violation;
use cinder_core::session::allowed_in_subscriber_mode;
use cinder_core::{tx, CommandError, Operation, Reply, Session};
use cinder_protocol::{parse_frame, Frame};
use subtle::ConstantTimeEq;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::blocking;
use crate::commands::{self, list};
use crate::pubsub::{PubMessage, PubSubBroker};
use crate::server::ServerContext;

/// Hard cap on buffered-but-unparsed input; a frame larger than this
/// closes the connection.
const MAX_BUFFER: usize = 64 * 1024 * 1024;

enum Step {
    Continue,
    Close,
}

/// Serves one client until it disconnects or QUITs.
pub async fn handle<S>(mut stream: S, ctx: Arc<ServerContext>) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let requirepass = ctx.instance.password();
    let mut session = Session::new(requirepass.is_none());
    let mut subs = Subscriptions::new(Arc::clone(&ctx.pubsub));
    let mut buf = BytesMut::with_capacity(4 * 1024);
    let mut out = BytesMut::with_capacity(4 * 1024);

    loop {
        // drain every complete frame before touching the socket again
        loop {
            let parsed = match parse_frame(&buf) {
                Ok(parsed) => parsed,
                Err(e) => {
                    Frame::Error(format!("ERR Protocol error: {e}")).serialize(&mut out);
                    let _ = stream.write_all(&out).await;
                    return Ok(());
                }
            };
            let Some((frame, consumed)) = parsed else {
                break;
            };
            buf.advance(consumed);

            let argv = match frame_to_argv(frame) {
                Some(argv) => argv,
                None => {
                    Frame::Error("ERR Protocol error: expected array of bulk strings".into())
                        .serialize(&mut out);
                    let _ = stream.write_all(&out).await;
                    return Ok(());
                }
            };
            let Some(first) = argv.first() else {
                continue; // empty command array: ignored, like the real server
            };
            let name = String::from_utf8_lossy(first).to_ascii_uppercase();
            let args = &argv[1..];

            // blocking pops take the socket-aware path so a dead client
            // doesn't leave a poller behind
            if matches!(name.as_str(), "BLPOP" | "BRPOP") && may_block(&session, &requirepass) {
                stream.write_all(&out).await?;
                out.clear();
                match run_blocking(&mut stream, &mut buf, &ctx, session.db_index, &name, args).await? {
                    Some(reply) => reply_frame(reply).serialize(&mut out),
                    None => return Ok(()),
                }
                continue;
            }

            match execute(&name, args, &mut session, &mut subs, &ctx, &requirepass, &mut out) {
                Step::Continue => {}
                Step::Close => {
                    stream.write_all(&out).await?;
                    return Ok(());
                }
            }
        }

        if !out.is_empty() {
            stream.write_all(&out).await?;
            out.clear();
        }
        if buf.len() > MAX_BUFFER {
            Frame::Error("ERR Protocol error: request too large".into()).serialize(&mut out);
            let _ = stream.write_all(&out).await;
            return Ok(());
        }

        let has_subs = subs.count() > 0;
        tokio::select! {
            result = stream.read_buf(&mut buf) => {
                match result {
                    Ok(0) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => return Err(e),
                }
            }
            msg = subs.rx.recv(), if has_subs => {
                if let Some(msg) = msg {
                    deliver(&msg, &mut out);
                    stream.write_all(&out).await?;
                    out.clear();
                }
            }
        }
    }
}

/// Blocking is only legal on a plain authenticated connection; queued
/// and subscriber contexts degrade elsewhere.
fn may_block(session: &Session, requirepass: &Option<String>) -> bool {
    !session.in_multi()
        && !session.is_subscriber()
        && (requirepass.is_none() || session.authenticated)
}

/// Runs a BLPOP/BRPOP poll loop racing it against socket teardown.
/// `Ok(None)` means the client disconnected mid-wait — no reply is
/// attempted for a dead socket.
async fn run_blocking<S>(
    stream: &mut S,
    buf: &mut BytesMut,
    ctx: &Arc<ServerContext>,
    db_index: usize,
    name: &str,
    args: &[Bytes],
) -> io::Result<Option<Reply>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let left = name == "BLPOP";
    let parsed = match list::parse_blocking_pop(args, if left { "blpop" } else { "brpop" }) {
        Ok(parsed) => parsed,
        Err(e) => return Ok(Some(e.into())),
    };

    let pop = blocking::pop_loop(ctx, db_index, &parsed.keys, left, parsed.timeout);
    tokio::pin!(pop);
    loop {
        tokio::select! {
            reply = &mut pop => return Ok(Some(reply)),
            result = stream.read_buf(buf) => match result {
                Ok(0) => return Ok(None),
                Ok(_) => {} // pipelined input buffers up while we wait
                Err(e) => return Err(e),
            }
        }
    }
}

/// One command, start to finish. Writes reply frame(s) into `out`.
fn execute(
    name: &str,
    args: &[Bytes],
    session: &mut Session,
    subs: &mut Subscriptions,
    ctx: &Arc<ServerContext>,
    requirepass: &Option<String>,
    out: &mut BytesMut,
) -> Step {
    if name == "QUIT" {
        reply_frame(Reply::ok()).serialize(out);
        return Step::Close;
    }
    if name == "AUTH" {
        reply_frame(auth(args, session, requirepass)).serialize(out);
        return Step::Continue;
    }
    if requirepass.is_some() && !session.authenticated && !matches!(name, "PING" | "ECHO") {
        reply_frame(Reply::Error("NOAUTH Authentication required.".into())).serialize(out);
        return Step::Continue;
    }
    if session.is_subscriber() && !allowed_in_subscriber_mode(name) {
        reply_frame(Reply::Error(mode_violation(name))).serialize(out);
        return Step::Continue;
    }

    let reply = match name {
        "MULTI" => tx::multi(session),
        "EXEC" => tx::exec(&ctx.instance, session),
        "DISCARD" => tx::discard(session),
        "WATCH" => watch_cmd(args, session, ctx),
        "UNWATCH" => tx::unwatch(session),
        "SELECT" => select_cmd(args, session),
        "SUBSCRIBE" | "UNSUBSCRIBE" | "PSUBSCRIBE" | "PUNSUBSCRIBE" => {
            return subscription_cmd(name, args, session, subs, out);
        }
        "PUBLISH" => publish_cmd(args, session, ctx),
        "PUBSUB" => pubsub_introspect(args, ctx),
        // inside MULTI a blocking pop degrades to one immediate attempt
        "BLPOP" | "BRPOP" => {
            let left = name == "BLPOP";
            match list::blocking_pop_degraded(args, if left { "blpop" } else { "brpop" }, left) {
                Ok(op) => tx::dispatch(&ctx.instance, session, op),
                Err(e) => {
                    session.mark_dirty();
                    e.into()
                }
            }
        }
        _ => match commands::prepare(name, args) {
            Ok(op) => tx::dispatch(&ctx.instance, session, op),
            Err(e) => {
                // a failed validation marks an open transaction dirty
                // but is reported immediately either way
                session.mark_dirty();
                e.into()
            }
        },
    };
    reply_frame(reply).serialize(out);
    Step::Continue
}

fn auth(args: &[Bytes], session: &mut Session, requirepass: &Option<String>) -> Reply {
    let password = match args {
        [password] => password,
        [username, password] => {
            // no ACLs: only the default user exists
            if !username.eq_ignore_ascii_case(b"default") {
                return Reply::Error(
                    "WRONGPASS invalid username-password pair or user is disabled.".into(),
                );
            }
            password
        }
        _ => return CommandError::WrongArity("auth").into(),
    };
    let Some(expected) = requirepass else {
        return Reply::Error(
            "ERR Client sent AUTH, but no password is set. \
             Did you mean ACL SETUSER with >password?"
                .into(),
        );
    };
    if bool::from(expected.as_bytes().ct_eq(password)) {
        session.authenticated = true;
        Reply::ok()
    } else {
        Reply::Error("ERR invalid password".into())
    }
}

fn select_cmd(args: &[Bytes], session: &mut Session) -> Reply {
    let [index] = args else {
        return CommandError::WrongArity("select").into();
    };
    match commands::generic::db_index(index) {
        Ok(index) => {
            session.db_index = index;
            Reply::ok()
        }
        Err(e) => e.into(),
    }
}

fn watch_cmd(args: &[Bytes], session: &mut Session, ctx: &Arc<ServerContext>) -> Reply {
    if args.is_empty() {
        return CommandError::WrongArity("watch").into();
    }
    match commands::utf8_args(args) {
        Ok(keys) => tx::watch(&ctx.instance, session, &keys),
        Err(e) => e.into(),
    }
}

/// PUBLISH is queueable: the bound operation captures the broker, so
/// inside MULTI the message goes out at EXEC time.
fn publish_cmd(args: &[Bytes], session: &mut Session, ctx: &Arc<ServerContext>) -> Reply {
    let [channel, payload] = args else {
        return CommandError::WrongArity("publish").into();
    };
    let channel = match commands::utf8_arg(channel) {
        Ok(channel) => channel,
        Err(e) => {
            session.mark_dirty();
            return e.into();
        }
    };
    let payload = payload.clone();
    let broker = Arc::clone(&ctx.pubsub);
    let op: Operation = Box::new(move |_| Reply::Int(broker.publish(&channel, payload) as i64));
    tx::dispatch(&ctx.instance, session, op)
}

fn pubsub_introspect(args: &[Bytes], ctx: &Arc<ServerContext>) -> Reply {
    let Some((sub, rest)) = args.split_first() else {
        return CommandError::WrongArity("pubsub").into();
    };
    if sub.eq_ignore_ascii_case(b"CHANNELS") {
        let pattern = match rest {
            [] => None,
            [pattern] => match commands::utf8_arg(pattern) {
                Ok(p) => Some(p),
                Err(e) => return e.into(),
            },
            _ => return CommandError::WrongArity("pubsub").into(),
        };
        let mut names = ctx.pubsub.channel_names(pattern.as_deref());
        names.sort();
        Reply::Array(names.into_iter().map(Reply::bulk).collect())
    } else if sub.eq_ignore_ascii_case(b"NUMSUB") {
        let channels = match commands::utf8_args(rest) {
            Ok(channels) => channels,
            Err(e) => return e.into(),
        };
        let mut replies = Vec::with_capacity(channels.len() * 2);
        for (channel, count) in ctx.pubsub.numsub(&channels) {
            replies.push(Reply::bulk(channel));
            replies.push(Reply::Int(count as i64));
        }
        Reply::Array(replies)
    } else if sub.eq_ignore_ascii_case(b"NUMPAT") {
        Reply::Int(ctx.pubsub.active_patterns() as i64)
    } else {
        CommandError::UnknownSubcommand(format!(
            "pubsub {}",
            String::from_utf8_lossy(sub).to_lowercase()
        ))
        .into()
    }
}

/// SUBSCRIBE/UNSUBSCRIBE and the pattern variants. Each name gets its
/// own confirmation frame; the subscriber-mode flag follows the
/// subscription count across 0.
fn subscription_cmd(
    name: &str,
    args: &[Bytes],
    session: &mut Session,
    subs: &mut Subscriptions,
    out: &mut BytesMut,
) -> Step {
    if session.in_multi() {
        session.mark_dirty();
        let label: &'static str = match name {
            "SUBSCRIBE" => "SUBSCRIBE",
            "UNSUBSCRIBE" => "UNSUBSCRIBE",
            "PSUBSCRIBE" => "PSUBSCRIBE",
            _ => "PUNSUBSCRIBE",
        };
        reply_frame(CommandError::NotInTransactions(label).into()).serialize(out);
        return Step::Continue;
    }

    let kind = name.to_ascii_lowercase();
    match name {
        "SUBSCRIBE" | "PSUBSCRIBE" => {
            if args.is_empty() {
                let arity = if name == "SUBSCRIBE" { "subscribe" } else { "psubscribe" };
                reply_frame(CommandError::WrongArity(arity).into()).serialize(out);
                return Step::Continue;
            }
            for arg in args {
                let target = match commands::utf8_arg(arg) {
                    Ok(target) => target,
                    Err(e) => {
                        reply_frame(e.into()).serialize(out);
                        return Step::Continue;
                    }
                };
                let count = if name == "SUBSCRIBE" {
                    subs.subscribe(&target)
                } else {
                    subs.psubscribe(&target)
                };
                confirmation(&kind, Some(&target), count).serialize(out);
            }
        }
        _ => {
            // without arguments, unsubscribe from everything of that kind
            let targets: Vec<String> = if args.is_empty() {
                if name == "UNSUBSCRIBE" {
                    subs.channel_names()
                } else {
                    subs.pattern_names()
                }
            } else {
                match commands::utf8_args(args) {
                    Ok(targets) => targets,
                    Err(e) => {
                        reply_frame(e.into()).serialize(out);
                        return Step::Continue;
                    }
                }
            };
            if targets.is_empty() {
                confirmation(&kind, None, subs.count()).serialize(out);
            }
            for target in targets {
                let count = if name == "UNSUBSCRIBE" {
                    subs.unsubscribe(&target)
                } else {
                    subs.punsubscribe(&target)
                };
                confirmation(&kind, Some(&target), count).serialize(out);
            }
        }
    }

    session.set_subscriber(subs.count() > 0);
    Step::Continue
}

/// Builds a `[kind, channel|nil, count]` confirmation frame.
fn confirmation(kind: &str, target: Option<&str>, count: usize) -> Frame {
    Frame::Array(vec![
        Frame::Bulk(Bytes::copy_from_slice(kind.as_bytes())),
        match target {
            Some(target) => Frame::Bulk(Bytes::copy_from_slice(target.as_bytes())),
            None => Frame::NullBulk,
        },
        Frame::Integer(count as i64),
    ])
}

/// Renders a delivered pub/sub message.
fn deliver(msg: &PubMessage, out: &mut BytesMut) {
    let channel = Frame::Bulk(Bytes::copy_from_slice(msg.channel.as_bytes()));
    let frame = match &msg.pattern {
        Some(pattern) => Frame::Array(vec![
            Frame::bulk("pmessage"),
            Frame::Bulk(Bytes::copy_from_slice(pattern.as_bytes())),
            channel,
            Frame::Bulk(msg.data.clone()),
        ]),
        None => Frame::Array(vec![
            Frame::bulk("message"),
            channel,
            Frame::Bulk(msg.data.clone()),
        ]),
    };
    frame.serialize(out);
}

/// Maps an engine reply onto the wire.
pub(crate) fn reply_frame(reply: Reply) -> Frame {
    match reply {
        Reply::Simple(s) => Frame::Simple(s),
        Reply::Int(n) => Frame::Integer(n),
        Reply::Bulk(data) => Frame::Bulk(data),
        Reply::Nil => Frame::NullBulk,
        Reply::Array(items) => Frame::Array(items.into_iter().map(reply_frame).collect()),
        Reply::NilArray => Frame::NullArray,
        Reply::Error(msg) => Frame::Error(msg),
    }
}

/// Extracts the argument vector from a client command frame.
fn frame_to_argv(frame: Frame) -> Option<Vec<Bytes>> {
    let Frame::Array(items) = frame else {
        return None;
    };
    let mut argv = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Frame::Bulk(data) => argv.push(data),
            Frame::Simple(s) => argv.push(Bytes::from(s)),
            Frame::Integer(n) => argv.push(Bytes::from(n.to_string())),
            _ => return None,
        }
    }
    Some(argv)
}

/// This connection's live subscriptions: one forwarder task per
/// channel/pattern, all funneling into a single mpsc the connection
/// loop selects on.
struct Subscriptions {
    broker: Arc<PubSubBroker>,
    channels: HashMap<String, JoinHandle<()>>,
    patterns: HashMap<String, JoinHandle<()>>,
    tx: mpsc::UnboundedSender<PubMessage>,
    rx: mpsc::UnboundedReceiver<PubMessage>,
}

impl Subscriptions {
    fn new(broker: Arc<PubSubBroker>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            broker,
            channels: HashMap::new(),
            patterns: HashMap::new(),
            tx,
            rx,
        }
    }

    fn count(&self) -> usize {
        self.channels.len() + self.patterns.len()
    }

    fn channel_names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    fn pattern_names(&self) -> Vec<String> {
        self.patterns.keys().cloned().collect()
    }

    fn subscribe(&mut self, channel: &str) -> usize {
        if !self.channels.contains_key(channel) {
            let rx = self.broker.subscribe(channel);
            self.channels
                .insert(channel.to_owned(), forward(rx, self.tx.clone()));
        }
        self.count()
    }

    fn unsubscribe(&mut self, channel: &str) -> usize {
        if let Some(handle) = self.channels.remove(channel) {
            handle.abort();
            self.broker.unsubscribe(channel);
        }
        self.count()
    }

    fn psubscribe(&mut self, pattern: &str) -> usize {
        if !self.patterns.contains_key(pattern) {
            let rx = self.broker.psubscribe(pattern);
            self.patterns
                .insert(pattern.to_owned(), forward(rx, self.tx.clone()));
        }
        self.count()
    }

    fn punsubscribe(&mut self, pattern: &str) -> usize {
        if let Some(handle) = self.patterns.remove(pattern) {
            handle.abort();
            self.broker.punsubscribe(pattern);
        }
        self.count()
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for (channel, handle) in self.channels.drain() {
            handle.abort();
            self.broker.unsubscribe(&channel);
        }
        for (pattern, handle) in self.patterns.drain() {
            handle.abort();
            self.broker.punsubscribe(&pattern);
        }
    }
}

/// Pumps one broadcast receiver into the connection's mpsc. Lagged
/// receivers skip missed messages rather than disconnecting.
fn forward(
    mut rx: broadcast::Receiver<PubMessage>,
    tx: mpsc::UnboundedSender<PubMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if tx.send(msg).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(missed, "pub/sub subscriber lagged, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_core::Instance;

    async fn start() -> (tokio::io::DuplexStream, Arc<ServerContext>) {
        let ctx = Arc::new(ServerContext::new(Arc::new(Instance::new())));
        let (client, server) = tokio::io::duplex(64 * 1024);
        let handler_ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            let _ = handle(server, handler_ctx).await;
        });
        (client, ctx)
    }

    async fn send(client: &mut tokio::io::DuplexStream, parts: &[&str]) {
        let mut buf = BytesMut::new();
        Frame::Array(
            parts
                .iter()
                .map(|p| Frame::Bulk(Bytes::copy_from_slice(p.as_bytes())))
                .collect(),
        )
        .serialize(&mut buf);
        client.write_all(&buf).await.unwrap();
    }

    async fn recv(client: &mut tokio::io::DuplexStream, buf: &mut BytesMut) -> Frame {
        loop {
            if let Some((frame, consumed)) = parse_frame(buf).unwrap() {
                buf.advance(consumed);
                return frame;
            }
            let n = client.read_buf(buf).await.unwrap();
            assert!(n > 0, "connection closed while waiting for a reply");
        }
    }

    #[tokio::test]
    async fn ping_and_set_get() {
        let (mut client, _ctx) = start().await;
        let mut buf = BytesMut::new();

        send(&mut client, &["PING"]).await;
        assert_eq!(recv(&mut client, &mut buf).await, Frame::Simple("PONG".into()));

        send(&mut client, &["SET", "foo", "bar"]).await;
        assert_eq!(recv(&mut client, &mut buf).await, Frame::Simple("OK".into()));

        send(&mut client, &["GET", "foo"]).await;
        assert_eq!(recv(&mut client, &mut buf).await, Frame::bulk("bar"));
    }

    #[tokio::test]
    async fn transaction_over_the_wire() {
        let (mut client, _ctx) = start().await;
        let mut buf = BytesMut::new();

        send(&mut client, &["MULTI"]).await;
        assert_eq!(recv(&mut client, &mut buf).await, Frame::Simple("OK".into()));
        send(&mut client, &["SET", "a", "1"]).await;
        assert_eq!(
            recv(&mut client, &mut buf).await,
            Frame::Simple("QUEUED".into())
        );
        send(&mut client, &["INCR", "a"]).await;
        assert_eq!(
            recv(&mut client, &mut buf).await,
            Frame::Simple("QUEUED".into())
        );
        send(&mut client, &["EXEC"]).await;
        assert_eq!(
            recv(&mut client, &mut buf).await,
            Frame::Array(vec![Frame::Simple("OK".into()), Frame::Integer(2)])
        );
    }

    #[tokio::test]
    async fn subscriber_mode_gates_commands() {
        let (mut client, _ctx) = start().await;
        let mut buf = BytesMut::new();

        send(&mut client, &["SUBSCRIBE", "news"]).await;
        let confirm = recv(&mut client, &mut buf).await;
        assert_eq!(
            confirm,
            Frame::Array(vec![
                Frame::bulk("subscribe"),
                Frame::bulk("news"),
                Frame::Integer(1)
            ])
        );

        send(&mut client, &["GET", "foo"]).await;
        let reply = recv(&mut client, &mut buf).await;
        assert!(matches!(reply, Frame::Error(msg) if msg.contains("only (P)SUBSCRIBE")));

        // PING stays allowed
        send(&mut client, &["PING"]).await;
        assert_eq!(recv(&mut client, &mut buf).await, Frame::Simple("PONG".into()));

        // leaving subscriber mode restores normal dispatch
        send(&mut client, &["UNSUBSCRIBE"]).await;
        let _confirm = recv(&mut client, &mut buf).await;
        send(&mut client, &["GET", "foo"]).await;
        assert_eq!(recv(&mut client, &mut buf).await, Frame::NullBulk);
    }

    #[tokio::test]
    async fn message_delivery_between_connections() {
        let (mut subscriber, ctx) = start().await;
        let mut buf = BytesMut::new();

        send(&mut subscriber, &["SUBSCRIBE", "ch"]).await;
        let _confirm = recv(&mut subscriber, &mut buf).await;

        // publish from a second connection
        let (mut publisher, _) = {
            let (client, server) = tokio::io::duplex(64 * 1024);
            let handler_ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                let _ = handle(server, handler_ctx).await;
            });
            (client, ())
        };
        let mut pbuf = BytesMut::new();
        send(&mut publisher, &["PUBLISH", "ch", "hello"]).await;
        assert_eq!(recv(&mut publisher, &mut pbuf).await, Frame::Integer(1));

        let delivery = recv(&mut subscriber, &mut buf).await;
        assert_eq!(
            delivery,
            Frame::Array(vec![
                Frame::bulk("message"),
                Frame::bulk("ch"),
                Frame::bulk("hello"),
            ])
        );
    }

    #[tokio::test]
    async fn auth_required_when_password_set() {
        let instance = Arc::new(Instance::with_password("hunter2"));
        let ctx = Arc::new(ServerContext::new(instance));
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let handler_ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            let _ = handle(server, handler_ctx).await;
        });
        let mut buf = BytesMut::new();

        send(&mut client, &["GET", "foo"]).await;
        let reply = recv(&mut client, &mut buf).await;
        assert!(matches!(reply, Frame::Error(msg) if msg.starts_with("NOAUTH")));

        send(&mut client, &["AUTH", "wrong"]).await;
        let reply = recv(&mut client, &mut buf).await;
        assert!(matches!(reply, Frame::Error(msg) if msg.contains("invalid password")));

        send(&mut client, &["AUTH", "hunter2"]).await;
        assert_eq!(recv(&mut client, &mut buf).await, Frame::Simple("OK".into()));

        send(&mut client, &["GET", "foo"]).await;
        assert_eq!(recv(&mut client, &mut buf).await, Frame::NullBulk);
    }

    #[tokio::test]
    async fn quit_closes_the_connection() {
        let (mut client, _ctx) = start().await;
        let mut buf = BytesMut::new();
        send(&mut client, &["QUIT"]).await;
        assert_eq!(recv(&mut client, &mut buf).await, Frame::Simple("OK".into()));
        // the server side hangs up after the reply
        let n = client.read_buf(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }
}
