//! Poll-retry loops for blocking commands.
//!
//! No suspension queues: a blocked BLPOP re-acquires the instance
//! lock, re-checks every key from scratch, releases the lock, and
//! sleeps briefly. Re-checking fully each iteration matters — any
//! other connection may have pushed, popped, renamed, or expired the
//! keys while the lock was released. The connection layer races this
//! loop against socket teardown so a dead client never keeps a poller
//! alive past its next tick.

use std::time::Duration;

use bytes::Bytes;
use cinder_core::Reply;
use tokio::time::Instant;

use crate::server::ServerContext;

/// Delay between retries. Short enough that tests using a pinned
/// clock see sub-hundred-millisecond wakeups, long enough to not spin.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// BLPOP/BRPOP: pops from the first non-empty key, retrying until
/// `timeout` elapses (`None` = retry forever). A timeout yields a
/// null array, matching the non-error contract of blocking commands.
pub async fn pop_loop(
    ctx: &ServerContext,
    db_index: usize,
    keys: &[String],
    left: bool,
    timeout: Option<Duration>,
) -> Reply {
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        // one full evaluation under the lock
        let attempt = ctx.instance.exec(db_index, |ectx| {
            let now = ectx.now;
            for key in keys {
                match ectx.db().pop(key, left, now) {
                    Ok(Some(value)) => return Some(Ok((key.clone(), value))),
                    Ok(None) => continue,
                    Err(e) => return Some(Err(e)),
                }
            }
            None
        });

        match attempt {
            Some(Ok((key, value))) => {
                return Reply::Array(vec![
                    Reply::Bulk(Bytes::from(key)),
                    Reply::Bulk(value),
                ]);
            }
            Some(Err(e)) => return e.into(),
            None => {}
        }

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Reply::NilArray;
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_core::types::Value;
    use cinder_core::Instance;
    use std::sync::Arc;

    fn context() -> Arc<ServerContext> {
        Arc::new(ServerContext::new(Arc::new(Instance::new())))
    }

    #[tokio::test]
    async fn immediate_pop_when_data_present() {
        let ctx = context();
        ctx.instance.exec(0, |ectx| {
            let now = ectx.now;
            ectx.db().rpush("q", &[Bytes::from("job")], now).unwrap();
        });
        let reply = pop_loop(&ctx, 0, &["q".into()], true, None).await;
        assert_eq!(
            reply,
            Reply::Array(vec![Reply::bulk("q"), Reply::bulk("job")])
        );
    }

    #[tokio::test]
    async fn times_out_with_null_array() {
        let ctx = context();
        let reply = pop_loop(
            &ctx,
            0,
            &["empty".into()],
            true,
            Some(Duration::from_millis(30)),
        )
        .await;
        assert_eq!(reply, Reply::NilArray);
    }

    #[tokio::test]
    async fn wakes_when_another_task_pushes() {
        let ctx = context();
        let pusher = Arc::clone(&ctx);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            pusher.instance.exec(0, |ectx| {
                let now = ectx.now;
                ectx.db().rpush("q", &[Bytes::from("late")], now).unwrap();
            });
        });

        let reply = pop_loop(&ctx, 0, &["q".into()], true, Some(Duration::from_secs(5))).await;
        assert_eq!(
            reply,
            Reply::Array(vec![Reply::bulk("q"), Reply::bulk("late")])
        );
    }

    #[tokio::test]
    async fn first_key_with_data_wins() {
        let ctx = context();
        ctx.instance.exec(0, |ectx| {
            let now = ectx.now;
            ectx.db().rpush("b", &[Bytes::from("2")], now).unwrap();
            ectx.db().rpush("a", &[Bytes::from("1")], now).unwrap();
        });
        let reply = pop_loop(&ctx, 0, &["a".into(), "b".into()], true, None).await;
        assert_eq!(reply, Reply::Array(vec![Reply::bulk("a"), Reply::bulk("1")]));
    }

    #[tokio::test]
    async fn wrong_type_reports_immediately() {
        let ctx = context();
        ctx.instance.exec(0, |ectx| {
            let now = ectx.now;
            ectx.db().set("s", Value::Str(Bytes::from("x")), now);
        });
        let reply = pop_loop(&ctx, 0, &["s".into()], true, None).await;
        assert!(matches!(reply, Reply::Error(msg) if msg.starts_with("WRONGTYPE")));
    }
}
