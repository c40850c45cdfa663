//! Server, keyspace, and expiry commands.

use std::time::{Duration, SystemTime};

use bytes::Bytes;
use cinder_core::{CommandError, Operation, Reply, StoreError, TtlResult};

use super::{int_arg, utf8_arg, utf8_args};

pub(crate) fn ping(args: &[Bytes]) -> Result<Operation, CommandError> {
    match args {
        [] => Ok(Box::new(|_| Reply::Simple("PONG".into()))),
        [msg] => {
            let msg = msg.clone();
            Ok(Box::new(move |_| Reply::Bulk(msg)))
        }
        _ => Err(CommandError::WrongArity("ping")),
    }
}

pub(crate) fn echo(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [msg] = args else {
        return Err(CommandError::WrongArity("echo"));
    };
    let msg = msg.clone();
    Ok(Box::new(move |_| Reply::Bulk(msg)))
}

/// TIME reports the instance clock, so pinned clocks are visible over
/// the wire: [seconds, microseconds] since the epoch.
pub(crate) fn time(args: &[Bytes]) -> Result<Operation, CommandError> {
    if !args.is_empty() {
        return Err(CommandError::WrongArity("time"));
    }
    Ok(Box::new(|ctx| {
        let since_epoch = ctx
            .now
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Reply::Array(vec![
            Reply::bulk(since_epoch.as_secs().to_string()),
            Reply::bulk(since_epoch.subsec_micros().to_string()),
        ])
    }))
}

pub(crate) fn dbsize(args: &[Bytes]) -> Result<Operation, CommandError> {
    if !args.is_empty() {
        return Err(CommandError::WrongArity("dbsize"));
    }
    Ok(Box::new(|ctx| {
        let now = ctx.now;
        Reply::Int(ctx.db().len(now) as i64)
    }))
}

pub(crate) fn flushdb(args: &[Bytes]) -> Result<Operation, CommandError> {
    if !args.is_empty() {
        return Err(CommandError::WrongArity("flushdb"));
    }
    Ok(Box::new(|ctx| {
        ctx.db().clear();
        Reply::ok()
    }))
}

pub(crate) fn flushall(args: &[Bytes]) -> Result<Operation, CommandError> {
    if !args.is_empty() {
        return Err(CommandError::WrongArity("flushall"));
    }
    Ok(Box::new(|ctx| {
        ctx.flush_all();
        Reply::ok()
    }))
}

pub(crate) fn swapdb(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [first, second] = args else {
        return Err(CommandError::WrongArity("swapdb"));
    };
    let a = db_index(first)?;
    let b = db_index(second)?;
    Ok(Box::new(move |ctx| {
        ctx.swap_dbs(a, b);
        Reply::ok()
    }))
}

/// Sorted for deterministic output; the keyspace itself is unordered.
pub(crate) fn keys(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [pattern] = args else {
        return Err(CommandError::WrongArity("keys"));
    };
    let pattern = utf8_arg(pattern)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let mut keys = ctx.db().keys(&pattern, now);
        keys.sort();
        Reply::Array(keys.into_iter().map(Reply::bulk).collect())
    }))
}

pub(crate) fn scan(args: &[Bytes]) -> Result<Operation, CommandError> {
    let Some((cursor_arg, mut rest)) = args.split_first() else {
        return Err(CommandError::WrongArity("scan"));
    };
    let cursor: u64 = std::str::from_utf8(cursor_arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::InvalidCursor)?;

    let mut pattern = None;
    let mut count = 10usize;
    while let Some((option, tail)) = rest.split_first() {
        let Some((value, tail)) = tail.split_first() else {
            return Err(CommandError::Syntax);
        };
        if option.eq_ignore_ascii_case(b"MATCH") {
            pattern = Some(utf8_arg(value)?);
        } else if option.eq_ignore_ascii_case(b"COUNT") {
            let n = int_arg(value)?;
            if n <= 0 {
                return Err(CommandError::Syntax);
            }
            count = n as usize;
        } else {
            return Err(CommandError::Syntax);
        }
        rest = tail;
    }

    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let (next, keys) = ctx.db().scan(cursor, count, pattern.as_deref(), now);
        Reply::Array(vec![
            Reply::bulk(next.to_string()),
            Reply::Array(keys.into_iter().map(Reply::bulk).collect()),
        ])
    }))
}

pub(crate) fn randomkey(args: &[Bytes]) -> Result<Operation, CommandError> {
    if !args.is_empty() {
        return Err(CommandError::WrongArity("randomkey"));
    }
    Ok(Box::new(|ctx| {
        let now = ctx.now;
        match ctx.db().random_key(now) {
            Some(key) => Reply::bulk(key),
            None => Reply::Nil,
        }
    }))
}

pub(crate) fn type_cmd(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("type"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        Reply::Simple(ctx.db().type_name(&key, now).into())
    }))
}

pub(crate) fn exists(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.is_empty() {
        return Err(CommandError::WrongArity("exists"));
    }
    let keys = utf8_args(args)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let db = ctx.db();
        let count = keys.iter().filter(|k| db.exists(k, now)).count();
        Reply::Int(count as i64)
    }))
}

pub(crate) fn del(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.is_empty() {
        return Err(CommandError::WrongArity("del"));
    }
    let keys = utf8_args(args)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let db = ctx.db();
        let count = keys.iter().filter(|k| db.del(k, now)).count();
        Reply::Int(count as i64)
    }))
}

pub(crate) fn rename(args: &[Bytes], only_if_fresh: bool) -> Result<Operation, CommandError> {
    let [from, to] = args else {
        return Err(CommandError::WrongArity(if only_if_fresh {
            "renamenx"
        } else {
            "rename"
        }));
    };
    let from = utf8_arg(from)?;
    let to = utf8_arg(to)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let db = ctx.db();
        if only_if_fresh {
            if !db.exists(&from, now) {
                return StoreError::NoSuchKey.into();
            }
            if db.exists(&to, now) {
                return Reply::Int(0);
            }
            match db.rename(&from, &to, now) {
                Ok(()) => Reply::Int(1),
                Err(e) => e.into(),
            }
        } else {
            match db.rename(&from, &to, now) {
                Ok(()) => Reply::ok(),
                Err(e) => e.into(),
            }
        }
    }))
}

pub(crate) fn move_cmd(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, dest] = args else {
        return Err(CommandError::WrongArity("move"));
    };
    let key = utf8_arg(key)?;
    let dest = db_index(dest)?;
    Ok(Box::new(move |ctx| match ctx.move_key(&key, dest) {
        Ok(moved) => Reply::from_bool(moved),
        Err(e) => e.into(),
    }))
}

pub(crate) fn object(args: &[Bytes]) -> Result<Operation, CommandError> {
    let Some((sub, rest)) = args.split_first() else {
        return Err(CommandError::WrongArity("object"));
    };
    if !sub.eq_ignore_ascii_case(b"IDLETIME") {
        return Err(CommandError::UnknownSubcommand(format!(
            "object {}",
            String::from_utf8_lossy(sub).to_lowercase()
        )));
    }
    let [key] = rest else {
        return Err(CommandError::WrongArity("object"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().idle_time(&key, now) {
            Some(idle) => Reply::Int(idle.as_secs() as i64),
            None => StoreError::NoSuchKey.into(),
        }
    }))
}

/// EXPIRE/PEXPIRE: a relative timeout in the given unit. Non-positive
/// timeouts delete the key, like the real server.
pub(crate) fn expire(
    args: &[Bytes],
    name: &'static str,
    millis_per_unit: u64,
) -> Result<Operation, CommandError> {
    let [key, amount] = args else {
        return Err(CommandError::WrongArity(name));
    };
    let key = utf8_arg(key)?;
    let amount = int_arg(amount)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let db = ctx.db();
        let applied = if amount > 0 {
            let delta = Duration::from_millis((amount as u64).saturating_mul(millis_per_unit));
            db.expire_at(&key, now + delta, now)
        } else {
            db.del(&key, now)
        };
        Reply::from_bool(applied)
    }))
}

/// EXPIREAT/PEXPIREAT: an absolute Unix timestamp in the given unit.
pub(crate) fn expire_at(
    args: &[Bytes],
    name: &'static str,
    millis_per_unit: u64,
) -> Result<Operation, CommandError> {
    let [key, timestamp] = args else {
        return Err(CommandError::WrongArity(name));
    };
    let key = utf8_arg(key)?;
    let timestamp = int_arg(timestamp)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let db = ctx.db();
        let applied = if timestamp > 0 {
            let deadline = SystemTime::UNIX_EPOCH
                + Duration::from_millis((timestamp as u64).saturating_mul(millis_per_unit));
            db.expire_at(&key, deadline, now)
        } else {
            db.del(&key, now)
        };
        Reply::from_bool(applied)
    }))
}

/// TTL/PTTL: -2 for a missing key, -1 for no expiry, else the rounded
/// remaining time.
pub(crate) fn ttl(args: &[Bytes], in_seconds: bool) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity(if in_seconds { "ttl" } else { "pttl" }));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().ttl(&key, now) {
            TtlResult::NotFound => Reply::Int(-2),
            TtlResult::NoExpiry => Reply::Int(-1),
            TtlResult::Remaining(left) => {
                let ms = left.as_millis() as u64;
                if in_seconds {
                    // round up so EXPIRE k 100; TTL k answers 100
                    Reply::Int(ms.div_ceil(1000) as i64)
                } else {
                    Reply::Int(ms as i64)
                }
            }
        }
    }))
}

pub(crate) fn persist(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("persist"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        Reply::from_bool(ctx.db().persist(&key, now))
    }))
}

/// Parses a database index argument.
pub(crate) fn db_index(arg: &Bytes) -> Result<usize, CommandError> {
    let n = int_arg(arg).map_err(|_| CommandError::InvalidDbIndex)?;
    usize::try_from(n).map_err(|_| CommandError::InvalidDbIndex)
}
