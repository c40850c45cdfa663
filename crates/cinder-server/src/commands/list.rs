//! List commands.
//!
//! The blocking variants (BLPOP/BRPOP) live partly in
//! [`crate::blocking`]: the connection layer runs the poll loop.
//! Inside a transaction they degrade to a single non-blocking attempt,
//! which is what the queued-operation builder here produces.

use std::time::Duration;

use bytes::Bytes;
use cinder_core::{CommandError, Operation, Reply};

use super::{int_arg, utf8_arg, utf8_args};

pub(crate) fn push(args: &[Bytes], left: bool) -> Result<Operation, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongArity(if left { "lpush" } else { "rpush" }));
    }
    let key = utf8_arg(&args[0])?;
    let values: Vec<Bytes> = args[1..].to_vec();
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().push(&key, &values, left, now) {
            Ok(len) => Reply::Int(len as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn pop(args: &[Bytes], left: bool) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity(if left { "lpop" } else { "rpop" }));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().pop(&key, left, now) {
            Ok(Some(value)) => Reply::Bulk(value),
            Ok(None) => Reply::Nil,
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn llen(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("llen"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().llen(&key, now) {
            Ok(len) => Reply::Int(len as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn lrange(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, start, stop] = args else {
        return Err(CommandError::WrongArity("lrange"));
    };
    let key = utf8_arg(key)?;
    let start = int_arg(start)?;
    let stop = int_arg(stop)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().lrange(&key, start, stop, now) {
            Ok(items) => Reply::Array(items.into_iter().map(Reply::Bulk).collect()),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn lindex(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, index] = args else {
        return Err(CommandError::WrongArity("lindex"));
    };
    let key = utf8_arg(key)?;
    let index = int_arg(index)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().lindex(&key, index, now) {
            Ok(Some(value)) => Reply::Bulk(value),
            Ok(None) => Reply::Nil,
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn lset(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, index, value] = args else {
        return Err(CommandError::WrongArity("lset"));
    };
    let key = utf8_arg(key)?;
    let index = int_arg(index)?;
    let value = value.clone();
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().lset(&key, index, value, now) {
            Ok(()) => Reply::ok(),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn ltrim(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, start, stop] = args else {
        return Err(CommandError::WrongArity("ltrim"));
    };
    let key = utf8_arg(key)?;
    let start = int_arg(start)?;
    let stop = int_arg(stop)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().ltrim(&key, start, stop, now) {
            Ok(()) => Reply::ok(),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn lrem(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, count, value] = args else {
        return Err(CommandError::WrongArity("lrem"));
    };
    let key = utf8_arg(key)?;
    let count = int_arg(count)?;
    let value = value.clone();
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().lrem(&key, count, &value, now) {
            Ok(removed) => Reply::Int(removed as i64),
            Err(e) => e.into(),
        }
    }))
}

/// Validated arguments of a BLPOP/BRPOP call: the key list and the
/// timeout (`None` = block forever).
#[derive(Debug)]
pub(crate) struct BlockingPopArgs {
    pub keys: Vec<String>,
    pub timeout: Option<Duration>,
}

/// Parses `BLPOP key [key ...] timeout`. The timeout accepts
/// fractional seconds; zero means "no limit".
pub(crate) fn parse_blocking_pop(
    args: &[Bytes],
    name: &'static str,
) -> Result<BlockingPopArgs, CommandError> {
    let Some((timeout_arg, key_args)) = args.split_last() else {
        return Err(CommandError::WrongArity(name));
    };
    if key_args.is_empty() {
        return Err(CommandError::WrongArity(name));
    }
    let keys = utf8_args(key_args)?;
    let timeout: f64 = std::str::from_utf8(timeout_arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::InvalidTimeout)?;
    if !timeout.is_finite() {
        return Err(CommandError::InvalidTimeout);
    }
    if timeout < 0.0 {
        return Err(CommandError::NegativeTimeout);
    }
    let timeout = if timeout == 0.0 {
        None
    } else {
        Some(Duration::from_secs_f64(timeout))
    };
    Ok(BlockingPopArgs { keys, timeout })
}

/// The in-transaction form of BLPOP/BRPOP: one pass over the keys,
/// null array when all are empty. Queued transactions must never
/// suspend, so the blocking behavior degrades to this.
pub(crate) fn blocking_pop_degraded(
    args: &[Bytes],
    name: &'static str,
    left: bool,
) -> Result<Operation, CommandError> {
    let BlockingPopArgs { keys, .. } = parse_blocking_pop(args, name)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let db = ctx.db();
        for key in &keys {
            match db.pop(key, left, now) {
                Ok(Some(value)) => {
                    return Reply::Array(vec![Reply::bulk(key.clone()), Reply::Bulk(value)]);
                }
                Ok(None) => continue,
                Err(e) => return e.into(),
            }
        }
        Reply::NilArray
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_core::{dispatch, Instance, Session};

    fn run(instance: &Instance, session: &mut Session, name: &str, args: &[&str]) -> Reply {
        let args: Vec<Bytes> = args
            .iter()
            .map(|a| Bytes::copy_from_slice(a.as_bytes()))
            .collect();
        match crate::commands::prepare(name, &args) {
            Ok(op) => dispatch(instance, session, op),
            Err(e) => e.into(),
        }
    }

    #[test]
    fn push_pop_range() {
        let instance = Instance::new();
        let mut session = Session::new(true);
        assert_eq!(
            run(&instance, &mut session, "RPUSH", &["l", "a", "b", "c"]),
            Reply::Int(3)
        );
        assert_eq!(
            run(&instance, &mut session, "LRANGE", &["l", "0", "-1"]),
            Reply::Array(vec![
                Reply::bulk("a"),
                Reply::bulk("b"),
                Reply::bulk("c"),
            ])
        );
        assert_eq!(
            run(&instance, &mut session, "LPOP", &["l"]),
            Reply::Bulk(Bytes::from("a"))
        );
        assert_eq!(run(&instance, &mut session, "LLEN", &["l"]), Reply::Int(2));
    }

    #[test]
    fn timeout_parsing() {
        let args = [Bytes::from("k"), Bytes::from("0.25")];
        let parsed = parse_blocking_pop(&args, "blpop").unwrap();
        assert_eq!(parsed.keys, vec!["k".to_owned()]);
        assert_eq!(parsed.timeout, Some(Duration::from_millis(250)));

        let args = [Bytes::from("k"), Bytes::from("0")];
        assert_eq!(parse_blocking_pop(&args, "blpop").unwrap().timeout, None);

        let args = [Bytes::from("k"), Bytes::from("-1")];
        assert_eq!(
            parse_blocking_pop(&args, "blpop").unwrap_err(),
            CommandError::NegativeTimeout
        );
        let args = [Bytes::from("k"), Bytes::from("soon")];
        assert_eq!(
            parse_blocking_pop(&args, "blpop").unwrap_err(),
            CommandError::InvalidTimeout
        );
    }

    #[test]
    fn degraded_blocking_pop_scans_keys_in_order() {
        let instance = Instance::new();
        let mut session = Session::new(true);
        run(&instance, &mut session, "RPUSH", &["second", "x"]);

        let args = [Bytes::from("first"), Bytes::from("second"), Bytes::from("1")];
        let op = blocking_pop_degraded(&args, "blpop", true).unwrap();
        let reply = dispatch(&instance, &mut session, op);
        assert_eq!(
            reply,
            Reply::Array(vec![Reply::bulk("second"), Reply::bulk("x")])
        );

        // nothing left anywhere: null array, no waiting
        let args = [Bytes::from("first"), Bytes::from("second"), Bytes::from("1")];
        let op = blocking_pop_degraded(&args, "blpop", true).unwrap();
        assert_eq!(dispatch(&instance, &mut session, op), Reply::NilArray);
    }
}
