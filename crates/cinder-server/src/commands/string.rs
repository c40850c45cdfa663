//! String commands.

use std::time::Duration;

use bytes::Bytes;
use cinder_core::{CommandError, Operation, Reply};

use super::{float_arg, int_arg, utf8_arg};

/// SET key value [EX seconds | PX milliseconds] [NX | XX]
pub(crate) fn set(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongArity("set"));
    }
    let key = utf8_arg(&args[0])?;
    let value = args[1].clone();

    let mut expire = None;
    let mut nx = false;
    let mut xx = false;
    let mut rest = &args[2..];
    while let Some((option, tail)) = rest.split_first() {
        if option.eq_ignore_ascii_case(b"NX") {
            nx = true;
            rest = tail;
        } else if option.eq_ignore_ascii_case(b"XX") {
            xx = true;
            rest = tail;
        } else if option.eq_ignore_ascii_case(b"EX") || option.eq_ignore_ascii_case(b"PX") {
            let Some((amount, tail)) = tail.split_first() else {
                return Err(CommandError::Syntax);
            };
            let n = int_arg(amount)?;
            if n <= 0 {
                return Err(CommandError::InvalidExpireTime("set"));
            }
            let millis = if option.eq_ignore_ascii_case(b"EX") {
                (n as u64).saturating_mul(1000)
            } else {
                n as u64
            };
            expire = Some(Duration::from_millis(millis));
            rest = tail;
        } else {
            return Err(CommandError::Syntax);
        }
    }
    if nx && xx {
        return Err(CommandError::Syntax);
    }

    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        if ctx.db().set_string(&key, value, expire, nx, xx, now) {
            Reply::ok()
        } else {
            Reply::Nil
        }
    }))
}

pub(crate) fn get(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("get"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().get(&key, now) {
            Ok(Some(data)) => Reply::Bulk(data),
            Ok(None) => Reply::Nil,
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn getset(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, value] = args else {
        return Err(CommandError::WrongArity("getset"));
    };
    let key = utf8_arg(key)?;
    let value = value.clone();
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().getset(&key, value, now) {
            Ok(Some(previous)) => Reply::Bulk(previous),
            Ok(None) => Reply::Nil,
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn setnx(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, value] = args else {
        return Err(CommandError::WrongArity("setnx"));
    };
    let key = utf8_arg(key)?;
    let value = value.clone();
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        Reply::from_bool(ctx.db().set_string(&key, value, None, true, false, now))
    }))
}

/// SETEX/PSETEX: SET plus a mandatory TTL in the given unit.
pub(crate) fn setex(
    args: &[Bytes],
    name: &'static str,
    millis_per_unit: u64,
) -> Result<Operation, CommandError> {
    let [key, amount, value] = args else {
        return Err(CommandError::WrongArity(name));
    };
    let key = utf8_arg(key)?;
    let amount = int_arg(amount)?;
    if amount <= 0 {
        return Err(CommandError::InvalidExpireTime(name));
    }
    let expire = Duration::from_millis((amount as u64).saturating_mul(millis_per_unit));
    let value = value.clone();
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        ctx.db().set_string(&key, value, Some(expire), false, false, now);
        Reply::ok()
    }))
}

pub(crate) fn mset(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(CommandError::WrongArity("mset"));
    }
    let mut pairs = Vec::with_capacity(args.len() / 2);
    for chunk in args.chunks_exact(2) {
        pairs.push((utf8_arg(&chunk[0])?, chunk[1].clone()));
    }
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let db = ctx.db();
        for (key, value) in pairs {
            db.set_string(&key, value, None, false, false, now);
        }
        Reply::ok()
    }))
}

pub(crate) fn mget(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.is_empty() {
        return Err(CommandError::WrongArity("mget"));
    }
    let keys: Vec<String> = args.iter().map(utf8_arg).collect::<Result<_, _>>()?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let db = ctx.db();
        let replies = keys
            .iter()
            .map(|key| match db.get(key, now) {
                // a wrong-typed key reads as nil in MGET, never an error
                Ok(Some(data)) => Reply::Bulk(data),
                Ok(None) | Err(_) => Reply::Nil,
            })
            .collect();
        Reply::Array(replies)
    }))
}

pub(crate) fn append(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, suffix] = args else {
        return Err(CommandError::WrongArity("append"));
    };
    let key = utf8_arg(key)?;
    let suffix = suffix.clone();
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().append(&key, &suffix, now) {
            Ok(len) => Reply::Int(len as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn strlen(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("strlen"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().strlen(&key, now) {
            Ok(len) => Reply::Int(len as i64),
            Err(e) => e.into(),
        }
    }))
}

/// INCR/DECR: fixed delta of ±1.
pub(crate) fn incr_by_const(
    args: &[Bytes],
    name: &'static str,
    delta: i64,
) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity(name));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().incr_by(&key, delta, now) {
            Ok(n) => Reply::Int(n),
            Err(e) => e.into(),
        }
    }))
}

/// INCRBY/DECRBY: client-supplied delta, negated for DECRBY.
pub(crate) fn incr_by(
    args: &[Bytes],
    name: &'static str,
    negate: bool,
) -> Result<Operation, CommandError> {
    let [key, delta] = args else {
        return Err(CommandError::WrongArity(name));
    };
    let key = utf8_arg(key)?;
    let delta = int_arg(delta)?;
    let delta = if negate {
        delta.checked_neg().ok_or(CommandError::InvalidInteger)?
    } else {
        delta
    };
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().incr_by(&key, delta, now) {
            Ok(n) => Reply::Int(n),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn incr_by_float(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, delta] = args else {
        return Err(CommandError::WrongArity("incrbyfloat"));
    };
    let key = utf8_arg(key)?;
    let delta = float_arg(delta)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().incr_by_float(&key, delta, now) {
            Ok(n) => Reply::bulk(cinder_core::format_float(n)),
            Err(e) => e.into(),
        }
    }))
}
