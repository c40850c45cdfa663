//! Hash commands.

use bytes::Bytes;
use cinder_core::{CommandError, Operation, Reply};

use super::{int_arg, utf8_arg, utf8_args};

/// HSET key field value [field value ...] — the deprecated HMSET
/// alias routes here too and gets the new-field-count reply instead
/// of its historical +OK.
pub(crate) fn hset(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() < 3 || args.len() % 2 == 0 {
        return Err(CommandError::WrongArity("hset"));
    }
    let key = utf8_arg(&args[0])?;
    let mut fields = Vec::with_capacity((args.len() - 1) / 2);
    for chunk in args[1..].chunks_exact(2) {
        fields.push((utf8_arg(&chunk[0])?, chunk[1].clone()));
    }
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hset(&key, &fields, now) {
            Ok(added) => Reply::Int(added as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hsetnx(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, field, value] = args else {
        return Err(CommandError::WrongArity("hsetnx"));
    };
    let key = utf8_arg(key)?;
    let field = utf8_arg(field)?;
    let value = value.clone();
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hsetnx(&key, &field, value, now) {
            Ok(written) => Reply::from_bool(written),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hget(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, field] = args else {
        return Err(CommandError::WrongArity("hget"));
    };
    let key = utf8_arg(key)?;
    let field = utf8_arg(field)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hget(&key, &field, now) {
            Ok(Some(value)) => Reply::Bulk(value),
            Ok(None) => Reply::Nil,
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hmget(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongArity("hmget"));
    }
    let key = utf8_arg(&args[0])?;
    let fields = utf8_args(&args[1..])?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hmget(&key, &fields, now) {
            Ok(values) => Reply::Array(
                values
                    .into_iter()
                    .map(|v| v.map(Reply::Bulk).unwrap_or(Reply::Nil))
                    .collect(),
            ),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hdel(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongArity("hdel"));
    }
    let key = utf8_arg(&args[0])?;
    let fields = utf8_args(&args[1..])?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hdel(&key, &fields, now) {
            Ok(removed) => Reply::Int(removed as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hgetall(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("hgetall"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hgetall(&key, now) {
            Ok(pairs) => {
                let mut replies = Vec::with_capacity(pairs.len() * 2);
                for (field, value) in pairs {
                    replies.push(Reply::bulk(field));
                    replies.push(Reply::Bulk(value));
                }
                Reply::Array(replies)
            }
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hkeys(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("hkeys"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hkeys(&key, now) {
            Ok(fields) => Reply::Array(fields.into_iter().map(Reply::bulk).collect()),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hvals(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("hvals"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hvals(&key, now) {
            Ok(values) => Reply::Array(values.into_iter().map(Reply::Bulk).collect()),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hlen(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("hlen"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hlen(&key, now) {
            Ok(len) => Reply::Int(len as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hexists(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, field] = args else {
        return Err(CommandError::WrongArity("hexists"));
    };
    let key = utf8_arg(key)?;
    let field = utf8_arg(field)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hexists(&key, &field, now) {
            Ok(present) => Reply::from_bool(present),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hincrby(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, field, delta] = args else {
        return Err(CommandError::WrongArity("hincrby"));
    };
    let key = utf8_arg(key)?;
    let field = utf8_arg(field)?;
    let delta = int_arg(delta)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hincr_by(&key, &field, delta, now) {
            Ok(n) => Reply::Int(n),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn hstrlen(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, field] = args else {
        return Err(CommandError::WrongArity("hstrlen"));
    };
    let key = utf8_arg(key)?;
    let field = utf8_arg(field)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().hstrlen(&key, &field, now) {
            Ok(len) => Reply::Int(len as i64),
            Err(e) => e.into(),
        }
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
    fn hset_hget_hgetall() {
        let instance = Instance::new();
        let mut session = Session::new(true);
        assert_eq!(
            run(&instance, &mut session, "HSET", &["h", "f1", "a", "f2", "b"]),
            Reply::Int(2)
        );
        assert_eq!(
            run(&instance, &mut session, "HGET", &["h", "f1"]),
            Reply::Bulk(Bytes::from("a"))
        );
        assert_eq!(run(&instance, &mut session, "HGET", &["h", "zz"]), Reply::Nil);
        let Reply::Array(pairs) = run(&instance, &mut session, "HGETALL", &["h"]) else {
            panic!("expected array");
        };
        assert_eq!(pairs.len(), 4);
        // uneven field/value arguments are an arity error
        assert!(run(&instance, &mut session, "HSET", &["h", "f1"]).is_error());
    }

    #[test]
    fn hdel_and_hlen() {
        let instance = Instance::new();
        let mut session = Session::new(true);
        run(&instance, &mut session, "HSET", &["h", "a", "1", "b", "2"]);
        assert_eq!(run(&instance, &mut session, "HLEN", &["h"]), Reply::Int(2));
        assert_eq!(
            run(&instance, &mut session, "HDEL", &["h", "a", "ghost"]),
            Reply::Int(1)
        );
        assert_eq!(run(&instance, &mut session, "HLEN", &["h"]), Reply::Int(1));
    }

    #[test]
    fn hincrby_counts() {
        let instance = Instance::new();
        let mut session = Session::new(true);
        assert_eq!(
            run(&instance, &mut session, "HINCRBY", &["h", "n", "3"]),
            Reply::Int(3)
        );
        assert_eq!(
            run(&instance, &mut session, "HINCRBY", &["h", "n", "-5"]),
            Reply::Int(-2)
        );
    }
}
