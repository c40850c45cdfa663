//! Set commands.

use bytes::Bytes;
use cinder_core::{CommandError, Operation, Reply};

use super::{utf8_arg, utf8_args};

pub(crate) fn sadd(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongArity("sadd"));
    }
    let key = utf8_arg(&args[0])?;
    let members = utf8_args(&args[1..])?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().sadd(&key, &members, now) {
            Ok(added) => Reply::Int(added as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn srem(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongArity("srem"));
    }
    let key = utf8_arg(&args[0])?;
    let members = utf8_args(&args[1..])?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().srem(&key, &members, now) {
            Ok(removed) => Reply::Int(removed as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn smembers(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("smembers"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().smembers(&key, now) {
            Ok(members) => Reply::Array(members.into_iter().map(Reply::bulk).collect()),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn sismember(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, member] = args else {
        return Err(CommandError::WrongArity("sismember"));
    };
    let key = utf8_arg(key)?;
    let member = utf8_arg(member)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().sismember(&key, &member, now) {
            Ok(present) => Reply::from_bool(present),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn scard(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("scard"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().scard(&key, now) {
            Ok(len) => Reply::Int(len as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn spop(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("spop"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().spop(&key, now) {
            Ok(Some(member)) => Reply::bulk(member),
            Ok(None) => Reply::Nil,
            Err(e) => e.into(),
        }
    }))
}

/// SUNION/SINTER/SDIFF share their argument shape.
pub(crate) fn algebra(args: &[Bytes], name: &'static str) -> Result<Operation, CommandError> {
    if args.is_empty() {
        return Err(CommandError::WrongArity(name));
    }
    let keys = utf8_args(args)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        let db = ctx.db();
        let result = match name {
            "sunion" => db.sunion(&keys, now),
            "sinter" => db.sinter(&keys, now),
            _ => db.sdiff(&keys, now),
        };
        match result {
            Ok(members) => Reply::Array(members.into_iter().map(Reply::bulk).collect()),
            Err(e) => e.into(),
        }
    }))
}
