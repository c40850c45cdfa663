//! Stream commands.

use bytes::Bytes;
use cinder_core::types::stream::StreamId;
use cinder_core::{CommandError, Operation, Reply, StoreError};

use super::utf8_arg;

/// XADD key <id | *> field value [field value ...]
pub(crate) fn xadd(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() < 4 || args.len() % 2 != 0 {
        return Err(CommandError::WrongArity("xadd"));
    }
    let key = utf8_arg(&args[0])?;
    let id_arg = utf8_arg(&args[1])?;
    let id = if id_arg == "*" {
        None
    } else {
        Some(parse_id(&id_arg)?)
    };
    let mut fields = Vec::with_capacity((args.len() - 2) / 2);
    for chunk in args[2..].chunks_exact(2) {
        fields.push((utf8_arg(&chunk[0])?, chunk[1].clone()));
    }
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().xadd(&key, id, fields, now) {
            Ok(id) => Reply::bulk(id.to_string()),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn xlen(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("xlen"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().xlen(&key, now) {
            Ok(len) => Reply::Int(len as i64),
            Err(e) => e.into(),
        }
    }))
}

/// XRANGE key start end — `-` and `+` select the extremes.
pub(crate) fn xrange(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, start, end] = args else {
        return Err(CommandError::WrongArity("xrange"));
    };
    let key = utf8_arg(key)?;
    let start = range_bound(&utf8_arg(start)?, StreamId::MIN)?;
    let end = range_bound(&utf8_arg(end)?, StreamId::MAX)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().xrange(&key, start, end, now) {
            Ok(entries) => Reply::Array(
                entries
                    .into_iter()
                    .map(|entry| {
                        let mut fields = Vec::with_capacity(entry.fields.len() * 2);
                        for (field, value) in entry.fields {
                            fields.push(Reply::bulk(field));
                            fields.push(Reply::Bulk(value));
                        }
                        Reply::Array(vec![
                            Reply::bulk(entry.id.to_string()),
                            Reply::Array(fields),
                        ])
                    })
                    .collect(),
            ),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn xdel(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongArity("xdel"));
    }
    let key = utf8_arg(&args[0])?;
    let mut ids = Vec::with_capacity(args.len() - 1);
    for arg in &args[1..] {
        ids.push(parse_id(&utf8_arg(arg)?)?);
    }
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().xdel(&key, &ids, now) {
            Ok(removed) => Reply::Int(removed as i64),
            Err(e) => e.into(),
        }
    }))
}

fn parse_id(raw: &str) -> Result<StreamId, CommandError> {
    raw.parse().map_err(|_: StoreError| CommandError::Syntax)
}

fn range_bound(raw: &str, extreme: StreamId) -> Result<StreamId, CommandError> {
    match raw {
        "-" | "+" => Ok(extreme),
        other => parse_id(other),
    }
}
