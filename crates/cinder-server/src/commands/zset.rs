//! Sorted-set commands.

use bytes::Bytes;
use cinder_core::db::ZAddFlags;
use cinder_core::{format_float, CommandError, Operation, Reply};

use super::{float_arg, int_arg, utf8_arg, utf8_args};

/// ZADD key [NX|XX] [CH] score member [score member ...]
pub(crate) fn zadd(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() < 3 {
        return Err(CommandError::WrongArity("zadd"));
    }
    let key = utf8_arg(&args[0])?;

    let mut flags = ZAddFlags::default();
    let mut index = 1;
    while index < args.len() {
        let arg = &args[index];
        if arg.eq_ignore_ascii_case(b"NX") {
            flags.nx = true;
        } else if arg.eq_ignore_ascii_case(b"XX") {
            flags.xx = true;
        } else if arg.eq_ignore_ascii_case(b"CH") {
            flags.ch = true;
        } else {
            break;
        }
        index += 1;
    }
    if flags.nx && flags.xx {
        return Err(CommandError::Syntax);
    }

    let pairs = &args[index..];
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(CommandError::Syntax);
    }
    let mut members = Vec::with_capacity(pairs.len() / 2);
    for chunk in pairs.chunks_exact(2) {
        members.push((float_arg(&chunk[0])?, utf8_arg(&chunk[1])?));
    }

    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().zadd(&key, flags, &members, now) {
            Ok(count) => Reply::Int(count as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn zrem(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::WrongArity("zrem"));
    }
    let key = utf8_arg(&args[0])?;
    let members = utf8_args(&args[1..])?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().zrem(&key, &members, now) {
            Ok(removed) => Reply::Int(removed as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn zscore(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, member] = args else {
        return Err(CommandError::WrongArity("zscore"));
    };
    let key = utf8_arg(key)?;
    let member = utf8_arg(member)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().zscore(&key, &member, now) {
            Ok(Some(score)) => Reply::bulk(format_float(score)),
            Ok(None) => Reply::Nil,
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn zcard(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("zcard"));
    };
    let key = utf8_arg(key)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().zcard(&key, now) {
            Ok(len) => Reply::Int(len as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn zrank(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, member] = args else {
        return Err(CommandError::WrongArity("zrank"));
    };
    let key = utf8_arg(key)?;
    let member = utf8_arg(member)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().zrank(&key, &member, now) {
            Ok(Some(rank)) => Reply::Int(rank as i64),
            Ok(None) => Reply::Nil,
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn zincrby(args: &[Bytes]) -> Result<Operation, CommandError> {
    let [key, delta, member] = args else {
        return Err(CommandError::WrongArity("zincrby"));
    };
    let key = utf8_arg(key)?;
    let delta = float_arg(delta)?;
    let member = utf8_arg(member)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().zincr_by(&key, &member, delta, now) {
            Ok(score) => Reply::bulk(format_float(score)),
            Err(e) => e.into(),
        }
    }))
}

/// ZRANGE/ZREVRANGE key start stop [WITHSCORES]
pub(crate) fn zrange(args: &[Bytes], rev: bool) -> Result<Operation, CommandError> {
    let name: &'static str = if rev { "zrevrange" } else { "zrange" };
    if args.len() != 3 && args.len() != 4 {
        return Err(CommandError::WrongArity(name));
    }
    let key = utf8_arg(&args[0])?;
    let start = int_arg(&args[1])?;
    let stop = int_arg(&args[2])?;
    let with_scores = match args.get(3) {
        None => false,
        Some(flag) if flag.eq_ignore_ascii_case(b"WITHSCORES") => true,
        Some(_) => return Err(CommandError::Syntax),
    };
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().zrange(&key, start, stop, rev, now) {
            Ok(members) => render(members, with_scores),
            Err(e) => e.into(),
        }
    }))
}

/// ZRANGEBYSCORE key min max [WITHSCORES]; bounds accept `(` prefixes
/// and ±inf.
pub(crate) fn zrangebyscore(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.len() != 3 && args.len() != 4 {
        return Err(CommandError::WrongArity("zrangebyscore"));
    }
    let key = utf8_arg(&args[0])?;
    let (min, min_exclusive) = score_bound(&args[1])?;
    let (max, max_exclusive) = score_bound(&args[2])?;
    let with_scores = match args.get(3) {
        None => false,
        Some(flag) if flag.eq_ignore_ascii_case(b"WITHSCORES") => true,
        Some(_) => return Err(CommandError::Syntax),
    };
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx
            .db()
            .zrange_by_score(&key, min, min_exclusive, max, max_exclusive, now)
        {
            Ok(members) => render(members, with_scores),
            Err(e) => e.into(),
        }
    }))
}

fn render(members: Vec<(String, f64)>, with_scores: bool) -> Reply {
    let mut replies = Vec::with_capacity(if with_scores {
        members.len() * 2
    } else {
        members.len()
    });
    for (member, score) in members {
        replies.push(Reply::bulk(member));
        if with_scores {
            replies.push(Reply::bulk(format_float(score)));
        }
    }
    Reply::Array(replies)
}

/// Parses a score range bound: `5`, `(5`, `-inf`, `+inf`.
fn score_bound(arg: &Bytes) -> Result<(f64, bool), CommandError> {
    let raw = std::str::from_utf8(arg).map_err(|_| CommandError::InvalidFloat)?;
    let (raw, exclusive) = match raw.strip_prefix('(') {
        Some(rest) => (rest, true),
        None => (raw, false),
    };
    let value = match raw.to_ascii_lowercase().as_str() {
        "-inf" | "-infinity" => f64::NEG_INFINITY,
        "+inf" | "inf" | "+infinity" | "infinity" => f64::INFINITY,
        other => other.parse().map_err(|_| CommandError::InvalidFloat)?,
    };
    Ok((value, exclusive))
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
    fn zadd_zrange_with_scores() {
        let instance = Instance::new();
        let mut session = Session::new(true);
        assert_eq!(
            run(&instance, &mut session, "ZADD", &["z", "2", "b", "1", "a"]),
            Reply::Int(2)
        );
        assert_eq!(
            run(&instance, &mut session, "ZRANGE", &["z", "0", "-1", "WITHSCORES"]),
            Reply::Array(vec![
                Reply::bulk("a"),
                Reply::bulk("1"),
                Reply::bulk("b"),
                Reply::bulk("2"),
            ])
        );
        assert_eq!(
            run(&instance, &mut session, "ZREVRANGE", &["z", "0", "0"]),
            Reply::Array(vec![Reply::bulk("b")])
        );
    }

    #[test]
    fn score_bounds() {
        assert_eq!(score_bound(&Bytes::from("5")).unwrap(), (5.0, false));
        assert_eq!(score_bound(&Bytes::from("(5")).unwrap(), (5.0, true));
        assert_eq!(
            score_bound(&Bytes::from("-inf")).unwrap(),
            (f64::NEG_INFINITY, false)
        );
        assert!(score_bound(&Bytes::from("abc")).is_err());
    }

    #[test]
    fn zrangebyscore_exclusive() {
        let instance = Instance::new();
        let mut session = Session::new(true);
        run(
            &instance,
            &mut session,
            "ZADD",
            &["z", "1", "a", "2", "b", "3", "c"],
        );
        assert_eq!(
            run(&instance, &mut session, "ZRANGEBYSCORE", &["z", "(1", "+inf"]),
            Reply::Array(vec![Reply::bulk("b"), Reply::bulk("c")])
        );
    }

    #[test]
    fn zscore_and_rank() {
        let instance = Instance::new();
        let mut session = Session::new(true);
        run(&instance, &mut session, "ZADD", &["z", "1.5", "m"]);
        assert_eq!(
            run(&instance, &mut session, "ZSCORE", &["z", "m"]),
            Reply::Bulk(Bytes::from("1.5"))
        );
        assert_eq!(run(&instance, &mut session, "ZRANK", &["z", "m"]), Reply::Int(0));
        assert_eq!(run(&instance, &mut session, "ZRANK", &["z", "x"]), Reply::Nil);
    }
}
