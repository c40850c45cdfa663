//! HyperLogLog commands (exact-count emulation).

use bytes::Bytes;
use cinder_core::{CommandError, Operation, Reply};

use super::{utf8_arg, utf8_args};

pub(crate) fn pfadd(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.is_empty() {
        return Err(CommandError::WrongArity("pfadd"));
    }
    let key = utf8_arg(&args[0])?;
    let elements: Vec<Bytes> = args[1..].to_vec();
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().pfadd(&key, &elements, now) {
            Ok(changed) => Reply::from_bool(changed),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn pfcount(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.is_empty() {
        return Err(CommandError::WrongArity("pfcount"));
    }
    let keys = utf8_args(args)?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().pfcount(&keys, now) {
            Ok(count) => Reply::Int(count as i64),
            Err(e) => e.into(),
        }
    }))
}

pub(crate) fn pfmerge(args: &[Bytes]) -> Result<Operation, CommandError> {
    if args.is_empty() {
        return Err(CommandError::WrongArity("pfmerge"));
    }
    let dest = utf8_arg(&args[0])?;
    let sources = utf8_args(&args[1..])?;
    Ok(Box::new(move |ctx| {
        let now = ctx.now;
        match ctx.db().pfmerge(&dest, &sources, now) {
            Ok(()) => Reply::ok(),
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
    fn pfadd_pfcount_pfmerge() {
        let instance = Instance::new();
        let mut session = Session::new(true);
        assert_eq!(
            run(&instance, &mut session, "PFADD", &["h", "a", "b"]),
            Reply::Int(1)
        );
        assert_eq!(run(&instance, &mut session, "PFADD", &["h", "a"]), Reply::Int(0));
        assert_eq!(run(&instance, &mut session, "PFCOUNT", &["h"]), Reply::Int(2));

        run(&instance, &mut session, "PFADD", &["other", "c"]);
        assert_eq!(
            run(&instance, &mut session, "PFCOUNT", &["h", "other"]),
            Reply::Int(3)
        );
        assert_eq!(
            run(&instance, &mut session, "PFMERGE", &["dest", "h", "other"]),
            Reply::ok()
        );
        assert_eq!(run(&instance, &mut session, "PFCOUNT", &["dest"]), Reply::Int(3));
    }

    #[test]
    fn type_reports_string_for_hll() {
        let instance = Instance::new();
        let mut session = Session::new(true);
        run(&instance, &mut session, "PFADD", &["h", "x"]);
        assert_eq!(
            run(&instance, &mut session, "TYPE", &["h"]),
            Reply::Simple("string".into())
        );
    }
}
