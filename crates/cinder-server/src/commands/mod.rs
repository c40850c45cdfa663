//! Command handlers: argument validation and bound operations.
//!
//! Every data command goes through [`prepare`]: the handler checks
//! arity and argument syntax up front, then closes over the validated
//! arguments in an [`Operation`] for the dispatch boundary. Validation
//! failures surface before any keyspace access — inside a transaction
//! they mark the queue dirty instead of running anything.

use bytes::Bytes;
use cinder_core::{CommandError, Operation};

pub mod generic;
pub mod hash;
pub mod hll;
pub mod list;
pub mod set;
pub mod string;
pub mod stream;
pub mod zset;

/// Routes a command name (already upper-cased) to its handler.
///
/// Connection-state commands (AUTH, SELECT, SUBSCRIBE, MULTI, ...) are
/// not listed here — the connection layer owns those because they
/// mutate the session rather than a keyspace.
pub fn prepare(name: &str, args: &[Bytes]) -> Result<Operation, CommandError> {
    match name {
        // connection & server
        "PING" => generic::ping(args),
        "ECHO" => generic::echo(args),
        "TIME" => generic::time(args),
        "DBSIZE" => generic::dbsize(args),
        "FLUSHDB" => generic::flushdb(args),
        "FLUSHALL" => generic::flushall(args),
        "SWAPDB" => generic::swapdb(args),

        // keyspace
        "KEYS" => generic::keys(args),
        "SCAN" => generic::scan(args),
        "RANDOMKEY" => generic::randomkey(args),
        "TYPE" => generic::type_cmd(args),
        "EXISTS" => generic::exists(args),
        "DEL" => generic::del(args),
        "RENAME" => generic::rename(args, false),
        "RENAMENX" => generic::rename(args, true),
        "MOVE" => generic::move_cmd(args),
        "OBJECT" => generic::object(args),

        // expiry
        "EXPIRE" => generic::expire(args, "expire", 1000),
        "PEXPIRE" => generic::expire(args, "pexpire", 1),
        "EXPIREAT" => generic::expire_at(args, "expireat", 1000),
        "PEXPIREAT" => generic::expire_at(args, "pexpireat", 1),
        "TTL" => generic::ttl(args, true),
        "PTTL" => generic::ttl(args, false),
        "PERSIST" => generic::persist(args),

        // strings
        "SET" => string::set(args),
        "GET" => string::get(args),
        "GETSET" => string::getset(args),
        "SETNX" => string::setnx(args),
        "SETEX" => string::setex(args, "setex", 1000),
        "PSETEX" => string::setex(args, "psetex", 1),
        "MSET" => string::mset(args),
        "MGET" => string::mget(args),
        "APPEND" => string::append(args),
        "STRLEN" => string::strlen(args),
        "INCR" => string::incr_by_const(args, "incr", 1),
        "DECR" => string::incr_by_const(args, "decr", -1),
        "INCRBY" => string::incr_by(args, "incrby", false),
        "DECRBY" => string::incr_by(args, "decrby", true),
        "INCRBYFLOAT" => string::incr_by_float(args),

        // hashes
        "HSET" | "HMSET" => hash::hset(args),
        "HSETNX" => hash::hsetnx(args),
        "HGET" => hash::hget(args),
        "HMGET" => hash::hmget(args),
        "HDEL" => hash::hdel(args),
        "HGETALL" => hash::hgetall(args),
        "HKEYS" => hash::hkeys(args),
        "HVALS" => hash::hvals(args),
        "HLEN" => hash::hlen(args),
        "HEXISTS" => hash::hexists(args),
        "HINCRBY" => hash::hincrby(args),
        "HSTRLEN" => hash::hstrlen(args),

        // lists (blocking variants are handled by the connection layer)
        "LPUSH" => list::push(args, true),
        "RPUSH" => list::push(args, false),
        "LPOP" => list::pop(args, true),
        "RPOP" => list::pop(args, false),
        "LLEN" => list::llen(args),
        "LRANGE" => list::lrange(args),
        "LINDEX" => list::lindex(args),
        "LSET" => list::lset(args),
        "LTRIM" => list::ltrim(args),
        "LREM" => list::lrem(args),

        // sets
        "SADD" => set::sadd(args),
        "SREM" => set::srem(args),
        "SMEMBERS" => set::smembers(args),
        "SISMEMBER" => set::sismember(args),
        "SCARD" => set::scard(args),
        "SPOP" => set::spop(args),
        "SUNION" => set::algebra(args, "sunion"),
        "SINTER" => set::algebra(args, "sinter"),
        "SDIFF" => set::algebra(args, "sdiff"),

        // sorted sets
        "ZADD" => zset::zadd(args),
        "ZREM" => zset::zrem(args),
        "ZSCORE" => zset::zscore(args),
        "ZCARD" => zset::zcard(args),
        "ZRANK" => zset::zrank(args),
        "ZINCRBY" => zset::zincrby(args),
        "ZRANGE" => zset::zrange(args, false),
        "ZREVRANGE" => zset::zrange(args, true),
        "ZRANGEBYSCORE" => zset::zrangebyscore(args),

        // streams
        "XADD" => stream::xadd(args),
        "XLEN" => stream::xlen(args),
        "XRANGE" => stream::xrange(args),
        "XDEL" => stream::xdel(args),

        // hyperloglog
        "PFADD" => hll::pfadd(args),
        "PFCOUNT" => hll::pfcount(args),
        "PFMERGE" => hll::pfmerge(args),

        other => Err(CommandError::UnknownCommand(other.to_lowercase())),
    }
}

/// Decodes one argument as UTF-8 (keys, members, fields).
pub(crate) fn utf8_arg(arg: &Bytes) -> Result<String, CommandError> {
    String::from_utf8(arg.to_vec()).map_err(|_| CommandError::InvalidUtf8)
}

/// Decodes a whole argument slice as UTF-8 strings.
pub(crate) fn utf8_args(args: &[Bytes]) -> Result<Vec<String>, CommandError> {
    args.iter().map(utf8_arg).collect()
}

/// Parses an i64 argument.
pub(crate) fn int_arg(arg: &Bytes) -> Result<i64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::InvalidInteger)
}

/// Parses an f64 argument.
pub(crate) fn float_arg(arg: &Bytes) -> Result<f64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or(CommandError::InvalidFloat)
}
