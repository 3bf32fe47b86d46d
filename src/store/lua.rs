//! Lua scripts for the Redis store implementation

// Lua script to delete a hash field only while it still holds the expected value
// Used to release a reservation without clobbering one taken over by somebody else
//
// KEYS[1]: hash key
// ARGV[1]: field
// ARGV[2]: expected value
//
// Returns:
//   1 if the field was deleted
//   0 if the field is missing or holds another value
pub static HASH_DELETE_IF_EQ_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], ARGV[1])
if current == ARGV[2] then
    return redis.call('HDEL', KEYS[1], ARGV[1])
end
return 0
"#;

// Lua script to delete a string key only while it still holds the expected value
// Used to drop a pairing ticket without touching one reissued to somebody else
//
// KEYS[1]: key
// ARGV[1]: expected value
//
// Returns:
//   1 if the key was deleted
//   0 if the key is missing or holds another value
pub static DELETE_IF_EQ_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

// Lua script for sorted set range queries returning members with scores as a flat array
//
// KEYS[1]: sorted set key
// ARGV[1]: minimum score
// ARGV[2]: maximum score
// ARGV[3]: 'asc' or 'desc'
// ARGV[4]: limit, negative for no limit
//
// Returns: { member1, score1, member2, score2, ... }
pub static RANGE_BY_SCORE_SCRIPT: &str = r#"
local limit = tonumber(ARGV[4])
if ARGV[3] == 'desc' then
    return redis.call('ZREVRANGEBYSCORE', KEYS[1], ARGV[2], ARGV[1], 'WITHSCORES', 'LIMIT', 0, limit)
end
return redis.call('ZRANGEBYSCORE', KEYS[1], ARGV[1], ARGV[2], 'WITHSCORES', 'LIMIT', 0, limit)
"#;
