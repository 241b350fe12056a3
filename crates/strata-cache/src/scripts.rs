//! Server-side scripts for atomic reference resolution.
//!
//! Multi-command sequences are only atomic when expressed as one script,
//! so every resolution path is a single scripted round trip. Key names
//! and namespace prefixes arrive as `KEYS`/`ARGV` parameters — nothing
//! is interpolated into the script body, which keeps the sources
//! constant and lets the client cache them server-side by SHA.

use redis::Script;

/// Resolve one index key to its single referenced payload.
///
/// KEYS[1] = index key, ARGV[1] = payload key prefix.
const RESOLVE_ONE: &str = r"
local ref = redis.call('GET', KEYS[1])
if not ref then
    return false
end
return redis.call('GET', ARGV[1] .. ref)
";

/// Resolve one index key holding a comma-joined reference list.
///
/// KEYS[1] = index key, ARGV[1] = payload key prefix. A leading comma
/// is a tolerated artifact, stripped rather than treated as an empty
/// first reference.
const RESOLVE_LIST: &str = r"
local raw = redis.call('GET', KEYS[1])
if not raw then
    return {}
end
if string.sub(raw, 1, 1) == ',' then
    raw = string.sub(raw, 2)
end
local keys = {}
for ref in (raw .. ','):gmatch('(.-),') do
    if ref ~= '' then
        table.insert(keys, ARGV[1] .. ref)
    end
end
if #keys == 0 then
    return {}
end
return redis.call('MGET', unpack(keys))
";

/// Resolve many index keys, fetching each distinct reference list once.
///
/// KEYS = index keys, ARGV[1] = payload key prefix. Two index keys
/// holding an identical raw list are de-duplicated across the batch.
const RESOLVE_BATCH: &str = r"
local results = {}
local seen = {}
for _, key in ipairs(KEYS) do
    local raw = redis.call('GET', key)
    if raw and not seen[raw] then
        seen[raw] = true
        if string.sub(raw, 1, 1) == ',' then
            raw = string.sub(raw, 2)
        end
        local keys = {}
        for ref in (raw .. ','):gmatch('(.-),') do
            if ref ~= '' then
                table.insert(keys, ARGV[1] .. ref)
            end
        end
        if #keys > 0 then
            table.insert(results, redis.call('MGET', unpack(keys)))
        end
    end
end
return results
";

/// Scan the index namespace for keys matching user prefixes and resolve
/// the union as a batch.
///
/// ARGV[1] = index key prefix, ARGV[2] = payload key prefix,
/// ARGV[3..] = user key prefixes. Discovered keys are de-duplicated
/// across prefixes, then identical reference lists across the union.
/// Iteration is cursor-based, never one unbounded listing.
const RESOLVE_PREFIX: &str = r"
local results = {}
local seen_keys = {}
local seen_lists = {}
for i = 3, #ARGV do
    local pattern = ARGV[1] .. ARGV[i] .. '*'
    local cursor = '0'
    repeat
        local scan = redis.call('SCAN', cursor, 'MATCH', pattern, 'COUNT', 1000)
        cursor = scan[1]
        for _, key in ipairs(scan[2]) do
            if not seen_keys[key] then
                seen_keys[key] = true
                local raw = redis.call('GET', key)
                if raw and not seen_lists[raw] then
                    seen_lists[raw] = true
                    if string.sub(raw, 1, 1) == ',' then
                        raw = string.sub(raw, 2)
                    end
                    local keys = {}
                    for ref in (raw .. ','):gmatch('(.-),') do
                        if ref ~= '' then
                            table.insert(keys, ARGV[2] .. ref)
                        end
                    end
                    if #keys > 0 then
                        table.insert(results, redis.call('MGET', unpack(keys)))
                    end
                end
            end
        end
    until cursor == '0'
end
return results
";

/// Precompiled resolution scripts, one set per reference cache.
pub(crate) struct ReferenceScripts {
    pub resolve_one: Script,
    pub resolve_list: Script,
    pub resolve_batch: Script,
    pub resolve_prefix: Script,
}

impl ReferenceScripts {
    pub fn new() -> Self {
        Self {
            resolve_one: Script::new(RESOLVE_ONE),
            resolve_list: Script::new(RESOLVE_LIST),
            resolve_batch: Script::new(RESOLVE_BATCH),
            resolve_prefix: Script::new(RESOLVE_PREFIX),
        }
    }
}
