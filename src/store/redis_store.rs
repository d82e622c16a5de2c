use dashmap::DashMap;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{Client, ConnectionInfo, RedisError};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::store::{
    words, DocumentStore, FieldType, IndexDefinition, JsonPath, Multi, SearchQuery, SearchResult, StoreError, WriteOp
};

const MINOR_UNITS: i64 = 10_000;
const SEARCH_LIMIT: usize = 10_000;

/// Applies a whole write set. Every key and path is checked before anything is written,
/// and balances are added as exact fixed-point text rather than through float math.
/// Replies `OK`, or a newline separated failure code with the offending key and path.
const APPLY_SCRIPT: &str = r#"
local ops = cjson.decode(ARGV[1])
local balances = {}
local order = {}

for _, op in ipairs(ops) do
    local key = KEYS[op.k]
    if redis.call('EXISTS', key) == 0 then
        return 'NOKEY\n' .. key
    end
    local types = redis.call('JSON.TYPE', key, op.path)
    if #types == 0 then
        return 'NOPATH\n' .. key .. '\n' .. op.path
    end
    if op.op == 'append' then
        if types[1] ~= 'array' then
            return 'WRONGTYPE\n' .. key .. '\n' .. op.path .. '\narray'
        end
    else
        local slot = key .. '\n' .. op.path
        local balance = balances[slot]
        if balance == nil then
            local raw = redis.call('JSON.GET', key, op.path)
            local sign, whole, fraction = string.match(raw, '^%["?(%-?)(%d+)%.?(%d*)"?%]$')
            if whole == nil or #fraction > 4 or #whole > 11 then
                return 'WRONGTYPE\n' .. key .. '\n' .. op.path .. '\nnumber'
            end
            local minor = tonumber(whole) * 10000 + tonumber((fraction .. '0000'):sub(1, 4))
            if sign == '-' then
                minor = -minor
            end
            balance = { key = key, path = op.path, minor = minor }
            balances[slot] = balance
            table.insert(order, balance)
        end
        balance.minor = balance.minor + tonumber(op.delta)
        if math.abs(balance.minor) >= 1e15 then
            return 'OVERFLOW\n' .. key .. '\n' .. op.path
        end
    end
end

for _, op in ipairs(ops) do
    if op.op == 'append' then
        redis.call('JSON.ARRAPPEND', KEYS[op.k], op.path, op.value)
    end
end

for _, balance in ipairs(order) do
    local minor = balance.minor
    local sign = ''
    if minor < 0 then
        sign = '-'
        minor = -minor
    end
    local text = string.format('%s%d.%04d', sign, math.floor(minor / 10000), minor % 10000)
    redis.call('JSON.SET', balance.key, balance.path, cjson.encode(text))
end

return 'OK'
"#;

/// [`DocumentStore`] backed by a Redis server with the RedisJSON and RediSearch modules.
///
/// Plain commands share one auto-reconnecting [`ConnectionManager`]. Every `watch` opens
/// its own connection, because WATCH state belongs to the connection that issued it.
pub struct RedisStore {
    client: Client,
    connection: ConnectionManager,
    indices: DashMap<String, IndexDefinition>
}

/// A connection with WATCH issued on the observed keys.
pub struct RedisWatch {
    connection: MultiplexedConnection,
    keys: Vec<String>
}

fn unavailable(error: RedisError) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

impl RedisStore {
    pub async fn connect(info: ConnectionInfo) -> Result<Self, StoreError> {
        let client = Client::open(info).map_err(unavailable)?;

        // The manager retries its first connection with back-off; an unreachable server
        // should fail on the first refusal instead.
        let mut first = client.get_multiplexed_async_connection().await.map_err(unavailable)?;
        let _: String = redis::cmd("PING").query_async(&mut first).await.map_err(unavailable)?;

        let connection = ConnectionManager::new(client.clone()).await.map_err(unavailable)?;

        Ok(Self {
            client,
            connection,
            indices: DashMap::new()
        })
    }

    /// Shared connection, for services that live on the same server.
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

/// Converts an increment into whole minor units, rejecting sub-unit precision.
pub(super) fn minor_units(key: &str, path: &str, delta: Decimal) -> Result<String, StoreError> {
    let overflow = || StoreError::Overflow { key: key.to_string(), path: path.to_string() };
    let scaled = delta.checked_mul(Decimal::from(MINOR_UNITS)).ok_or_else(overflow)?;

    if !scaled.fract().is_zero() {
        return Err(StoreError::InvalidQuery {
            index: key.to_string(),
            reason: format!("increment {delta} at [{path}] is finer than 4 decimal places")
        });
    }

    Ok(scaled.trunc().normalize().to_string())
}

/// Splits a write set into the distinct keys it touches and the script argument.
pub(super) fn encode_ops(multi: Multi) -> Result<(Vec<String>, String), StoreError> {
    let mut keys: Vec<String> = Vec::new();
    let mut ops = Vec::new();

    for op in multi.into_ops() {
        let slot = match keys.iter().position(|key| key == op.key()) {
            Some(index) => index + 1,
            None => {
                keys.push(op.key().to_string());
                keys.len()
            }
        };

        let encoded = match op {
            WriteOp::Append { path, value, .. } => {
                JsonPath::parse(&path)?;
                json!({ "k": slot, "op": "append", "path": path, "value": value.to_string() })
            }
            WriteOp::IncrBy { key, path, delta } => {
                JsonPath::parse(&path)?;
                json!({ "k": slot, "op": "incr", "path": path, "delta": minor_units(&key, &path, delta)? })
            }
        };

        ops.push(encoded);
    }

    Ok((keys, Value::Array(ops).to_string()))
}

/// Maps the reply of the apply script onto the store's error kinds.
pub(super) fn apply_outcome(reply: &str) -> Result<(), StoreError> {
    let mut parts = reply.split('\n');

    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("OK"), None, ..) => Ok(()),
        (Some("NOKEY"), Some(key), ..) => Err(StoreError::not_found(key, "$")),
        (Some("NOPATH"), Some(key), Some(path), _) => Err(StoreError::not_found(key, path)),
        (Some("WRONGTYPE"), Some(key), Some(path), Some("array")) => Err(StoreError::wrong_type(key, path, "an array")),
        (Some("WRONGTYPE"), Some(key), Some(path), _) => Err(StoreError::wrong_type(key, path, "a number")),
        (Some("OVERFLOW"), Some(key), Some(path), _) => Err(StoreError::Overflow { key: key.to_string(), path: path.to_string() }),
        _ => Err(StoreError::Unavailable(format!("unexpected reply from write script: {reply:?}")))
    }
}

/// RediSearch query for a definition, `None` when the query can match nothing.
pub(super) fn search_query(definition: &IndexDefinition, query: &SearchQuery) -> Result<Option<String>, StoreError> {
    match (definition.field_type, query) {
        (FieldType::Text, SearchQuery::Text(text)) => {
            let wanted: Vec<String> = words(text).collect();

            Ok((!wanted.is_empty()).then(|| format!("@{}:({})", definition.field, wanted.join(" "))))
        }
        (FieldType::Tag, SearchQuery::Tag(tag)) => {
            let tag = tag.trim();
            let escaped: String = tag.chars()
                .flat_map(|c| if c.is_alphanumeric() { vec![c] } else { vec!['\\', c] })
                .collect();

            Ok((!tag.is_empty()).then(|| format!("@{}:{{{}}}", definition.field, escaped)))
        }
        _ => Err(StoreError::InvalidQuery {
            index: definition.name.clone(),
            reason: format!("field [{}] is {:?}", definition.field, definition.field_type)
        })
    }
}

fn search_document(key: &str, fields: Vec<String>) -> Result<Value, StoreError> {
    let mut fields = fields.into_iter();

    while let (Some(name), Some(value)) = (fields.next(), fields.next()) {
        if name == "$" {
            return Ok(serde_json::from_str(&value)?);
        }
    }

    Err(StoreError::not_found(key, "$"))
}

impl DocumentStore for RedisStore {
    type Watch = RedisWatch;

    async fn ping(&self) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut connection).await.map_err(unavailable)?;

        Ok(())
    }

    async fn create_index(&self, index: IndexDefinition) -> Result<(), StoreError> {
        JsonPath::parse(&index.path)?;

        let kind = match index.field_type {
            FieldType::Text => "TEXT",
            FieldType::Tag => "TAG"
        };
        let mut connection = self.connection.clone();

        let created: Result<String, RedisError> = redis::cmd("FT.CREATE")
            .arg(&index.name)
            .arg("ON")
            .arg("JSON")
            .arg("PREFIX")
            .arg(1)
            .arg(&index.prefix)
            .arg("SCHEMA")
            .arg(&index.path)
            .arg("AS")
            .arg(&index.field)
            .arg(kind)
            .query_async(&mut connection)
            .await;

        let name = index.name.clone();

        // Definitions are remembered even when another instance created the index first.
        self.indices.insert(name.clone(), index);

        match created {
            Ok(_) => {
                debug!("Created index [{name}]");
                Ok(())
            }
            Err(error) if error.to_string().to_lowercase().contains("index already exists") => {
                Err(StoreError::IndexExists { index: name })
            }
            Err(error) => Err(unavailable(error))
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let count: u64 = redis::cmd("EXISTS").arg(key).query_async(&mut connection).await.map_err(unavailable)?;

        Ok(count > 0)
    }

    async fn get(&self, key: &str, path: &str) -> Result<Value, StoreError> {
        JsonPath::parse(path)?;

        let mut connection = self.connection.clone();
        let raw: Option<String> = redis::cmd("JSON.GET")
            .arg(key)
            .arg(path)
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;

        let raw = raw.ok_or_else(|| StoreError::not_found(key, "$"))?;
        let mut found: Vec<Value> = serde_json::from_str(&raw)?;

        if found.is_empty() {
            return Err(StoreError::not_found(key, path));
        }

        Ok(found.swap_remove(0))
    }

    async fn set_if_absent(&self, key: &str, document: Value) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let written: Option<String> = redis::cmd("JSON.SET")
            .arg(key)
            .arg("$")
            .arg(document.to_string())
            .arg("NX")
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;

        Ok(written.is_some())
    }

    async fn watch(&self, keys: &[&str]) -> Result<RedisWatch, StoreError> {
        let mut connection = self.client.get_multiplexed_async_connection().await.map_err(unavailable)?;
        let _: () = redis::cmd("WATCH").arg(keys).query_async(&mut connection).await.map_err(unavailable)?;

        Ok(RedisWatch {
            connection,
            keys: keys.iter().map(|key| key.to_string()).collect()
        })
    }

    async fn exec(&self, watch: RedisWatch, multi: Multi) -> Result<(), StoreError> {
        let RedisWatch { mut connection, keys: watched } = watch;
        let (keys, ops) = encode_ops(multi)?;

        trace!("Executing {} write key(s) under watch of {watched:?}", keys.len());

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("EVAL")
            .arg(APPLY_SCRIPT)
            .arg(keys.len())
            .arg(&keys)
            .arg(ops);

        let replies: Option<Vec<String>> = pipe.query_async(&mut connection).await.map_err(unavailable)?;

        match replies {
            None => {
                debug!("Aborting exec, a watched key among {watched:?} changed");
                Err(StoreError::Conflict { key: watched.join(", ") })
            }
            Some(replies) => match replies.first() {
                Some(reply) => apply_outcome(reply),
                None => Err(StoreError::Unavailable("empty reply from exec".to_string()))
            }
        }
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResult, StoreError> {
        let definition = self.indices.get(index)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::UnknownIndex { index: index.to_string() })?;

        let Some(expression) = search_query(&definition, query)? else {
            return Ok(SearchResult::default());
        };

        let mut connection = self.connection.clone();
        let reply: Vec<redis::Value> = redis::cmd("FT.SEARCH")
            .arg(index)
            .arg(&expression)
            .arg("LIMIT")
            .arg(0)
            .arg(SEARCH_LIMIT)
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;

        let mut items = reply.iter();
        let total: usize = match items.next() {
            Some(count) => redis::from_redis_value(count).map_err(unavailable)?,
            None => 0
        };

        let mut documents = Vec::new();

        while let (Some(key), Some(fields)) = (items.next(), items.next()) {
            let key: String = redis::from_redis_value(key).map_err(unavailable)?;
            let fields: Vec<String> = redis::from_redis_value(fields).map_err(unavailable)?;

            documents.push((key.clone(), search_document(&key, fields)?));
        }

        documents.sort_by(|left, right| left.0.cmp(&right.0));

        Ok(SearchResult { total, documents })
    }
}
