use serde::{
    Deserialize,
    Deserializer,
};
use serde_json::Value;

/// Scheme Plex puts in front of MusicBrainz ids in `Guid` lists
pub const MBID_PREFIX: &str = "mbid://";


/// Strips exactly [`MBID_PREFIX`] from `id`, rejecting ids from any other agent
pub fn strip_mbid(id: &str) -> Option<&str> { id.strip_prefix(MBID_PREFIX).filter(|mbid| !mbid.is_empty()) }

/// First MusicBrainz id in a Plex `Guid` list: `[{ "id": "mbid://..." }, ...]`
pub fn first_mbid<'v>(guids: impl IntoIterator<Item = &'v Value>) -> Option<&'v str> {
    guids
        .into_iter()
        .filter_map(|guid| guid.get("id").and_then(Value::as_str))
        .find_map(strip_mbid)
}

/// Plex is not consistent about numbers, some arrive as strings
pub fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `deserialize_with` counterpart of [`lenient_u64`]; shape mismatches become `None`
pub fn opt_lenient_u64<'de, D>(de: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(de).map(|v| v.as_ref().and_then(lenient_u64))
}
