use serde::de::Error;
use serde::{Deserialize, Deserializer};

/// Rejects strings that are empty or whitespace only, returning the value trimmed.
pub fn non_blank<'de, D>(des: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(des)?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(D::Error::custom("value must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub fn positive<'de, D>(des: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let n = u64::deserialize(des)?;
    if n == 0 {
        return Err(D::Error::custom("value must be greater than zero"));
    }
    Ok(n)
}
