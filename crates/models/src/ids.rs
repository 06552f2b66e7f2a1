//! Canonical record ids.
//!
//! Every collection is keyed by an `i64`. Stored data written by older clients
//! may carry ids as numeric strings, so decoding goes through [`loose`] /
//! [`loose_opt`], which normalize both shapes to `i64`. Encoding always writes
//! plain numbers. Small counts stored by the same clients (years, stars) get
//! the same treatment through [`loose_uint`].

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{de, Deserialize, Deserializer};

pub type RecordId = i64;

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseId {
    fn into_id<E: de::Error>(self) -> Result<RecordId, E> {
        match self {
            LooseId::Int(n) => Ok(n),
            LooseId::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
            LooseId::Float(f) => Err(E::custom(format!("non-integral id {f}"))),
            LooseId::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| E::custom(format!("invalid id {s:?}"))),
        }
    }
}

/// Deserialize an id stored either as a number or as a numeric string.
pub fn loose<'de, D: Deserializer<'de>>(d: D) -> Result<RecordId, D::Error> {
    LooseId::deserialize(d)?.into_id()
}

/// Optional variant of [`loose`]; `null`, absent and empty strings become `None`.
pub fn loose_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RecordId>, D::Error> {
    match Option::<LooseId>::deserialize(d)? {
        None => Ok(None),
        Some(LooseId::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(id) => id.into_id().map(Some),
    }
}

/// Deserialize an unsigned count stored either as a number or as a numeric
/// string, rejecting values that do not fit `T`.
pub fn loose_uint<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let n = LooseId::deserialize(d)?.into_id::<D::Error>()?;
    T::try_from(n).map_err(|_| de::Error::custom(format!("value {n} out of range")))
}

/// Optional variant of [`loose_uint`], with the same `None` rules as [`loose_opt`].
pub fn loose_uint_opt<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    match loose_opt(d)? {
        None => Ok(None),
        Some(n) => T::try_from(n).map(Some).map_err(|_| de::Error::custom(format!("value {n} out of range"))),
    }
}

/// Wall-clock derived id source.
///
/// Ids are milliseconds since the epoch, bumped to `last + 1` when two records
/// are created within the same millisecond, so ids from one generator are
/// strictly increasing.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self { Self::default() }

    /// Start after `floor`, e.g. the largest id already persisted.
    pub fn starting_after(floor: RecordId) -> Self {
        Self { last: AtomicI64::new(floor) }
    }

    pub fn next_id(&self) -> RecordId {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}
