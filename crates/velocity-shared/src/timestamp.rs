//! Serde helpers for task timestamps.
//!
//! Clients send RFC 3339 with millisecond
//! precision. The service may answer with
//! a zone-less ISO local date-time, which
//! is read as UTC.

use chrono::{
  DateTime,
  NaiveDateTime,
  SecondsFormat,
  Utc
};
use serde::{
  Deserialize,
  Deserializer,
  Serializer
};

const LOCAL_FORMATS: [&str; 2] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f"
];

pub fn format(
  dt: &DateTime<Utc>
) -> String {
  dt.to_rfc3339_opts(
    SecondsFormat::Millis,
    true
  )
}

pub fn parse(
  raw: &str
) -> Result<DateTime<Utc>, String> {
  let raw = raw.trim();
  if let Ok(dt) =
    DateTime::parse_from_rfc3339(raw)
  {
    return Ok(dt.with_timezone(&Utc));
  }

  for fmt in LOCAL_FORMATS {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        raw, fmt
      )
    {
      return Ok(ndt.and_utc());
    }
  }

  Err(format!(
    "unrecognised timestamp: {raw}"
  ))
}

pub fn serialize<S>(
  dt: &DateTime<Utc>,
  serializer: S
) -> Result<S::Ok, S::Error>
where
  S: Serializer
{
  serializer.serialize_str(&format(dt))
}

pub fn deserialize<'de, D>(
  deserializer: D
) -> Result<DateTime<Utc>, D::Error>
where
  D: Deserializer<'de>
{
  let raw =
    String::deserialize(deserializer)?;
  parse(&raw)
    .map_err(serde::de::Error::custom)
}

pub mod option {
  use chrono::{
    DateTime,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &Option<DateTime<Utc>>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match dt {
      | Some(value) => {
        super::serialize(
          value, serializer
        )
      }
      | None => {
        serializer.serialize_none()
      }
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<
    Option<DateTime<Utc>>,
    D::Error
  >
  where
    D: Deserializer<'de>
  {
    let opt =
      Option::<String>::deserialize(
        deserializer
      )?;
    match opt {
      | Some(raw) => super::parse(&raw)
        .map(Some)
        .map_err(
          serde::de::Error::custom
        ),
      | None => Ok(None)
    }
  }
}
