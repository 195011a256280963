//! Stable entity identity.

use crate::error::DatasourceError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// 128-bit identifier that survives save/load cycles.
///
/// Serialized as the hyphenated lowercase string, which is also the form
/// used by the `id` and `transform.parent` payload fields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Guid(Uuid);

impl Guid {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn parse(value: &str) -> Result<Self, DatasourceError> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|source| DatasourceError::InvalidGuid {
                value: value.to_string(),
                source,
            })
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Guid {
    type Err = DatasourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for Guid {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips() {
        let id = Guid::from_u128(0x1);
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000001");
        assert_eq!(id.to_string().parse::<Guid>().unwrap(), id);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Guid::parse("not-a-guid"),
            Err(DatasourceError::InvalidGuid { .. })
        ));
    }

    #[test]
    fn serializes_as_string() {
        let id = Guid::from_u128(0xabc);
        assert_eq!(
            serde_json::to_value(id).unwrap(),
            serde_json::json!("00000000-0000-0000-0000-000000000abc")
        );
    }
}
