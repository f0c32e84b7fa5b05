use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Stable identifier for a coffee shop in the catalog (e.g., `"1"`).
///
/// Ids are assigned by the catalog file and never change for the lifetime of
/// a process; overlay snapshots key their review lists by this value.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopId(pub String);

/// Identifier of a single review, unique within one shop's merged review set.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub String);

impl ShopId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ReviewId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShopId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for ReviewId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ShopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Boolean amenity a shop either offers or not.
///
/// The set is closed: catalog files and filter requests must use one of the
/// four keys below, spelled exactly as the catalog spells them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Facet {
    Wifi,
    Seating,
    PowerOutlets,
    QuietSpace,
}

impl Facet {
    /// Every facet in canonical display order.
    pub const ALL: [Facet; 4] = [
        Facet::Wifi,
        Facet::Seating,
        Facet::PowerOutlets,
        Facet::QuietSpace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Wifi => "wifi",
            Facet::Seating => "seating",
            Facet::PowerOutlets => "powerOutlets",
            Facet::QuietSpace => "quietSpace",
        }
    }

    /// Human label used by CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Facet::Wifi => "Free WiFi",
            Facet::Seating => "Seating Available",
            Facet::PowerOutlets => "Power Outlets",
            Facet::QuietSpace => "Quiet Space",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown facet '{0}' (expected wifi|seating|powerOutlets|quietSpace)")]
pub struct UnknownFacet(pub String);

impl FromStr for Facet {
    type Err = UnknownFacet;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "wifi" => Ok(Facet::Wifi),
            "seating" => Ok(Facet::Seating),
            "powerOutlets" | "power_outlets" => Ok(Facet::PowerOutlets),
            "quietSpace" | "quiet_space" => Ok(Facet::QuietSpace),
            other => Err(UnknownFacet(other.to_string())),
        }
    }
}

impl Serialize for Facet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Facet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
