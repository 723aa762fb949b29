//! Coordinate Reference System definitions.
//!
//! The engine carries a proj4 string for every CRS it touches so
//! geometries can be transformed without an external EPSG database.
//! Only the systems the reference layers actually use are covered:
//! WGS84 geographic, WGS84 UTM zones, ETRS89-LAEA (the European
//! equal-area system used for km² math) and Web Mercator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MspError, MspResult};

/// Axis unit of a CRS. Area-per-pixel math requires linear units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrsUnit {
    /// Angular degrees (geographic CRS).
    Degree,
    /// Linear meters (projected CRS).
    Meter,
}

/// A coordinate reference system with its proj4 definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrsDef {
    /// EPSG code when the system has one.
    pub epsg: Option<u32>,
    /// proj4 definition string used for transformations.
    pub proj4: String,
    /// Axis unit.
    pub unit: CrsUnit,
}

impl CrsDef {
    /// WGS84 geographic (EPSG:4326), the canonical storage CRS.
    pub fn wgs84() -> Self {
        Self {
            epsg: Some(4326),
            proj4: "+proj=longlat +datum=WGS84 +no_defs".to_string(),
            unit: CrsUnit::Degree,
        }
    }

    /// ETRS89-extended / LAEA Europe (EPSG:3035), equal-area in meters.
    ///
    /// Adequate for km² aggregation over Atlantic/European study areas.
    pub fn laea_europe() -> Self {
        Self {
            epsg: Some(3035),
            proj4: "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 \
                    +ellps=GRS80 +units=m +no_defs"
                .to_string(),
            unit: CrsUnit::Meter,
        }
    }

    /// Web Mercator (EPSG:3857).
    pub fn web_mercator() -> Self {
        Self {
            epsg: Some(3857),
            proj4: "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 \
                    +x_0=0 +y_0=0 +k=1 +units=m +no_defs"
                .to_string(),
            unit: CrsUnit::Meter,
        }
    }

    /// WGS84 UTM zone (EPSG:326zz north / 327zz south).
    pub fn utm(zone: u32, north: bool) -> Self {
        let south = if north { "" } else { " +south" };
        Self {
            epsg: Some(if north { 32600 + zone } else { 32700 + zone }),
            proj4: format!("+proj=utm +zone={zone}{south} +datum=WGS84 +units=m +no_defs"),
            unit: CrsUnit::Meter,
        }
    }

    /// Resolve an EPSG code to a definition.
    ///
    /// Covers the codes reference rasters and layers are expected to
    /// carry; anything else is an `UnsupportedCrs` error.
    pub fn from_epsg(code: u32) -> MspResult<Self> {
        match code {
            4326 => Ok(Self::wgs84()),
            3035 => Ok(Self::laea_europe()),
            3857 => Ok(Self::web_mercator()),
            32601..=32660 => Ok(Self::utm(code - 32600, true)),
            32701..=32760 => Ok(Self::utm(code - 32700, false)),
            other => Err(MspError::UnsupportedCrs(format!("EPSG:{other}"))),
        }
    }

    /// Check if this is a geographic (degree-unit) CRS.
    pub fn is_geographic(&self) -> bool {
        self.unit == CrsUnit::Degree
    }

    /// True when two definitions describe the same system.
    pub fn same_as(&self, other: &CrsDef) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => self.proj4 == other.proj4,
        }
    }
}

impl fmt::Display for CrsDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{code}"),
            None => write!(f, "{}", self.proj4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_epsg_known_codes() {
        assert_eq!(CrsDef::from_epsg(4326).unwrap(), CrsDef::wgs84());
        assert_eq!(CrsDef::from_epsg(3035).unwrap(), CrsDef::laea_europe());
        assert_eq!(CrsDef::from_epsg(32630).unwrap(), CrsDef::utm(30, true));
        assert_eq!(CrsDef::from_epsg(32730).unwrap(), CrsDef::utm(30, false));
        assert!(CrsDef::from_epsg(99999).is_err());
    }

    #[test]
    fn test_utm_proj4_south_flag() {
        assert!(!CrsDef::utm(30, true).proj4.contains("+south"));
        assert!(CrsDef::utm(19, false).proj4.contains("+south"));
    }

    #[test]
    fn test_geographic_flag() {
        assert!(CrsDef::wgs84().is_geographic());
        assert!(!CrsDef::utm(30, true).is_geographic());
        assert!(!CrsDef::laea_europe().is_geographic());
    }

    #[test]
    fn test_display() {
        assert_eq!(CrsDef::wgs84().to_string(), "EPSG:4326");
        assert_eq!(CrsDef::utm(30, true).to_string(), "EPSG:32630");
    }
}
