//! Shopper session: selected delivery region and the cart

use serde::Serialize;
use thiserror::Error;
use crate::domain::aggregates::cart::Cart;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Region {
    pub id: &'static str,
    pub name: &'static str,
    pub name_ar: &'static str,
    pub available: bool,
}

pub const REGIONS: [Region; 8] = [
    Region { id: "riyadh", name: "Riyadh", name_ar: "الرياض", available: true },
    Region { id: "jeddah", name: "Jeddah", name_ar: "جدة", available: true },
    Region { id: "mecca", name: "Mecca", name_ar: "مكة المكرمة", available: true },
    Region { id: "dammam", name: "Dammam", name_ar: "الدمام", available: true },
    Region { id: "medina", name: "Medina", name_ar: "المدينة المنورة", available: true },
    Region { id: "abha", name: "Abha", name_ar: "أبها", available: false },
    Region { id: "taif", name: "Taif", name_ar: "الطائف", available: true },
    Region { id: "tabuk", name: "Tabuk", name_ar: "تبوك", available: false },
];

pub fn find_region(id: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("unknown region: {0}")]
    UnknownRegion(String),
    #[error("delivery is not available in {0} yet")]
    RegionUnavailable(&'static str),
}

/// Per-shopper state, owned by the caller and passed to whatever needs it.
#[derive(Clone, Debug, Default)]
pub struct ShopperSession {
    region: Option<&'static Region>,
    pub cart: Cart,
}

impl ShopperSession {
    pub fn new() -> Self { Self::default() }

    pub fn region(&self) -> Option<&'static Region> { self.region }

    /// Switching region keeps the cart.
    pub fn select_region(&mut self, id: &str) -> Result<&'static Region, SessionError> {
        let region = find_region(id).ok_or_else(|| SessionError::UnknownRegion(id.to_string()))?;
        if !region.available {
            return Err(SessionError::RegionUnavailable(region.name));
        }
        self.region = Some(region);
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_region() {
        let mut session = ShopperSession::new();
        assert!(session.region().is_none());
        assert_eq!(session.select_region("jeddah").unwrap().name_ar, "جدة");
        assert_eq!(session.select_region("abha"), Err(SessionError::RegionUnavailable("Abha")));
        assert_eq!(session.region().map(|r| r.id), Some("jeddah"));
        assert!(matches!(session.select_region("cairo"), Err(SessionError::UnknownRegion(_))));
    }

    #[test]
    fn test_two_regions_unavailable() {
        let closed: Vec<_> = REGIONS.iter().filter(|r| !r.available).map(|r| r.id).collect();
        assert_eq!(closed, vec!["abha", "tabuk"]);
    }
}
