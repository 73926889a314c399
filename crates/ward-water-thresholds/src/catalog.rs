//! Region catalog: the set of wards a run works on.

use std::collections::BTreeMap;

use ward_water_core::{Region, RegionId};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("duplicate region id {0}")]
    DuplicateRegion(RegionId),
    #[error("unknown region id {0}")]
    UnknownRegion(RegionId),
}

/// Regions with unique identifiers, kept in insertion order.
#[derive(Clone, Debug, Default)]
pub struct RegionCatalog {
    regions: Vec<Region>,
    index: BTreeMap<RegionId, usize>,
}

impl RegionCatalog {
    /// Build a catalog, rejecting repeated identifiers.
    pub fn new(regions: Vec<Region>) -> Result<Self, CatalogError> {
        let mut index = BTreeMap::new();
        for (i, r) in regions.iter().enumerate() {
            if index.insert(r.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateRegion(r.id.clone()));
            }
        }
        Ok(Self { regions, index })
    }

    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn get(&self, id: &RegionId) -> Option<&Region> {
        self.index.get(id).map(|&i| &self.regions[i])
    }

    pub fn require(&self, id: &RegionId) -> Result<&Region, CatalogError> {
        self.get(id)
            .ok_or_else(|| CatalogError::UnknownRegion(id.clone()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &RegionId> {
        self.regions.iter().map(|r| &r.id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl<'a> IntoIterator for &'a RegionCatalog {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_water_core::Footprint;

    #[test]
    fn lookup_by_id() {
        let cat = RegionCatalog::new(vec![
            Region::new(61, Footprint::rect(0, 0, 2, 2)),
            Region::new("port", Footprint::rect(2, 0, 4, 2)),
        ])
        .expect("unique ids");
        assert_eq!(cat.len(), 2);
        assert_eq!(
            cat.get(&RegionId::from("port")).map(|r| &r.footprint),
            Some(&Footprint::rect(2, 0, 4, 2))
        );
        assert_eq!(
            cat.require(&RegionId::from(7)),
            Err(CatalogError::UnknownRegion(RegionId::Num(7)))
        );
        let ids: Vec<String> = cat.ids().map(|id| id.to_string()).collect();
        assert_eq!(ids, ["61", "port"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = RegionCatalog::new(vec![
            Region::new(5, Footprint::rect(0, 0, 1, 1)),
            Region::new(5, Footprint::rect(1, 0, 2, 1)),
        ])
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateRegion(RegionId::Num(5)));
    }
}
