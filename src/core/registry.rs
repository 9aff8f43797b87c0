//! Anchor registry: the immutable beacon layout for a site

use crate::core::{AnchorId, AnchorPosition};
use crate::validation::error::{PositioningError, PositioningResult};
use std::collections::BTreeMap;
use tracing::debug;

/// Immutable map of anchor id to position.
///
/// Built once from an externally parsed beacon map and shared read-only
/// across every device's update cycle.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    anchors: BTreeMap<AnchorId, AnchorPosition>,
}

/// Build a registry, rejecting duplicate ids and non-finite coordinates.
pub fn load_registry<I>(anchors: I) -> PositioningResult<Registry>
where
    I: IntoIterator<Item = AnchorPosition>,
{
    let mut map = BTreeMap::new();
    for anchor in anchors {
        if !anchor.x.is_finite() || !anchor.y.is_finite() {
            return Err(PositioningError::InvalidAnchorPosition { id: anchor.id });
        }
        if map.contains_key(&anchor.id) {
            return Err(PositioningError::DuplicateAnchor { id: anchor.id });
        }
        map.insert(anchor.id.clone(), anchor);
    }
    debug!(anchors = map.len(), "anchor registry loaded");
    Ok(Registry { anchors: map })
}

impl Registry {
    pub fn get(&self, id: &AnchorId) -> Option<&AnchorPosition> {
        self.anchors.get(id)
    }

    pub fn contains(&self, id: &AnchorId) -> bool {
        self.anchors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Anchors in id order
    pub fn iter(&self) -> impl Iterator<Item = &AnchorPosition> {
        self.anchors.values()
    }

    /// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` of the layout
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut iter = self.anchors.values();
        let first = iter.next()?;
        let init = (first.x, first.y, first.x, first.y);
        Some(iter.fold(init, |(min_x, min_y, max_x, max_y), a| {
            (min_x.min(a.x), min_y.min(a.y), max_x.max(a.x), max_y.max(a.y))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<AnchorPosition> {
        vec![
            AnchorPosition::new("B1", 0.0, 0.0),
            AnchorPosition::new("B2", 10.0, 0.0),
            AnchorPosition::new("B3", 10.0, 10.0),
            AnchorPosition::new("B4", 0.0, 10.0),
        ]
    }

    #[test]
    fn test_load_registry() {
        let registry = load_registry(square()).unwrap();
        assert_eq!(registry.len(), 4);
        assert!(registry.contains(&AnchorId::from("B3")));
        assert_eq!(registry.get(&AnchorId::from("B2")).unwrap().x, 10.0);
        assert_eq!(registry.bounds(), Some((0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut anchors = square();
        anchors.push(AnchorPosition::new("B1", 5.0, 5.0));
        let err = load_registry(anchors).unwrap_err();
        assert_eq!(err, PositioningError::DuplicateAnchor { id: AnchorId::from("B1") });
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = load_registry(vec![AnchorPosition::new("B1", f64::NAN, 0.0)]).unwrap_err();
        assert!(matches!(err, PositioningError::InvalidAnchorPosition { .. }));
    }

    #[test]
    fn test_iteration_is_id_ordered() {
        let mut anchors = square();
        anchors.reverse();
        let registry = load_registry(anchors).unwrap();
        let ids: Vec<_> = registry.iter().map(|a| a.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["B1", "B2", "B3", "B4"]);
    }
}
