//! Process-wide registry of map sources.
//!
//! Sources are registered once at startup and handed out as shared,
//! read-only `Arc<dyn MapSource>` references for the process lifetime.

use std::sync::Arc;

use tracing::warn;

use crate::source::{GridSubtype, MapSource, ScaleGridSource, SlippySource};

/// Registry ids of the built-in sources.
pub const AERIAL_ID: u8 = 1;
pub const TOPO_ID: u8 = 2;
pub const URBAN_ID: u8 = 4;
pub const OSM_MAPNIK_ID: u8 = 13;
pub const BLUEMARBLE_ID: u8 = 15;

/// Owns every registered map source.
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn MapSource>>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry populated with the built-in providers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SlippySource::new(
            OSM_MAPNIK_ID,
            "OSM Mapnik",
            "tile.openstreetmap.org",
            "/{z}/{x}/{y}.png",
        )));
        registry.register(Arc::new(SlippySource::new(
            BLUEMARBLE_ID,
            "BlueMarble",
            "s3.amazonaws.com",
            "/com.modestmaps.bluemarble/{z}-r{y}-c{x}.jpg",
        )));
        registry.register(Arc::new(ScaleGridSource::new(
            AERIAL_ID,
            "Aerial",
            GridSubtype::Aerial,
        )));
        registry.register(Arc::new(ScaleGridSource::new(
            TOPO_ID,
            "Topographic",
            GridSubtype::Topo,
        )));
        registry.register(Arc::new(ScaleGridSource::new(
            URBAN_ID,
            "Urban",
            GridSubtype::Urban,
        )));
        registry
    }

    /// Registers a source, replacing any earlier source with the same id.
    pub fn register(&mut self, source: Arc<dyn MapSource>) {
        let id = source.descriptor().id;
        if let Some(existing) = self.sources.iter_mut().find(|s| s.descriptor().id == id) {
            warn!(id, "replacing already-registered map source");
            *existing = source;
        } else {
            self.sources.push(source);
        }
    }

    /// Looks a source up by registry id.
    pub fn get(&self, id: u8) -> Option<Arc<dyn MapSource>> {
        self.sources
            .iter()
            .find(|s| s.descriptor().id == id)
            .cloned()
    }

    /// Looks a source up by label, case-insensitively.
    pub fn by_label(&self, label: &str) -> Option<Arc<dyn MapSource>> {
        self.sources
            .iter()
            .find(|s| s.descriptor().label.eq_ignore_ascii_case(label))
            .cloned()
    }

    /// Iterates over all registered sources in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn MapSource>> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_registered() {
        let registry = SourceRegistry::with_defaults();
        assert_eq!(registry.len(), 5);
        assert!(registry.get(OSM_MAPNIK_ID).is_some());
        assert!(registry.get(AERIAL_ID).is_some());
        assert!(registry.get(200).is_none());
    }

    #[test]
    fn test_lookup_by_label_is_case_insensitive() {
        let registry = SourceRegistry::with_defaults();
        let source = registry.by_label("osm mapnik").unwrap();
        assert_eq!(source.descriptor().id, OSM_MAPNIK_ID);
        assert!(registry.by_label("no such source").is_none());
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(SlippySource::new(7, "First", "a.example", "/{z}/{x}/{y}")));
        registry.register(Arc::new(SlippySource::new(7, "Second", "b.example", "/{z}/{x}/{y}")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(7).unwrap().descriptor().label, "Second");
    }
}
