/// Axis-aligned bounding box in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// The drop surfaces a drag can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropZone {
    Calendar,
    TodoList,
}

/// Registry of drop-surface bounds.
///
/// Each surface reports its current bounding box here (and re-reports it on
/// layout changes); the coordinator answers "which zone is under this point"
/// without reaching into any surface's internals. Re-registering moves a
/// zone on top, so the most recently laid-out surface wins overlaps.
#[derive(Debug, Default)]
pub struct DropZoneRegistry {
    zones: Vec<(DropZone, Rect)>,
}

impl DropZoneRegistry {
    pub fn register(&mut self, zone: DropZone, bounds: Rect) {
        self.zones.retain(|(z, _)| *z != zone);
        self.zones.push((zone, bounds));
    }

    pub fn unregister(&mut self, zone: DropZone) {
        self.zones.retain(|(z, _)| *z != zone);
    }

    pub fn bounds(&self, zone: DropZone) -> Option<Rect> {
        self.zones
            .iter()
            .find(|(z, _)| *z == zone)
            .map(|(_, r)| *r)
    }

    /// Which zone is under the point, if any. Later registrations win.
    pub fn zone_at(&self, x: f64, y: f64) -> Option<DropZone> {
        self.zones
            .iter()
            .rev()
            .find(|(_, r)| r.contains(x, y))
            .map(|(z, _)| *z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(109.9, 59.9));
        assert!(!r.contains(110.0, 30.0)); // right edge excluded
        assert!(!r.contains(50.0, 60.0)); // bottom edge excluded
        assert!(!r.contains(9.9, 30.0));
    }

    #[test]
    fn zone_at_resolves_registered_bounds() {
        let mut registry = DropZoneRegistry::default();
        registry.register(DropZone::Calendar, Rect::new(0.0, 0.0, 800.0, 600.0));
        registry.register(DropZone::TodoList, Rect::new(800.0, 0.0, 240.0, 600.0));

        assert_eq!(registry.zone_at(400.0, 300.0), Some(DropZone::Calendar));
        assert_eq!(registry.zone_at(900.0, 100.0), Some(DropZone::TodoList));
        assert_eq!(registry.zone_at(2000.0, 100.0), None);
    }

    #[test]
    fn reregistering_replaces_bounds() {
        let mut registry = DropZoneRegistry::default();
        registry.register(DropZone::TodoList, Rect::new(0.0, 0.0, 100.0, 100.0));
        registry.register(DropZone::TodoList, Rect::new(500.0, 0.0, 100.0, 100.0));

        assert_eq!(registry.zone_at(50.0, 50.0), None); // old bounds gone
        assert_eq!(registry.zone_at(550.0, 50.0), Some(DropZone::TodoList));
    }

    #[test]
    fn later_registration_wins_overlaps() {
        let mut registry = DropZoneRegistry::default();
        registry.register(DropZone::Calendar, Rect::new(0.0, 0.0, 100.0, 100.0));
        registry.register(DropZone::TodoList, Rect::new(50.0, 0.0, 100.0, 100.0));

        assert_eq!(registry.zone_at(75.0, 50.0), Some(DropZone::TodoList));
    }
}
