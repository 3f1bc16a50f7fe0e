//! Location provider collaborator interface.
//!
//! The engine does not talk to positioning hardware; a collaborator
//! supplies the device's current coordinate, which is used to stamp new
//! strokes recorded "here".

use parking_lot::Mutex;
use roundlink_model::GeoPoint;

/// Supplies the device's current coordinate.
pub trait LocationProvider: Send + Sync {
    /// Returns the current coordinate, or `None` if no fix is
    /// available.
    fn current_location(&self) -> Option<GeoPoint>;
}

/// A location provider returning a settable fixed coordinate.
#[derive(Default)]
pub struct FixedLocationProvider {
    location: Mutex<Option<GeoPoint>>,
}

impl FixedLocationProvider {
    /// Creates a provider with no fix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider with the given coordinate.
    #[must_use]
    pub fn at(location: GeoPoint) -> Self {
        Self {
            location: Mutex::new(Some(location)),
        }
    }

    /// Sets or clears the coordinate.
    pub fn set(&self, location: Option<GeoPoint>) {
        *self.location.lock() = location;
    }
}

impl LocationProvider for FixedLocationProvider {
    fn current_location(&self) -> Option<GeoPoint> {
        *self.location.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_provider() {
        let provider = FixedLocationProvider::new();
        assert!(provider.current_location().is_none());

        provider.set(Some(GeoPoint::new(1.0, 2.0)));
        assert_eq!(provider.current_location(), Some(GeoPoint::new(1.0, 2.0)));

        let provider = FixedLocationProvider::at(GeoPoint::new(3.0, 4.0));
        assert_eq!(provider.current_location(), Some(GeoPoint::new(3.0, 4.0)));
    }
}
