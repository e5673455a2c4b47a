//! Delhi NCR landmarks for realistic test fixtures.
//!
//! Coordinates are approximate public landmark positions.

use route_optimizer::Stop;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    pub fn to_stop(&self, id: i64) -> Stop {
        Stop::new(id, self.name, self.lat, self.lng).expect("fixture coordinates are valid")
    }
}

// ============================================================================
// Depots
// ============================================================================

pub const CONNAUGHT_PLACE: Location = Location::new("Connaught Place", 28.6315, 77.2167);

// ============================================================================
// Central Delhi
// ============================================================================

pub const CENTRAL: &[Location] = &[
    Location::new("India Gate", 28.6129, 77.2295),
    Location::new("Rashtrapati Bhavan", 28.6143, 77.1994),
    Location::new("Jantar Mantar", 28.6271, 77.2166),
    Location::new("Lodhi Garden", 28.5931, 77.2197),
    Location::new("Humayun's Tomb", 28.5933, 77.2507),
    Location::new("Khan Market", 28.6003, 77.2270),
];

// ============================================================================
// Old Delhi
// ============================================================================

pub const OLD_DELHI: &[Location] = &[
    Location::new("Red Fort", 28.6562, 77.2410),
    Location::new("Jama Masjid", 28.6507, 77.2334),
    Location::new("Chandni Chowk", 28.6506, 77.2303),
    Location::new("Karol Bagh", 28.6519, 77.1909),
];

// ============================================================================
// South Delhi
// ============================================================================

pub const SOUTH: &[Location] = &[
    Location::new("Qutub Minar", 28.5245, 77.1855),
    Location::new("Hauz Khas Village", 28.5494, 77.2001),
    Location::new("Saket", 28.5245, 77.2066),
    Location::new("Lotus Temple", 28.5535, 77.2588),
    Location::new("Nehru Place", 28.5492, 77.2518),
];

// ============================================================================
// Outskirts
// ============================================================================

pub const OUTSKIRTS: &[Location] = &[
    Location::new("Akshardham", 28.6127, 77.2773),
    Location::new("Noida Sector 18", 28.5708, 77.3261),
    Location::new("Dwarka Sector 21", 28.5521, 77.0587),
    Location::new("Rohini", 28.7495, 77.0565),
];

/// Depot first, then every landmark.
pub fn all_stops() -> Vec<Stop> {
    std::iter::once(&CONNAUGHT_PLACE)
        .chain(CENTRAL)
        .chain(OLD_DELHI)
        .chain(SOUTH)
        .chain(OUTSKIRTS)
        .enumerate()
        .map(|(i, location)| location.to_stop(i as i64 + 1))
        .collect()
}
