use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

const fn waypoint(name: &'static str, latitude: f64, longitude: f64) -> Waypoint {
    Waypoint {
        name,
        latitude,
        longitude,
    }
}

/// A loop through Chennai.
pub const CHENNAI: [Waypoint; 6] = [
    waypoint("Chennai Central", 13.0827, 80.2707),
    waypoint("Marina Beach", 13.0674, 80.2376),
    waypoint("Anna Salai", 13.0524, 80.2508),
    waypoint("Guindy", 13.0352, 80.2089),
    waypoint("Velachery", 12.9908, 80.2337),
    waypoint("Medavakkam", 12.9716, 80.2214),
];

/// Largest fraction of a leg covered by a single point.
const MAX_PROGRESS: f64 = 0.1;
/// Chance to move on to the next leg after each point.
const ADVANCE_PROBABILITY: f64 = 0.1;

/// Produces jittery GPS fixes along a closed route.
#[derive(Debug, Clone)]
pub struct RouteWalker<'a> {
    route: &'a [Waypoint],
    leg: usize,
}

impl<'a> RouteWalker<'a> {
    /// Returns `None` for an empty route.
    pub fn new(route: &'a [Waypoint], start: usize) -> Option<Self> {
        if route.is_empty() {
            return None;
        }
        Some(Self {
            route,
            leg: start % route.len(),
        })
    }

    /// The waypoint the current leg starts at.
    pub fn current(&self) -> &Waypoint {
        &self.route[self.leg]
    }

    fn next(&self) -> &Waypoint {
        &self.route[(self.leg + 1) % self.route.len()]
    }

    /// Returns a point a small random distance along the current leg and
    /// sometimes moves on to the next one.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> (f64, f64) {
        let progress = rng.random_range(0.0..MAX_PROGRESS);
        let (from, to) = (self.current(), self.next());
        let point = (
            from.latitude + (to.latitude - from.latitude) * progress,
            from.longitude + (to.longitude - from.longitude) * progress,
        );
        if rng.random_bool(ADVANCE_PROBABILITY) {
            self.leg = (self.leg + 1) % self.route.len();
        }
        point
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::{RouteWalker, CHENNAI};

    fn between(value: f64, a: f64, b: f64) -> bool {
        value >= a.min(b) && value <= a.max(b)
    }

    #[test]
    fn points_stay_near_the_start_of_the_leg() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut walker = RouteWalker::new(&CHENNAI, 0).unwrap();
        for _ in 0..200 {
            let (from, to) = (*walker.current(), walker.route[(walker.leg + 1) % 6]);
            let (latitude, longitude) = walker.step(&mut rng);
            let near_lat = from.latitude + (to.latitude - from.latitude) * 0.1;
            let near_lng = from.longitude + (to.longitude - from.longitude) * 0.1;
            assert!(between(latitude, from.latitude, near_lat));
            assert!(between(longitude, from.longitude, near_lng));
        }
    }

    #[test]
    fn eventually_moves_along_and_wraps_around() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut walker = RouteWalker::new(&CHENNAI, 5).unwrap();
        assert_eq!(walker.current().name, "Medavakkam");

        let mut visited = std::collections::HashSet::new();
        for _ in 0..2_000 {
            walker.step(&mut rng);
            visited.insert(walker.current().name);
        }
        assert_eq!(visited.len(), CHENNAI.len());
    }

    #[test]
    fn same_seed_same_path() {
        let walk = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut walker = RouteWalker::new(&CHENNAI, 2).unwrap();
            (0..20).map(|_| walker.step(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(walk(1), walk(1));
    }

    #[test]
    fn empty_routes_are_rejected() {
        assert!(RouteWalker::new(&[], 0).is_none());
    }
}
