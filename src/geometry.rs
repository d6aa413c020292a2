use geo::{Centroid, Contains, LineString, Point, Polygon};


/// The shape of a building or a service, as given in a projected coordinate system.
#[derive(PartialEq, Debug, Clone)]
pub enum Footprint {
    Point(Point<f64>),
    Polygon(Polygon<f64>),
}

impl Footprint {
    pub fn point(x_coord: f64, y_coord: f64) -> Footprint {
        Footprint::Point(Point::new(x_coord, y_coord))
    }

    /// Builds a polygon footprint from its exterior ring.  The ring is closed automatically.
    pub fn polygon(exterior: Vec<(f64, f64)>) -> Footprint {
        Footprint::Polygon(polygon_from_ring(exterior))
    }

    pub fn centroid(&self) -> Point<f64> {
        match self {
            Footprint::Point(point) => *point,
            Footprint::Polygon(poly) => match poly.centroid() {
                Some(centroid) => centroid,
                // degenerate rings have no area-weighted centroid; fall back on the first vertex
                None => match poly.exterior().points().next() {
                    Some(first) => first,
                    None => Point::new(f64::NAN, f64::NAN),
                },
            },
        }
    }

    pub fn as_array(&self) -> [f64; 2] {
        let centroid = self.centroid();
        [centroid.x(), centroid.y()]
    }

    /// True if the footprint lies inside the zone.  Shapes touching only the zone's boundary
    /// are not inside it.
    pub fn is_within(&self, zone: &Polygon<f64>) -> bool {
        match self {
            Footprint::Point(point) => zone.contains(point),
            Footprint::Polygon(poly) => zone.contains(poly),
        }
    }
}

pub fn polygon_from_ring(exterior: Vec<(f64, f64)>) -> Polygon<f64> {
    Polygon::new(LineString::from(exterior), vec![])
}

/// A straight line between the centroids of two footprints.
pub fn connecting_line(from: &Footprint, to: &Footprint) -> LineString<f64> {
    LineString::from(vec![from.centroid().x_y(), to.centroid().x_y()])
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square(offset: f64) -> Vec<(f64, f64)> {
        vec![(offset, offset), (offset + 1., offset), (offset + 1., offset + 1.),
             (offset, offset + 1.)]
    }

    #[test]
    fn test_centroids() {
        let point = Footprint::point(3., -2.);
        assert_eq!(point.as_array(), [3., -2.]);

        let square = Footprint::polygon(unit_square(10.));
        let centroid = square.centroid();
        assert_relative_eq!(centroid.x(), 10.5);
        assert_relative_eq!(centroid.y(), 10.5);

        // a ring with no area still has a usable location
        let flat = Footprint::polygon(vec![(1., 1.), (1., 1.), (1., 1.)]);
        assert_eq!(flat.as_array(), [1., 1.]);
    }

    #[test]
    fn test_is_within() {
        let zone = polygon_from_ring(vec![(0., 0.), (100., 0.), (100., 100.), (0., 100.)]);
        assert!(Footprint::point(50., 50.).is_within(&zone));
        assert!(!Footprint::point(150., 50.).is_within(&zone));
        // on the boundary doesn't count
        assert!(!Footprint::point(0., 50.).is_within(&zone));

        assert!(Footprint::polygon(unit_square(10.)).is_within(&zone));
        // the square straddling the zone's edge is not within it
        assert!(!Footprint::polygon(unit_square(99.5)).is_within(&zone));
    }

    #[test]
    fn test_connecting_line() {
        let from = Footprint::polygon(unit_square(0.));
        let to = Footprint::point(10., 0.);
        let line = connecting_line(&from, &to);
        let coords: Vec<(f64, f64)> = line.points().map(|pp| pp.x_y()).collect();
        assert_eq!(coords.len(), 2);
        assert_relative_eq!(coords[0].0, 0.5);
        assert_relative_eq!(coords[0].1, 0.5);
        assert_eq!(coords[1], (10., 0.));
    }
}
