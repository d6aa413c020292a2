use geo::Polygon;
use ndarray::prelude::*;

use super::entities::Located;


/// Which buildings and services fall inside the area of interest.  Entries line up with the
/// rows and columns of the destination matrix.
#[derive(PartialEq, Debug, Clone)]
pub struct Visibility {
    pub buildings: Vec<bool>,
    pub services: Vec<bool>,
}

impl Visibility {
    pub fn num_visible_buildings(&self) -> usize {
        self.buildings.iter().filter(|vv| **vv).count()
    }

    pub fn num_visible_services(&self) -> usize {
        self.services.iter().filter(|vv| **vv).count()
    }

    /// Keeps the items whose flag is set.
    pub fn filter<TT>(items: Vec<TT>, flags: &[bool]) -> Vec<TT> {
        items.into_iter().zip(flags).filter(|(_, vv)| **vv).map(|(item, _)| item).collect()
    }
}

/// Buildings are visible if their footprint lies within `zone`; services are visible if they
/// supply at least one visible building.  With no zone everything is visible.
pub fn compute_visibility<BB: Located>(buildings: &[BB], num_services: usize,
                                       destination: &Array2<u64>, zone: Option<&Polygon<f64>>)
                                       -> Visibility {
    let zone = match zone {
        Some(zone) => zone,
        None => return Visibility {
            buildings: vec![true; buildings.len()],
            services: vec![true; num_services],
        },
    };

    let bld_visible: Vec<bool> = buildings.iter()
        .map(|bb| bb.footprint().is_within(zone))
        .collect();
    let svc_visible: Vec<bool> = destination.outer_iter()
        .map(|row| row.iter().zip(&bld_visible).any(|(flow, vv)| *vv && *flow > 0))
        .collect();
    let visibility = Visibility {buildings: bld_visible, services: svc_visible};
    log::info!("{} buildings and {} services are inside the selection zone",
               visibility.num_visible_buildings(), visibility.num_visible_services());
    visibility
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::geometry::polygon_from_ring;
    use super::super::test_utils::make_buildings;

    #[test]
    fn test_no_zone() {
        let buildings = make_buildings(&[(1, 1), (2, 1)]);
        let destination = Array::zeros((3, 2));
        let visibility = compute_visibility(&buildings, 3, &destination, None);
        assert_eq!(visibility.buildings, vec![true, true]);
        assert_eq!(visibility.services, vec![true, true, true]);
    }

    #[test]
    fn test_services_visible_through_buildings() {
        // buildings sit at (id, 0); the zone covers x from 0 to 2.5
        let buildings = make_buildings(&[(1, 5), (2, 5), (3, 5)]);
        let zone = polygon_from_ring(vec![(0., -1.), (2.5, -1.), (2.5, 1.), (0., 1.)]);
        let destination = array![
            [2, 0, 0],
            [0, 0, 4],
            [0, 0, 0],
            [0, 1, 1],
        ];
        let visibility = compute_visibility(&buildings, 4, &destination, Some(&zone));
        assert_eq!(visibility.buildings, vec![true, true, false]);
        // the second service only reaches the building outside, the third reaches nothing
        assert_eq!(visibility.services, vec![true, false, false, true]);
        assert_eq!(visibility.num_visible_buildings(), 2);
        assert_eq!(visibility.num_visible_services(), 2);

        let kept = Visibility::filter(vec![10, 11, 12, 13], &visibility.services);
        assert_eq!(kept, vec![10, 13]);
    }
}
