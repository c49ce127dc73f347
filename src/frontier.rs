//! The coverage frontier: which part of the pyramid is already computed, and
//! where the next diamond of work can be carved out.

use log::trace;

use crate::geometry::{
    intersect_triangles, point_is_on_inside_of_triangle, point_is_outside_of_triangle,
    triangle_through_points, CellDiamond, CellLocation,
};

/// An ordered set of covered triangle bottoms.
///
/// Every bottom stands for "this cell and everything it depends on has been
/// computed". The list is kept sorted by `k` and never contains a bottom
/// lying strictly inside another's triangle; the first and last entries are
/// sentinels placed beyond the pyramid so that every real bottom has a
/// neighbor on each side.
pub struct Frontier {
    covered_triangle_bottoms: Vec<CellLocation>,
}

impl Frontier {
    /// Creates a frontier from the two outer sentinel bottoms.
    pub fn new(left_sentinel: CellLocation, right_sentinel: CellLocation) -> Self {
        assert!(left_sentinel.k < right_sentinel.k);
        Self {
            covered_triangle_bottoms: vec![left_sentinel, right_sentinel],
        }
    }

    /// Carves out the next uncovered diamond lying inside the triangle of
    /// `query_triangle_bottom`, or `None` when that region is fully covered.
    ///
    /// Between every pair of adjacent covered bottoms there is a highest cell
    /// whose dependencies are all covered; of the candidates strictly inside
    /// the query triangle, the one closest to the center diagonal is chosen,
    /// which keeps the left and right flanks of the band progressing evenly.
    pub fn get_next_exposed_diamond(
        &self,
        query_triangle_bottom: CellLocation,
    ) -> Option<CellDiamond> {
        let bottoms = &self.covered_triangle_bottoms;
        debug_assert!(bottoms.len() >= 2);
        debug_assert!(!point_is_on_inside_of_triangle(
            bottoms[0],
            query_triangle_bottom
        ));
        debug_assert!(!point_is_on_inside_of_triangle(
            bottoms[bottoms.len() - 1],
            query_triangle_bottom
        ));

        let mut best: Option<(usize, i32)> = None;
        for i in 1..bottoms.len() {
            let exposed_top = intersect_triangles(bottoms[i - 1], bottoms[i]);
            if point_is_on_inside_of_triangle(exposed_top, query_triangle_bottom)
                && best.map_or(true, |(_, lowest)| exposed_top.k.abs() < lowest)
            {
                best = Some((i, exposed_top.k.abs()));
            }
        }

        let (index, _) = best?;
        let prev_bottom = bottoms[index - 1];
        let next_bottom = bottoms[index];
        let mut exposed_top = intersect_triangles(prev_bottom, next_bottom);
        exposed_top.d += 2;
        debug_assert!(!point_is_outside_of_triangle(
            exposed_top,
            query_triangle_bottom
        ));
        let exposed_bottom = intersect_triangles(
            query_triangle_bottom,
            triangle_through_points(prev_bottom, next_bottom),
        );
        Some(CellDiamond::new(exposed_top, exposed_bottom))
    }

    /// Marks the triangle below `triangle_bottom` as covered, dropping any
    /// existing bottoms it swallows.
    pub fn cover_triangle(&mut self, triangle_bottom: CellLocation) {
        trace!("covering triangle {triangle_bottom}");
        debug_assert!(
            self.covered_triangle_bottoms
                .iter()
                .all(|existing| !point_is_on_inside_of_triangle(triangle_bottom, *existing)),
            "bottom {triangle_bottom} is already covered"
        );
        self.covered_triangle_bottoms
            .retain(|existing| point_is_outside_of_triangle(*existing, triangle_bottom));
        self.covered_triangle_bottoms.push(triangle_bottom);
        self.covered_triangle_bottoms.sort_by_key(|bottom| bottom.k);
    }
}
