//! Lattice geometry over the `(d, k)` cells of the Myers pyramid.
//!
//! A *triangle* is the down-cone of cells a given bottom point transitively
//! depends on; a *diamond* is a top and bottom point delimiting a contiguous
//! unit of work. All of the strategy's reasoning about "which region can be
//! computed next" happens in terms of these two shapes.

use std::fmt::Display;

/// A cell of the DP pyramid. `d` is the layer (number of edits), `k` the
/// diagonal (`x - y`). Valid cells satisfy `|k| <= d` and `(d - k) % 2 == 0`,
/// but intermediate geometric results may step outside that lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLocation {
    pub d: i32,
    pub k: i32,
}

impl CellLocation {
    pub fn new(d: i32, k: i32) -> Self {
        Self { d, k }
    }
}

impl Display for CellLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ d = {}, k = {} }}", self.d, self.k)
    }
}

/// A pair of top point (inclusive) and bottom point (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellDiamond {
    pub top: CellLocation,
    pub bottom: CellLocation,
}

impl CellDiamond {
    pub fn new(top: CellLocation, bottom: CellLocation) -> Self {
        Self { top, bottom }
    }

    /// Number of layers spanned, top and bottom included.
    pub fn height(&self) -> i32 {
        self.bottom.d - self.top.d + 1
    }
}

/// True iff `query_point` lies strictly inside the triangle whose bottom is
/// `triangle_bottom` (boundary excluded).
pub fn point_is_on_inside_of_triangle(
    query_point: CellLocation,
    triangle_bottom: CellLocation,
) -> bool {
    query_point.d < triangle_bottom.d
        && (query_point.k - triangle_bottom.k).abs() < triangle_bottom.d - query_point.d
}

/// True iff `query_point` lies strictly outside that triangle (boundary
/// excluded as well: a point on the boundary is neither inside nor outside).
pub fn point_is_outside_of_triangle(
    query_point: CellLocation,
    triangle_bottom: CellLocation,
) -> bool {
    query_point.d > triangle_bottom.d
        || (query_point.k - triangle_bottom.k).abs() > triangle_bottom.d - query_point.d
}

/// Intersect the diagonal in `(+d, +k)` direction through `a` with the
/// diagonal in `(+d, -k)` direction through `b`. The two diagonals meet in a
/// unique cell as long as the parities of `a` and `b` agree.
pub fn intersect_diagonals(a: CellLocation, b: CellLocation) -> CellLocation {
    let temp = b.k - a.k + a.d - b.d;
    assert!(temp % 2 == 0);
    let temp = temp / 2;
    CellLocation::new(b.d + temp, b.k - temp)
}

/// Bottom of the smallest triangle containing both `a` and `b`.
///
/// Preconditions: neither point is strictly inside the other's triangle.
pub fn triangle_through_points(a: CellLocation, b: CellLocation) -> CellLocation {
    assert!(!point_is_on_inside_of_triangle(a, b));
    assert!(!point_is_on_inside_of_triangle(b, a));
    let (a, b) = if a.k > b.k { (b, a) } else { (a, b) };
    intersect_diagonals(a, b)
}

/// Bottom of the largest triangle contained in both triangles. Returns one of
/// the arguments if it already lies within the other's triangle.
pub fn intersect_triangles(bottom_a: CellLocation, bottom_b: CellLocation) -> CellLocation {
    if bottom_a == bottom_b {
        return bottom_a;
    }
    if !point_is_outside_of_triangle(bottom_a, bottom_b) {
        return bottom_a;
    }
    if !point_is_outside_of_triangle(bottom_b, bottom_a) {
        return bottom_b;
    }
    let (a, b) = if bottom_a.k > bottom_b.k {
        (bottom_b, bottom_a)
    } else {
        (bottom_a, bottom_b)
    };
    let temp = b.k - a.k + b.d - a.d;
    assert!(temp > 0 && temp % 2 == 0);
    let temp = temp / 2;
    CellLocation::new(b.d - temp, b.k - temp)
}

/// A diamond is valid when its top is not outside the triangle of its bottom.
pub fn is_valid_diamond(diamond: &CellDiamond) -> bool {
    !point_is_outside_of_triangle(diamond.top, diamond.bottom)
}

/// Returns a diamond of height at most `limit`, inscribed in `target` with
/// the same top point.
///
/// If there are multiple ways to shrink the diamond, it is shrunk so that it
/// stays as square as possible. When the diamond is already square, an odd
/// shrink residue is absorbed into a single diagonal step.
pub fn limit_diamond_height(target: CellDiamond, limit: i32) -> CellDiamond {
    assert!(is_valid_diamond(&target));
    assert!(limit >= 1);
    let old_height = target.height();
    assert!(old_height >= 1);
    if old_height <= limit {
        return target;
    }

    let shrink_by_total = old_height - limit;
    let mut shrink_k_dir = (target.top.k - target.bottom.k).signum();
    let shrink_by_this_step;
    let was_square = shrink_k_dir == 0;
    if was_square {
        shrink_by_this_step = shrink_by_total;
        if shrink_by_total % 2 == 1 {
            shrink_k_dir = -1;
        }
    } else {
        shrink_by_this_step = shrink_by_total.min((target.top.k - target.bottom.k).abs());
    }

    let mut new_k = target.bottom.k + shrink_by_this_step * shrink_k_dir;
    if was_square {
        new_k = target.bottom.k;
        if shrink_by_this_step % 2 == 1 {
            new_k += shrink_k_dir;
        }
    }
    let result = CellDiamond::new(
        target.top,
        CellLocation::new(target.bottom.d - shrink_by_this_step, new_k),
    );
    if shrink_by_this_step < shrink_by_total {
        return limit_diamond_height(result, limit);
    }

    assert!(is_valid_diamond(&result));
    assert!(result.height() == limit);
    result
}
