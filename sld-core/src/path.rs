//! Rectilinear wiring arithmetic on the half-grid.
//!
//! Connections are Manhattan polylines whose vertices sit on half-grid
//! points. These helpers walk segments in half steps, snap proposed
//! endpoints onto existing segments and strip redundant vertices. All of
//! them are pure and exact for half-grid inputs.

use crate::geometry::Point;

/// Whether `x` lies between `a` and `b` (inclusive, either order).
#[must_use]
pub fn between(a: f64, x: f64, b: f64) -> bool {
    (a <= x && x <= b) || (b <= x && x <= a)
}

/// Whether `p` lies on the axis-aligned segment from `p1` to `p2`.
#[must_use]
pub fn lies_on(p: Point, p1: Point, p2: Point) -> bool {
    (p.x == p1.x && p.x == p2.x && between(p1.y, p.y, p2.y))
        || (p.y == p1.y && p.y == p2.y && between(p1.x, p.x, p2.x))
}

/// Manhattan distance between two points.
#[must_use]
pub fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// All half-grid points along the segment from `p1` to `p2`, walking the
/// segment's major axis from the lesser endpoint (snapped down to the
/// half-grid) to the greater.
#[must_use]
pub fn points_on_line(p1: Point, p2: Point) -> Vec<Point> {
    // Walk y for vertical segments, x otherwise.
    let walk_y = p1.x == p2.x;
    let coord = |p: Point| if walk_y { p.y } else { p.x };
    let (start, end) = if coord(p1) < coord(p2) {
        (p1, p2)
    } else {
        (p2, p1)
    };

    let mut points = Vec::new();
    let mut at = (coord(start) * 2.0).floor() / 2.0;
    while at <= coord(end) {
        points.push(if walk_y {
            Point::new(start.x, at)
        } else {
            Point::new(at, start.y)
        });
        at += 0.5;
    }
    points
}

/// The half-grid point on the segment `p1`-`p2` nearest to `p`.
#[must_use]
pub fn closest_point_on_line(p: Point, p1: Point, p2: Point) -> Point {
    let mut point = p1;
    for candidate in points_on_line(p1, p2) {
        if distance(candidate, p) < distance(point, p) {
            point = candidate;
        }
    }
    point
}

/// Where a path leg ending at `p2` meets the target segment `lp1`-`lp2`:
/// an already-coincident endpoint if there is one, else the nearest
/// half-grid point on the target.
#[must_use]
pub fn find_intersection(p1: Point, p2: Point, lp1: Point, lp2: Point) -> Point {
    if lies_on(p1, lp1, lp2) {
        return p1;
    }
    if lies_on(lp1, p1, p2) {
        return lp1;
    }
    if lies_on(lp2, p1, p2) {
        return lp2;
    }
    closest_point_on_line(p2, lp1, lp2)
}

/// Strip interior vertices that are duplicates of, or collinear with, their
/// neighbours, working from the tail backward. Endpoints are kept.
pub fn clean_path(path: &mut Vec<Point>) {
    if path.len() < 3 {
        return;
    }
    let mut i = path.len() - 2;
    while i > 0 {
        let p = path[i - 1];
        let c = path[i];
        let n = path[i + 1];
        if (c.x == n.x && c.y == n.y)
            || (c.x == n.x && c.x == p.x)
            || (c.y == n.y && c.y == p.y)
        {
            path.remove(i);
        }
        i -= 1;
    }
}

/// Whether three points lie on one horizontal or vertical line.
#[must_use]
pub fn collinear(a: Point, b: Point, c: Point) -> bool {
    (a.x == b.x && b.x == c.x) || (a.y == b.y && b.y == c.y)
}
