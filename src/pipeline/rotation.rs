//! # Rotation Alignment
//!
//! Picks, per source, a rotation about the vertical axis that makes the
//! horizontal footprint of its visible geometry as small as possible, so
//! that element boxes measured afterwards are tight.
//!
//! Candidate orientations come from the edges of the convex hull of the
//! projected fragment points (a minimal-area rectangle always has a side on
//! a hull edge) plus the principal axis of the point cloud. This is a
//! heuristic over fragment points, not exact surfaces: results are
//! approximate.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use std::rc::Rc;

use cgmath::Rad;
use log::debug;

use crate::host::SceneHost;
use crate::scene::SourceId;

/// Relative area difference below which two orientations count as equal
const AREA_TOLERANCE: f32 = 1e-4;

/// Computes footprint-minimizing rotations for scene sources
pub struct RotationAligner<H: SceneHost> {
    host: Rc<H>,
}

impl<H: SceneHost> RotationAligner<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self { host }
    }

    /// Rotation for every source in `sources`; zero when there is not
    /// enough geometry to orient.
    pub fn compute_rotation(&self, sources: &[SourceId]) -> HashMap<SourceId, Rad<f32>> {
        sources
            .iter()
            .map(|source| {
                let points = self.projected_points(*source);
                let angle = best_rotation(&points);
                debug!("{} aligned by {:.2} degrees", source, angle.to_degrees());
                (*source, Rad(angle))
            })
            .collect()
    }

    fn projected_points(&self, source: SourceId) -> Vec<[f32; 2]> {
        self.host
            .all_fragments(source)
            .into_iter()
            .filter(|fragment| self.host.fragment_visible(source, *fragment))
            .flat_map(|fragment| self.host.fragment_points(source, fragment))
            .map(|p| [p.x, p.y])
            .collect()
    }
}

/// Angle (radians, in `(-45°, 45°]`) minimizing the axis-aligned area of
/// `points` once rotated; ties go to the angle closest to zero.
pub fn best_rotation(points: &[[f32; 2]]) -> f32 {
    let hull = convex_hull(points);
    if hull.len() < 3 {
        return 0.0;
    }

    let mut candidates: Vec<f32> = hull
        .iter()
        .zip(hull.iter().cycle().skip(1))
        .map(|(a, b)| normalize_quarter(-(b[1] - a[1]).atan2(b[0] - a[0])))
        .collect();
    if let Some(axis) = principal_axis(points) {
        candidates.push(normalize_quarter(-axis));
    }
    candidates.sort_by(|a, b| a.abs().total_cmp(&b.abs()).then(a.total_cmp(b)));

    let mut best = 0.0;
    let mut best_area = rotated_area(&hull, 0.0);
    for angle in candidates {
        let area = rotated_area(&hull, angle);
        if area < best_area * (1.0 - AREA_TOLERANCE) {
            best = angle;
            best_area = area;
        }
    }
    best
}

/// Reduce an angle into `(-45°, 45°]`; rectangle areas repeat every 90°
fn normalize_quarter(angle: f32) -> f32 {
    let mut a = angle - FRAC_PI_2 * (angle / FRAC_PI_2).round();
    if a <= -FRAC_PI_4 {
        a += FRAC_PI_2;
    }
    if a.abs() < 1e-7 {
        0.0
    } else {
        a
    }
}

fn rotated_area(points: &[[f32; 2]], angle: f32) -> f32 {
    let (sin, cos) = angle.sin_cos();
    let mut min = [f32::INFINITY; 2];
    let mut max = [f32::NEG_INFINITY; 2];
    for p in points {
        let x = p[0] * cos - p[1] * sin;
        let y = p[0] * sin + p[1] * cos;
        min = [min[0].min(x), min[1].min(y)];
        max = [max[0].max(x), max[1].max(y)];
    }
    (max[0] - min[0]) * (max[1] - min[1])
}

/// Direction of greatest variance, in radians
fn principal_axis(points: &[[f32; 2]]) -> Option<f32> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f32;
    let mean_x = points.iter().map(|p| p[0]).sum::<f32>() / n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f32>() / n;

    let (mut cxx, mut cyy, mut cxy) = (0.0f32, 0.0f32, 0.0f32);
    for p in points {
        let dx = p[0] - mean_x;
        let dy = p[1] - mean_y;
        cxx += dx * dx;
        cyy += dy * dy;
        cxy += dx * dy;
    }
    if cxx == 0.0 && cyy == 0.0 {
        return None;
    }
    Some(0.5 * (2.0 * cxy).atan2(cxx - cyy))
}

/// Andrew's monotone chain; counter-clockwise, collinear points dropped
fn convex_hull(points: &[[f32; 2]]) -> Vec<[f32; 2]> {
    let mut sorted: Vec<[f32; 2]> = points.to_vec();
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    fn cross(o: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
        (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
    }

    let mut lower: Vec<[f32; 2]> = Vec::new();
    for p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<[f32; 2]> = Vec::new();
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}
