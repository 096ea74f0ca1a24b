//! # Cluster Layout
//!
//! Row-based packing of clusters on the horizontal plane.
//!
//! 1. **Shapes** inside a cluster are shelf-packed, deepest first, into rows
//!    whose width targets a square cluster footprint.
//! 2. **Clusters** are ordered by footprint (largest first, ties by name) and
//!    placed left to right, wrapping to a new row when the row would grow
//!    past the target aspect ratio.
//! 3. **Transforms** move each shape's box onto its slot; all shapes rest on
//!    a common floor and the layout is centered where the scene was.
//!
//! Spacing scales with the mean shape size so models in any unit look alike.
//! The computation is pure: equal input gives bit-identical output.

use std::collections::HashMap;

use cgmath::{Matrix4, Rad, Vector3};
use indexmap::IndexMap;

use super::bounding_box::BoundingBoxProvider;
use super::cluster_builder::Cluster;
use crate::config::ClusterConfig;
use crate::error::{ClusterError, Result};
use crate::host::SceneHost;
use crate::scene::{ShapeIdentity, Transform, AABB};

/// Slack for floating point comparisons when wrapping rows
const WRAP_EPSILON: f32 = 1e-6;

/// Source of shape boxes (post-rotation frame) and rotations for layout
pub trait ShapeBounds {
    fn shape_box(&self, shape: &ShapeIdentity) -> AABB;

    /// Rotation about the vertical axis the shape's box was measured under
    fn shape_rotation(&self, _shape: &ShapeIdentity) -> Rad<f32> {
        Rad(0.0)
    }

    /// Bounds of the shape where it sits in the scene before any rotation.
    ///
    /// The default rotates the measured box back, which over-approximates
    /// rotated shapes; providers that can measure directly should.
    fn world_box(&self, shape: &ShapeIdentity) -> AABB {
        let measured = self.shape_box(shape);
        let angle = self.shape_rotation(shape);
        if measured.is_empty() || angle.0 == 0.0 {
            return measured;
        }
        measured.transform(&Matrix4::from_angle_z(-angle))
    }
}

impl<H: SceneHost> ShapeBounds for BoundingBoxProvider<H> {
    fn shape_box(&self, shape: &ShapeIdentity) -> AABB {
        self.get_box(shape)
    }

    fn shape_rotation(&self, shape: &ShapeIdentity) -> Rad<f32> {
        self.rotation(shape.source_id)
    }

    fn world_box(&self, shape: &ShapeIdentity) -> AABB {
        self.get_world_box(shape)
    }
}

impl ShapeBounds for HashMap<ShapeIdentity, AABB> {
    fn shape_box(&self, shape: &ShapeIdentity) -> AABB {
        self.get(shape).copied().unwrap_or_default()
    }
}

/// Target transforms of one completed clustering run
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    transforms: IndexMap<ShapeIdentity, Transform>,
    cluster_bounds: Vec<(String, AABB)>,
}

impl LayoutResult {
    pub fn transform(&self, shape: &ShapeIdentity) -> Option<&Transform> {
        self.transforms.get(shape)
    }

    pub fn contains(&self, shape: &ShapeIdentity) -> bool {
        self.transforms.contains_key(shape)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Shapes and transforms in placement order
    pub fn iter(&self) -> impl Iterator<Item = (&ShapeIdentity, &Transform)> {
        self.transforms.iter()
    }

    /// Target region of each cluster, in placement order (for labels)
    pub fn cluster_bounds(&self) -> &[(String, AABB)] {
        &self.cluster_bounds
    }

    pub fn into_transforms(self) -> IndexMap<ShapeIdentity, Transform> {
        self.transforms
    }
}

/// One shape slot inside a packed cluster
struct Slot {
    shape: ShapeIdentity,
    bounds: AABB,
    offset: [f32; 2],
}

/// A cluster packed in its own local frame
struct PackedCluster<'a> {
    name: &'a str,
    index: usize,
    slots: Vec<Slot>,
    /// Shapes without visible geometry; they get no slot
    hollow: Vec<ShapeIdentity>,
    width: f32,
    depth: f32,
}

impl PackedCluster<'_> {
    fn footprint(&self) -> f32 {
        self.width * self.depth
    }
}

/// Computes non-overlapping target placements for clusters
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    shape_spacing: f32,
    cluster_spacing: f32,
    row_aspect_ratio: f32,
}

impl LayoutEngine {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            shape_spacing: config.shape_spacing,
            cluster_spacing: config.cluster_spacing,
            row_aspect_ratio: config.row_aspect_ratio,
        }
    }

    /// Place every shape of every cluster.
    ///
    /// Fails with `IncompleteLayout` when a shape appears in more than one
    /// cluster, since the result could not hold one entry per shape.
    pub fn compute_layout(
        &self,
        clusters: &[Cluster],
        boxes: &impl ShapeBounds,
    ) -> Result<LayoutResult> {
        let expected: usize = clusters.iter().map(Cluster::len).sum();

        let measured: Vec<Vec<(ShapeIdentity, AABB)>> = clusters
            .iter()
            .map(|c| c.shape_ids.iter().map(|s| (*s, boxes.shape_box(s))).collect())
            .collect();

        // Measured boxes may be in a rotated frame; the layout is anchored
        // on the scene as it stands
        let scene_bounds = measured
            .iter()
            .flatten()
            .fold(AABB::empty(), |acc, (shape, _)| acc.union(&boxes.world_box(shape)));
        let floor = measured
            .iter()
            .flatten()
            .map(|(_, b)| b)
            .filter(|b| !b.is_empty())
            .fold(f32::INFINITY, |acc, b| acc.min(b.min.z));
        let unit = mean_extent(measured.iter().flatten().map(|(_, b)| b));
        let shape_gap = self.shape_spacing * unit;
        let cluster_gap = self.cluster_spacing * unit;

        let mut packed: Vec<PackedCluster> = clusters
            .iter()
            .zip(measured)
            .enumerate()
            .map(|(index, (cluster, shapes))| pack_cluster(&cluster.name, index, shapes, shape_gap))
            .collect();
        packed.sort_by(|a, b| {
            b.footprint()
                .total_cmp(&a.footprint())
                .then_with(|| a.name.cmp(b.name))
                .then(a.index.cmp(&b.index))
        });

        // Cluster origins in layout space, padded by the cluster gap
        let padded: Vec<[f32; 2]> = packed
            .iter()
            .map(|c| [c.width + cluster_gap, c.depth + cluster_gap])
            .collect();
        let widest = padded.iter().map(|p| p[0]).fold(0.0f32, f32::max);
        let total_area: f32 = padded.iter().map(|p| p[0] * p[1]).sum();
        let row_width = widest.max((total_area * self.row_aspect_ratio).sqrt());
        let (origins, extent) = shelf_pack(&padded, row_width);

        let center = if scene_bounds.is_empty() {
            Vector3::new(0.0, 0.0, 0.0)
        } else {
            scene_bounds.center()
        };
        let floor = if floor.is_finite() { floor } else { 0.0 };
        let base = [center.x - extent[0] * 0.5, center.y - extent[1] * 0.5];

        let mut transforms = IndexMap::with_capacity(expected);
        let mut cluster_bounds = Vec::with_capacity(packed.len());
        for (cluster, origin) in packed.iter().zip(origins) {
            let corner = [
                base[0] + origin[0] + cluster_gap * 0.5,
                base[1] + origin[1] + cluster_gap * 0.5,
            ];
            let mut region = AABB::empty();
            for slot in &cluster.slots {
                let target_min = Vector3::new(
                    corner[0] + slot.offset[0] + shape_gap * 0.5,
                    corner[1] + slot.offset[1] + shape_gap * 0.5,
                    floor,
                );
                let translation = target_min - slot.bounds.min;
                region = region.union(&slot.bounds.translated(translation));
                transforms.insert(
                    slot.shape,
                    Transform::from_translation_rotation_z(translation, boxes.shape_rotation(&slot.shape)),
                );
            }
            // Nothing visible to place; leave them where they are
            for shape in &cluster.hollow {
                transforms.insert(*shape, Transform::identity());
            }
            cluster_bounds.push((cluster.name.to_string(), region));
        }

        if transforms.len() != expected {
            return Err(ClusterError::IncompleteLayout {
                missing: expected - transforms.len(),
            });
        }

        Ok(LayoutResult {
            transforms,
            cluster_bounds,
        })
    }
}

/// Mean horizontal extent of the non-empty boxes, 1.0 when there are none
fn mean_extent<'a>(boxes: impl Iterator<Item = &'a AABB>) -> f32 {
    let (sum, count) = boxes
        .filter(|b| !b.is_empty())
        .fold((0.0f32, 0usize), |(sum, count), b| {
            let size = b.size();
            (sum + (size.x + size.y) * 0.5, count + 1)
        });
    if count == 0 || sum <= 0.0 {
        1.0
    } else {
        sum / count as f32
    }
}

fn pack_cluster<'a>(
    name: &'a str,
    index: usize,
    shapes: Vec<(ShapeIdentity, AABB)>,
    gap: f32,
) -> PackedCluster<'a> {
    let (solid, hollow): (Vec<_>, Vec<_>) = shapes.into_iter().enumerate().partition(|(_, (_, b))| !b.is_empty());

    let mut solid: Vec<(usize, ShapeIdentity, AABB)> =
        solid.into_iter().map(|(i, (s, b))| (i, s, b)).collect();
    // Deepest first keeps shelf rows evenly filled
    solid.sort_by(|a, b| {
        let (da, db) = (a.2.size().y, b.2.size().y);
        db.total_cmp(&da).then(a.0.cmp(&b.0))
    });

    let sizes: Vec<[f32; 2]> = solid
        .iter()
        .map(|(_, _, b)| {
            let size = b.size();
            [size.x + gap, size.y + gap]
        })
        .collect();
    let widest = sizes.iter().map(|s| s[0]).fold(0.0f32, f32::max);
    let area: f32 = sizes.iter().map(|s| s[0] * s[1]).sum();
    let (offsets, extent) = shelf_pack(&sizes, widest.max(area.sqrt()));

    PackedCluster {
        name,
        index,
        slots: solid
            .into_iter()
            .zip(offsets)
            .map(|((_, shape, bounds), offset)| Slot {
                shape,
                bounds,
                offset,
            })
            .collect(),
        hollow: hollow.into_iter().map(|(_, (s, _))| s).collect(),
        width: extent[0],
        depth: extent[1],
    }
}

/// Place rectangles left to right in rows no wider than `max_width`.
///
/// Returns each rectangle's min corner and the overall extent.
fn shelf_pack(sizes: &[[f32; 2]], max_width: f32) -> (Vec<[f32; 2]>, [f32; 2]) {
    let mut origins = Vec::with_capacity(sizes.len());
    let (mut x, mut y, mut row_depth, mut width) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);

    for size in sizes {
        if x > 0.0 && x + size[0] > max_width * (1.0 + WRAP_EPSILON) {
            y += row_depth;
            x = 0.0;
            row_depth = 0.0;
        }
        origins.push([x, y]);
        x += size[0];
        width = width.max(x);
        row_depth = row_depth.max(size[1]);
    }
    (origins, [width, y + row_depth])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SourceId;
    use cgmath::Deg;

    fn shape(id: u32) -> ShapeIdentity {
        ShapeIdentity::new(SourceId(1), id)
    }

    fn unit_at(x: f32, y: f32) -> AABB {
        AABB::new(Vector3::new(x, y, 0.0), Vector3::new(x + 1.0, y + 1.0, 1.0))
    }

    fn placed(layout: &LayoutResult, boxes: &HashMap<ShapeIdentity, AABB>, s: &ShapeIdentity) -> AABB {
        let t = layout.transform(s).unwrap();
        boxes[s].translated(t.translation)
    }

    fn doors_and_windows() -> (Vec<Cluster>, HashMap<ShapeIdentity, AABB>) {
        let clusters = vec![
            Cluster::new("Windows", vec![shape(3)]),
            Cluster::new("Doors", vec![shape(1), shape(2)]),
        ];
        let boxes: HashMap<_, _> = [
            (shape(1), unit_at(0.0, 0.0)),
            (shape(2), unit_at(5.0, 3.0)),
            (shape(3), unit_at(-2.0, 8.0)),
        ]
        .into_iter()
        .collect();
        (clusters, boxes)
    }

    #[test]
    fn test_doors_and_windows_side_by_side() {
        let (clusters, boxes) = doors_and_windows();
        let engine = LayoutEngine::new(&ClusterConfig::default());
        let layout = engine.compute_layout(&clusters, &boxes).unwrap();

        assert_eq!(layout.len(), 3);
        let names: Vec<_> = layout.cluster_bounds().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Doors", "Windows"]);

        let doors = &layout.cluster_bounds()[0].1;
        let windows = &layout.cluster_bounds()[1].1;
        assert!(doors.max.x < windows.min.x, "Doors must be left of Windows");
        assert!(!doors.overlaps_xy(windows, 1e-5));
        // Same row: the two groups share their near edge
        assert!((doors.min.y - windows.min.y).abs() < 1e-4);

        let a = placed(&layout, &boxes, &shape(1));
        let b = placed(&layout, &boxes, &shape(2));
        assert!(!a.overlaps_xy(&b, 1e-5));
        assert_eq!(a.min.z, 0.0);
    }

    #[test]
    fn test_equal_footprints_order_by_name() {
        let clusters = vec![
            Cluster::new("Walls", vec![shape(1)]),
            Cluster::new("Beams", vec![shape(2)]),
        ];
        let boxes: HashMap<_, _> = [(shape(1), unit_at(0.0, 0.0)), (shape(2), unit_at(3.0, 0.0))]
            .into_iter()
            .collect();
        let layout = LayoutEngine::new(&ClusterConfig::default())
            .compute_layout(&clusters, &boxes)
            .unwrap();

        assert_eq!(layout.cluster_bounds()[0].0, "Beams");
        assert!(placed(&layout, &boxes, &shape(2)).max.x < placed(&layout, &boxes, &shape(1)).min.x);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let (clusters, boxes) = doors_and_windows();
        let engine = LayoutEngine::new(&ClusterConfig::default());

        let first = engine.compute_layout(&clusters, &boxes).unwrap();
        let second = engine.compute_layout(&clusters, &boxes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_layout_is_centered_on_scene() {
        let (clusters, boxes) = doors_and_windows();
        let layout = LayoutEngine::new(&ClusterConfig::default())
            .compute_layout(&clusters, &boxes)
            .unwrap();

        let before = boxes.values().fold(AABB::empty(), |acc, b| acc.union(b));
        let after = layout
            .cluster_bounds()
            .iter()
            .fold(AABB::empty(), |acc, (_, b)| acc.union(b));
        // The packed extent includes outer gaps, so centers agree only roughly
        assert!((before.center().x - after.center().x).abs() < 1.0);
        assert!((before.center().y - after.center().y).abs() < 1.0);
    }

    #[test]
    fn test_many_clusters_wrap_into_rows() {
        let clusters: Vec<Cluster> = (0..9)
            .map(|i| Cluster::new(format!("C{}", i), vec![shape(i)]))
            .collect();
        let boxes: HashMap<_, _> = (0..9).map(|i| (shape(i), unit_at(i as f32, 0.0))).collect();
        let layout = LayoutEngine::new(&ClusterConfig::default())
            .compute_layout(&clusters, &boxes)
            .unwrap();

        let rows: std::collections::BTreeSet<i64> = layout
            .cluster_bounds()
            .iter()
            .map(|(_, b)| (b.min.y * 1000.0).round() as i64)
            .collect();
        assert!(rows.len() > 1);
    }

    #[test]
    fn test_shapes_without_geometry_keep_their_place() {
        let clusters = vec![Cluster::new("Misc", vec![shape(1), shape(2)])];
        let boxes: HashMap<_, _> = [(shape(1), unit_at(4.0, 4.0))].into_iter().collect();
        let layout = LayoutEngine::new(&ClusterConfig::default())
            .compute_layout(&clusters, &boxes)
            .unwrap();

        assert_eq!(layout.len(), 2);
        assert!(layout.transform(&shape(2)).unwrap().is_identity());
    }

    #[test]
    fn test_shape_in_two_clusters_is_incomplete() {
        let clusters = vec![
            Cluster::new("A", vec![shape(1)]),
            Cluster::new("B", vec![shape(1)]),
        ];
        let boxes: HashMap<_, _> = [(shape(1), unit_at(0.0, 0.0))].into_iter().collect();
        let result = LayoutEngine::new(&ClusterConfig::default()).compute_layout(&clusters, &boxes);

        assert!(matches!(result, Err(ClusterError::IncompleteLayout { missing: 1 })));
    }

    #[test]
    fn test_rotation_is_carried_into_transforms() {
        struct Rotated(HashMap<ShapeIdentity, AABB>);
        impl ShapeBounds for Rotated {
            fn shape_box(&self, shape: &ShapeIdentity) -> AABB {
                self.0.shape_box(shape)
            }
            fn shape_rotation(&self, _shape: &ShapeIdentity) -> Rad<f32> {
                Deg(30.0).into()
            }
        }

        let (clusters, boxes) = doors_and_windows();
        let layout = LayoutEngine::new(&ClusterConfig::default())
            .compute_layout(&clusters, &Rotated(boxes))
            .unwrap();
        for (_, t) in layout.iter() {
            assert!(!t.is_identity());
            assert!((t.rotation.s - 15.0f32.to_radians().cos()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rotated_boxes_are_centered_on_the_scene() {
        // Boxes measured after a 90 degree turn about the origin, for shapes
        // that actually sit around (100, 100)
        struct Turned(HashMap<ShapeIdentity, AABB>);
        impl ShapeBounds for Turned {
            fn shape_box(&self, shape: &ShapeIdentity) -> AABB {
                self.0.shape_box(shape).transform(&Matrix4::from_angle_z(Deg(90.0)))
            }
            fn shape_rotation(&self, _shape: &ShapeIdentity) -> Rad<f32> {
                Deg(90.0).into()
            }
            fn world_box(&self, shape: &ShapeIdentity) -> AABB {
                self.0.shape_box(shape)
            }
        }

        let clusters = vec![Cluster::new("Beams", vec![shape(1), shape(2), shape(3)])];
        let world: HashMap<_, _> = (1..=3)
            .map(|i| (shape(i), unit_at(100.0 + i as f32 * 2.0, 100.0)))
            .collect();
        let before = world.values().fold(AABB::empty(), |acc, b| acc.union(b));
        let layout = LayoutEngine::new(&ClusterConfig::default())
            .compute_layout(&clusters, &Turned(world))
            .unwrap();

        let after = layout.cluster_bounds()[0].1;
        assert!((before.center().x - after.center().x).abs() < 2.0);
        assert!((before.center().y - after.center().y).abs() < 2.0);
    }

    #[test]
    fn test_hollow_shapes_stay_put_under_rotation() {
        struct Rotated(HashMap<ShapeIdentity, AABB>);
        impl ShapeBounds for Rotated {
            fn shape_box(&self, shape: &ShapeIdentity) -> AABB {
                self.0.shape_box(shape)
            }
            fn shape_rotation(&self, _shape: &ShapeIdentity) -> Rad<f32> {
                Deg(25.0).into()
            }
        }

        let clusters = vec![Cluster::new("Misc", vec![shape(1), shape(2)])];
        let boxes: HashMap<_, _> = [(shape(1), unit_at(40.0, 40.0))].into_iter().collect();
        let layout = LayoutEngine::new(&ClusterConfig::default())
            .compute_layout(&clusters, &Rotated(boxes))
            .unwrap();

        assert!(layout.transform(&shape(2)).unwrap().is_identity());
        assert!(!layout.transform(&shape(1)).unwrap().is_identity());
    }

    #[test]
    fn test_empty_input() {
        let layout = LayoutEngine::new(&ClusterConfig::default())
            .compute_layout(&[], &HashMap::new())
            .unwrap();
        assert!(layout.is_empty());
    }
}
