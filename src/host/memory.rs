//! # In-Memory Scene Host
//!
//! A self-contained [`SceneHost`] backed by plain maps. It stands in for the
//! host viewer in tests and demos: element hierarchy, property database,
//! box-shaped fragments with visibility flags, and a transform store that
//! records what the animation pushes.
//!
//! Property queries can be made to yield before answering
//! ([`MemoryScene::set_query_delay`]) or to fail ([`MemoryScene::fail_queries`])
//! so asynchronous interleavings and error paths can be exercised.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use cgmath::Vector3;
use futures::future::{FutureExt, LocalBoxFuture};

use super::traits::{
    FragmentId, Property, PropertyRecord, PropertyValue, SceneHost, TransformSink,
};
use crate::error::HostError;
use crate::scene::{ElementId, ShapeIdentity, SourceId, Transform, AABB};

#[derive(Debug, Clone, Default)]
struct Node {
    name: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    properties: Vec<Property>,
    fragments: Vec<FragmentId>,
}

#[derive(Debug, Clone)]
struct Fragment {
    points: Vec<Vector3<f32>>,
    loaded: bool,
    hidden: bool,
}

/// One scene source (model) held by [`MemoryScene`]
#[derive(Debug, Clone)]
pub struct MemorySource {
    id: SourceId,
    root: ElementId,
    has_property_db: bool,
    nodes: BTreeMap<ElementId, Node>,
    fragments: BTreeMap<FragmentId, Fragment>,
    next_fragment: FragmentId,
}

impl MemorySource {
    /// Create a source containing only its root element
    pub fn new(id: SourceId, root: ElementId) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            root,
            Node {
                name: "Model".to_string(),
                ..Node::default()
            },
        );
        Self {
            id,
            root,
            has_property_db: true,
            nodes,
            fragments: BTreeMap::new(),
            next_fragment: 1,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn set_property_db(&mut self, loaded: bool) -> &mut Self {
        self.has_property_db = loaded;
        self
    }

    /// Add an element under `parent`
    pub fn add_element(&mut self, id: ElementId, parent: ElementId, name: &str) -> &mut Self {
        self.nodes.insert(
            id,
            Node {
                name: name.to_string(),
                parent: Some(parent),
                ..Node::default()
            },
        );
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        self
    }

    pub fn set_property(
        &mut self,
        element: ElementId,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(&element) {
            let value = value.into();
            match node.properties.iter_mut().find(|p| p.name == name) {
                Some(existing) => existing.value = value,
                None => node.properties.push(Property {
                    name: name.to_string(),
                    value,
                }),
            }
        }
        self
    }

    /// Attach a box-shaped fragment to an element
    pub fn add_box_fragment(&mut self, element: ElementId, bounds: AABB) -> FragmentId {
        self.add_fragment(element, bounds.corners().to_vec())
    }

    /// Attach a fragment made of arbitrary points to an element
    pub fn add_fragment(&mut self, element: ElementId, points: Vec<Vector3<f32>>) -> FragmentId {
        let id = self.next_fragment;
        self.next_fragment += 1;
        self.fragments.insert(
            id,
            Fragment {
                points,
                loaded: true,
                hidden: false,
            },
        );
        if let Some(node) = self.nodes.get_mut(&element) {
            node.fragments.push(id);
        }
        id
    }

    pub fn set_fragment_hidden(&mut self, fragment: FragmentId, hidden: bool) -> &mut Self {
        if let Some(f) = self.fragments.get_mut(&fragment) {
            f.hidden = hidden;
        }
        self
    }

    pub fn set_fragment_loaded(&mut self, fragment: FragmentId, loaded: bool) -> &mut Self {
        if let Some(f) = self.fragments.get_mut(&fragment) {
            f.loaded = loaded;
        }
        self
    }

    fn collect_fragments(&self, element: ElementId, out: &mut Vec<FragmentId>) {
        if let Some(node) = self.nodes.get(&element) {
            out.extend(node.fragments.iter().copied());
            for child in &node.children {
                self.collect_fragments(*child, out);
            }
        }
    }

    fn record(&self, id: ElementId, names: &[String]) -> Option<PropertyRecord> {
        let node = self.nodes.get(&id)?;
        let properties: Vec<Property> = node
            .properties
            .iter()
            .filter(|p| names.is_empty() || names.iter().any(|n| n.eq_ignore_ascii_case(&p.name)))
            .cloned()
            .collect();
        Some(PropertyRecord {
            element_id: id,
            name: node.name.clone(),
            properties,
        })
    }
}

/// In-memory implementation of the host viewer
#[derive(Debug, Default)]
pub struct MemoryScene {
    sources: RefCell<BTreeMap<SourceId, MemorySource>>,
    transforms: RefCell<HashMap<ShapeIdentity, Transform>>,
    failing: RefCell<HashSet<SourceId>>,
    query_delay: Cell<usize>,
    query_count: Cell<usize>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or replace) a source
    pub fn add_source(&self, source: MemorySource) {
        self.sources.borrow_mut().insert(source.id, source);
    }

    pub fn remove_source(&self, source: SourceId) -> Option<MemorySource> {
        self.sources.borrow_mut().remove(&source)
    }

    /// Mutate a loaded source in place
    pub fn edit_source<R>(&self, source: SourceId, f: impl FnOnce(&mut MemorySource) -> R) -> Option<R> {
        self.sources.borrow_mut().get_mut(&source).map(f)
    }

    /// Make every property query against `source` fail
    pub fn fail_queries(&self, source: SourceId, fail: bool) {
        let mut failing = self.failing.borrow_mut();
        if fail {
            failing.insert(source);
        } else {
            failing.remove(&source);
        }
    }

    /// Number of times a property query yields to the executor before answering
    pub fn set_query_delay(&self, polls: usize) {
        self.query_delay.set(polls);
    }

    /// Total property queries issued so far
    pub fn query_count(&self) -> usize {
        self.query_count.get()
    }

    /// Transform most recently pushed for a shape, identity if none
    pub fn transform_of(&self, shape: &ShapeIdentity) -> Transform {
        self.transforms
            .borrow()
            .get(shape)
            .copied()
            .unwrap_or_default()
    }

    /// Every shape that has received a non-identity transform
    pub fn moved_shapes(&self) -> Vec<ShapeIdentity> {
        let mut moved: Vec<_> = self
            .transforms
            .borrow()
            .iter()
            .filter(|(_, t)| !t.is_identity())
            .map(|(shape, _)| *shape)
            .collect();
        moved.sort();
        moved
    }
}

impl TransformSink for MemoryScene {
    fn apply_transform(&self, shape: &ShapeIdentity, transform: &Transform) {
        self.transforms.borrow_mut().insert(*shape, *transform);
    }
}

impl SceneHost for MemoryScene {
    fn sources(&self) -> Vec<SourceId> {
        self.sources.borrow().keys().copied().collect()
    }

    fn has_property_db(&self, source: SourceId) -> bool {
        self.sources
            .borrow()
            .get(&source)
            .map_or(false, |s| s.has_property_db)
    }

    fn root(&self, source: SourceId) -> Option<ElementId> {
        self.sources.borrow().get(&source).map(|s| s.root)
    }

    fn children(&self, source: SourceId, element: ElementId) -> Vec<ElementId> {
        self.sources
            .borrow()
            .get(&source)
            .and_then(|s| s.nodes.get(&element))
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn bulk_properties(
        &self,
        source: SourceId,
        ids: Vec<ElementId>,
        names: Vec<String>,
    ) -> LocalBoxFuture<'_, Result<Vec<PropertyRecord>, HostError>> {
        self.query_count.set(self.query_count.get() + 1);
        let delay = self.query_delay.get();
        async move {
            for _ in 0..delay {
                YieldNow::default().await;
            }
            if self.failing.borrow().contains(&source) {
                return Err(HostError::new(format!("property database unavailable for {}", source)));
            }
            let sources = self.sources.borrow();
            let src = sources
                .get(&source)
                .ok_or_else(|| HostError::new(format!("{} is not loaded", source)))?;
            if !src.has_property_db {
                return Err(HostError::new(format!("{} has no property database", source)));
            }
            Ok(ids.iter().filter_map(|id| src.record(*id, &names)).collect())
        }
        .boxed_local()
    }

    fn fragments(&self, source: SourceId, element: ElementId) -> Vec<FragmentId> {
        let mut out = Vec::new();
        if let Some(src) = self.sources.borrow().get(&source) {
            src.collect_fragments(element, &mut out);
        }
        out
    }

    fn fragment_visible(&self, source: SourceId, fragment: FragmentId) -> bool {
        self.sources
            .borrow()
            .get(&source)
            .and_then(|s| s.fragments.get(&fragment))
            .map_or(false, |f| f.loaded && !f.hidden)
    }

    fn fragment_points(&self, source: SourceId, fragment: FragmentId) -> Vec<Vector3<f32>> {
        self.sources
            .borrow()
            .get(&source)
            .and_then(|s| s.fragments.get(&fragment))
            .map(|f| f.points.clone())
            .unwrap_or_default()
    }
}

/// Future that returns `Pending` once, waking itself, before completing
#[derive(Default)]
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemorySource {
        let mut src = MemorySource::new(SourceId(1), 1);
        src.add_element(2, 1, "Door [2]").add_element(3, 2, "Mesh");
        src.set_property(2, "Category", "Doors")
            .set_property(3, "parent", 2);
        src.add_box_fragment(
            3,
            AABB::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 2.0)),
        );
        src
    }

    #[test]
    fn test_hierarchy_and_fragments() {
        let scene = MemoryScene::new();
        scene.add_source(sample());

        assert_eq!(scene.sources(), vec![SourceId(1)]);
        assert_eq!(scene.children(SourceId(1), 1), vec![2]);
        assert_eq!(scene.fragments(SourceId(1), 1).len(), 1);
        assert_eq!(scene.fragment_points(SourceId(1), 1).len(), 8);
        assert!(scene.fragment_visible(SourceId(1), 1));
    }

    #[test]
    fn test_bulk_properties_filters_by_name() {
        let scene = MemoryScene::new();
        scene.add_source(sample());
        scene.set_query_delay(2);

        let records = pollster::block_on(scene.bulk_properties(
            SourceId(1),
            vec![2, 3, 99],
            vec!["parent".to_string()],
        ))
        .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].property("Category").is_none());
        assert_eq!(records[1].property("parent"), Some(&PropertyValue::Integer(2)));
        assert_eq!(scene.query_count(), 1);
    }

    #[test]
    fn test_failing_source_rejects_queries() {
        let scene = MemoryScene::new();
        scene.add_source(sample());
        scene.fail_queries(SourceId(1), true);

        let result = pollster::block_on(scene.bulk_properties(SourceId(1), vec![2], Vec::new()));
        assert!(result.is_err());
    }
}
