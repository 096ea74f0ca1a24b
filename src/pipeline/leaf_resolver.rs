//! # Leaf Resolution
//!
//! Finds the elements of a source that should be classified: the leaves of
//! its hierarchy, with raw geometry primitives ("mesh", "body", ...) promoted
//! to the element named by their `parent` property.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::try_join_all;
use indexmap::IndexSet;
use log::debug;

use crate::config::ClusterConfig;
use crate::error::{ClusterError, Result};
use crate::host::{PropertyRecord, SceneHost};
use crate::scene::{ElementId, SourceId};

/// Resolves and caches the classified element set of each source
pub struct LeafResolver<H: SceneHost> {
    host: Rc<H>,
    batch_size: usize,
    config: ClusterConfig,
    cache: RefCell<HashMap<SourceId, Vec<ElementId>>>,
}

impl<H: SceneHost> LeafResolver<H> {
    pub fn new(host: Rc<H>, config: &ClusterConfig) -> Self {
        Self {
            host,
            batch_size: config.batch_size.max(1),
            config: config.clone(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve the element set of `source`.
    ///
    /// With `use_cache`, a previously resolved set is returned unchanged even
    /// if the scene has changed since; callers invalidate explicitly. A failed
    /// property batch fails the whole call and caches nothing.
    pub async fn resolve(&self, source: SourceId, use_cache: bool) -> Result<Vec<ElementId>> {
        if use_cache {
            if let Some(hit) = self.cache.borrow().get(&source) {
                debug!("leaf cache hit for {} ({} elements)", source, hit.len());
                return Ok(hit.clone());
            }
        }

        let root = self
            .host
            .root(source)
            .ok_or(ClusterError::UnknownSource(source))?;
        let leaves = self.collect_leaves(source, root);

        let mut names = vec![self.config.parent_property.clone()];
        names.extend(self.config.marker_properties.iter().cloned());

        let batches = leaves.chunks(self.batch_size).map(|chunk| {
            self.host
                .bulk_properties(source, chunk.to_vec(), names.clone())
        });
        let answers = try_join_all(batches)
            .await
            .map_err(|cause| ClusterError::query(source, cause))?;

        let records: HashMap<ElementId, PropertyRecord> = answers
            .into_iter()
            .flatten()
            .map(|record| (record.element_id, record))
            .collect();

        let mut resolved = IndexSet::with_capacity(leaves.len());
        for leaf in &leaves {
            let id = match records.get(leaf) {
                Some(record) if self.is_geometry_primitive(record) => {
                    match record
                        .property(&self.config.parent_property)
                        .and_then(|v| v.as_element_id())
                    {
                        Some(parent) => parent,
                        None => {
                            // No usable parent reference: keep the primitive itself
                            debug!("{} element {} has no parent reference", source, leaf);
                            *leaf
                        }
                    }
                }
                _ => *leaf,
            };
            resolved.insert(id);
        }

        let resolved: Vec<ElementId> = resolved.into_iter().collect();
        debug!(
            "resolved {} leaves of {} into {} elements",
            leaves.len(),
            source,
            resolved.len()
        );

        if use_cache {
            self.cache.borrow_mut().insert(source, resolved.clone());
        }
        Ok(resolved)
    }

    /// Drop the cached set of one source
    pub fn invalidate(&self, source: SourceId) {
        self.cache.borrow_mut().remove(&source);
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn is_cached(&self, source: SourceId) -> bool {
        self.cache.borrow().contains_key(&source)
    }

    /// Elements without children, in depth-first hierarchy order
    fn collect_leaves(&self, source: SourceId, root: ElementId) -> Vec<ElementId> {
        let mut leaves = Vec::new();
        let mut stack = vec![root];
        while let Some(element) = stack.pop() {
            let children = self.host.children(source, element);
            if children.is_empty() {
                leaves.push(element);
            } else {
                stack.extend(children.into_iter().rev());
            }
        }
        leaves
    }

    fn is_geometry_primitive(&self, record: &PropertyRecord) -> bool {
        self.config.is_geometry_marker(&record.name)
            || record
                .properties
                .iter()
                .filter(|p| !p.name.eq_ignore_ascii_case(&self.config.parent_property))
                .any(|p| self.config.is_geometry_marker(&p.value.display()))
    }
}
