//! # Cluster Building
//!
//! Groups the resolved elements of every source by the display value of one
//! attribute. Sources are classified concurrently and merged only after all
//! of them answered; one failing source fails the whole build.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use futures::future::try_join_all;
use indexmap::IndexMap;
use log::debug;

use super::leaf_resolver::LeafResolver;
use crate::config::ClusterConfig;
use crate::error::{ClusterError, Result};
use crate::host::SceneHost;
use crate::scene::{ElementId, ShapeIdentity, SourceId};

/// A named group of shapes sharing one attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub name: String,
    pub shape_ids: Vec<ShapeIdentity>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, shape_ids: Vec<ShapeIdentity>) -> Self {
        Self {
            name: name.into(),
            shape_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.shape_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shape_ids.is_empty()
    }
}

type Grouping = IndexMap<String, Vec<ShapeIdentity>>;

/// Builds clusters from attribute values queried through the host
pub struct ClusterBuilder<H: SceneHost> {
    host: Rc<H>,
    resolver: LeafResolver<H>,
    config: ClusterConfig,
}

impl<H: SceneHost> ClusterBuilder<H> {
    pub fn new(host: Rc<H>, config: &ClusterConfig) -> Self {
        Self {
            resolver: LeafResolver::new(host.clone(), config),
            host,
            config: config.clone(),
        }
    }

    /// The leaf resolver whose cache this builder reads through
    pub fn resolver(&self) -> &LeafResolver<H> {
        &self.resolver
    }

    /// Cluster every classified element of `sources` by `attribute`.
    ///
    /// With `expand_to_descendants`, each classified element is replaced by
    /// its descendant leaves that have at least one visible fragment.
    /// Clusters come out in first-seen order of their value, walking the
    /// sources in the order given; a shape claimed by an earlier cluster is
    /// not repeated.
    pub async fn build(
        &self,
        sources: &[SourceId],
        attribute: &str,
        expand_to_descendants: bool,
    ) -> Result<Vec<Cluster>> {
        let contributions = try_join_all(
            sources
                .iter()
                .map(|source| self.classify_source(*source, attribute, expand_to_descendants)),
        )
        .await?;

        let mut merged: Grouping = IndexMap::new();
        let mut claimed: HashSet<ShapeIdentity> = HashSet::new();
        for grouping in contributions {
            for (name, shapes) in grouping {
                let members = merged.entry(name).or_default();
                members.extend(shapes.into_iter().filter(|shape| claimed.insert(*shape)));
            }
        }

        let clusters: Vec<Cluster> = merged
            .into_iter()
            .filter(|(_, shapes)| !shapes.is_empty())
            .map(|(name, shapes)| Cluster::new(name, shapes))
            .collect();

        debug!(
            "built {} clusters over {} shapes by `{}`",
            clusters.len(),
            claimed.len(),
            attribute
        );
        Ok(clusters)
    }

    async fn classify_source(
        &self,
        source: SourceId,
        attribute: &str,
        expand_to_descendants: bool,
    ) -> Result<Grouping> {
        let elements = self.resolver.resolve(source, true).await?;
        let values = self.query_values(source, &elements, attribute).await?;

        let mut grouping: Grouping = IndexMap::new();
        for element in &elements {
            let label = values
                .get(element)
                .filter(|value| !value.is_empty() && !self.config.excluded_names.contains(*value))
                .cloned()
                .unwrap_or_else(|| self.config.uncategorized_label.clone());

            let members = grouping.entry(label).or_default();
            if expand_to_descendants {
                members.extend(
                    self.visible_descendant_leaves(source, *element)
                        .into_iter()
                        .map(|leaf| ShapeIdentity::new(source, leaf)),
                );
            } else {
                members.push(ShapeIdentity::new(source, *element));
            }
        }
        Ok(grouping)
    }

    /// Display value of `attribute` per element; elements without it are absent
    async fn query_values(
        &self,
        source: SourceId,
        elements: &[ElementId],
        attribute: &str,
    ) -> Result<HashMap<ElementId, String>> {
        let names = vec![attribute.to_string()];
        let batches = elements.chunks(self.config.batch_size.max(1)).map(|chunk| {
            self.host
                .bulk_properties(source, chunk.to_vec(), names.clone())
        });
        let answers = try_join_all(batches)
            .await
            .map_err(|cause| ClusterError::query(source, cause))?;

        Ok(answers
            .into_iter()
            .flatten()
            .filter_map(|record| {
                let value = match record.property(attribute) {
                    Some(value) => value.display(),
                    // The element name is always available even without a property row
                    None if attribute.eq_ignore_ascii_case("name") => record.name.trim().to_string(),
                    None => return None,
                };
                Some((record.element_id, value))
            })
            .collect())
    }

    /// Leaves under `element` (itself when it is a leaf) with a visible fragment
    fn visible_descendant_leaves(&self, source: SourceId, element: ElementId) -> Vec<ElementId> {
        let mut leaves = Vec::new();
        let mut stack = vec![element];
        while let Some(current) = stack.pop() {
            let children = self.host.children(source, current);
            if !children.is_empty() {
                stack.extend(children.into_iter().rev());
                continue;
            }
            let visible = self
                .host
                .fragments(source, current)
                .into_iter()
                .any(|fragment| self.host.fragment_visible(source, fragment));
            if visible {
                leaves.push(current);
            }
        }
        leaves
    }
}
