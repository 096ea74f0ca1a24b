//! # Configuration
//!
//! Tuning knobs for every pipeline stage, gathered in one plain struct so the
//! host can inject them when it constructs the extension.

use std::collections::HashSet;

use crate::animation::Easing;

/// Configuration for leaf resolution, clustering, layout and animation
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Maximum number of elements per bulk property query
    pub batch_size: usize,
    /// Lowercase names/values marking a raw geometry primitive (promoted to its parent)
    pub geometry_markers: HashSet<String>,
    /// Extra properties whose values are checked against `geometry_markers`
    pub marker_properties: Vec<String>,
    /// Property holding the parent element id of a geometry primitive
    pub parent_property: String,
    /// Cluster name for elements without a usable attribute value
    pub uncategorized_label: String,
    /// Attribute values that never form their own cluster
    pub excluded_names: HashSet<String>,
    /// Attribute clustered on when the layout is activated before any selection
    pub default_attribute: String,
    /// Replace each classified element by its visible descendant leaves
    pub expand_to_descendants: bool,
    /// Rotate each source so its horizontal footprint is minimal before layout
    pub align_rotation: bool,
    /// Gap between shapes inside a cluster, as a ratio of the mean shape extent
    pub shape_spacing: f32,
    /// Gap between clusters, as a ratio of the mean shape extent
    pub cluster_spacing: f32,
    /// Target width/depth ratio of the overall layout
    pub row_aspect_ratio: f32,
    /// Length of a full transition in seconds
    pub transition_duration: f32,
    pub easing: Easing,
}

impl ClusterConfig {
    pub const DEFAULT_BATCH_SIZE: usize = 1000;
    pub const DEFAULT_PARENT_PROPERTY: &'static str = "parent";
    pub const DEFAULT_ATTRIBUTE: &'static str = "Category";
    pub const DEFAULT_UNCATEGORIZED_LABEL: &'static str = "Uncategorized";
    pub const DEFAULT_SHAPE_SPACING: f32 = 0.1;
    pub const DEFAULT_CLUSTER_SPACING: f32 = 0.5;
    pub const DEFAULT_ROW_ASPECT_RATIO: f32 = 2.0;
    pub const DEFAULT_TRANSITION_DURATION: f32 = 1.5;
    pub const DEFAULT_GEOMETRY_MARKERS: [&'static str; 2] = ["mesh", "body"];
    pub const DEFAULT_MARKER_PROPERTIES: [&'static str; 1] = ["Type"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_geometry_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.geometry_markers = markers
            .into_iter()
            .map(|m| m.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn with_marker_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.marker_properties = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parent_property(mut self, name: impl Into<String>) -> Self {
        self.parent_property = name.into();
        self
    }

    pub fn with_uncategorized_label(mut self, label: impl Into<String>) -> Self {
        self.uncategorized_label = label.into();
        self
    }

    pub fn with_excluded_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.default_attribute = attribute.into();
        self
    }

    pub fn with_descendant_expansion(mut self, enabled: bool) -> Self {
        self.expand_to_descendants = enabled;
        self
    }

    pub fn with_rotation_alignment(mut self, enabled: bool) -> Self {
        self.align_rotation = enabled;
        self
    }

    pub fn with_spacing(mut self, shape_spacing: f32, cluster_spacing: f32) -> Self {
        self.shape_spacing = shape_spacing.max(0.0);
        self.cluster_spacing = cluster_spacing.max(0.0);
        self
    }

    pub fn with_row_aspect_ratio(mut self, ratio: f32) -> Self {
        self.row_aspect_ratio = if ratio > 0.0 {
            ratio
        } else {
            Self::DEFAULT_ROW_ASPECT_RATIO
        };
        self
    }

    pub fn with_transition(mut self, duration: f32, easing: Easing) -> Self {
        self.transition_duration = duration.max(0.0);
        self.easing = easing;
        self
    }

    /// True when `value` (case-insensitive) marks a raw geometry primitive
    pub fn is_geometry_marker(&self, value: &str) -> bool {
        self.geometry_markers.contains(&value.trim().to_lowercase())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::DEFAULT_BATCH_SIZE,
            geometry_markers: Self::DEFAULT_GEOMETRY_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            marker_properties: Self::DEFAULT_MARKER_PROPERTIES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            parent_property: Self::DEFAULT_PARENT_PROPERTY.to_string(),
            uncategorized_label: Self::DEFAULT_UNCATEGORIZED_LABEL.to_string(),
            excluded_names: HashSet::new(),
            default_attribute: Self::DEFAULT_ATTRIBUTE.to_string(),
            expand_to_descendants: false,
            align_rotation: false,
            shape_spacing: Self::DEFAULT_SHAPE_SPACING,
            cluster_spacing: Self::DEFAULT_CLUSTER_SPACING,
            row_aspect_ratio: Self::DEFAULT_ROW_ASPECT_RATIO,
            transition_duration: Self::DEFAULT_TRANSITION_DURATION,
            easing: Easing::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_are_case_insensitive() {
        let config = ClusterConfig::default();
        assert!(config.is_geometry_marker("Mesh"));
        assert!(config.is_geometry_marker(" BODY "));
        assert!(!config.is_geometry_marker("Door"));

        let custom = ClusterConfig::new().with_geometry_markers(["Solid"]);
        assert!(custom.is_geometry_marker("solid"));
        assert!(!custom.is_geometry_marker("mesh"));
    }

    #[test]
    fn test_builder_clamps_values() {
        let config = ClusterConfig::new()
            .with_batch_size(0)
            .with_row_aspect_ratio(-1.0)
            .with_transition(-2.0, Easing::Linear);

        assert_eq!(config.batch_size, 1);
        assert_eq!(config.row_aspect_ratio, ClusterConfig::DEFAULT_ROW_ASPECT_RATIO);
        assert_eq!(config.transition_duration, 0.0);
    }
}
