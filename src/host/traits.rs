//! # Host Traits
//!
//! The capability set the clustering pipeline needs from the host viewer.
//! The host owns the scene graph, the property database and rendering; this
//! crate only queries it and pushes per-element transform deltas back.

use cgmath::Vector3;
use futures::future::LocalBoxFuture;

use crate::error::HostError;
use crate::scene::{ElementId, ShapeIdentity, SourceId, Transform};

/// Renderable sub-part of an element (a fragment in the host's terms)
pub type FragmentId = u32;

/// Display value of one property as reported by the property database
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl PropertyValue {
    /// Value as shown to users, empty text for blank values
    pub fn display(&self) -> String {
        match self {
            PropertyValue::Text(text) => text.trim().to_string(),
            PropertyValue::Integer(value) => value.to_string(),
            PropertyValue::Number(value) => value.to_string(),
        }
    }

    /// Interpret the value as an element id (used for `parent` references)
    pub fn as_element_id(&self) -> Option<ElementId> {
        match self {
            PropertyValue::Text(text) => text.trim().parse().ok(),
            PropertyValue::Integer(value) => ElementId::try_from(*value).ok(),
            PropertyValue::Number(value) => {
                if value.fract() == 0.0 && *value >= 0.0 && *value <= ElementId::MAX as f64 {
                    Some(*value as ElementId)
                } else {
                    None
                }
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Integer(i64::from(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

/// One row of a bulk property answer
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub element_id: ElementId,
    /// Element display name
    pub name: String,
    pub properties: Vec<Property>,
}

impl PropertyRecord {
    /// Look up a property by name, case-insensitive
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.value)
    }
}

/// Receiver of per-element transform deltas (the host's render-side proxies)
pub trait TransformSink {
    fn apply_transform(&self, shape: &ShapeIdentity, transform: &Transform);
}

/// Scene query surface of the host viewer.
///
/// Tree and geometry lookups are synchronous like the host's instance tree;
/// property lookups go to the property database and are asynchronous.
pub trait SceneHost: TransformSink {
    /// Sources currently loaded, in load order
    fn sources(&self) -> Vec<SourceId>;

    /// Whether the source has a loaded property database
    fn has_property_db(&self, source: SourceId) -> bool;

    /// Root element of the source hierarchy, `None` for an unknown source
    fn root(&self, source: SourceId) -> Option<ElementId>;

    /// Direct children of an element, in hierarchy order
    fn children(&self, source: SourceId, element: ElementId) -> Vec<ElementId>;

    /// Fetch the named properties for a batch of elements.
    ///
    /// An empty `names` list requests every property. Elements unknown to
    /// the database are left out of the answer.
    fn bulk_properties(
        &self,
        source: SourceId,
        ids: Vec<ElementId>,
        names: Vec<String>,
    ) -> LocalBoxFuture<'_, Result<Vec<PropertyRecord>, HostError>>;

    /// Fragments under an element, including every descendant's
    fn fragments(&self, source: SourceId, element: ElementId) -> Vec<FragmentId>;

    /// A fragment is visible when it is loaded and not hidden
    fn fragment_visible(&self, source: SourceId, fragment: FragmentId) -> bool;

    /// World-space geometry points of a fragment (vertices or box corners)
    fn fragment_points(&self, source: SourceId, fragment: FragmentId) -> Vec<Vector3<f32>>;

    /// Every fragment in the source
    fn all_fragments(&self, source: SourceId) -> Vec<FragmentId> {
        match self.root(source) {
            Some(root) => self.fragments(source, root),
            None => Vec::new(),
        }
    }
}

/// Scene mutations and UI signals forwarded by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    ModelAdded(SourceId),
    ModelRemoved(SourceId),
    VisibilityChanged(SourceId),
    IsolationChanged(SourceId),
    SelectionChanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_reference_parsing() {
        assert_eq!(PropertyValue::from("42").as_element_id(), Some(42));
        assert_eq!(PropertyValue::Integer(42).as_element_id(), Some(42));
        assert_eq!(PropertyValue::Number(42.0).as_element_id(), Some(42));
        assert_eq!(PropertyValue::Number(4.5).as_element_id(), None);
        assert_eq!(PropertyValue::Integer(-1).as_element_id(), None);
        assert_eq!(PropertyValue::from("Wall").as_element_id(), None);
    }

    #[test]
    fn test_property_lookup_ignores_case() {
        let record = PropertyRecord {
            element_id: 1,
            name: "Door [1]".to_string(),
            properties: vec![Property {
                name: "Category".to_string(),
                value: PropertyValue::from(" Doors "),
            }],
        };

        assert_eq!(record.property("category").map(|v| v.display()), Some("Doors".to_string()));
        assert!(record.property("Level").is_none());
    }
}
