use thiserror::Error;

use crate::element::ElementId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Layer '{0}' does not exist")]
    MissingLayer(String),

    #[error("Layer '{parent}' already has a child named '{name}'")]
    DuplicateLayer { parent: String, name: String },

    #[error("Element {0} does not exist")]
    MissingElement(ElementId),

    #[error("{batch} batch: expected {expected} entries, found {found}")]
    BatchLength {
        batch: &'static str,
        expected: usize,
        found: usize,
    },
}
