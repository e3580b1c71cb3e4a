use schemars::JsonSchema;
use serde::Serialize;
use std::fmt::Debug;

pub use serde_with;
use utility::id::{HasId, Id};

pub mod position;
pub mod topic;
pub mod vehicle;

/// Types with a representative value, served next to their json schema.
pub trait ExampleData {
    fn example_data() -> Self;
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub id: Id<V>,
    #[serde(flatten)]
    pub content: V,
}

impl<V> WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub fn new(id: Id<V>, content: V) -> Self {
        Self { id, content }
    }
}
