//! Graph access layer: vertex/edge records, the recipe graph schema, and
//! the [`GraphStore`] operations backed by Gremlin.

mod element;
pub mod schema;
mod store;

pub use element::{Direction, Edge, PropertyMap, Vertex};
pub use schema::{edges, labels, EntityKind};
pub use store::{ensure_partition_key, GraphStore, GremlinGraph};
