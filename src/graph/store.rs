use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{RecipebotError, Result};
use crate::graph::{Direction, Edge, PropertyMap, Vertex};
use crate::gremlin::{GremlinTransport, Traversal};

/// Create/read operations against the property graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create one vertex. The partition-key property is filled in from
    /// `name` (or the label) when the caller leaves it out.
    async fn add_vertex(&self, label: &str, properties: PropertyMap) -> Result<Vertex>;

    /// All vertices with `label`, optionally narrowed to an exact
    /// (case-sensitive) `(property, value)` match. No match is `Ok(vec![])`.
    async fn find_vertices(&self, label: &str, filter: Option<(&str, &str)>) -> Result<Vec<Vertex>>;

    /// Create one directed edge; both endpoints must already exist.
    async fn add_edge(
        &self,
        from_id: &str,
        to_id: &str,
        label: &str,
        properties: PropertyMap,
    ) -> Result<Edge>;

    /// Neighbors exactly one `edge_label` hop away in `direction`.
    async fn get_connected_vertices(
        &self,
        vertex_id: &str,
        edge_label: &str,
        direction: Direction,
    ) -> Result<Vec<Vertex>>;

    /// [`GraphStore::get_connected_vertices`] with the direction given as
    /// text. Anything other than `in`, `out` or `both` fails before a
    /// traversal is issued.
    async fn get_connected_vertices_by_name(
        &self,
        vertex_id: &str,
        edge_label: &str,
        direction: &str,
    ) -> Result<Vec<Vertex>> {
        let direction: Direction = direction.parse()?;
        self.get_connected_vertices(vertex_id, edge_label, direction)
            .await
    }
}

/// Fill in the partition key from `name`, falling back to the label.
pub fn ensure_partition_key(label: &str, properties: &mut PropertyMap, partition_key: &str) {
    let present = properties
        .get(partition_key)
        .is_some_and(|v| !v.trim().is_empty());
    if present {
        return;
    }
    let value = properties
        .get("name")
        .filter(|n| !n.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| label.to_string());
    properties.insert(partition_key.to_string(), value);
}

/// [`GraphStore`] backed by a Gremlin endpoint
pub struct GremlinGraph {
    transport: Arc<dyn GremlinTransport>,
    partition_key: String,
}

impl GremlinGraph {
    pub fn new(transport: Arc<dyn GremlinTransport>, partition_key: impl Into<String>) -> Self {
        Self {
            transport,
            partition_key: partition_key.into(),
        }
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    async fn vertices(&self, traversal: Traversal) -> Result<Vec<Vertex>> {
        self.transport
            .submit(&traversal)
            .await?
            .iter()
            .map(Vertex::from_value)
            .collect()
    }

    /// `g.V().limit(1).count()`; used as a connectivity probe.
    pub async fn ping(&self) -> Result<u64> {
        let items = self
            .transport
            .submit(&Traversal::vertices().limit(1).count())
            .await?;
        Ok(items
            .first()
            .and_then(crate::gremlin::protocol::scalar_to_string)
            .and_then(|c| c.parse().ok())
            .unwrap_or(0))
    }
}

#[async_trait]
impl GraphStore for GremlinGraph {
    async fn add_vertex(&self, label: &str, mut properties: PropertyMap) -> Result<Vertex> {
        if label.trim().is_empty() {
            return Err(RecipebotError::InvalidInput("Vertex label must not be empty".to_string()));
        }
        ensure_partition_key(label, &mut properties, &self.partition_key);

        let traversal = properties
            .iter()
            .fold(Traversal::add_vertex(label), |t, (key, value)| t.property(key, value));

        let items = self.transport.submit(&traversal).await?;
        let first = items.first().ok_or_else(|| RecipebotError::Graph {
            code: 204,
            message: format!("addV('{}') returned no vertex", label),
        })?;
        Vertex::from_value(first)
    }

    async fn find_vertices(&self, label: &str, filter: Option<(&str, &str)>) -> Result<Vec<Vertex>> {
        let mut traversal = Traversal::vertices().has_label(label);
        if let Some((key, value)) = filter {
            traversal = traversal.has(key, value);
        }
        self.vertices(traversal).await
    }

    async fn add_edge(
        &self,
        from_id: &str,
        to_id: &str,
        label: &str,
        properties: PropertyMap,
    ) -> Result<Edge> {
        let traversal = properties.iter().fold(
            Traversal::vertex(from_id).add_edge(label).to_vertex(to_id),
            |t, (key, value)| t.property(key, value),
        );

        let items = self.transport.submit(&traversal).await?;
        // g.V(missing) yields nothing, so addE never runs.
        let first = items
            .first()
            .ok_or_else(|| RecipebotError::VertexNotFound(from_id.to_string()))?;
        Edge::from_value(first)
    }

    async fn get_connected_vertices(
        &self,
        vertex_id: &str,
        edge_label: &str,
        direction: Direction,
    ) -> Result<Vec<Vertex>> {
        let start = Traversal::vertex(vertex_id);
        let traversal = match direction {
            Direction::Out => start.out(edge_label),
            Direction::In => start.in_(edge_label),
            Direction::Both => start.both(edge_label),
        };
        self.vertices(traversal).await
    }
}
