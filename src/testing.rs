//! In-process fakes for the outbound seams, shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{RecipebotError, Result};
use crate::graph::{ensure_partition_key, Direction, Edge, GraphStore, PropertyMap, Vertex};
use crate::gremlin::{GremlinTransport, Traversal};
use crate::llm::{ChatCompletion, ChatMessage, CompletionOptions};
use crate::search::{DocumentSearch, SearchResult};

/// Records every submitted traversal and replays queued responses.
/// An empty queue answers `Ok(vec![])`.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<Result<Vec<Value>>>>,
    submitted: Mutex<Vec<Traversal>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: Result<Vec<Value>>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn submitted(&self) -> Vec<Traversal> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl GremlinTransport for RecordingTransport {
    async fn submit(&self, traversal: &Traversal) -> Result<Vec<Value>> {
        self.submitted.lock().unwrap().push(traversal.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
struct GraphData {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

/// A [`GraphStore`] held in memory.
///
/// Lookups for names registered with [`InMemoryGraph::fail_lookups_of`]
/// fail with a connection error.
#[derive(Default)]
pub struct InMemoryGraph {
    data: Mutex<GraphData>,
    failing_names: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vertex directly; returns its id.
    pub fn insert(&self, label: &str, name: &str, extra: &[(&str, &str)]) -> String {
        let mut data = self.data.lock().unwrap();
        let id = format!("v{}", data.vertices.len() + 1);
        let mut properties: PropertyMap = extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        properties.insert("name".to_string(), name.to_string());
        data.vertices.push(Vertex {
            id: id.clone(),
            label: label.to_string(),
            properties,
        });
        id
    }

    /// Insert an edge directly.
    pub fn link(&self, from_id: &str, to_id: &str, label: &str) {
        let mut data = self.data.lock().unwrap();
        let id = format!("e{}", data.edges.len() + 1);
        data.edges.push(Edge {
            id,
            label: label.to_string(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            properties: PropertyMap::new(),
        });
    }

    pub fn fail_lookups_of(&self, name: &str) {
        self.failing_names.lock().unwrap().push(name.to_string());
    }

    /// Number of store operations issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vertex_count(&self) -> usize {
        self.data.lock().unwrap().vertices.len()
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.data.lock().unwrap().edges.clone()
    }

    fn vertex_by_id(data: &GraphData, id: &str) -> Option<Vertex> {
        data.vertices.iter().find(|v| v.id == id).cloned()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    async fn add_vertex(&self, label: &str, mut properties: PropertyMap) -> Result<Vertex> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ensure_partition_key(label, &mut properties, "pk");
        let mut data = self.data.lock().unwrap();
        let vertex = Vertex {
            id: format!("v{}", data.vertices.len() + 1),
            label: label.to_string(),
            properties,
        };
        data.vertices.push(vertex.clone());
        Ok(vertex)
    }

    async fn find_vertices(&self, label: &str, filter: Option<(&str, &str)>) -> Result<Vec<Vertex>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((_, value)) = filter {
            if self.failing_names.lock().unwrap().iter().any(|n| n == value) {
                return Err(RecipebotError::GraphConnection(format!("lookup of '{}' failed", value)));
            }
        }
        let data = self.data.lock().unwrap();
        Ok(data
            .vertices
            .iter()
            .filter(|v| v.label == label)
            .filter(|v| filter.map_or(true, |(key, value)| v.property(key) == Some(value)))
            .cloned()
            .collect())
    }

    async fn add_edge(
        &self,
        from_id: &str,
        to_id: &str,
        label: &str,
        properties: PropertyMap,
    ) -> Result<Edge> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.lock().unwrap();
        for id in [from_id, to_id] {
            if Self::vertex_by_id(&data, id).is_none() {
                return Err(RecipebotError::VertexNotFound(id.to_string()));
            }
        }
        let edge = Edge {
            id: format!("e{}", data.edges.len() + 1),
            label: label.to_string(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            properties,
        };
        data.edges.push(edge.clone());
        Ok(edge)
    }

    async fn get_connected_vertices(
        &self,
        vertex_id: &str,
        edge_label: &str,
        direction: Direction,
    ) -> Result<Vec<Vertex>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let data = self.data.lock().unwrap();
        let mut neighbors = Vec::new();
        for edge in data.edges.iter().filter(|e| e.label == edge_label) {
            let outgoing = edge.from_id == vertex_id && direction != Direction::In;
            let incoming = edge.to_id == vertex_id && direction != Direction::Out;
            if outgoing {
                neighbors.extend(Self::vertex_by_id(&data, &edge.to_id));
            }
            if incoming {
                neighbors.extend(Self::vertex_by_id(&data, &edge.from_id));
            }
        }
        Ok(neighbors)
    }
}

/// Returns a fixed result list and records the queries it was asked.
#[derive(Default)]
pub struct FakeSearch {
    results: Vec<SearchResult>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentSearch for FakeSearch {
    async fn search_documents(&self, query: &str, _fields: &[String], top_n: usize) -> Vec<SearchResult> {
        self.queries.lock().unwrap().push(query.to_string());
        self.results.iter().take(top_n).cloned().collect()
    }
}

/// Scripted completion model. An empty script answers `Ok("{}")`.
#[derive(Default)]
pub struct FakeLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<(Vec<ChatMessage>, CompletionOptions)>>,
}

impl FakeLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, reply: Result<String>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<(Vec<ChatMessage>, CompletionOptions)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCompletion for FakeLlm {
    async fn complete(&self, messages: &[ChatMessage], options: &CompletionOptions) -> Result<String> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), *options));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("{}".to_string()))
    }
}
