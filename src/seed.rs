//! Demo graph seeding from a JSON description.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{RecipebotError, Result};
use crate::graph::{edges, labels, GraphStore, PropertyMap};
use crate::gremlin::protocol::scalar_to_string;

/// A vertex to create: its name plus any scalar properties.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedVertex {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl SeedVertex {
    fn to_properties(&self) -> PropertyMap {
        let mut props: PropertyMap = self
            .properties
            .iter()
            .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
            .collect();
        props.insert("name".to_string(), self.name.clone());
        props
    }
}

/// A recipe and the names of everything it links to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRecipe {
    #[serde(flatten)]
    pub vertex: SeedVertex,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub cuisines: Vec<String>,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
}

impl SeedRecipe {
    /// (edge label, target vertex label, target names) for each relation.
    fn relations(&self) -> [(&'static str, &'static str, &[String]); 6] {
        [
            (edges::HAS_INGREDIENT, labels::INGREDIENT, self.ingredients.as_slice()),
            (edges::USES_PRODUCT, labels::PRODUCT, self.products.as_slice()),
            (edges::BELONGS_TO_CATEGORY, labels::CATEGORY, self.categories.as_slice()),
            (edges::IS_CUISINE, labels::CUISINE, self.cuisines.as_slice()),
            (edges::HAS_DIETARY_TAG, labels::DIETARY_TAG, self.dietary_tags.as_slice()),
            (edges::CONTAINS_ALLERGEN, labels::ALLERGEN, self.allergens.as_slice()),
        ]
    }
}

/// The full seed document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeedGraph {
    pub recipes: Vec<SeedRecipe>,
    pub products: Vec<SeedVertex>,
    pub ingredients: Vec<SeedVertex>,
    pub categories: Vec<SeedVertex>,
    pub cuisines: Vec<SeedVertex>,
    pub dietary_tags: Vec<SeedVertex>,
    pub allergens: Vec<SeedVertex>,
}

impl SeedGraph {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RecipebotError::Config(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Every vertex with its label, recipes first.
    pub fn vertices(&self) -> Vec<(&'static str, &SeedVertex)> {
        let groups: [(&'static str, &[SeedVertex]); 6] = [
            (labels::PRODUCT, self.products.as_slice()),
            (labels::INGREDIENT, self.ingredients.as_slice()),
            (labels::CATEGORY, self.categories.as_slice()),
            (labels::CUISINE, self.cuisines.as_slice()),
            (labels::DIETARY_TAG, self.dietary_tags.as_slice()),
            (labels::ALLERGEN, self.allergens.as_slice()),
        ];
        self.recipes
            .iter()
            .map(|r| (labels::RECIPE, &r.vertex))
            .chain(
                groups
                    .into_iter()
                    .flat_map(|(label, group)| group.iter().map(move |v| (label, v))),
            )
            .collect()
    }
}

/// Counts reported after seeding.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PopulateSummary {
    pub vertices_added: usize,
    pub vertices_failed: usize,
    pub edges_added: usize,
    /// Edges whose endpoint was never created.
    pub edges_skipped: usize,
    pub edges_failed: usize,
}

impl std::fmt::Display for PopulateSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vertices added: {}, vertex failures: {}, edges added: {}, edges skipped: {}, edge failures: {}",
            self.vertices_added, self.vertices_failed, self.edges_added, self.edges_skipped, self.edges_failed
        )
    }
}

/// Add every seed vertex, then (unless `with_edges` is false) every recipe
/// edge. Individual failures are logged and counted, never fatal.
pub async fn populate(graph: &dyn GraphStore, seed: &SeedGraph, with_edges: bool) -> PopulateSummary {
    let mut summary = PopulateSummary::default();
    // (label, name) -> id; names repeat across labels ("Eggs").
    let mut ids: HashMap<(&str, &str), String> = HashMap::new();

    log::info!("Adding vertices...");
    for (label, vertex) in seed.vertices() {
        match graph.add_vertex(label, vertex.to_properties()).await {
            Ok(created) => {
                log::info!("Added {}: {}", label, vertex.name);
                ids.insert((label, vertex.name.as_str()), created.id);
                summary.vertices_added += 1;
            }
            Err(e) => {
                log::error!("Failed to add {} {}: {}", label, vertex.name, e);
                summary.vertices_failed += 1;
            }
        }
    }

    if !with_edges {
        log::info!("Skipping edge creation");
        return summary;
    }

    log::info!("All vertices added. Now adding edges...");
    for recipe in &seed.recipes {
        let name = recipe.vertex.name.as_str();
        let Some(recipe_id) = ids.get(&(labels::RECIPE, name)) else {
            let count: usize = recipe.relations().iter().map(|(_, _, t)| t.len()).sum();
            log::warn!("Recipe vertex for {} not found. Skipping edge creation.", name);
            summary.edges_skipped += count;
            continue;
        };

        for (edge, target_label, targets) in recipe.relations() {
            for target in targets {
                let Some(target_id) = ids.get(&(target_label, target.as_str())) else {
                    log::warn!(
                        "{} vertex for {} not found. Edge not created for {}.",
                        target_label,
                        target,
                        name
                    );
                    summary.edges_skipped += 1;
                    continue;
                };
                match graph.add_edge(recipe_id, target_id, edge, PropertyMap::new()).await {
                    Ok(_) => {
                        log::info!("Added edge: {} --{}--> {}", name, edge, target);
                        summary.edges_added += 1;
                    }
                    Err(e) => {
                        log::error!("Failed to add {} edge from {} to {}: {}", edge, name, target, e);
                        summary.edges_failed += 1;
                    }
                }
            }
        }
    }

    log::info!("Graph population complete");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Direction;
    use crate::testing::InMemoryGraph;

    const SMALL_SEED: &str = r#"{
        "recipes": [{
            "name": "Banana Bread",
            "properties": {"servings": 10, "difficulty": "Easy"},
            "ingredients": ["Bananas", "Eggs", "Saffron"],
            "allergens": ["Eggs"]
        }],
        "ingredients": [{"name": "Bananas"}, {"name": "Eggs", "properties": {"is_allergen": true}}],
        "allergens": [{"name": "Eggs"}]
    }"#;

    #[test]
    fn test_bundled_seed_parses() {
        let text = include_str!("../data/seed_graph.json");
        let seed = SeedGraph::parse(text).unwrap();
        assert_eq!(seed.recipes.len(), 4);
        assert_eq!(seed.vertices().len(), 38);
        assert_eq!(seed.vertices()[0], (labels::RECIPE, &seed.recipes[0].vertex));
    }

    #[test]
    fn test_scalar_properties_become_text() {
        let seed = SeedGraph::parse(SMALL_SEED).unwrap();
        let props = seed.recipes[0].vertex.to_properties();
        assert_eq!(props.get("servings").map(String::as_str), Some("10"));
        assert_eq!(props.get("name").map(String::as_str), Some("Banana Bread"));
        let eggs = seed.ingredients[1].to_properties();
        assert_eq!(eggs.get("is_allergen").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_populate_links_by_label_and_name() {
        let seed = SeedGraph::parse(SMALL_SEED).unwrap();
        let graph = InMemoryGraph::new();

        let summary = populate(&graph, &seed, true).await;
        assert_eq!(summary.vertices_added, 4);
        assert_eq!(summary.edges_added, 3);
        assert_eq!(summary.edges_skipped, 1);
        assert_eq!(summary.edges_failed, 0);

        let bread = graph.find_vertices(labels::RECIPE, Some(("name", "Banana Bread"))).await.unwrap();
        let allergens = graph
            .get_connected_vertices(&bread[0].id, edges::CONTAINS_ALLERGEN, Direction::Out)
            .await
            .unwrap();
        assert_eq!(allergens.len(), 1);
        assert_eq!(allergens[0].label, labels::ALLERGEN);
        assert_eq!(allergens[0].property("pk"), Some("Eggs"));
    }

    #[tokio::test]
    async fn test_populate_without_edges() {
        let seed = SeedGraph::parse(SMALL_SEED).unwrap();
        let graph = InMemoryGraph::new();

        let summary = populate(&graph, &seed, false).await;
        assert_eq!(summary.vertices_added, 4);
        assert_eq!(summary.edges_added, 0);
        assert!(graph.edges().is_empty());
    }
}
