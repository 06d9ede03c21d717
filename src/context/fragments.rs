//! Narrative text for one extracted entity.

use crate::error::Result;
use crate::graph::{edges, Direction, EntityKind, GraphStore, Vertex};

/// Recipe relations walked outward, with the heading each list is printed under.
const RECIPE_RELATIONS: [(&str, &str); 6] = [
    (edges::HAS_INGREDIENT, "Required ingredients"),
    (edges::USES_PRODUCT, "Nestle Products used"),
    (edges::BELONGS_TO_CATEGORY, "Categories"),
    (edges::IS_CUISINE, "Cuisine"),
    (edges::HAS_DIETARY_TAG, "Dietary Tags"),
    (edges::CONTAINS_ALLERGEN, "Contains Allergens"),
];

/// Look up the first vertex named `name` and describe it.
/// No match yields an empty fragment.
pub async fn describe(graph: &dyn GraphStore, kind: EntityKind, name: &str) -> Result<String> {
    let found = graph
        .find_vertices(kind.vertex_label(), Some(("name", name)))
        .await?;
    log::debug!(
        "Querying for {} '{}'. Found: {}",
        kind.display_name(),
        name,
        found.len()
    );
    let Some(vertex) = found.into_iter().next() else {
        return Ok(String::new());
    };

    match kind {
        EntityKind::Recipe => describe_recipe(graph, &vertex).await,
        EntityKind::Product => describe_product(graph, &vertex).await,
        EntityKind::Ingredient => describe_ingredient(graph, &vertex).await,
        EntityKind::Category => {
            recipes_under(graph, &vertex, edges::BELONGS_TO_CATEGORY, "category").await
        }
        EntityKind::DietaryTag => {
            recipes_under(graph, &vertex, edges::HAS_DIETARY_TAG, "dietary tag").await
        }
    }
}

async fn describe_recipe(graph: &dyn GraphStore, recipe: &Vertex) -> Result<String> {
    let mut text = String::new();
    match recipe.name() {
        Some(name) => {
            text.push_str(&format!("\nRecipe: {}. ", name));
            for (key, heading) in [
                ("description", "Description"),
                ("prepTime", "Prep Time"),
                ("cookTime", "Cook Time"),
                ("servings", "Servings"),
            ] {
                if let Some(value) = non_blank(recipe, key) {
                    text.push_str(&format!("{}: {}. ", heading, value));
                }
            }
            if let Some(difficulty) = non_blank(recipe, "difficulty") {
                text.push_str(&format!("Difficulty: {}.", difficulty));
            }
            text.push('\n');
        }
        None => log::debug!("Could not get name for recipe vertex with id: {}", recipe.id),
    }

    for (edge, heading) in RECIPE_RELATIONS {
        let names = neighbor_names(graph, &recipe.id, edge, Direction::Out).await?;
        if !names.is_empty() {
            text.push_str(&format!("{}: {}.\n", heading, names.join(", ")));
        }
    }
    Ok(text)
}

async fn describe_product(graph: &dyn GraphStore, product: &Vertex) -> Result<String> {
    let mut text = String::new();
    match product.name() {
        Some(name) => {
            text.push_str(&format!("\nNestle Product: {}. ", name));
            if let Some(category) = non_blank(product, "category") {
                text.push_str(&format!("Category: {}. ", category));
            }
            if let Some(brand) = non_blank(product, "brand") {
                text.push_str(&format!("Brand: {}.", brand));
            }
            text.push('\n');
        }
        None => log::debug!("Could not get name for product vertex with id: {}", product.id),
    }
    text.push_str(&used_in(graph, &product.id, edges::USES_PRODUCT).await?);
    Ok(text)
}

async fn describe_ingredient(graph: &dyn GraphStore, ingredient: &Vertex) -> Result<String> {
    let mut text = String::new();
    match ingredient.name() {
        Some(name) => {
            text.push_str(&format!("\nIngredient: {}. ", name));
            if let Some(kind) = non_blank(ingredient, "type") {
                text.push_str(&format!("Type: {}. ", kind));
            }
            if let Some(flag) = non_blank(ingredient, "is_allergen") {
                let answer = if flag.eq_ignore_ascii_case("true") { "Yes" } else { "No" };
                text.push_str(&format!("Is Allergen: {}.", answer));
            }
            text.push('\n');
        }
        None => log::debug!("Could not get name for ingredient vertex with id: {}", ingredient.id),
    }
    text.push_str(&used_in(graph, &ingredient.id, edges::HAS_INGREDIENT).await?);
    Ok(text)
}

/// "Recipes in 'X' category: ..." style listing for grouping vertices.
async fn recipes_under(graph: &dyn GraphStore, group: &Vertex, edge: &str, noun: &str) -> Result<String> {
    let names = neighbor_names(graph, &group.id, edge, Direction::In).await?;
    if names.is_empty() {
        return Ok(String::new());
    }
    let preposition = if edge == edges::BELONGS_TO_CATEGORY { "in" } else { "with" };
    Ok(format!(
        "\nRecipes {} '{}' {}: {}.\n",
        preposition,
        group.name().unwrap_or_default(),
        noun,
        names.join(", ")
    ))
}

async fn used_in(graph: &dyn GraphStore, id: &str, edge: &str) -> Result<String> {
    let names = neighbor_names(graph, id, edge, Direction::In).await?;
    if names.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("Used in recipes: {}.\n", names.join(", ")))
    }
}

async fn neighbor_names(
    graph: &dyn GraphStore,
    id: &str,
    edge: &str,
    direction: Direction,
) -> Result<Vec<String>> {
    let neighbors = graph.get_connected_vertices(id, edge, direction).await?;
    Ok(neighbors
        .iter()
        .filter_map(|v| v.name().map(str::to_string))
        .collect())
}

fn non_blank<'a>(vertex: &'a Vertex, key: &str) -> Option<&'a str> {
    vertex.property(key).filter(|v| !v.trim().is_empty())
}
