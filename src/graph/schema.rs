//! Vertex labels, edge labels and the entity kinds the chat pipeline looks up.

/// Vertex labels
pub mod labels {
    pub const RECIPE: &str = "recipe";
    pub const PRODUCT: &str = "nestleProduct";
    pub const INGREDIENT: &str = "ingredient";
    pub const CATEGORY: &str = "recipeCategory";
    pub const CUISINE: &str = "cuisineType";
    pub const DIETARY_TAG: &str = "dietaryTag";
    pub const ALLERGEN: &str = "allergen";
}

/// Edge labels; every edge points out of a recipe.
pub mod edges {
    pub const HAS_INGREDIENT: &str = "hasIngredient";
    pub const USES_PRODUCT: &str = "usesProduct";
    pub const BELONGS_TO_CATEGORY: &str = "belongsToCategory";
    pub const IS_CUISINE: &str = "isCuisine";
    pub const HAS_DIETARY_TAG: &str = "hasDietaryTag";
    pub const CONTAINS_ALLERGEN: &str = "containsAllergen";
}

/// Extracted entity categories that resolve to graph vertices.
///
/// Cuisine and allergen names are extracted too but are only reached
/// through recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Recipe,
    Product,
    Ingredient,
    Category,
    DietaryTag,
}

impl EntityKind {
    /// Lookup order used when assembling context.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Recipe,
        EntityKind::Product,
        EntityKind::Ingredient,
        EntityKind::Category,
        EntityKind::DietaryTag,
    ];

    pub fn vertex_label(self) -> &'static str {
        match self {
            EntityKind::Recipe => labels::RECIPE,
            EntityKind::Product => labels::PRODUCT,
            EntityKind::Ingredient => labels::INGREDIENT,
            EntityKind::Category => labels::CATEGORY,
            EntityKind::DietaryTag => labels::DIETARY_TAG,
        }
    }

    /// Human-readable category name, used in log lines.
    pub fn display_name(self) -> &'static str {
        match self {
            EntityKind::Recipe => "Recipe",
            EntityKind::Product => "Product",
            EntityKind::Ingredient => "Ingredient",
            EntityKind::Category => "Category",
            EntityKind::DietaryTag => "Dietary Tag",
        }
    }
}
