use serde::{Deserialize, Serialize};

use crate::ids::{self, RecordId};

/// One entry of the closed category table.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Category {
    pub id: RecordId,
    pub slug: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub emoji: &'static str,
    pub description: &'static str,
}

pub const FALLBACK_SLUG: &str = "outros";

pub const CATEGORIES: [Category; 7] = [
    Category { id: 1, slug: "reparos", name: "Reparos", icon: "fas fa-tools", emoji: "🔧", description: "Serviços de reparo e manutenção" },
    Category { id: 2, slug: "limpeza", name: "Limpeza", icon: "fas fa-home", emoji: "🧹", description: "Serviços de limpeza residencial" },
    Category { id: 3, slug: "pintura", name: "Pintura", icon: "fas fa-paint-roller", emoji: "🎨", description: "Serviços de pintura" },
    Category { id: 4, slug: "eletrica", name: "Elétrica", icon: "fas fa-plug", emoji: "⚡", description: "Serviços elétricos" },
    Category { id: 5, slug: "encanamento", name: "Encanamento", icon: "fas fa-faucet", emoji: "🔩", description: "Serviços de encanamento" },
    Category { id: 6, slug: "jardinagem", name: "Jardinagem", icon: "fas fa-leaf", emoji: "🌱", description: "Serviços de jardinagem" },
    Category { id: 7, slug: "outros", name: "Outros", icon: "fas fa-briefcase", emoji: "📦", description: "Demais categorias" },
];

impl Category {
    pub fn by_slug(slug: &str) -> Option<&'static Category> {
        CATEGORIES.iter().find(|c| c.slug == slug)
    }

    pub fn by_id(id: RecordId) -> Option<&'static Category> {
        CATEGORIES.iter().find(|c| c.id == id)
    }

    /// Case-insensitive match against the display name.
    pub fn by_name(name: &str) -> Option<&'static Category> {
        let wanted = name.trim().to_lowercase();
        CATEGORIES.iter().find(|c| c.name.to_lowercase() == wanted)
    }

    pub fn fallback() -> &'static Category {
        &CATEGORIES[CATEGORIES.len() - 1]
    }

    pub fn to_ref(&self) -> CategoryRef {
        CategoryRef { category: self.slug.to_string(), category_id: self.id, category_name: self.name.to_string() }
    }
}

/// The `{slug, id, display name}` triple a service is filed under.
///
/// Flattened into the service record as `category`, `category_id` and
/// `category_name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRef {
    pub category: String,
    #[serde(deserialize_with = "ids::loose")]
    pub category_id: RecordId,
    pub category_name: String,
}

impl Default for CategoryRef {
    fn default() -> Self { Category::fallback().to_ref() }
}
