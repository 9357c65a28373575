//! Seed import
//!
//! Loads taxonomy, users and recipes from a YAML or JSON file. Records refer
//! to each other by name; recipes go through [`Catalog::upload`] so the same
//! validation applies as for interactive uploads.

use crate::catalog::{Catalog, IngredientDraft, RecipeDraft};
use crate::error::{Error, Result};
use crate::social::{ChefRegistration, Social};
use crate::store::Store;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub categories: Vec<String>,
    pub regions: Vec<String>,
    pub festivals: Vec<SeedFestival>,
    pub users: Vec<SeedUser>,
    pub chefs: Vec<ChefRegistration>,
    pub recipes: Vec<SeedRecipe>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFestival {
    pub name: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRecipe {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Username of the author
    pub author: String,
    pub category: String,
    pub region: String,
    #[serde(default)]
    pub festivals: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientDraft>,
    /// Usernames that like this recipe
    #[serde(default)]
    pub liked_by: Vec<String>,
    #[serde(default)]
    pub bookmarked_by: Vec<String>,
}

/// Statistics from an import
#[derive(Debug, Clone, Default)]
pub struct ImportStats {
    pub categories: usize,
    pub regions: usize,
    pub festivals: usize,
    pub users: usize,
    pub recipes: usize,
    pub likes: usize,
    pub bookmarks: usize,
    pub duration: Duration,
}

impl SeedFile {
    /// Parse a seed file; the extension picks the format
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "json" => Ok(serde_json::from_str(&text)?),
            "yaml" | "yml" => Ok(serde_yaml::from_str(&text)?),
            _ => Err(Error::Validation(format!(
                "Unsupported seed file '{}': expected .json, .yaml or .yml",
                path.display()
            ))),
        }
    }
}

/// Writes seed records into a store
pub struct Importer<'a> {
    store: &'a Store,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a Store) -> Self {
        Importer { store }
    }

    pub fn import_file<P: AsRef<Path>>(&self, path: P) -> Result<ImportStats> {
        let seed = SeedFile::load(path.as_ref())?;
        tracing::info!("Importing seed file {}", path.as_ref().display());
        self.import(&seed)
    }

    /// Import a parsed seed. Taxonomy entries that already exist by name are reused.
    ///
    /// The whole seed is written in one transaction; any failure leaves the
    /// store as it was.
    pub fn import(&self, seed: &SeedFile) -> Result<ImportStats> {
        let start = Instant::now();
        let mut stats = self.store.transaction(|| self.write_seed(seed))?;

        stats.duration = start.elapsed();
        tracing::info!(
            "Imported {} recipes, {} users in {:?}",
            stats.recipes,
            stats.users,
            stats.duration
        );
        Ok(stats)
    }

    fn write_seed(&self, seed: &SeedFile) -> Result<ImportStats> {
        let mut stats = ImportStats::default();

        for name in &seed.categories {
            if self.store.find_category(name)?.is_none() {
                self.store.add_category(name)?;
                stats.categories += 1;
            }
        }
        for name in &seed.regions {
            if self.store.find_region(name)?.is_none() {
                self.store.add_region(name)?;
                stats.regions += 1;
            }
        }
        for festival in &seed.festivals {
            if self.store.find_festival(&festival.name)?.is_none() {
                self.store
                    .add_festival(&festival.name, festival.date, &festival.description)?;
                stats.festivals += 1;
            }
        }

        for user in &seed.users {
            if self.store.find_user(&user.username)?.is_none() {
                self.store
                    .create_user(&user.username, &user.first_name, &user.last_name)?;
                stats.users += 1;
            }
        }
        let social = Social::new(self.store);
        for chef in &seed.chefs {
            if self.store.find_user(&chef.username)?.is_none() {
                social.register_chef(chef)?;
                stats.users += 1;
            }
        }

        let catalog = Catalog::new(self.store);
        for recipe in &seed.recipes {
            let author = self.store.get_user_by_name(&recipe.author)?;
            let draft = self.draft(recipe)?;
            let id = catalog.upload(&author, &draft)?;
            stats.recipes += 1;

            for username in &recipe.liked_by {
                let user = self.store.get_user_by_name(username)?;
                self.store.set_liked(user.id, id, true)?;
                stats.likes += 1;
            }
            for username in &recipe.bookmarked_by {
                let user = self.store.get_user_by_name(username)?;
                self.store.set_bookmarked(user.id, id, true)?;
                stats.bookmarks += 1;
            }
        }

        Ok(stats)
    }

    fn draft(&self, recipe: &SeedRecipe) -> Result<RecipeDraft> {
        let category = self
            .store
            .find_category(&recipe.category)?
            .ok_or_else(|| Error::not_found("Category", &recipe.category))?;
        let region = self
            .store
            .find_region(&recipe.region)?
            .ok_or_else(|| Error::not_found("Region", &recipe.region))?;
        let festivals = recipe
            .festivals
            .iter()
            .map(|name| {
                self.store
                    .find_festival(name)?
                    .map(|f| f.id)
                    .ok_or_else(|| Error::not_found("Festival", name))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RecipeDraft {
            title: recipe.title.clone(),
            description: recipe.description.clone(),
            category: Some(category.id),
            region: Some(region.id),
            image: recipe.image.clone(),
            video: recipe.video.clone(),
            festivals,
            ingredients: recipe.ingredients.clone(),
        })
    }
}
