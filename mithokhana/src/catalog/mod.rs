//! Recipe publishing: upload, edit, delete and detail views

use crate::error::{Error, Result};
use crate::store::{
    Category, Comment, Festival, Ingredient, Recipe, RecipeFields, Region, Store, User,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One ingredient row as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientDraft {
    pub name: String,
    pub quantity: String,
    #[serde(default)]
    pub cook_time: String,
}

impl IngredientDraft {
    pub fn new(name: &str, quantity: &str, cook_time: &str) -> Self {
        IngredientDraft {
            name: name.to_string(),
            quantity: quantity.to_string(),
            cook_time: cook_time.to_string(),
        }
    }
}

/// A recipe as submitted for upload or edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub category: Option<i64>,
    pub region: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub festivals: Vec<i64>,
    #[serde(default)]
    pub ingredients: Vec<IngredientDraft>,
}

/// A top-level comment and its replies, oldest reply first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Everything shown on a recipe page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub author: User,
    pub category: Option<Category>,
    pub region: Option<Region>,
    pub festivals: Vec<Festival>,
    pub ingredients: Vec<Ingredient>,
    pub likes: i64,
    /// Newest thread first
    pub comments: Vec<CommentThread>,
}

/// Categories, regions and festivals, for filter and upload forms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    pub categories: Vec<Category>,
    pub regions: Vec<Region>,
    pub festivals: Vec<Festival>,
}

/// Recipe catalog operations
pub struct Catalog<'a> {
    store: &'a Store,
}

impl<'a> Catalog<'a> {
    pub fn new(store: &'a Store) -> Self {
        Catalog { store }
    }

    /// Publish a new recipe authored by `author`
    pub fn upload(&self, author: &User, draft: &RecipeDraft) -> Result<i64> {
        let fields = self.validate(draft)?;

        let id = self.store.transaction(|| {
            let id = self.store.insert_recipe(author.id, &fields)?;
            self.store.set_recipe_festivals(id, &draft.festivals)?;
            self.store
                .replace_ingredients(id, &clean_ingredients(&draft.ingredients))?;
            Ok(id)
        })?;

        tracing::info!("{} uploaded recipe {} '{}'", author.username, id, fields.title);
        Ok(id)
    }

    /// Replace a recipe's content. Only the author may edit.
    pub fn edit(&self, actor: &User, id: i64, draft: &RecipeDraft) -> Result<()> {
        let recipe = self.store.get_recipe(id)?;
        ensure_author(actor, &recipe, "edit")?;

        let fields = self.validate(draft)?;
        self.store.transaction(|| {
            self.store.update_recipe(id, &fields)?;
            self.store.set_recipe_festivals(id, &draft.festivals)?;
            self.store
                .replace_ingredients(id, &clean_ingredients(&draft.ingredients))
        })?;

        tracing::info!("{} edited recipe {}", actor.username, id);
        Ok(())
    }

    /// Delete a recipe. Only the author may delete.
    pub fn delete(&self, actor: &User, id: i64) -> Result<()> {
        let recipe = self.store.get_recipe(id)?;
        ensure_author(actor, &recipe, "delete")?;
        self.store.delete_recipe(id)?;
        tracing::info!("{} deleted recipe {}", actor.username, id);
        Ok(())
    }

    pub fn detail(&self, id: i64) -> Result<RecipeDetail> {
        let recipe = self.store.get_recipe(id)?;
        let author = self.store.get_user(recipe.created_by)?;
        let category = recipe
            .category_id
            .map(|c| self.store.get_category(c))
            .transpose()?;
        let region = recipe
            .region_id
            .map(|r| self.store.get_region(r))
            .transpose()?;

        Ok(RecipeDetail {
            festivals: self.store.festivals_for_recipe(id)?,
            ingredients: self.store.ingredients(id)?,
            likes: self.store.count_likes(id)?,
            comments: thread_comments(self.store.comments_for_recipe(id)?),
            recipe,
            author,
            category,
            region,
        })
    }

    pub fn taxonomy(&self) -> Result<Taxonomy> {
        Ok(Taxonomy {
            categories: self.store.list_categories()?,
            regions: self.store.list_regions()?,
            festivals: self.store.list_festivals()?,
        })
    }

    fn validate(&self, draft: &RecipeDraft) -> Result<RecipeFields> {
        let (category, region) = match (draft.category, draft.region) {
            (Some(category), Some(region)) => (category, region),
            _ => {
                return Err(Error::Validation(
                    "Please select both a category and a region.".to_string(),
                ))
            }
        };
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(Error::Validation("Title is required.".to_string()));
        }

        // Existence checks surface NotFound instead of a foreign-key failure
        self.store.get_category(category)?;
        self.store.get_region(region)?;
        for festival in &draft.festivals {
            self.store.get_festival(*festival)?;
        }

        check_media(draft.image.as_deref(), "image")?;
        check_media(draft.video.as_deref(), "video")?;

        Ok(RecipeFields {
            title: title.to_string(),
            description: draft.description.clone(),
            category_id: Some(category),
            region_id: Some(region),
            image: draft.image.clone(),
            video: draft.video.clone(),
        })
    }
}

fn ensure_author(actor: &User, recipe: &Recipe, action: &str) -> Result<()> {
    if actor.id != recipe.created_by {
        return Err(Error::Forbidden(format!(
            "You are not allowed to {} this recipe.",
            action
        )));
    }
    Ok(())
}

/// Rows with a blank name or quantity are dropped; the rest are trimmed
fn clean_ingredients(drafts: &[IngredientDraft]) -> Vec<(String, String, String)> {
    drafts
        .iter()
        .filter(|d| !d.name.trim().is_empty() && !d.quantity.trim().is_empty())
        .map(|d| {
            (
                d.name.trim().to_string(),
                d.quantity.trim().to_string(),
                d.cook_time.trim().to_string(),
            )
        })
        .collect()
}

/// Media paths must carry an extension of the expected MIME top-level type
fn check_media(path: Option<&str>, kind: &str) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let mime = mime_guess::from_path(Path::new(path)).first_or_octet_stream();
    if mime.type_().as_str() != kind {
        return Err(Error::Validation(format!(
            "'{}' is not a valid {} file ({})",
            path, kind, mime
        )));
    }
    Ok(())
}

/// Group a flat, newest-first comment list into threads. Replies at any
/// depth attach to their top-level ancestor, oldest first.
fn thread_comments(comments: Vec<Comment>) -> Vec<CommentThread> {
    let parents: HashMap<i64, Option<i64>> =
        comments.iter().map(|c| (c.id, c.parent_id)).collect();

    let root_of = |mut id: i64| -> Option<i64> {
        // Bounded so a malformed parent chain cannot loop.
        for _ in 0..=parents.len() {
            match parents.get(&id)? {
                Some(parent) => id = *parent,
                None => return Some(id),
            }
        }
        None
    };

    let (top, replies): (Vec<Comment>, Vec<Comment>) =
        comments.into_iter().partition(|c| c.parent_id.is_none());

    let mut by_root: HashMap<i64, Vec<Comment>> = HashMap::new();
    for reply in replies.into_iter().rev() {
        if let Some(root) = root_of(reply.id) {
            by_root.entry(root).or_default().push(reply);
        }
    }

    top.into_iter()
        .map(|comment| CommentThread {
            replies: by_root.remove(&comment.id).unwrap_or_default(),
            comment,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        store: Store,
        author: User,
        other: User,
        category: i64,
        region: i64,
    }

    fn fixture() -> Fixture {
        let store = Store::open_memory().unwrap();
        let author = store.create_user("sita", "Sita", "").unwrap();
        let other = store.create_user("hari", "Hari", "").unwrap();
        let category = store.add_category("Snack").unwrap();
        let region = store.add_region("Newar").unwrap();
        Fixture {
            author: store.get_user(author).unwrap(),
            other: store.get_user(other).unwrap(),
            store,
            category,
            region,
        }
    }

    fn draft(f: &Fixture) -> RecipeDraft {
        RecipeDraft {
            title: "  Bara ".to_string(),
            description: "Lentil patties".to_string(),
            category: Some(f.category),
            region: Some(f.region),
            ingredients: vec![
                IngredientDraft::new(" Black lentils ", " 1 cup ", " 8 hours "),
                IngredientDraft::new("", "1 tsp", ""),
                IngredientDraft::new("Salt", "  ", ""),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_upload_requires_category_and_region() {
        let f = fixture();
        let mut d = draft(&f);
        d.region = None;
        let err = Catalog::new(&f.store).upload(&f.author, &d).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please select both a category and a region."
        );
    }

    #[test]
    fn test_upload_skips_blank_ingredients() {
        let f = fixture();
        let catalog = Catalog::new(&f.store);
        let id = catalog.upload(&f.author, &draft(&f)).unwrap();

        let detail = catalog.detail(id).unwrap();
        assert_eq!(detail.recipe.title, "Bara");
        assert_eq!(detail.author.username, "sita");
        assert_eq!(detail.category.unwrap().name, "Snack");
        assert_eq!(detail.ingredients.len(), 1);
        assert_eq!(detail.ingredients[0].name, "Black lentils");
        assert_eq!(detail.ingredients[0].cook_time, "8 hours");
    }

    #[test]
    fn test_upload_rejects_unknown_category() {
        let f = fixture();
        let mut d = draft(&f);
        d.category = Some(999);
        assert!(matches!(
            Catalog::new(&f.store).upload(&f.author, &d),
            Err(Error::NotFound { kind: "Category", .. })
        ));
    }

    #[test]
    fn test_media_type_checked() {
        let f = fixture();
        let catalog = Catalog::new(&f.store);

        let mut d = draft(&f);
        d.image = Some("recipes/bara.jpg".to_string());
        d.video = Some("video/bara.mp4".to_string());
        assert!(catalog.upload(&f.author, &d).is_ok());

        let mut d = draft(&f);
        d.image = Some("recipes/bara.mp4".to_string());
        assert!(matches!(
            catalog.upload(&f.author, &d),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_only_author_can_edit_or_delete() {
        let f = fixture();
        let catalog = Catalog::new(&f.store);
        let id = catalog.upload(&f.author, &draft(&f)).unwrap();

        let mut d = draft(&f);
        d.title = "Wo".to_string();
        assert!(matches!(
            catalog.edit(&f.other, id, &d),
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(catalog.delete(&f.other, id), Err(Error::Forbidden(_))));

        d.ingredients = vec![IngredientDraft::new("Mung beans", "2 cups", "")];
        catalog.edit(&f.author, id, &d).unwrap();
        let detail = catalog.detail(id).unwrap();
        assert_eq!(detail.recipe.title, "Wo");
        assert_eq!(detail.ingredients.len(), 1);
        assert_eq!(detail.ingredients[0].name, "Mung beans");

        catalog.delete(&f.author, id).unwrap();
        assert!(matches!(catalog.detail(id), Err(Error::RecipeNotFound(_))));
    }

    #[test]
    fn test_detail_threads_comments() {
        let f = fixture();
        let catalog = Catalog::new(&f.store);
        let id = catalog.upload(&f.author, &draft(&f)).unwrap();

        let first = f.store.insert_comment(id, f.other.id, "Tasty", None).unwrap();
        f.store
            .insert_comment(id, f.author.id, "Thanks!", Some(first))
            .unwrap();
        f.store
            .insert_comment(id, f.other.id, "Made it again", None)
            .unwrap();

        let detail = catalog.detail(id).unwrap();
        assert_eq!(detail.comments.len(), 2);
        let thread = detail
            .comments
            .iter()
            .find(|t| t.comment.id == first)
            .unwrap();
        assert_eq!(thread.replies.len(), 1);
        assert_eq!(thread.replies[0].text, "Thanks!");
    }

    #[test]
    fn test_detail_keeps_nested_replies() {
        let f = fixture();
        let catalog = Catalog::new(&f.store);
        let id = catalog.upload(&f.author, &draft(&f)).unwrap();

        let top = f.store.insert_comment(id, f.other.id, "Tasty", None).unwrap();
        let reply = f
            .store
            .insert_comment(id, f.author.id, "Thanks!", Some(top))
            .unwrap();
        let nested = f
            .store
            .insert_comment(id, f.other.id, "Any tips for the batter?", Some(reply))
            .unwrap();

        let detail = catalog.detail(id).unwrap();
        assert_eq!(detail.comments.len(), 1);
        let thread = &detail.comments[0];
        assert_eq!(thread.comment.id, top);
        let ids: Vec<i64> = thread.replies.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![reply, nested]);
    }

    #[test]
    fn test_taxonomy() {
        let f = fixture();
        let taxonomy = Catalog::new(&f.store).taxonomy().unwrap();
        assert_eq!(taxonomy.categories.len(), 1);
        assert_eq!(taxonomy.regions.len(), 1);
        assert!(taxonomy.festivals.is_empty());
    }
}
