//! Likes, bookmarks, comments, profiles and recommendations

use crate::error::{Error, Result};
use crate::store::{Chef, Comment, Recipe, Store, User};
use serde::{Deserialize, Serialize};

/// Default number of recommended recipes
pub const DEFAULT_RECOMMEND_LIMIT: usize = 10;

/// State after toggling a like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: i64,
}

/// A user's own page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user: User,
    pub bookmarked: Vec<Recipe>,
    pub recipes: Vec<Recipe>,
    pub chef: Option<Chef>,
}

/// Public page of a cook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChefProfile {
    pub user: User,
    pub chef: Option<Chef>,
    pub recipes: Vec<Recipe>,
}

/// Sign-up data for a chef account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChefRegistration {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub experience: u32,
    pub specialty: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub photo: Option<String>,
}

/// A recommended recipe and how many like-minded likes it has
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub recipe: Recipe,
    pub score: i64,
}

/// Social operations bound to a store
pub struct Social<'a> {
    store: &'a Store,
}

impl<'a> Social<'a> {
    pub fn new(store: &'a Store) -> Self {
        Social { store }
    }

    pub fn toggle_like(&self, user: &User, recipe_id: i64) -> Result<LikeState> {
        self.store.get_recipe(recipe_id)?;
        let liked = !self.store.has_liked(user.id, recipe_id)?;
        self.store.set_liked(user.id, recipe_id, liked)?;
        Ok(LikeState {
            liked,
            likes_count: self.store.count_likes(recipe_id)?,
        })
    }

    /// Returns whether the recipe is now bookmarked
    pub fn toggle_bookmark(&self, user: &User, recipe_id: i64) -> Result<bool> {
        self.store.get_recipe(recipe_id)?;
        let bookmarked = !self.store.is_bookmarked(user.id, recipe_id)?;
        self.store.set_bookmarked(user.id, recipe_id, bookmarked)?;
        Ok(bookmarked)
    }

    /// Comment on a recipe, optionally replying to `parent`
    pub fn add_comment(
        &self,
        user: &User,
        recipe_id: i64,
        text: &str,
        parent: Option<i64>,
    ) -> Result<Comment> {
        self.store.get_recipe(recipe_id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("Text is required".to_string()));
        }
        if let Some(parent_id) = parent {
            let parent = self.store.get_comment(parent_id)?;
            if parent.recipe_id != recipe_id {
                return Err(Error::Validation(format!(
                    "Comment {} belongs to another recipe",
                    parent_id
                )));
            }
        }

        let id = self.store.insert_comment(recipe_id, user.id, text, parent)?;
        self.store.get_comment(id)
    }

    /// Delete a comment (and its replies). Only its author may.
    pub fn delete_comment(&self, user: &User, comment_id: i64) -> Result<()> {
        let comment = self.store.get_comment(comment_id)?;
        if comment.user_id != user.id {
            return Err(Error::Forbidden(
                "You may only delete your own comments.".to_string(),
            ));
        }
        self.store.delete_comment(comment_id)
    }

    pub fn profile(&self, user: &User) -> Result<Profile> {
        Ok(Profile {
            user: user.clone(),
            bookmarked: self.store.bookmarked_recipes(user.id)?,
            recipes: self.store.recipes_by_author(user.id)?,
            chef: self.store.get_chef(user.id)?,
        })
    }

    /// Create a user together with its chef profile
    pub fn register_chef(&self, registration: &ChefRegistration) -> Result<User> {
        let username = registration.username.trim();
        if username.is_empty() {
            return Err(Error::Validation("Username is required".to_string()));
        }
        if registration.specialty.trim().is_empty() {
            return Err(Error::Validation("Specialty is required".to_string()));
        }

        let id = self.store.transaction(|| {
            let id = self.store.create_user(
                username,
                registration.first_name.trim(),
                registration.last_name.trim(),
            )?;
            self.store.upsert_chef(&Chef {
                user_id: id,
                experience: registration.experience,
                specialty: registration.specialty.trim().to_string(),
                bio: registration.bio.clone(),
                photo: registration.photo.clone(),
            })?;
            Ok(id)
        })?;

        tracing::info!("Registered chef {}", username);
        self.store.get_user(id)
    }

    pub fn chef_profile(&self, user_id: i64) -> Result<ChefProfile> {
        Ok(ChefProfile {
            user: self.store.get_user(user_id)?,
            chef: self.store.get_chef(user_id)?,
            recipes: self.store.recipes_by_author(user_id)?,
        })
    }

    /// Recipes liked by users who share a like with `user`, minus the
    /// ones `user` already liked
    pub fn recommended(&self, user: &User, limit: usize) -> Result<Vec<Recommendation>> {
        let rows = self.store.co_liked_recipes(user.id, limit)?;
        tracing::debug!("{} recommendations for {}", rows.len(), user.username);
        Ok(rows
            .into_iter()
            .map(|(recipe, score)| Recommendation { recipe, score })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecipeFields;

    fn setup() -> (Store, User, User) {
        let store = Store::open_memory().unwrap();
        let a = store.create_user("sita", "", "").unwrap();
        let b = store.create_user("hari", "", "").unwrap();
        let a = store.get_user(a).unwrap();
        let b = store.get_user(b).unwrap();
        (store, a, b)
    }

    fn recipe(store: &Store, author: &User, title: &str) -> i64 {
        store
            .insert_recipe(
                author.id,
                &RecipeFields {
                    title: title.to_string(),
                    description: String::new(),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    #[test]
    fn test_toggle_like() {
        let (store, a, b) = setup();
        let id = recipe(&store, &a, "Momo");
        let social = Social::new(&store);

        let state = social.toggle_like(&b, id).unwrap();
        assert_eq!(state, LikeState { liked: true, likes_count: 1 });
        let state = social.toggle_like(&a, id).unwrap();
        assert_eq!(state.likes_count, 2);
        let state = social.toggle_like(&b, id).unwrap();
        assert_eq!(state, LikeState { liked: false, likes_count: 1 });

        assert!(matches!(
            social.toggle_like(&b, 999),
            Err(Error::RecipeNotFound(999))
        ));
    }

    #[test]
    fn test_toggle_bookmark_and_profile() {
        let (store, a, b) = setup();
        let id = recipe(&store, &a, "Momo");
        let social = Social::new(&store);

        assert!(social.toggle_bookmark(&b, id).unwrap());
        let profile = social.profile(&b).unwrap();
        assert_eq!(profile.bookmarked.len(), 1);
        assert!(profile.recipes.is_empty());
        assert!(profile.chef.is_none());

        assert!(!social.toggle_bookmark(&b, id).unwrap());
        assert!(social.profile(&b).unwrap().bookmarked.is_empty());
        assert_eq!(social.profile(&a).unwrap().recipes.len(), 1);
    }

    #[test]
    fn test_comments() {
        let (store, a, b) = setup();
        let id = recipe(&store, &a, "Momo");
        let other = recipe(&store, &a, "Chatamari");
        let social = Social::new(&store);

        assert!(matches!(
            social.add_comment(&b, id, "   ", None),
            Err(Error::Validation(_))
        ));

        let parent = social.add_comment(&b, id, " Lovely ", None).unwrap();
        assert_eq!(parent.text, "Lovely");
        assert_eq!(parent.username, "hari");

        let reply = social.add_comment(&a, id, "Thanks", Some(parent.id)).unwrap();
        assert_eq!(reply.parent_id, Some(parent.id));

        assert!(matches!(
            social.add_comment(&a, other, "Wrong thread", Some(parent.id)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            social.add_comment(&a, id, "Ghost", Some(999)),
            Err(Error::CommentNotFound(999))
        ));

        assert!(matches!(
            social.delete_comment(&a, parent.id),
            Err(Error::Forbidden(_))
        ));
        social.delete_comment(&b, parent.id).unwrap();
        assert!(store.comments_for_recipe(id).unwrap().is_empty());
    }

    #[test]
    fn test_register_chef() {
        let (store, _, _) = setup();
        let social = Social::new(&store);
        let registration = ChefRegistration {
            username: "maya".to_string(),
            first_name: "Maya".to_string(),
            last_name: "Gurung".to_string(),
            experience: 12,
            specialty: "Thakali".to_string(),
            ..Default::default()
        };

        let user = social.register_chef(&registration).unwrap();
        let page = social.chef_profile(user.id).unwrap();
        assert_eq!(page.user.full_name(), "Maya Gurung");
        assert_eq!(page.chef.unwrap().experience, 12);

        assert!(matches!(
            social.register_chef(&registration),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_recommended() {
        let (store, a, b) = setup();
        let c = store.create_user("gita", "", "").unwrap();
        let c = store.get_user(c).unwrap();
        let d = store.create_user("ram", "", "").unwrap();
        let d = store.get_user(d).unwrap();

        let momo = recipe(&store, &a, "Momo");
        let sel = recipe(&store, &a, "Sel Roti");
        let yomari = recipe(&store, &a, "Yomari");
        let dhido = recipe(&store, &a, "Dhido");

        // a and b share momo; a and c share momo; d shares nothing with a
        for (user, id) in [
            (&a, momo),
            (&b, momo),
            (&b, sel),
            (&b, yomari),
            (&c, momo),
            (&c, yomari),
            (&d, dhido),
        ] {
            store.set_liked(user.id, id, true).unwrap();
        }

        let social = Social::new(&store);
        let recs = social.recommended(&a, DEFAULT_RECOMMEND_LIMIT).unwrap();
        let ids: Vec<i64> = recs.iter().map(|r| r.recipe.id).collect();
        assert_eq!(ids, vec![yomari, sel]);
        assert_eq!(recs[0].score, 2);
        assert_eq!(recs[1].score, 1);

        assert_eq!(social.recommended(&a, 1).unwrap().len(), 1);
        assert!(social.recommended(&d, 10).unwrap().is_empty());
    }
}
