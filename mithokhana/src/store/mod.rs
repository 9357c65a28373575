//! Database store for Mitho Khana
//!
//! The store manages the SQLite database containing:
//! - Taxonomy (categories, regions, festivals)
//! - Users and chef profiles
//! - Recipes and their ingredients
//! - Social relations (likes, bookmarks, comments)

mod schema;

use crate::error::{Error, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use schema::SCHEMA_VERSION;

/// Date format used for festival dates
const DATE_FORMAT: &str = "%Y-%m-%d";

const RECIPE_COLUMNS: &str =
    "r.id, r.title, r.description, r.category_id, r.region_id, r.image, r.video, r.created_by, r.created_at";

/// A named region (e.g. "Newar", "Thakali")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    pub name: String,
}

/// A named recipe category (e.g. "Dessert")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A festival, optionally dated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Festival {
    pub id: i64,
    pub name: String,
    pub date: Option<NaiveDate>,
    pub description: String,
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
}

impl User {
    /// "First Last", falling back to the username when both are blank
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }
}

/// Chef profile attached to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chef {
    pub user_id: i64,
    pub experience: u32,
    pub specialty: String,
    pub bio: String,
    pub photo: Option<String>,
}

/// Recipe row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub region_id: Option<i64>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub created_by: i64,
    pub created_at: String,
}

/// Fields written when inserting or updating a recipe
#[derive(Debug, Clone, Default)]
pub struct RecipeFields {
    pub title: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub region_id: Option<i64>,
    pub image: Option<String>,
    pub video: Option<String>,
}

/// Ingredient row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub recipe_id: i64,
    pub name: String,
    pub quantity: String,
    pub cook_time: String,
}

/// Comment row, joined with the author's username
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub recipe_id: i64,
    pub user_id: i64,
    pub username: String,
    pub text: String,
    pub parent_id: Option<i64>,
    pub created_at: String,
}

/// Structured filters applied in SQL before any text matching
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub category: Option<i64>,
    pub region: Option<i64>,
    pub festival: Option<i64>,
}

/// The main database store
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let mut store = Store { conn, path };
        store.ensure_schema()?;

        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Store {
            conn,
            path: PathBuf::from(":memory:"),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::ensure_schema(&self.conn)
    }

    /// Get the database path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` inside a transaction, committing only if it succeeds.
    ///
    /// Calls nested inside an open transaction join it instead of starting
    /// a new one, so the outermost caller decides the commit.
    pub fn transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return f();
        }
        let tx = self.conn.unchecked_transaction()?;
        let value = f()?;
        tx.commit()?;
        Ok(value)
    }

    // -------------------------------------------------------------------------
    // Taxonomy
    // -------------------------------------------------------------------------

    /// Add a category and return its id
    pub fn add_category(&self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_category(&self, id: i64) -> Result<Category> {
        self.conn
            .query_row(
                "SELECT id, name FROM categories WHERE id = ?1",
                [id],
                |row| {
                    Ok(Category {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Category", id))
    }

    /// Look up a category by exact name
    pub fn find_category(&self, name: &str) -> Result<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM categories WHERE name = ?1 ORDER BY id LIMIT 1",
                [name],
                |row| {
                    Ok(Category {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY id")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Add a region and return its id
    pub fn add_region(&self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO regions (name) VALUES (?1)", [name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_region(&self, id: i64) -> Result<Region> {
        self.conn
            .query_row("SELECT id, name FROM regions WHERE id = ?1", [id], |row| {
                Ok(Region {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?
            .ok_or_else(|| Error::not_found("Region", id))
    }

    /// Look up a region by exact name
    pub fn find_region(&self, name: &str) -> Result<Option<Region>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM regions WHERE name = ?1 ORDER BY id LIMIT 1",
                [name],
                |row| {
                    Ok(Region {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn list_regions(&self) -> Result<Vec<Region>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM regions ORDER BY id")?;
        let regions = stmt
            .query_map([], |row| {
                Ok(Region {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(regions)
    }

    /// Add a festival and return its id
    pub fn add_festival(
        &self,
        name: &str,
        date: Option<NaiveDate>,
        description: &str,
    ) -> Result<i64> {
        let date = date.map(|d| d.format(DATE_FORMAT).to_string());
        self.conn.execute(
            "INSERT INTO festivals (name, date, description) VALUES (?1, ?2, ?3)",
            params![name, date, description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_festival(&self, id: i64) -> Result<Festival> {
        self.conn
            .query_row(
                "SELECT id, name, date, description FROM festivals WHERE id = ?1",
                [id],
                row_to_festival,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Festival", id))
    }

    /// Look up a festival by exact name
    pub fn find_festival(&self, name: &str) -> Result<Option<Festival>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, date, description FROM festivals WHERE name = ?1 ORDER BY id LIMIT 1",
                [name],
                row_to_festival,
            )
            .optional()?)
    }

    /// List festivals ordered by date (undated last), then id
    pub fn list_festivals(&self) -> Result<Vec<Festival>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, date, description FROM festivals
             ORDER BY date IS NULL, date, id",
        )?;
        let festivals = stmt
            .query_map([], row_to_festival)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(festivals)
    }

    /// Replace the set of festivals a recipe is linked to
    pub fn set_recipe_festivals(&self, recipe_id: i64, festival_ids: &[i64]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM festival_recipes WHERE recipe_id = ?1",
            [recipe_id],
        )?;
        for festival_id in festival_ids {
            self.conn.execute(
                "INSERT OR IGNORE INTO festival_recipes (festival_id, recipe_id) VALUES (?1, ?2)",
                [*festival_id, recipe_id],
            )?;
        }
        Ok(())
    }

    pub fn festivals_for_recipe(&self, recipe_id: i64) -> Result<Vec<Festival>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.id, f.name, f.date, f.description FROM festivals f
             JOIN festival_recipes fr ON fr.festival_id = f.id
             WHERE fr.recipe_id = ?1 ORDER BY f.id",
        )?;
        let festivals = stmt
            .query_map([recipe_id], row_to_festival)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(festivals)
    }

    // -------------------------------------------------------------------------
    // Users and chefs
    // -------------------------------------------------------------------------

    /// Create a user. Usernames are unique.
    pub fn create_user(&self, username: &str, first_name: &str, last_name: &str) -> Result<i64> {
        if self.find_user(username)?.is_some() {
            return Err(Error::Validation(format!(
                "A user with that username already exists: {}",
                username
            )));
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO users (username, first_name, last_name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![username, first_name, last_name, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.conn
            .query_row(
                "SELECT id, username, first_name, last_name, created_at FROM users WHERE id = ?1",
                [id],
                row_to_user,
            )
            .optional()?
            .ok_or_else(|| Error::UserNotFound(id.to_string()))
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, username, first_name, last_name, created_at FROM users WHERE username = ?1",
                [username],
                row_to_user,
            )
            .optional()?)
    }

    /// Get a user by username or fail with `UserNotFound`
    pub fn get_user_by_name(&self, username: &str) -> Result<User> {
        self.find_user(username)?
            .ok_or_else(|| Error::UserNotFound(username.to_string()))
    }

    /// List users, optionally leaving one out (the viewer)
    pub fn list_users(&self, exclude: Option<i64>) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, first_name, last_name, created_at FROM users
             WHERE ?1 IS NULL OR id != ?1 ORDER BY id",
        )?;
        let users = stmt
            .query_map([exclude], row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Insert or replace the chef profile of a user
    pub fn upsert_chef(&self, chef: &Chef) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO chefs (user_id, experience, specialty, bio, photo)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                chef.user_id,
                chef.experience,
                chef.specialty,
                chef.bio,
                chef.photo
            ],
        )?;
        Ok(())
    }

    pub fn get_chef(&self, user_id: i64) -> Result<Option<Chef>> {
        Ok(self
            .conn
            .query_row(
                "SELECT user_id, experience, specialty, bio, photo FROM chefs WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(Chef {
                        user_id: row.get(0)?,
                        experience: row.get(1)?,
                        specialty: row.get(2)?,
                        bio: row.get(3)?,
                        photo: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    // -------------------------------------------------------------------------
    // Recipes
    // -------------------------------------------------------------------------

    /// Insert a recipe authored by `created_by` and return its id
    pub fn insert_recipe(&self, created_by: i64, fields: &RecipeFields) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO recipes
             (title, description, category_id, region_id, image, video, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                fields.title,
                fields.description,
                fields.category_id,
                fields.region_id,
                fields.image,
                fields.video,
                created_by,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Overwrite a recipe's editable fields. Media is only replaced when given.
    pub fn update_recipe(&self, id: i64, fields: &RecipeFields) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE recipes SET
               title = ?2,
               description = ?3,
               category_id = ?4,
               region_id = ?5,
               image = COALESCE(?6, image),
               video = COALESCE(?7, video)
             WHERE id = ?1",
            params![
                id,
                fields.title,
                fields.description,
                fields.category_id,
                fields.region_id,
                fields.image,
                fields.video
            ],
        )?;
        if changed == 0 {
            return Err(Error::RecipeNotFound(id));
        }
        Ok(())
    }

    /// Delete a recipe; ingredients, comments and relations cascade
    pub fn delete_recipe(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::RecipeNotFound(id));
        }
        Ok(())
    }

    pub fn get_recipe(&self, id: i64) -> Result<Recipe> {
        let sql = format!("SELECT {} FROM recipes r WHERE r.id = ?1", RECIPE_COLUMNS);
        self.conn
            .query_row(&sql, [id], row_to_recipe)
            .optional()?
            .ok_or(Error::RecipeNotFound(id))
    }

    /// List recipes matching the structured filters, in id order
    pub fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        let mut sql = format!("SELECT {} FROM recipes r", RECIPE_COLUMNS);
        let mut clauses = Vec::new();
        let mut values: Vec<i64> = Vec::new();

        if let Some(festival) = filter.festival {
            sql.push_str(" JOIN festival_recipes fr ON fr.recipe_id = r.id");
            clauses.push("fr.festival_id = ?");
            values.push(festival);
        }
        if let Some(category) = filter.category {
            clauses.push("r.category_id = ?");
            values.push(category);
        }
        if let Some(region) = filter.region {
            clauses.push("r.region_id = ?");
            values.push(region);
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY r.id");

        let mut stmt = self.conn.prepare(&sql)?;
        let recipes = stmt
            .query_map(params_from_iter(values.iter()), row_to_recipe)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn recipes_by_author(&self, user_id: i64) -> Result<Vec<Recipe>> {
        let sql = format!(
            "SELECT {} FROM recipes r WHERE r.created_by = ?1 ORDER BY r.id",
            RECIPE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let recipes = stmt
            .query_map([user_id], row_to_recipe)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn count_recipes(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?)
    }

    /// Replace all ingredients of a recipe
    pub fn replace_ingredients(
        &self,
        recipe_id: i64,
        ingredients: &[(String, String, String)],
    ) -> Result<()> {
        self.conn
            .execute("DELETE FROM ingredients WHERE recipe_id = ?1", [recipe_id])?;
        for (name, quantity, cook_time) in ingredients {
            self.conn.execute(
                "INSERT INTO ingredients (recipe_id, name, quantity, cook_time)
                 VALUES (?1, ?2, ?3, ?4)",
                params![recipe_id, name, quantity, cook_time],
            )?;
        }
        Ok(())
    }

    pub fn ingredients(&self, recipe_id: i64) -> Result<Vec<Ingredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recipe_id, name, quantity, cook_time FROM ingredients
             WHERE recipe_id = ?1 ORDER BY id",
        )?;
        let ingredients = stmt
            .query_map([recipe_id], |row| {
                Ok(Ingredient {
                    id: row.get(0)?,
                    recipe_id: row.get(1)?,
                    name: row.get(2)?,
                    quantity: row.get(3)?,
                    cook_time: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    // -------------------------------------------------------------------------
    // Likes and bookmarks
    // -------------------------------------------------------------------------

    pub fn has_liked(&self, user_id: i64, recipe_id: i64) -> Result<bool> {
        self.relation_exists("recipe_likes", user_id, recipe_id)
    }

    pub fn set_liked(&self, user_id: i64, recipe_id: i64, liked: bool) -> Result<()> {
        self.set_relation("recipe_likes", user_id, recipe_id, liked)
    }

    pub fn count_likes(&self, recipe_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM recipe_likes WHERE recipe_id = ?1",
            [recipe_id],
            |row| row.get(0),
        )?)
    }

    pub fn is_bookmarked(&self, user_id: i64, recipe_id: i64) -> Result<bool> {
        self.relation_exists("recipe_bookmarks", user_id, recipe_id)
    }

    pub fn set_bookmarked(&self, user_id: i64, recipe_id: i64, bookmarked: bool) -> Result<()> {
        self.set_relation("recipe_bookmarks", user_id, recipe_id, bookmarked)
    }

    pub fn bookmarked_recipes(&self, user_id: i64) -> Result<Vec<Recipe>> {
        let sql = format!(
            "SELECT {} FROM recipes r JOIN recipe_bookmarks b ON b.recipe_id = r.id
             WHERE b.user_id = ?1 ORDER BY r.id",
            RECIPE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let recipes = stmt
            .query_map([user_id], row_to_recipe)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    /// Recipes ordered by like count (descending, ties by id), with counts
    pub fn most_liked(&self, limit: usize) -> Result<Vec<(Recipe, i64)>> {
        let sql = format!(
            "SELECT {}, COUNT(l.user_id) AS like_count FROM recipes r
             LEFT JOIN recipe_likes l ON l.recipe_id = r.id
             GROUP BY r.id ORDER BY like_count DESC, r.id ASC LIMIT ?1",
            RECIPE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows: Vec<(Recipe, i64)> = stmt
            .query_map([limit as i64], |row| Ok((row_to_recipe(row)?, row.get(9)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Recipes liked by users who share at least one like with `user_id`,
    /// excluding the ones `user_id` already liked. Scored by the number of
    /// such likes.
    pub fn co_liked_recipes(&self, user_id: i64, limit: usize) -> Result<Vec<(Recipe, i64)>> {
        let sql = format!(
            "SELECT {}, COUNT(*) AS score FROM recipe_likes l
             JOIN recipes r ON r.id = l.recipe_id
             WHERE l.user_id IN (
                 SELECT DISTINCT peer.user_id FROM recipe_likes peer
                 WHERE peer.user_id != ?1
                   AND peer.recipe_id IN (SELECT recipe_id FROM recipe_likes WHERE user_id = ?1)
             )
             AND r.id NOT IN (SELECT recipe_id FROM recipe_likes WHERE user_id = ?1)
             GROUP BY r.id ORDER BY score DESC, r.id ASC LIMIT ?2",
            RECIPE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows: Vec<(Recipe, i64)> = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok((row_to_recipe(row)?, row.get(9)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn relation_exists(&self, table: &str, user_id: i64, recipe_id: i64) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND recipe_id = ?2",
            table
        );
        let count: i64 = self
            .conn
            .query_row(&sql, [user_id, recipe_id], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn set_relation(&self, table: &str, user_id: i64, recipe_id: i64, present: bool) -> Result<()> {
        let sql = if present {
            format!(
                "INSERT OR IGNORE INTO {} (user_id, recipe_id) VALUES (?1, ?2)",
                table
            )
        } else {
            format!("DELETE FROM {} WHERE user_id = ?1 AND recipe_id = ?2", table)
        };
        self.conn.execute(&sql, [user_id, recipe_id])?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Comments
    // -------------------------------------------------------------------------

    pub fn insert_comment(
        &self,
        recipe_id: i64,
        user_id: i64,
        text: &str,
        parent_id: Option<i64>,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO comments (recipe_id, user_id, text, parent_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![recipe_id, user_id, text, parent_id, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_comment(&self, id: i64) -> Result<Comment> {
        self.conn
            .query_row(
                "SELECT c.id, c.recipe_id, c.user_id, u.username, c.text, c.parent_id, c.created_at
                 FROM comments c JOIN users u ON u.id = c.user_id WHERE c.id = ?1",
                [id],
                row_to_comment,
            )
            .optional()?
            .ok_or(Error::CommentNotFound(id))
    }

    /// Delete a comment and, through the cascade, its replies
    pub fn delete_comment(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM comments WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::CommentNotFound(id));
        }
        Ok(())
    }

    /// All comments on a recipe, newest first
    pub fn comments_for_recipe(&self, recipe_id: i64) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.recipe_id, c.user_id, u.username, c.text, c.parent_id, c.created_at
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.recipe_id = ?1 ORDER BY c.created_at DESC, c.id DESC",
        )?;
        let comments = stmt
            .query_map([recipe_id], row_to_comment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    /// Get database file size in bytes
    pub fn database_size(&self) -> Result<u64> {
        if self.path.to_str() == Some(":memory:") {
            return Ok(0);
        }
        let metadata = std::fs::metadata(&self.path)?;
        Ok(metadata.len())
    }
}

fn row_to_recipe(row: &Row<'_>) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category_id: row.get(3)?,
        region_id: row.get(4)?,
        image: row.get(5)?,
        video: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        recipe_id: row.get(1)?,
        user_id: row.get(2)?,
        username: row.get(3)?,
        text: row.get(4)?,
        parent_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_festival(row: &Row<'_>) -> rusqlite::Result<Festival> {
    let date: Option<String> = row.get(2)?;
    Ok(Festival {
        id: row.get(0)?,
        name: row.get(1)?,
        // Unparseable dates are treated as undated
        date: date.and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
        description: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_author() -> (Store, i64) {
        let store = Store::open_memory().unwrap();
        let user = store.create_user("sita", "Sita", "Shrestha").unwrap();
        (store, user)
    }

    fn fields(title: &str) -> RecipeFields {
        RecipeFields {
            title: title.to_string(),
            description: format!("{} description", title),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_memory() {
        let store = Store::open_memory().unwrap();
        assert_eq!(store.path().to_str(), Some(":memory:"));
        assert_eq!(store.database_size().unwrap(), 0);
    }

    #[test]
    fn test_open_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recipes.sqlite");
        let store = Store::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_taxonomy_operations() {
        let store = Store::open_memory().unwrap();

        let dessert = store.add_category("Dessert").unwrap();
        store.add_region("Newar").unwrap();
        let dashain = store
            .add_festival(
                "Dashain",
                NaiveDate::from_ymd_opt(2025, 10, 2),
                "Harvest festival",
            )
            .unwrap();
        store.add_festival("Teej", None, "").unwrap();

        assert_eq!(store.get_category(dessert).unwrap().name, "Dessert");
        assert_eq!(store.find_region("Newar").unwrap().unwrap().name, "Newar");
        assert!(store.find_region("Thakali").unwrap().is_none());
        assert!(matches!(
            store.get_category(999),
            Err(Error::NotFound { kind: "Category", .. })
        ));

        let festivals = store.list_festivals().unwrap();
        assert_eq!(festivals.len(), 2);
        assert_eq!(festivals[0].id, dashain);
        assert_eq!(festivals[0].date, NaiveDate::from_ymd_opt(2025, 10, 2));
        assert_eq!(festivals[1].date, None);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (store, _) = store_with_author();
        let err = store.create_user("sita", "", "").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_user_full_name() {
        let (store, id) = store_with_author();
        let user = store.get_user(id).unwrap();
        assert_eq!(user.full_name(), "Sita Shrestha");

        let bare = store.create_user("ram", "", "").unwrap();
        assert_eq!(store.get_user(bare).unwrap().full_name(), "ram");
    }

    #[test]
    fn test_recipe_crud() {
        let (store, author) = store_with_author();

        let id = store.insert_recipe(author, &fields("Momo")).unwrap();
        let recipe = store.get_recipe(id).unwrap();
        assert_eq!(recipe.title, "Momo");
        assert_eq!(recipe.created_by, author);

        let mut update = fields("Jhol Momo");
        update.image = Some("recipes/momo.jpg".to_string());
        store.update_recipe(id, &update).unwrap();
        let recipe = store.get_recipe(id).unwrap();
        assert_eq!(recipe.title, "Jhol Momo");
        assert_eq!(recipe.image.as_deref(), Some("recipes/momo.jpg"));

        // Media is kept when the update carries none
        store.update_recipe(id, &fields("Jhol Momo")).unwrap();
        let recipe = store.get_recipe(id).unwrap();
        assert_eq!(recipe.image.as_deref(), Some("recipes/momo.jpg"));

        store.delete_recipe(id).unwrap();
        assert!(matches!(store.get_recipe(id), Err(Error::RecipeNotFound(_))));
        assert!(matches!(
            store.delete_recipe(id),
            Err(Error::RecipeNotFound(_))
        ));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let (store, author) = store_with_author();

        let result: Result<()> = store.transaction(|| {
            store.insert_recipe(author, &fields("Momo"))?;
            store.transaction(|| {
                store.add_category("Snack")?;
                Ok(())
            })?;
            Err(Error::Validation("abort".to_string()))
        });
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.count_recipes().unwrap(), 0);
        assert!(store.list_categories().unwrap().is_empty());

        let id = store
            .transaction(|| store.insert_recipe(author, &fields("Sel Roti")))
            .unwrap();
        assert_eq!(store.get_recipe(id).unwrap().title, "Sel Roti");
    }

    #[test]
    fn test_list_recipes_with_filters() {
        let (store, author) = store_with_author();
        let snack = store.add_category("Snack").unwrap();
        let newar = store.add_region("Newar").unwrap();
        let tihar = store.add_festival("Tihar", None, "").unwrap();

        let mut a = fields("Bara");
        a.category_id = Some(snack);
        a.region_id = Some(newar);
        let a = store.insert_recipe(author, &a).unwrap();

        let mut b = fields("Sel Roti");
        b.category_id = Some(snack);
        let b = store.insert_recipe(author, &b).unwrap();
        store.set_recipe_festivals(b, &[tihar]).unwrap();

        store.insert_recipe(author, &fields("Dal Bhat")).unwrap();

        assert_eq!(store.list_recipes(&RecipeFilter::default()).unwrap().len(), 3);

        let by_category = store
            .list_recipes(&RecipeFilter {
                category: Some(snack),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            by_category.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![a, b]
        );

        let combined = store
            .list_recipes(&RecipeFilter {
                category: Some(snack),
                region: Some(newar),
                festival: None,
            })
            .unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].id, a);

        let by_festival = store
            .list_recipes(&RecipeFilter {
                festival: Some(tihar),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_festival.len(), 1);
        assert_eq!(by_festival[0].id, b);
    }

    #[test]
    fn test_ingredients_replace() {
        let (store, author) = store_with_author();
        let id = store.insert_recipe(author, &fields("Momo")).unwrap();

        store
            .replace_ingredients(
                id,
                &[
                    ("Flour".into(), "2 cups".into(), "".into()),
                    ("Minced meat".into(), "500 g".into(), "10 mins".into()),
                ],
            )
            .unwrap();
        assert_eq!(store.ingredients(id).unwrap().len(), 2);

        store
            .replace_ingredients(id, &[("Water".into(), "1 cup".into(), "".into())])
            .unwrap();
        let ingredients = store.ingredients(id).unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "Water");
    }

    #[test]
    fn test_likes_and_most_liked() {
        let (store, author) = store_with_author();
        let fan = store.create_user("hari", "", "").unwrap();
        let a = store.insert_recipe(author, &fields("A")).unwrap();
        let b = store.insert_recipe(author, &fields("B")).unwrap();

        store.set_liked(author, b, true).unwrap();
        store.set_liked(fan, b, true).unwrap();
        store.set_liked(fan, b, true).unwrap();
        assert!(store.has_liked(fan, b).unwrap());
        assert_eq!(store.count_likes(b).unwrap(), 2);

        let ranked = store.most_liked(10).unwrap();
        assert_eq!(ranked[0].0.id, b);
        assert_eq!(ranked[0].1, 2);
        assert_eq!(ranked[1].0.id, a);
        assert_eq!(ranked[1].1, 0);

        store.set_liked(fan, b, false).unwrap();
        assert_eq!(store.count_likes(b).unwrap(), 1);
    }

    #[test]
    fn test_delete_recipe_cascades() {
        let (store, author) = store_with_author();
        let id = store.insert_recipe(author, &fields("Momo")).unwrap();
        store
            .replace_ingredients(id, &[("Flour".into(), "1 cup".into(), "".into())])
            .unwrap();
        store.set_liked(author, id, true).unwrap();
        store.set_bookmarked(author, id, true).unwrap();
        let comment = store.insert_comment(id, author, "Yum", None).unwrap();

        store.delete_recipe(id).unwrap();

        assert!(store.ingredients(id).unwrap().is_empty());
        assert!(store.bookmarked_recipes(author).unwrap().is_empty());
        assert!(matches!(
            store.get_comment(comment),
            Err(Error::CommentNotFound(_))
        ));
    }

    #[test]
    fn test_comment_replies_cascade() {
        let (store, author) = store_with_author();
        let id = store.insert_recipe(author, &fields("Momo")).unwrap();
        let parent = store.insert_comment(id, author, "First", None).unwrap();
        let reply = store
            .insert_comment(id, author, "Reply", Some(parent))
            .unwrap();

        let comment = store.get_comment(reply).unwrap();
        assert_eq!(comment.parent_id, Some(parent));
        assert_eq!(comment.username, "sita");

        store.delete_comment(parent).unwrap();
        assert!(store.comments_for_recipe(id).unwrap().is_empty());
    }
}
