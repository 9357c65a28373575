//! Mitho Khana CLI - recipe catalog command-line interface

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mithokhana::catalog::{Catalog, IngredientDraft, RecipeDraft};
use mithokhana::festival::festival_calendar;
use mithokhana::social::{ChefRegistration, Social};
use mithokhana::store::{Recipe, User};
use mithokhana::{Config, Importer, ListingQuery, Searcher, Store};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mitho")]
#[command(
    author,
    version,
    about = "Mitho Khana - share, discover and search recipes"
)]
#[command(propagate_version = true)]
struct Cli {
    /// Database path (default: ~/.cache/mithokhana/recipes.sqlite)
    #[arg(long, short = 'd', env = "MITHO_DB_PATH", global = true)]
    database: Option<PathBuf>,

    /// YAML config file
    #[arg(long, short = 'c', env = "MITHO_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Acting user for commands that need one
    #[arg(long, short = 'u', env = "MITHO_USER", global = true)]
    user: Option<String>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new database
    Init,

    /// Import categories, users and recipes from a YAML or JSON seed file
    Import {
        /// Seed file path
        file: PathBuf,
    },

    /// List recipes, ranked by relevance when a query is given
    Search {
        /// Search query (omit to list everything)
        #[arg(default_value = "")]
        query: String,

        /// Filter by category id
        #[arg(long)]
        category: Option<i64>,

        /// Filter by region id
        #[arg(long)]
        region: Option<i64>,

        /// Filter by festival id
        #[arg(long)]
        festival: Option<i64>,

        /// Maximum number of results
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// Show a few of the most liked recipes
    Popular {
        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// Show a recipe with ingredients and comments
    Show {
        /// Recipe id
        id: i64,

        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// Upload a new recipe as --user
    Upload(RecipeArgs),

    /// Edit one of your recipes
    Edit {
        /// Recipe id
        id: i64,

        #[command(flatten)]
        recipe: RecipeArgs,
    },

    /// Delete one of your recipes
    Delete {
        /// Recipe id
        id: i64,
    },

    /// Like or unlike a recipe
    Like {
        /// Recipe id
        id: i64,
    },

    /// Bookmark or unbookmark a recipe
    Bookmark {
        /// Recipe id
        id: i64,
    },

    /// Comment on a recipe
    Comment {
        /// Recipe id
        id: i64,

        /// Comment text
        text: String,

        /// Reply to this comment id
        #[arg(long)]
        reply_to: Option<i64>,
    },

    /// Delete one of your comments
    Uncomment {
        /// Comment id
        id: i64,
    },

    /// Show your bookmarks and recipes
    Profile {
        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// Recipes liked by people who like what you like
    Recommend {
        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// Festival calendar
    Festivals {
        /// Only festivals in this month (e.g. "October")
        #[arg(long, short = 'm')]
        month: Option<String>,

        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// Chef accounts
    Chef {
        #[command(subcommand)]
        action: ChefAction,
    },

    /// Manage categories, regions and festivals
    Taxonomy {
        #[command(subcommand)]
        action: TaxonomyAction,
    },

    /// Show database status and statistics
    Status,
}

#[derive(Args)]
struct RecipeArgs {
    /// Recipe title
    #[arg(long, short = 't')]
    title: String,

    /// Recipe description
    #[arg(long, default_value = "")]
    description: String,

    /// Category id
    #[arg(long)]
    category: Option<i64>,

    /// Region id
    #[arg(long)]
    region: Option<i64>,

    /// Festival id (repeatable)
    #[arg(long = "festival")]
    festivals: Vec<i64>,

    /// Ingredient as "name:quantity[:cook time]" (repeatable)
    #[arg(long = "ingredient", short = 'i', value_parser = parse_ingredient)]
    ingredients: Vec<IngredientDraft>,

    /// Image path
    #[arg(long)]
    image: Option<String>,

    /// Video path
    #[arg(long)]
    video: Option<String>,
}

impl RecipeArgs {
    fn into_draft(self) -> RecipeDraft {
        RecipeDraft {
            title: self.title,
            description: self.description,
            category: self.category,
            region: self.region,
            image: self.image,
            video: self.video,
            festivals: self.festivals,
            ingredients: self.ingredients,
        }
    }
}

#[derive(Subcommand)]
enum ChefAction {
    /// Register a new chef account
    Register {
        /// Username
        username: String,

        /// Years of experience
        #[arg(long, default_value = "0")]
        experience: u32,

        /// Specialty (e.g. "Newari cuisine")
        #[arg(long)]
        specialty: String,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        #[arg(long, default_value = "")]
        bio: String,

        /// Photo path
        #[arg(long)]
        photo: Option<String>,
    },

    /// Show a chef's profile and recipes
    Show {
        /// Username
        username: String,

        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// List other users (everyone but --user when given)
    List,
}

#[derive(Subcommand)]
enum TaxonomyAction {
    /// List categories, regions and festivals
    List {
        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// Add a category
    AddCategory { name: String },

    /// Add a region
    AddRegion { name: String },

    /// Add a festival
    AddFestival {
        name: String,

        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,

        #[arg(long, default_value = "")]
        description: String,
    },
}

/// Parse "name:quantity[:cook time]"
fn parse_ingredient(value: &str) -> std::result::Result<IngredientDraft, String> {
    let mut parts = value.splitn(3, ':');
    let name = parts.next().unwrap_or("").trim();
    let quantity = parts.next().map(str::trim).unwrap_or("");
    let cook_time = parts.next().map(str::trim).unwrap_or("");
    if name.is_empty() || quantity.is_empty() {
        return Err(format!(
            "expected \"name:quantity[:cook time]\", got \"{}\"",
            value
        ));
    }
    Ok(IngredientDraft::new(name, quantity, cook_time))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let db_path = cli.database.unwrap_or_else(mithokhana::default_db_path);
    tracing::debug!("Using database {}", db_path.display());
    let ctx = Ctx {
        db_path,
        config,
        user: cli.user,
    };

    match cli.command {
        Commands::Init => cmd_init(&ctx),
        Commands::Import { file } => cmd_import(&ctx, &file),
        Commands::Search {
            query,
            category,
            region,
            festival,
            limit,
            format,
        } => cmd_search(
            &ctx,
            ListingQuery {
                query,
                category,
                region,
                festival,
            },
            limit,
            &format,
        ),
        Commands::Popular { format } => cmd_popular(&ctx, &format),
        Commands::Show { id, format } => cmd_show(&ctx, id, &format),
        Commands::Upload(recipe) => cmd_upload(&ctx, recipe.into_draft()),
        Commands::Edit { id, recipe } => cmd_edit(&ctx, id, recipe.into_draft()),
        Commands::Delete { id } => cmd_delete(&ctx, id),
        Commands::Like { id } => cmd_like(&ctx, id),
        Commands::Bookmark { id } => cmd_bookmark(&ctx, id),
        Commands::Comment { id, text, reply_to } => cmd_comment(&ctx, id, &text, reply_to),
        Commands::Uncomment { id } => cmd_uncomment(&ctx, id),
        Commands::Profile { format } => cmd_profile(&ctx, &format),
        Commands::Recommend { format } => cmd_recommend(&ctx, &format),
        Commands::Festivals { month, format } => cmd_festivals(&ctx, month.as_deref(), &format),
        Commands::Chef { action } => cmd_chef(&ctx, action),
        Commands::Taxonomy { action } => cmd_taxonomy(&ctx, action),
        Commands::Status => cmd_status(&ctx),
    }
}

/// Resolved global options
struct Ctx {
    db_path: PathBuf,
    config: Config,
    user: Option<String>,
}

impl Ctx {
    fn store(&self) -> Result<Store> {
        Store::open(&self.db_path)
            .with_context(|| format!("Failed to open database {}", self.db_path.display()))
    }

    /// The acting user; commands that change data require one
    fn acting_user(&self, store: &Store) -> Result<User> {
        let Some(username) = self.user.as_deref() else {
            bail!("This command needs an acting user: pass --user or set MITHO_USER");
        };
        Ok(store.get_user_by_name(username)?)
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_recipe_line(index: usize, recipe: &Recipe, score: Option<f64>) {
    match score {
        Some(score) => println!(
            "{}. [{}] {} (score: {:.3})",
            index + 1,
            recipe.id,
            recipe.title,
            score
        ),
        None => println!("{}. [{}] {}", index + 1, recipe.id, recipe.title),
    }
    if !recipe.description.is_empty() {
        println!("   {}", mithokhana::truncate_chars(&recipe.description, 90));
    }
}

fn cmd_init(ctx: &Ctx) -> Result<()> {
    println!("Initializing database at: {}", ctx.db_path.display());
    let _store = ctx.store()?;
    println!("Database initialized successfully.");
    Ok(())
}

fn cmd_import(ctx: &Ctx, file: &Path) -> Result<()> {
    let store = ctx.store()?;
    let stats = Importer::new(&store)
        .import_file(file)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!("Import complete in {:?}:", stats.duration);
    println!("  Categories: {}", stats.categories);
    println!("  Regions:    {}", stats.regions);
    println!("  Festivals:  {}", stats.festivals);
    println!("  Users:      {}", stats.users);
    println!("  Recipes:    {}", stats.recipes);
    println!("  Likes:      {}", stats.likes);
    println!("  Bookmarks:  {}", stats.bookmarks);
    Ok(())
}

fn cmd_search(ctx: &Ctx, query: ListingQuery, limit: Option<usize>, format: &str) -> Result<()> {
    let store = ctx.store()?;
    let searcher = Searcher::with_ranker(&store, ctx.config.ranker());
    let mut listing = searcher.list(&query)?;
    if let Some(limit) = limit {
        listing.hits.truncate(limit);
    }

    if format == "json" {
        return print_json(&listing);
    }

    if let Some(notice) = listing.notice {
        println!("{}", notice);
        return Ok(());
    }
    if listing.is_empty() {
        if query.category.is_some() || query.region.is_some() || query.festival.is_some() {
            println!("No recipes match these filters.");
        } else {
            println!("No recipes yet. Use 'mitho upload' or 'mitho import' to add some.");
        }
        return Ok(());
    }

    let query_text = query.query.trim();
    if query_text.is_empty() {
        println!("{} recipes:\n", listing.hits.len());
    } else {
        println!("Found {} recipes for '{}':\n", listing.hits.len(), query_text);
    }
    for (i, hit) in listing.hits.iter().enumerate() {
        print_recipe_line(i, &hit.recipe, hit.score);
    }
    Ok(())
}

fn cmd_popular(ctx: &Ctx, format: &str) -> Result<()> {
    let store = ctx.store()?;
    let popular = &ctx.config.popular;
    let recipes = Searcher::new(&store).popular(popular.pool, popular.count)?;

    if format == "json" {
        return print_json(&recipes);
    }
    if recipes.is_empty() {
        println!("No recipes yet.");
        return Ok(());
    }
    println!("Popular recipes:\n");
    for (i, recipe) in recipes.iter().enumerate() {
        print_recipe_line(i, recipe, None);
    }
    Ok(())
}

fn cmd_show(ctx: &Ctx, id: i64, format: &str) -> Result<()> {
    let store = ctx.store()?;
    let detail = Catalog::new(&store).detail(id)?;

    if format == "json" {
        return print_json(&detail);
    }

    let recipe = &detail.recipe;
    println!("{} [{}]", recipe.title, recipe.id);
    println!("By {} on {}", detail.author.full_name(), recipe.created_at);
    println!(
        "Category: {}",
        detail.category.as_ref().map_or("N/A", |c| c.name.as_str())
    );
    println!(
        "Region: {}",
        detail.region.as_ref().map_or("N/A", |r| r.name.as_str())
    );
    if !detail.festivals.is_empty() {
        let names: Vec<&str> = detail.festivals.iter().map(|f| f.name.as_str()).collect();
        println!("Festivals: {}", names.join(", "));
    }
    println!("Likes: {}", detail.likes);
    if let Some(image) = &recipe.image {
        println!("Image: {}", image);
    }
    if let Some(video) = &recipe.video {
        println!("Video: {}", video);
    }

    println!("\n{}\n", recipe.description);

    if !detail.ingredients.is_empty() {
        println!("Ingredients:");
        for ingredient in &detail.ingredients {
            if ingredient.cook_time.is_empty() {
                println!("  - {} ({})", ingredient.name, ingredient.quantity);
            } else {
                println!(
                    "  - {} ({}, {})",
                    ingredient.name, ingredient.quantity, ingredient.cook_time
                );
            }
        }
        println!();
    }

    if !detail.comments.is_empty() {
        println!("Comments:");
        for thread in &detail.comments {
            let c = &thread.comment;
            println!("  #{} {}: {}", c.id, c.username, c.text);
            for reply in &thread.replies {
                println!("      #{} {}: {}", reply.id, reply.username, reply.text);
            }
        }
    }
    Ok(())
}

fn cmd_upload(ctx: &Ctx, draft: RecipeDraft) -> Result<()> {
    let store = ctx.store()?;
    let user = ctx.acting_user(&store)?;
    let id = Catalog::new(&store).upload(&user, &draft)?;
    println!("Recipe uploaded successfully! (id {})", id);
    Ok(())
}

fn cmd_edit(ctx: &Ctx, id: i64, draft: RecipeDraft) -> Result<()> {
    let store = ctx.store()?;
    let user = ctx.acting_user(&store)?;
    Catalog::new(&store).edit(&user, id, &draft)?;
    println!("Recipe updated successfully!");
    Ok(())
}

fn cmd_delete(ctx: &Ctx, id: i64) -> Result<()> {
    let store = ctx.store()?;
    let user = ctx.acting_user(&store)?;
    Catalog::new(&store).delete(&user, id)?;
    println!("Deleted recipe {}", id);
    Ok(())
}

fn cmd_like(ctx: &Ctx, id: i64) -> Result<()> {
    let store = ctx.store()?;
    let user = ctx.acting_user(&store)?;
    let state = Social::new(&store).toggle_like(&user, id)?;
    let verb = if state.liked { "Liked" } else { "Unliked" };
    println!("{} recipe {} ({} likes)", verb, id, state.likes_count);
    Ok(())
}

fn cmd_bookmark(ctx: &Ctx, id: i64) -> Result<()> {
    let store = ctx.store()?;
    let user = ctx.acting_user(&store)?;
    if Social::new(&store).toggle_bookmark(&user, id)? {
        println!("Bookmarked recipe {}", id);
    } else {
        println!("Removed bookmark for recipe {}", id);
    }
    Ok(())
}

fn cmd_comment(ctx: &Ctx, id: i64, text: &str, reply_to: Option<i64>) -> Result<()> {
    let store = ctx.store()?;
    let user = ctx.acting_user(&store)?;
    let comment = Social::new(&store).add_comment(&user, id, text, reply_to)?;
    println!("Added comment #{}", comment.id);
    Ok(())
}

fn cmd_uncomment(ctx: &Ctx, id: i64) -> Result<()> {
    let store = ctx.store()?;
    let user = ctx.acting_user(&store)?;
    Social::new(&store).delete_comment(&user, id)?;
    println!("Deleted comment #{}", id);
    Ok(())
}

fn cmd_profile(ctx: &Ctx, format: &str) -> Result<()> {
    let store = ctx.store()?;
    let user = ctx.acting_user(&store)?;
    let profile = Social::new(&store).profile(&user)?;

    if format == "json" {
        return print_json(&profile);
    }

    println!("{} (@{})", profile.user.full_name(), profile.user.username);
    if let Some(chef) = &profile.chef {
        println!(
            "Chef: {} ({} years experience)",
            chef.specialty, chef.experience
        );
    }
    println!("\nMy recipes ({}):", profile.recipes.len());
    for (i, recipe) in profile.recipes.iter().enumerate() {
        print_recipe_line(i, recipe, None);
    }
    println!("\nBookmarked ({}):", profile.bookmarked.len());
    for (i, recipe) in profile.bookmarked.iter().enumerate() {
        print_recipe_line(i, recipe, None);
    }
    Ok(())
}

fn cmd_recommend(ctx: &Ctx, format: &str) -> Result<()> {
    let store = ctx.store()?;
    let user = ctx.acting_user(&store)?;
    let recs = Social::new(&store).recommended(&user, ctx.config.recommend.limit)?;

    if format == "json" {
        return print_json(&recs);
    }
    if recs.is_empty() {
        println!("No recommendations yet. Like a few recipes first.");
        return Ok(());
    }
    println!("Recommended for {}:\n", user.username);
    for (i, rec) in recs.iter().enumerate() {
        println!(
            "{}. [{}] {} ({} likes from similar cooks)",
            i + 1,
            rec.recipe.id,
            rec.recipe.title,
            rec.score
        );
    }
    Ok(())
}

fn cmd_festivals(ctx: &Ctx, month: Option<&str>, format: &str) -> Result<()> {
    let store = ctx.store()?;
    let calendar = festival_calendar(&store, month)?;

    if format == "json" {
        return print_json(&calendar);
    }

    match &calendar.selected_month {
        Some(month) => println!("Festivals in {}:\n", month),
        None => println!("All festivals:\n"),
    }
    if calendar.festivals.is_empty() {
        println!("  (none)");
    }
    for festival in &calendar.festivals {
        let date = festival
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "undated".to_string());
        println!("  [{}] {} ({})", festival.id, festival.name, date);
        if !festival.description.is_empty() {
            println!("      {}", festival.description);
        }
    }
    Ok(())
}

fn cmd_chef(ctx: &Ctx, action: ChefAction) -> Result<()> {
    let store = ctx.store()?;
    let social = Social::new(&store);

    match action {
        ChefAction::Register {
            username,
            experience,
            specialty,
            first_name,
            last_name,
            bio,
            photo,
        } => {
            let user = social.register_chef(&ChefRegistration {
                username,
                first_name,
                last_name,
                experience,
                specialty,
                bio,
                photo,
            })?;
            println!("Chef account '{}' created successfully.", user.username);
        }
        ChefAction::Show { username, format } => {
            let user = store.get_user_by_name(&username)?;
            let page = social.chef_profile(user.id)?;
            if format == "json" {
                return print_json(&page);
            }
            println!("{} (@{})", page.user.full_name(), page.user.username);
            if let Some(chef) = &page.chef {
                println!("Specialty: {}", chef.specialty);
                println!("Experience: {} years", chef.experience);
                if !chef.bio.is_empty() {
                    println!("{}", chef.bio);
                }
            }
            println!("\nRecipes ({}):", page.recipes.len());
            for (i, recipe) in page.recipes.iter().enumerate() {
                print_recipe_line(i, recipe, None);
            }
        }
        ChefAction::List => {
            let viewer = match ctx.user.as_deref() {
                Some(name) => Some(store.get_user_by_name(name)?.id),
                None => None,
            };
            for user in store.list_users(viewer)? {
                println!("  @{} - {}", user.username, user.full_name());
            }
        }
    }
    Ok(())
}

fn cmd_taxonomy(ctx: &Ctx, action: TaxonomyAction) -> Result<()> {
    let store = ctx.store()?;

    match action {
        TaxonomyAction::List { format } => {
            let taxonomy = Catalog::new(&store).taxonomy()?;
            if format == "json" {
                return print_json(&taxonomy);
            }
            println!("Categories:");
            for c in &taxonomy.categories {
                println!("  [{}] {}", c.id, c.name);
            }
            println!("Regions:");
            for r in &taxonomy.regions {
                println!("  [{}] {}", r.id, r.name);
            }
            println!("Festivals:");
            for f in &taxonomy.festivals {
                println!("  [{}] {}", f.id, f.name);
            }
        }
        TaxonomyAction::AddCategory { name } => {
            let id = store.add_category(&name)?;
            println!("Added category '{}' (id {})", name, id);
        }
        TaxonomyAction::AddRegion { name } => {
            let id = store.add_region(&name)?;
            println!("Added region '{}' (id {})", name, id);
        }
        TaxonomyAction::AddFestival {
            name,
            date,
            description,
        } => {
            let id = store.add_festival(&name, date, &description)?;
            println!("Added festival '{}' (id {})", name, id);
        }
    }
    Ok(())
}

fn cmd_status(ctx: &Ctx) -> Result<()> {
    let store = ctx.store()?;
    let taxonomy = Catalog::new(&store).taxonomy()?;

    println!("Mitho Khana v{}", mithokhana::VERSION);
    println!("Database: {}", store.path().display());
    println!("Size: {}", format_bytes(store.database_size()? as i64));
    println!("Recipes: {}", store.count_recipes()?);
    println!("Users: {}", store.list_users(None)?.len());
    println!("Categories: {}", taxonomy.categories.len());
    println!("Regions: {}", taxonomy.regions.len());
    println!("Festivals: {}", taxonomy.festivals.len());
    println!("Ranking threshold: {}", ctx.config.ranker.threshold);
    Ok(())
}

/// Format bytes as human-readable size
fn format_bytes(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingredient() {
        assert_eq!(
            parse_ingredient("Rice flour: 2 cups").unwrap(),
            IngredientDraft::new("Rice flour", "2 cups", "")
        );
        assert_eq!(
            parse_ingredient("Lentils:1 cup:8 hours").unwrap(),
            IngredientDraft::new("Lentils", "1 cup", "8 hours")
        );
        assert!(parse_ingredient("Salt").is_err());
        assert!(parse_ingredient(":1 tsp").is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
