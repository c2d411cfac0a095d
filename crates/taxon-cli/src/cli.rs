use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "taxon",
    about = "Taxon: category hierarchies and category-filtered product browsing",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Snapshot file holding the catalog state (overrides the config file)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, inspect, or delete categories
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Add or browse products
    #[command(subcommand)]
    Product(ProductCommand),
    /// Compare the adjacency list against the tree documents
    Audit,
    /// Rebuild every tree document from the adjacency list
    Repair,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// Add a category, as a root unless --parent is given
    Add(CategoryAddArgs),
    /// List every category by display path
    List,
    /// Print the nested category trees
    Tree,
    /// Show a category and all of its descendants
    Subtree(CategoryIdArg),
    /// Delete a category and its descendants
    Delete(CategoryIdArg),
}

#[derive(Args, Debug)]
pub struct CategoryAddArgs {
    pub name: String,
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args, Debug)]
pub struct CategoryIdArg {
    pub id: String,
}

#[derive(Subcommand, Debug)]
pub enum ProductCommand {
    /// Add a product
    Add(ProductAddArgs),
    /// Browse products by category and keyword
    List(ProductListArgs),
}

#[derive(Args, Debug)]
pub struct ProductAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub price_cents: u64,
    #[arg(long)]
    pub stock: u32,
    #[arg(long)]
    pub sku: Option<String>,
    /// Category id; repeat for several
    #[arg(long = "category")]
    pub categories: Vec<String>,
    #[arg(long)]
    pub inactive: bool,
}

#[derive(Args, Debug)]
pub struct ProductListArgs {
    /// Category id; each one matches its whole subtree
    #[arg(long = "category")]
    pub categories: Vec<String>,
    /// Keyword matched against name or SKU
    #[arg(long)]
    pub q: Option<String>,
    /// Include inactive products, and list everything when no filter is given
    #[arg(long)]
    pub all: bool,
}
