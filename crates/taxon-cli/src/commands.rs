use std::path::PathBuf;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use taxon_sdk::{
    CategoryId, CategoryTreeNode, Product, ProductStatus, Taxon, TaxonConfig,
};

use crate::cli::*;

/// Snapshot file used when neither `--data` nor the config names one.
const DEFAULT_DATA_FILE: &str = "taxon.json";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let taxon = Taxon::open(config).context("failed to open catalog")?;
    let format = cli.format;

    let changed = match cli.command {
        Command::Category(cmd) => match cmd {
            CategoryCommand::Add(args) => cmd_category_add(&taxon, args, format)?,
            CategoryCommand::List => cmd_category_list(&taxon, format)?,
            CategoryCommand::Tree => cmd_category_tree(&taxon, format)?,
            CategoryCommand::Subtree(args) => cmd_category_subtree(&taxon, args, format)?,
            CategoryCommand::Delete(args) => cmd_category_delete(&taxon, args, format)?,
        },
        Command::Product(cmd) => match cmd {
            ProductCommand::Add(args) => cmd_product_add(&taxon, args, format)?,
            ProductCommand::List(args) => cmd_product_list(&taxon, args, format)?,
        },
        Command::Audit => cmd_audit(&taxon, format)?,
        Command::Repair => cmd_repair(&taxon, format)?,
    };

    if changed {
        debug!(path = ?taxon.config().snapshot_path, "saving catalog");
        taxon.save().context("failed to save catalog")?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<TaxonConfig> {
    let mut config = match &cli.config {
        Some(path) => TaxonConfig::load(path)?,
        None => TaxonConfig::default(),
    };
    if let Some(data) = &cli.data {
        config.snapshot_path = Some(data.clone());
    }
    if config.snapshot_path.is_none() {
        config.snapshot_path = Some(PathBuf::from(DEFAULT_DATA_FILE));
    }
    Ok(config)
}

fn parse_category_id(raw: &str) -> anyhow::Result<CategoryId> {
    raw.trim()
        .parse()
        .with_context(|| format!("invalid category id {raw:?}"))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_price(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

// ---- Categories ----

fn cmd_category_add(taxon: &Taxon, args: CategoryAddArgs, format: OutputFormat) -> anyhow::Result<bool> {
    let parent = args.parent.as_deref().map(parse_category_id).transpose()?;
    let id = taxon.insert_category(&args.name, parent.as_ref())?;
    let category = taxon.category(&id)?;
    match format {
        OutputFormat::Json => print_json(&category)?,
        OutputFormat::Text => println!(
            "{} Added category {} ({})",
            "✓".green().bold(),
            category.name.bold(),
            id.to_string().yellow()
        ),
    }
    Ok(true)
}

fn cmd_category_list(taxon: &Taxon, format: OutputFormat) -> anyhow::Result<bool> {
    let listing = taxon.list_categories()?;
    match format {
        OutputFormat::Json => print_json(&listing)?,
        OutputFormat::Text => {
            if listing.is_empty() {
                println!("No categories.");
            }
            for entry in &listing {
                let parent = entry
                    .parent_name
                    .as_deref()
                    .map(|p| format!("  (parent: {p})"))
                    .unwrap_or_default();
                println!(
                    "{}  {}{}",
                    entry.id.to_string().yellow(),
                    entry.display_path,
                    parent.dimmed()
                );
            }
        }
    }
    Ok(false)
}

fn cmd_category_tree(taxon: &Taxon, format: OutputFormat) -> anyhow::Result<bool> {
    let documents = taxon.category_tree()?;
    match format {
        OutputFormat::Json => print_json(&documents)?,
        OutputFormat::Text => {
            if documents.is_empty() {
                println!("No categories.");
            }
            for doc in &documents {
                print_tree(doc);
            }
        }
    }
    Ok(false)
}

fn print_tree(doc: &CategoryTreeNode) {
    for (depth, node) in tree_rows(doc) {
        let label = if depth == 0 {
            node.name.bold().to_string()
        } else {
            node.name.clone()
        };
        println!(
            "{}{} {}",
            "  ".repeat(depth),
            label,
            node.id.short_id().dimmed()
        );
    }
}

/// Pre-order rows with their depth. Iterative, so a deeply nested snapshot
/// cannot exhaust the stack.
fn tree_rows(doc: &CategoryTreeNode) -> Vec<(usize, &CategoryTreeNode)> {
    doc.walk()
        .into_iter()
        .map(|(node, ancestors)| (ancestors.len(), node))
        .collect()
}

fn cmd_category_subtree(taxon: &Taxon, args: CategoryIdArg, format: OutputFormat) -> anyhow::Result<bool> {
    let id = parse_category_id(&args.id)?;
    let members = taxon
        .subtree_of(&id)?
        .into_iter()
        .map(|member| taxon.category(&member))
        .collect::<Result<Vec<_>, _>>()?;
    match format {
        OutputFormat::Json => print_json(&members)?,
        OutputFormat::Text => {
            println!("Subtree of {} ({} categories)", id.to_string().yellow(), members.len());
            for member in &members {
                println!("  {} {}", member.id.short_id().dimmed(), member.name);
            }
        }
    }
    Ok(false)
}

fn cmd_category_delete(taxon: &Taxon, args: CategoryIdArg, format: OutputFormat) -> anyhow::Result<bool> {
    let id = parse_category_id(&args.id)?;
    let summary = taxon.delete_category(&id)?;
    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => println!(
            "{} Deleted {} categories; {} products updated",
            "✓".green().bold(),
            summary.categories.len().to_string().bold(),
            summary.products_updated
        ),
    }
    Ok(true)
}

// ---- Products ----

fn cmd_product_add(taxon: &Taxon, args: ProductAddArgs, format: OutputFormat) -> anyhow::Result<bool> {
    let categories = args
        .categories
        .iter()
        .map(|raw| parse_category_id(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut product = Product::new(args.name, args.price_cents, args.stock).with_categories(categories);
    if let Some(sku) = args.sku {
        product = product.with_sku(sku);
    }
    if args.inactive {
        product = product.with_status(ProductStatus::Inactive);
    }

    let id = taxon.add_product(product)?;
    let stored = taxon.product(&id)?;
    match format {
        OutputFormat::Json => print_json(&stored)?,
        OutputFormat::Text => println!(
            "{} Added product {} ({})",
            "✓".green().bold(),
            stored.name.bold(),
            id.to_string().yellow()
        ),
    }
    Ok(true)
}

fn cmd_product_list(taxon: &Taxon, args: ProductListArgs, format: OutputFormat) -> anyhow::Result<bool> {
    let mut filter = taxon.browse_filter();
    filter.categories = args
        .categories
        .iter()
        .map(|raw| parse_category_id(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    filter.keyword = args.q;
    if args.all {
        filter.active_only = false;
    }

    let unfiltered = filter.categories.is_empty()
        && filter.keyword.as_deref().map_or(true, |k| k.trim().is_empty());
    let products = if unfiltered && args.all {
        taxon.products()?
    } else {
        taxon.search(&filter)?
    };

    match format {
        OutputFormat::Json => print_json(&products)?,
        OutputFormat::Text => {
            if products.is_empty() {
                if unfiltered {
                    println!("No filter given. Use --category, --q, or --all.");
                } else {
                    println!("No products.");
                }
            }
            for product in &products {
                let status = match product.status {
                    ProductStatus::Active => "active".green(),
                    ProductStatus::Inactive => "inactive".red(),
                };
                println!(
                    "{}  {}  {}  stock {}  {}{}",
                    product.id.short_id().yellow(),
                    product.name.bold(),
                    format_price(product.price_cents),
                    product.stock,
                    status,
                    product
                        .sku
                        .as_deref()
                        .map(|s| format!("  sku {s}"))
                        .unwrap_or_default()
                        .dimmed()
                );
            }
        }
    }
    Ok(false)
}

// ---- Consistency ----

fn cmd_audit(taxon: &Taxon, format: OutputFormat) -> anyhow::Result<bool> {
    let report = taxon.audit()?;
    match format {
        OutputFormat::Json => {
            let violations: Vec<_> = report
                .violations
                .iter()
                .map(|v| {
                    json!({
                        "category": v.category,
                        "kind": format!("{:?}", v.kind),
                        "description": v.description,
                    })
                })
                .collect();
            print_json(&json!({
                "consistent": report.is_consistent(),
                "categories_checked": report.categories_checked,
                "tree_nodes_checked": report.tree_nodes_checked,
                "violations": violations,
            }))?;
        }
        OutputFormat::Text => {
            if report.is_consistent() {
                println!(
                    "{} Hierarchy consistent ({} categories, {} tree nodes)",
                    "✓".green().bold(),
                    report.categories_checked,
                    report.tree_nodes_checked
                );
            } else {
                println!(
                    "{} {} violations",
                    "✗".red().bold(),
                    report.violations.len().to_string().bold()
                );
                for v in &report.violations {
                    println!(
                        "  {} {}: {}",
                        v.category.short_id().yellow(),
                        format!("{:?}", v.kind).red(),
                        v.description
                    );
                }
                println!("Run {} to rebuild the tree documents.", "taxon repair".bold());
            }
        }
    }
    if !report.is_consistent() {
        anyhow::bail!("hierarchy is inconsistent");
    }
    Ok(false)
}

fn cmd_repair(taxon: &Taxon, format: OutputFormat) -> anyhow::Result<bool> {
    let summary = taxon.rebuild_trees()?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "documents": summary.documents,
            "nodes": summary.nodes,
            "unreachable": summary.unreachable,
        }))?,
        OutputFormat::Text => {
            println!(
                "{} Rebuilt {} tree documents ({} nodes)",
                "✓".green().bold(),
                summary.documents,
                summary.nodes
            );
            for id in &summary.unreachable {
                println!("  {} {} is not reachable from any root", "!".yellow(), id);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;

    use super::*;

    fn run(data: &Path, args: &[&str]) -> anyhow::Result<()> {
        let data = data.to_string_lossy().into_owned();
        let argv = ["taxon", "--data", data.as_str()]
            .into_iter()
            .chain(args.iter().copied());
        run_command(Cli::try_parse_from(argv)?)
    }

    fn open(data: &Path) -> Taxon {
        Taxon::open(TaxonConfig::default().with_snapshot_path(data)).unwrap()
    }

    #[test]
    fn price_formatting() {
        assert_eq!(format_price(0), "0.00");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(59_900), "599.00");
    }

    #[test]
    fn tree_rows_are_pre_order_with_depth() {
        let mut root = CategoryTreeNode::new(CategoryId::new(), "Electronics");
        let mut phones = CategoryTreeNode::new(CategoryId::new(), "Phones");
        phones
            .children
            .push(CategoryTreeNode::new(CategoryId::new(), "SmartPhones"));
        root.children.push(phones);
        root.children
            .push(CategoryTreeNode::new(CategoryId::new(), "Appliances"));

        let rows: Vec<(usize, &str)> = tree_rows(&root)
            .into_iter()
            .map(|(depth, node)| (depth, node.name.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                (0, "Electronics"),
                (1, "Phones"),
                (2, "SmartPhones"),
                (1, "Appliances"),
            ]
        );
    }

    #[test]
    fn tree_rows_handle_long_chains() {
        let mut node = CategoryTreeNode::new(CategoryId::new(), "leaf");
        for i in 0..1_000 {
            let mut parent = CategoryTreeNode::new(CategoryId::new(), format!("level-{i}"));
            parent.children.push(node);
            node = parent;
        }
        let rows = tree_rows(&node);
        assert_eq!(rows.len(), 1_001);
        assert_eq!(rows.last().map(|(depth, n)| (*depth, n.name.as_str())), Some((1_000, "leaf")));
    }

    #[test]
    fn category_ids_are_parsed_or_rejected() {
        let id = CategoryId::new();
        assert_eq!(parse_category_id(&format!(" {id} ")).unwrap(), id);
        assert!(parse_category_id("nope").is_err());
    }

    #[test]
    fn data_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("taxon.toml");
        std::fs::write(&config_path, "snapshot_path = \"from-config.json\"").unwrap();

        let cli = Cli::try_parse_from([
            "taxon",
            "--config",
            config_path.to_str().unwrap(),
            "--data",
            "override.json",
            "audit",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.snapshot_path, Some(PathBuf::from("override.json")));
    }

    #[test]
    fn commands_persist_through_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("shop.json");

        run(&data, &["category", "add", "Electronics"]).unwrap();
        let electronics = open(&data).list_categories().unwrap()[0].id.to_string();
        run(&data, &["category", "add", "Phones", "--parent", &electronics]).unwrap();
        let phones = open(&data)
            .list_categories()
            .unwrap()
            .into_iter()
            .find(|c| c.name == "Phones")
            .unwrap()
            .id
            .to_string();
        run(
            &data,
            &[
                "product", "add", "--name", "Pixel", "--price-cents", "59900", "--stock", "3",
                "--category", &phones,
            ],
        )
        .unwrap();

        let taxon = open(&data);
        let root: CategoryId = electronics.parse().unwrap();
        assert_eq!(taxon.products_in_category(&root).unwrap().len(), 1);
        run(&data, &["audit"]).unwrap();
        run(&data, &["--format", "json", "product", "list", "--category", &electronics]).unwrap();

        run(&data, &["category", "delete", &phones]).unwrap();
        let taxon = open(&data);
        assert_eq!(taxon.list_categories().unwrap().len(), 1);
        assert!(taxon.products().unwrap()[0].category_ids.is_empty());
    }

    #[test]
    fn unknown_parent_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("shop.json");
        let ghost = CategoryId::new().to_string();
        assert!(run(&data, &["category", "add", "Orphan", "--parent", &ghost]).is_err());
        assert!(!data.exists());
    }
}
