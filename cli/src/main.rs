mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_add, cmd_backup_export, cmd_backup_import, cmd_backup_validate, cmd_category_add,
    cmd_category_ls, cmd_category_order, cmd_category_reset_order, cmd_category_rm, cmd_clear,
    cmd_item_add, cmd_item_check, cmd_item_edit, cmd_item_recat, cmd_item_rm, cmd_list_archive,
    cmd_list_delete, cmd_list_duplicate, cmd_list_export, cmd_list_import, cmd_list_ls,
    cmd_list_new, cmd_list_rename, cmd_list_share, cmd_list_show, cmd_pref_ls, cmd_pref_rm,
    cmd_product_clear, cmd_product_ls, cmd_product_rm, cmd_scan,
};
use crate::config::Config;
use basket_core::service::ShoppingService;

#[derive(Parser)]
#[command(
    name = "basket",
    version,
    about = "A simple, local-first shopping list CLI",
    long_about = "\nA simple, local-first shopping list.\n\n\
        Type, paste or dictate what you need and basket splits it into items\n\
        and files each one under a grocery category. Everything stays in a\n\
        single SQLite file on this machine."
)]
struct Cli {
    /// Path to the database file (default: the platform data directory)
    #[arg(long, global = true, env = "BASKET_DB", value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, view and manage shopping lists
    List {
        #[command(subcommand)]
        command: ListCommands,
    },
    /// Quick-add items from free text (e.g. "2 bottles of milk, a dozen eggs and bread")
    Add {
        /// List ID or name
        list: String,
        /// Text to parse into items
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Work with individual items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// Remove completed items from a list
    Clear {
        /// List ID or name
        list: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a product to a list by barcode
    Scan {
        /// List ID or name
        list: String,
        /// Barcode number
        barcode: String,
        /// Barcode format reported by the scanner (e.g. `EAN_13`)
        #[arg(long)]
        format: Option<String>,
        /// Product name, used when the barcode is not cached yet
        #[arg(long)]
        name: Option<String>,
        /// Category ID or name for a new product (default: detected from the name)
        #[arg(long, requires = "name")]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the barcode product cache
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// Manage categories and their display order
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage learned item → category preferences
    Pref {
        #[command(subcommand)]
        command: PrefCommands,
    },
    /// Export, validate and import full backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
}

#[derive(Subcommand)]
enum ListCommands {
    /// Create a new list
    New {
        /// List name
        name: String,
        /// Display color (e.g. "#22aa44")
        #[arg(long)]
        color: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show all lists
    Ls {
        /// Include archived lists
        #[arg(short, long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the items on a list
    Show {
        /// List ID or name
        list: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a list
    Rename {
        /// List ID or name
        list: String,
        /// New name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Archive a list (hidden from `list ls` without --all)
    Archive {
        /// List ID or name
        list: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore an archived list
    Unarchive {
        /// List ID or name
        list: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a list and all of its items
    Delete {
        /// List ID or name
        list: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy a list and its items
    Duplicate {
        /// List ID or name
        list: String,
        /// Name for the copy (default: "<name> (copy)")
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a list as shareable text
    Share {
        /// List ID or name
        list: String,
    },
    /// Export a single list as JSON
    Export {
        /// List ID or name
        list: String,
        /// Output file (default: stdout)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import a list from a single-list export file
    Import {
        /// Path to the export file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Add a single item with an explicit quantity
    Add {
        /// List ID or name
        list: String,
        /// Item name
        name: String,
        /// Quantity
        #[arg(short, long, default_value = "1")]
        quantity: f64,
        /// Unit (e.g. "kg", "L")
        #[arg(short, long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark an item as completed
    Check {
        /// Item ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark an item as not completed
    Uncheck {
        /// Item ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an item
    Rm {
        /// Item ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an item's name, quantity, unit or notes
    Edit {
        /// Item ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New quantity
        #[arg(short, long)]
        quantity: Option<f64>,
        /// New unit
        #[arg(short, long, conflicts_with = "clear_unit")]
        unit: Option<String>,
        /// Remove the unit
        #[arg(long)]
        clear_unit: bool,
        /// New notes
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        /// Remove the notes
        #[arg(long)]
        clear_notes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an item's category and remember it for every item with that name
    Recat {
        /// Item ID
        id: String,
        /// Category ID or name
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProductCommands {
    /// Show cached products, most recently used first
    Ls {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a cached product
    Rm {
        /// Barcode number
        barcode: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every cached product
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Show categories in display order
    Ls {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a custom category
    Add {
        /// Category name
        name: String,
        /// Icon (default: 🏷️)
        #[arg(long)]
        icon: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a custom category (its items move to "other")
    Rm {
        /// Category ID or name
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put categories first, in the given order
    Order {
        /// Category IDs or names
        #[arg(required = true, num_args = 1..)]
        categories: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Go back to the default category order
    ResetOrder {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PrefCommands {
    /// Show learned preferences
    Ls {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget the preference for an item name
    Rm {
        /// Item name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Write a full backup of all data
    Export {
        /// Output file (default: stdout)
        #[arg(value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Restore a backup (replaces all lists, products and custom categories)
    Import {
        /// Path to the backup file
        file: PathBuf,
        /// Layer the backup on top of existing data instead of replacing it
        #[arg(long)]
        merge: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a backup file without importing it
    Validate {
        /// Path to the backup file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db.as_deref())?;
    tracing::debug!(db = %config.db_path.display(), "opening database");
    let svc = ShoppingService::open(&config.db_path)?;

    match cli.command {
        Commands::List { command } => match command {
            ListCommands::New { name, color, json } => cmd_list_new(&svc, &name, color, json),
            ListCommands::Ls { all, json } => cmd_list_ls(&svc, all, json),
            ListCommands::Show { list, json } => cmd_list_show(&svc, &list, json),
            ListCommands::Rename { list, name, json } => {
                cmd_list_rename(&svc, &list, &name, json)
            }
            ListCommands::Archive { list, json } => cmd_list_archive(&svc, &list, true, json),
            ListCommands::Unarchive { list, json } => cmd_list_archive(&svc, &list, false, json),
            ListCommands::Delete { list, json } => cmd_list_delete(&svc, &list, json),
            ListCommands::Duplicate { list, name, json } => {
                cmd_list_duplicate(&svc, &list, name.as_deref(), json)
            }
            ListCommands::Share { list } => cmd_list_share(&svc, &list),
            ListCommands::Export { list, output } => {
                cmd_list_export(&svc, &list, output.as_deref())
            }
            ListCommands::Import { file, json } => cmd_list_import(&svc, &file, json),
        },
        Commands::Add { list, text, json } => cmd_add(&svc, &list, &text.join(" "), json),
        Commands::Item { command } => match command {
            ItemCommands::Add {
                list,
                name,
                quantity,
                unit,
                json,
            } => cmd_item_add(&svc, &list, &name, quantity, unit, json),
            ItemCommands::Check { id, json } => cmd_item_check(&svc, &id, true, json),
            ItemCommands::Uncheck { id, json } => cmd_item_check(&svc, &id, false, json),
            ItemCommands::Rm { id, json } => cmd_item_rm(&svc, &id, json),
            ItemCommands::Edit {
                id,
                name,
                quantity,
                unit,
                clear_unit,
                notes,
                clear_notes,
                json,
            } => cmd_item_edit(
                &svc,
                &id,
                name,
                quantity,
                unit,
                clear_unit,
                notes,
                clear_notes,
                json,
            ),
            ItemCommands::Recat { id, category, json } => {
                cmd_item_recat(&svc, &id, &category, json)
            }
        },
        Commands::Clear { list, json } => cmd_clear(&svc, &list, json),
        Commands::Scan {
            list,
            barcode,
            format,
            name,
            category,
            json,
        } => cmd_scan(
            &svc,
            &list,
            &barcode,
            format,
            name.as_deref(),
            category.as_deref(),
            json,
        ),
        Commands::Product { command } => match command {
            ProductCommands::Ls { json } => cmd_product_ls(&svc, json),
            ProductCommands::Rm { barcode, json } => cmd_product_rm(&svc, &barcode, json),
            ProductCommands::Clear { json } => cmd_product_clear(&svc, json),
        },
        Commands::Category { command } => match command {
            CategoryCommands::Ls { json } => cmd_category_ls(&svc, json),
            CategoryCommands::Add { name, icon, json } => {
                cmd_category_add(&svc, &name, icon, json)
            }
            CategoryCommands::Rm { category, json } => cmd_category_rm(&svc, &category, json),
            CategoryCommands::Order { categories, json } => {
                cmd_category_order(&svc, &categories, json)
            }
            CategoryCommands::ResetOrder { json } => cmd_category_reset_order(&svc, json),
        },
        Commands::Pref { command } => match command {
            PrefCommands::Ls { json } => cmd_pref_ls(&svc, json),
            PrefCommands::Rm { name, json } => cmd_pref_rm(&svc, &name, json),
        },
        Commands::Backup { command } => match command {
            BackupCommands::Export { file } => cmd_backup_export(&svc, file.as_deref()),
            BackupCommands::Import { file, merge, json } => {
                cmd_backup_import(&svc, &file, merge, json)
            }
            BackupCommands::Validate { file, json } => cmd_backup_validate(&svc, &file, json),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_joins_words() {
        let cli = Cli::try_parse_from(["basket", "add", "groceries", "milk,", "eggs", "and", "bread"])
            .unwrap();
        match cli.command {
            Commands::Add { list, text, .. } => {
                assert_eq!(list, "groceries");
                assert_eq!(text.join(" "), "milk, eggs and bread");
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_scan_category_requires_name() {
        assert!(
            Cli::try_parse_from(["basket", "scan", "groceries", "123", "--category", "dairy"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from([
                "basket", "scan", "groceries", "123", "--name", "Milk", "--category", "dairy"
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_global_db_flag() {
        let cli = Cli::try_parse_from(["basket", "list", "ls", "--db", "/tmp/x.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
    }
}
