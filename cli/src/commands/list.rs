use anyhow::Result;
use std::path::Path;

use basket_core::service::ShoppingService;

use super::helpers::{
    format_timestamp, not_found, print_items_table, print_lists_table, read_json_file,
    resolve_list, write_output,
};

pub(crate) fn cmd_list_new(
    svc: &ShoppingService,
    name: &str,
    color: Option<String>,
    json: bool,
) -> Result<()> {
    let list = svc.create_list(name, color)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        println!("Created list '{}' ({})", list.name, list.id);
    }
    Ok(())
}

pub(crate) fn cmd_list_ls(svc: &ShoppingService, all: bool, json: bool) -> Result<()> {
    let lists = svc.lists(all)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&lists)?);
        return Ok(());
    }
    if lists.is_empty() {
        eprintln!("No lists yet. Use `basket list new <name>` to create one.");
        return Ok(());
    }

    let mut counts = Vec::with_capacity(lists.len());
    for list in &lists {
        let items = svc.items(&list.id)?;
        let done = items.iter().filter(|i| i.completed).count();
        counts.push((items.len(), done));
    }
    print_lists_table(&lists, &counts);
    Ok(())
}

pub(crate) fn cmd_list_show(svc: &ShoppingService, list: &str, json: bool) -> Result<()> {
    let list = resolve_list(svc, list, json)?;
    let items = svc.items(&list.id)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "list": list, "items": items }))?
        );
        return Ok(());
    }

    let archived = if list.archived { " (archived)" } else { "" };
    println!("{}{archived}", list.name);
    println!("Updated {}", format_timestamp(list.updated_at));
    if items.is_empty() {
        eprintln!("No items. Use `basket add '{}' <text>` to add some.", list.name);
    } else {
        print_items_table(&items, &svc.categories()?);
    }
    Ok(())
}

pub(crate) fn cmd_list_rename(
    svc: &ShoppingService,
    list: &str,
    name: &str,
    json: bool,
) -> Result<()> {
    let existing = resolve_list(svc, list, json)?;
    let renamed = svc.rename_list(&existing.id, name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&renamed)?);
    } else {
        println!("Renamed '{}' to '{}'", existing.name, renamed.name);
    }
    Ok(())
}

pub(crate) fn cmd_list_archive(
    svc: &ShoppingService,
    list: &str,
    archived: bool,
    json: bool,
) -> Result<()> {
    let existing = resolve_list(svc, list, json)?;
    let updated = svc.set_list_archived(&existing.id, archived)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else if archived {
        println!("Archived '{}'", updated.name);
    } else {
        println!("Restored '{}'", updated.name);
    }
    Ok(())
}

pub(crate) fn cmd_list_delete(svc: &ShoppingService, list: &str, json: bool) -> Result<()> {
    let existing = resolve_list(svc, list, json)?;
    if !svc.delete_list(&existing.id)? {
        not_found(&format!("List '{list}' not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": existing.id }));
    } else {
        println!("Deleted list '{}'", existing.name);
    }
    Ok(())
}

pub(crate) fn cmd_list_duplicate(
    svc: &ShoppingService,
    list: &str,
    name: Option<&str>,
    json: bool,
) -> Result<()> {
    let existing = resolve_list(svc, list, json)?;
    let copy = svc.duplicate_list(&existing.id, name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&copy)?);
    } else {
        println!("Copied '{}' to '{}' ({})", existing.name, copy.name, copy.id);
    }
    Ok(())
}

pub(crate) fn cmd_list_share(svc: &ShoppingService, list: &str) -> Result<()> {
    let list = resolve_list(svc, list, false)?;
    print!("{}", svc.share_text(&list.id)?);
    Ok(())
}

pub(crate) fn cmd_list_export(
    svc: &ShoppingService,
    list: &str,
    output: Option<&Path>,
) -> Result<()> {
    let list = resolve_list(svc, list, false)?;
    let export = svc.export_list(&list.id)?;
    write_output(output, &serde_json::to_string_pretty(&export)?)?;
    if let Some(path) = output {
        eprintln!(
            "Exported '{}' ({} items) to {}",
            list.name,
            export.items.len(),
            path.display()
        );
    }
    Ok(())
}

pub(crate) fn cmd_list_import(svc: &ShoppingService, file: &Path, json: bool) -> Result<()> {
    let value = read_json_file(file)?;
    let list = svc.import_list(&value)?;
    let count = svc.items(&list.id)?.len();
    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        println!("Imported '{}' with {count} items ({})", list.name, list.id);
    }
    Ok(())
}
