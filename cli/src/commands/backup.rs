use anyhow::Result;
use std::path::Path;

use basket_core::backup::{BackupError, ImportOptions};
use basket_core::models::ImportSummary;
use basket_core::service::ShoppingService;

use super::helpers::{json_error, read_json_file, write_output};

pub(crate) fn cmd_backup_export(svc: &ShoppingService, output: Option<&Path>) -> Result<()> {
    let snapshot = svc.export_backup()?;
    write_output(output, &serde_json::to_string_pretty(&snapshot)?)?;
    if let Some(path) = output {
        eprintln!(
            "Backed up {} lists, {} items and {} products to {}",
            snapshot.lists.len(),
            snapshot.items.len(),
            snapshot.products.len(),
            path.display()
        );
    }
    Ok(())
}

pub(crate) fn cmd_backup_validate(svc: &ShoppingService, file: &Path, json: bool) -> Result<()> {
    let value = read_json_file(file)?;
    let report = svc.validate_backup(&value);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.valid {
        println!("{} is a valid backup", file.display());
    } else {
        eprintln!("{} is not a valid backup:", file.display());
        for error in &report.errors {
            eprintln!("  - {error}");
        }
    }
    if !report.valid {
        std::process::exit(2);
    }
    Ok(())
}

/// Import a backup file. Validation problems exit with status 2 and leave
/// the store untouched.
pub(crate) fn cmd_backup_import(
    svc: &ShoppingService,
    file: &Path,
    merge: bool,
    json: bool,
) -> Result<()> {
    match import_file(svc, file, merge) {
        Ok(summary) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            Ok(())
        }
        Err(ImportFailure::Backup(e @ (BackupError::Validation { .. } | BackupError::Json(_)))) => {
            if json {
                println!("{}", json_error(&e.to_string()));
            } else {
                eprintln!("{e}");
            }
            std::process::exit(2);
        }
        Err(ImportFailure::Backup(e)) => Err(e.into()),
        Err(ImportFailure::Io(e)) => Err(e),
    }
}

enum ImportFailure {
    Io(anyhow::Error),
    Backup(BackupError),
}

fn import_file(
    svc: &ShoppingService,
    file: &Path,
    merge: bool,
) -> Result<ImportSummary, ImportFailure> {
    let text = std::fs::read_to_string(file).map_err(|e| {
        ImportFailure::Io(anyhow::Error::new(e).context(format!("Failed to read {}", file.display())))
    })?;
    svc.import_backup_str(&text, ImportOptions { merge })
        .map_err(ImportFailure::Backup)
}

fn print_summary(summary: &ImportSummary) {
    if summary.merged {
        println!("Merged backup into existing data");
    } else {
        println!("Replaced {} existing list(s) with backup", summary.lists_removed);
    }
    println!("  Lists:       {}", summary.lists_restored);
    println!("  Items:       {}", summary.items_restored);
    println!("  Categories:  {}", summary.categories_restored);
    println!("  Products:    {}", summary.products_restored);
    println!("  Preferences: {}", summary.preferences_restored);
    if summary.preferences_skipped > 0 {
        eprintln!(
            "  Skipped {} preference(s) for categories not in the backup",
            summary.preferences_skipped
        );
    }
    if summary.orphaned_items_skipped > 0 {
        eprintln!(
            "  Skipped {} item(s) whose list was missing from the backup",
            summary.orphaned_items_skipped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> ShoppingService {
        let svc = ShoppingService::new_in_memory().unwrap();
        let list = svc.create_list("Groceries", None).unwrap();
        svc.quick_add(&list.id, "milk, bread and apples").unwrap();
        svc
    }

    #[test]
    fn test_backup_file_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("backup.json");

        let source = seeded();
        cmd_backup_export(&source, Some(&path)).unwrap();

        let target = ShoppingService::new_in_memory().unwrap();
        let summary = import_file(&target, &path, false).ok().unwrap();
        assert_eq!(summary.lists_restored, 1);
        assert_eq!(summary.items_restored, 3);
        assert_eq!(target.lists(false).unwrap()[0].name, "Groceries");
    }

    #[test]
    fn test_import_file_classifies_failures() {
        let tmp = tempfile::TempDir::new().unwrap();
        let svc = seeded();

        let missing = import_file(&svc, &tmp.path().join("nope.json"), false);
        assert!(matches!(missing, Err(ImportFailure::Io(_))));

        let garbage = tmp.path().join("garbage.json");
        std::fs::write(&garbage, "{oops").unwrap();
        assert!(matches!(
            import_file(&svc, &garbage, false),
            Err(ImportFailure::Backup(BackupError::Json(_)))
        ));

        let old = tmp.path().join("v2.json");
        std::fs::write(
            &old,
            r#"{"version":"2.0.0","timestamp":1,"lists":[],"items":[],"customCategories":[],"products":[]}"#,
        )
        .unwrap();
        assert!(matches!(
            import_file(&svc, &old, false),
            Err(ImportFailure::Backup(BackupError::Validation { .. }))
        ));
        assert_eq!(svc.lists(false).unwrap().len(), 1);
    }

    #[test]
    fn test_merge_import_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("backup.json");
        let source = seeded();
        cmd_backup_export(&source, Some(&path)).unwrap();

        let summary = import_file(&source, &path, true).ok().unwrap();
        assert!(summary.merged);
        assert_eq!(source.lists(false).unwrap().len(), 2);
    }
}
