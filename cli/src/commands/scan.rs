use anyhow::Result;

use basket_core::service::{ScanOutcome, ScannedBarcode, ShoppingService};

use super::helpers::{not_found, resolve_category_id, resolve_list};

/// Add a product by barcode. An unknown barcode needs `--name` (and
/// optionally `--category`) to be cached and added.
pub(crate) fn cmd_scan(
    svc: &ShoppingService,
    list: &str,
    barcode: &str,
    format: Option<String>,
    name: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let list = resolve_list(svc, list, json)?;
    let scanned = ScannedBarcode {
        format,
        ..ScannedBarcode::new(barcode)
    };

    match svc.scan_barcode(&list.id, &scanned)? {
        ScanOutcome::Added { item, product } => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ScanOutcome::Added { item, product })?
                );
            } else {
                println!(
                    "Added {} [{}] to '{}' (barcode {})",
                    item.name, item.category, list.name, product.barcode
                );
            }
        }
        ScanOutcome::Unknown { barcode } => {
            let Some(name) = name else {
                not_found(
                    &format!(
                        "Barcode {barcode} is not in the product cache. Re-run with --name (and --category) to add it."
                    ),
                    json,
                );
            };

            let category_id = category
                .map(|c| resolve_category_id(svc, c, json))
                .transpose()?;
            let (item, product) =
                svc.add_scanned_product(&list.id, &barcode, name, category_id.as_deref())?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ScanOutcome::Added { item, product })?
                );
            } else {
                println!(
                    "Saved {} as {} [{}] and added it to '{}'",
                    product.barcode, product.name, product.category, list.name
                );
            }
        }
    }
    Ok(())
}
