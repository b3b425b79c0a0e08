mod backup;
mod catalog;
mod helpers;
mod item;
mod list;
mod scan;

pub(crate) use backup::{cmd_backup_export, cmd_backup_import, cmd_backup_validate};
pub(crate) use catalog::{
    cmd_category_add, cmd_category_ls, cmd_category_order, cmd_category_reset_order,
    cmd_category_rm, cmd_pref_ls, cmd_pref_rm, cmd_product_clear, cmd_product_ls,
    cmd_product_rm,
};
pub(crate) use item::{
    cmd_add, cmd_clear, cmd_item_add, cmd_item_check, cmd_item_edit, cmd_item_recat, cmd_item_rm,
};
pub(crate) use list::{
    cmd_list_archive, cmd_list_delete, cmd_list_duplicate, cmd_list_export, cmd_list_import,
    cmd_list_ls, cmd_list_new, cmd_list_rename, cmd_list_share, cmd_list_show,
};
pub(crate) use scan::cmd_scan;
