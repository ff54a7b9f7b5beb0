//! Catalog import DTOs

use serde::Deserialize;
use validator::Validate;

use domain_catalog::SheetRow;

/// Import payload: the commission category plus the rows produced by the
/// external spreadsheet parser (header-normalized key/value mappings).
#[derive(Debug, Deserialize, Validate)]
pub struct ImportRequest {
    #[validate(length(min = 1))]
    pub category: String,
    pub rows: Vec<SheetRow>,
}
