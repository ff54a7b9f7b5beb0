//! Catalog Domain - tariff offers and the commission importer
//!
//! Tariff spreadsheets are parsed by an external collaborator; this crate
//! consumes the parsed rows, upserts the offer catalog, and derives one
//! FIXED commission rule per tier from the offer's base commission. Keys
//! are composite structs end to end, so a re-import updates the same
//! offers, tiers, and rules instead of duplicating them.

pub mod offer;
pub mod import;
pub mod error;

pub use offer::{OfferKey, PriceTier, TariffOffer};
pub use import::{
    synthetic_sub_category, CatalogImporter, CatalogStore, ImportSummary, SheetRow, Upserted,
};
pub use error::CatalogError;
