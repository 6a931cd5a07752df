pub mod product;

pub use product::*;

/// Backend collection holding the shopping list.
pub const PRODUCTS_COLLECTION: &str = "produtos";

/// Server-stamped creation time; the list is ordered on it, newest first.
pub const FIELD_ADDED_AT: &str = "dataAdicao";

pub const FIELD_PURCHASED: &str = "comprado";
