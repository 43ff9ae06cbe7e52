pub mod product;

pub use product::{Product, ProductError, ProductKind, SharedProduct, LAPTOP_MAX_RENTAL_WEEKS};
