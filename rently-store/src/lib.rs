pub mod store;

pub use store::{RentalStore, SharedStore};
