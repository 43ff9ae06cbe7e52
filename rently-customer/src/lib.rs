pub mod customer;

pub use customer::{BuyOutcome, Customer, CustomerError, RentOutcome, RentalRecord};
