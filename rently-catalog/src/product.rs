use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Maximum cumulative rental duration for laptops, in weeks.
pub const LAPTOP_MAX_RENTAL_WEEKS: u32 = 12;

/// Shared handle to a product. The same unit can sit in a store catalog
/// and in a customer's rental ledger at the same time.
pub type SharedProduct = Rc<RefCell<Product>>;

/// Product kinds in the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductKind {
    Standard,
    Laptop,
    Phone,
}

/// A single rentable inventory unit.
///
/// A product is available until its first rental. Once rented, the rental
/// period can only be extended, never shortened or cleared, and the
/// product never returns to availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub kind: ProductKind,
    name: String,
    price_per_week: f64,
    buyable: bool,
    rental_ceiling: Option<u32>,
    rental_weeks: Option<u32>,
    rental_start: Option<NaiveDate>,
}

/// Product-related errors
#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("Product name must not be empty")]
    EmptyName,

    #[error("Price per week must be positive: {0}")]
    InvalidPrice(f64),

    #[error("Rental time must be a positive number of weeks")]
    InvalidRentalTime,

    #[error("Product has not been rented yet")]
    NotRented,

    #[error("New rental time {requested} must exceed the current {current}")]
    NotExtended { current: u32, requested: u32 },

    #[error("Rental time {requested} exceeds the ceiling of {max} weeks")]
    CeilingExceeded { requested: u32, max: u32 },

    #[error("Expected a list of product fields")]
    NotAList,

    #[error("Expected a list of 1 or 2 product fields, got {0}")]
    BadFieldCount(usize),

    #[error("Expected a mapping of product fields")]
    NotAMapping,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("Field `{0}` has the wrong type")]
    WrongFieldType(&'static str),
}

impl Product {
    fn build(
        kind: ProductKind,
        name: impl Into<String>,
        price_per_week: f64,
        buyable: bool,
        rental_ceiling: Option<u32>,
    ) -> Result<Self, ProductError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ProductError::EmptyName);
        }
        // Construction allows a zero price; only the mutator insists on > 0.
        if !price_per_week.is_finite() || price_per_week < 0.0 {
            return Err(ProductError::InvalidPrice(price_per_week));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            name,
            price_per_week,
            buyable,
            rental_ceiling,
            rental_weeks: None,
            rental_start: None,
        })
    }

    /// Plain product: not buyable, no rental ceiling.
    pub fn new(name: impl Into<String>, price_per_week: f64) -> Result<Self, ProductError> {
        Self::build(ProductKind::Standard, name, price_per_week, false, None)
    }

    /// Laptop: rental ceiling of [`LAPTOP_MAX_RENTAL_WEEKS`], not buyable.
    pub fn laptop(name: impl Into<String>, price_per_week: f64) -> Result<Self, ProductError> {
        Self::build(
            ProductKind::Laptop,
            name,
            price_per_week,
            false,
            Some(LAPTOP_MAX_RENTAL_WEEKS),
        )
    }

    /// Phone: buyable by default, no rental ceiling.
    pub fn phone(name: impl Into<String>, price_per_week: f64) -> Result<Self, ProductError> {
        Self::phone_with_buyable(name, price_per_week, true)
    }

    /// Phone with an explicit buyable flag.
    pub fn phone_with_buyable(
        name: impl Into<String>,
        price_per_week: f64,
        buyable: bool,
    ) -> Result<Self, ProductError> {
        Self::build(ProductKind::Phone, name, price_per_week, buyable, None)
    }

    /// Build a laptop from an ordered field list: `[name]` or `[name, price]`.
    pub fn laptop_from_list(fields: &Value) -> Result<Self, ProductError> {
        let fields = fields.as_array().ok_or(ProductError::NotAList)?;
        if fields.is_empty() || fields.len() > 2 {
            return Err(ProductError::BadFieldCount(fields.len()));
        }
        let name = fields[0]
            .as_str()
            .ok_or(ProductError::WrongFieldType("name"))?;
        let price_per_week = match fields.get(1) {
            Some(value) => value
                .as_f64()
                .ok_or(ProductError::WrongFieldType("price_per_week"))?,
            None => 0.0,
        };
        Self::laptop(name, price_per_week)
    }

    /// Build a phone from a mapping holding exactly the keys `name` and
    /// `price_per_week`.
    pub fn phone_from_map(fields: &Value) -> Result<Self, ProductError> {
        let map = fields.as_object().ok_or(ProductError::NotAMapping)?;
        for key in map.keys() {
            if key != "name" && key != "price_per_week" {
                return Err(ProductError::UnexpectedField(key.clone()));
            }
        }
        let name = map
            .get("name")
            .ok_or(ProductError::MissingField("name"))?
            .as_str()
            .ok_or(ProductError::WrongFieldType("name"))?;
        let price_per_week = map
            .get("price_per_week")
            .ok_or(ProductError::MissingField("price_per_week"))?
            .as_f64()
            .ok_or(ProductError::WrongFieldType("price_per_week"))?;
        Self::phone(name, price_per_week)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price_per_week(&self) -> f64 {
        self.price_per_week
    }

    pub fn buyable(&self) -> bool {
        self.buyable
    }

    pub fn rental_weeks(&self) -> Option<u32> {
        self.rental_weeks
    }

    /// Start of the current rental; only set through [`Product::rent`].
    pub fn rental_start(&self) -> Option<NaiveDate> {
        self.rental_start
    }

    pub fn rental_ceiling(&self) -> Option<u32> {
        self.rental_ceiling
    }

    /// Update the weekly price. Must be strictly positive.
    pub fn set_price_per_week(&mut self, new_price: f64) -> Result<(), ProductError> {
        if !new_price.is_finite() || new_price <= 0.0 {
            return Err(ProductError::InvalidPrice(new_price));
        }
        self.price_per_week = new_price;
        Ok(())
    }

    /// Extend the rental period. Only valid on a rented product, and only
    /// upward: the new duration must exceed the current one.
    pub fn set_rental_weeks(&mut self, new_weeks: u32) -> Result<(), ProductError> {
        if self.rental_start.is_none() {
            return Err(ProductError::NotRented);
        }
        if new_weeks == 0 {
            return Err(ProductError::InvalidRentalTime);
        }
        if let Some(max) = self.rental_ceiling {
            if new_weeks > max {
                return Err(ProductError::CeilingExceeded {
                    requested: new_weeks,
                    max,
                });
            }
        }
        if let Some(current) = self.rental_weeks {
            if new_weeks <= current {
                return Err(ProductError::NotExtended {
                    current,
                    requested: new_weeks,
                });
            }
        }
        self.rental_weeks = Some(new_weeks);
        Ok(())
    }

    /// Date the rental ends, when one has been taken out.
    pub fn rental_end(&self) -> Option<NaiveDate> {
        match (self.rental_start, self.rental_weeks) {
            (Some(start), Some(weeks)) => Some(start + Duration::weeks(i64::from(weeks))),
            _ => None,
        }
    }

    /// A product is available until its first rental. An elapsed rental
    /// does not return it to availability.
    pub fn available(&self) -> bool {
        self.rental_weeks.is_none()
    }

    /// Rent for `weeks` starting today.
    ///
    /// `Ok(false)` means the product was not available; nothing changes in
    /// that case and the caller decides how to report it.
    pub fn rent(&mut self, weeks: u32) -> Result<bool, ProductError> {
        self.rent_starting(Utc::now().date_naive(), weeks)
    }

    /// Rent with an explicit start date.
    ///
    /// The requested duration is validated (positive, within the ceiling)
    /// before the availability check, so an out-of-range request is a hard
    /// error even on an unavailable product.
    pub fn rent_starting(&mut self, start: NaiveDate, weeks: u32) -> Result<bool, ProductError> {
        if weeks == 0 {
            return Err(ProductError::InvalidRentalTime);
        }
        if let Some(max) = self.rental_ceiling {
            if weeks > max {
                return Err(ProductError::CeilingExceeded {
                    requested: weeks,
                    max,
                });
            }
        }
        if !self.available() {
            return Ok(false);
        }
        self.rental_weeks = Some(weeks);
        self.rental_start = Some(start);
        Ok(true)
    }

    /// One-line description: name and weekly price.
    pub fn description(&self) -> String {
        format!("Product: {}\nPrice per week: {}", self.name, self.price_per_week)
    }

    /// Wrap in a shared handle for use in a store catalog.
    pub fn into_shared(self) -> SharedProduct {
        Rc::new(RefCell::new(self))
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2}/week)", self.name, self.price_per_week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    fn fresh_product_state() {
        let product = Product::new("Test Product A", 0.0).unwrap();

        assert!(product.available());
        assert!(!product.buyable());
        assert_eq!(product.price_per_week(), 0.0);
        assert_eq!(product.rental_weeks(), None);
        assert_eq!(product.rental_start(), None);
        assert_eq!(product.rental_end(), None);
    }

    #[test]
    fn products_get_unique_ids() {
        let a = Product::new("Test Product A", 10.0).unwrap();
        let b = Product::new("Test Product A", 10.0).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn construction_rejects_bad_input() {
        assert!(matches!(
            Product::new("", 5.0),
            Err(ProductError::EmptyName)
        ));
        assert!(matches!(
            Product::new("Test Product C", -4.0),
            Err(ProductError::InvalidPrice(_))
        ));
        assert!(matches!(
            Product::new("Test Product C", f64::NAN),
            Err(ProductError::InvalidPrice(_))
        ));
    }

    #[test]
    fn rent_sets_rental_fields() {
        let mut product = Product::new("Test Product A", 10.0).unwrap();

        assert_eq!(product.rent(8).unwrap(), true);
        assert!(!product.available());
        assert_eq!(product.rental_weeks(), Some(8));
        assert_eq!(product.rental_start(), Some(today()));
        assert_eq!(product.rental_end(), Some(today() + Duration::weeks(8)));
    }

    #[test]
    fn rent_rejects_zero_weeks() {
        let mut product = Product::new("Test Product A", 10.0).unwrap();
        assert!(matches!(
            product.rent(0),
            Err(ProductError::InvalidRentalTime)
        ));
        assert!(product.available());
    }

    #[test]
    fn rent_when_unavailable_is_a_no_op() {
        let mut product = Product::new("Test Product A", 10.0).unwrap();
        product.rent(8).unwrap();

        assert_eq!(product.rent(2).unwrap(), false);
        assert_eq!(product.rental_weeks(), Some(8));
        assert_eq!(product.rental_start(), Some(today()));
    }

    #[test]
    fn rent_starting_uses_the_given_date() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut product = Product::new("Test Product A", 10.0).unwrap();

        assert_eq!(product.rent_starting(start, 2).unwrap(), true);
        assert_eq!(product.rental_start(), Some(start));
        assert_eq!(product.rental_end(), Some(start + Duration::weeks(2)));
    }

    #[test]
    fn price_can_be_updated_to_positive_values() {
        let mut product = Product::new("Test Product C", 5.2).unwrap();

        product.set_price_per_week(6.3).unwrap();
        assert_eq!(product.price_per_week(), 6.3);

        assert!(matches!(
            product.set_price_per_week(0.0),
            Err(ProductError::InvalidPrice(_))
        ));
        assert!(matches!(
            product.set_price_per_week(-2.0),
            Err(ProductError::InvalidPrice(_))
        ));
        assert_eq!(product.price_per_week(), 6.3);
    }

    #[test]
    fn rental_weeks_can_only_be_extended() {
        let mut product = Product::new("Test Product A", 10.0).unwrap();

        // Not settable before the first rental.
        assert!(matches!(
            product.set_rental_weeks(2),
            Err(ProductError::NotRented)
        ));

        product.rent(8).unwrap();
        product.set_rental_weeks(10).unwrap();
        assert_eq!(product.rental_weeks(), Some(10));

        assert!(matches!(
            product.set_rental_weeks(6),
            Err(ProductError::NotExtended { current: 10, requested: 6 })
        ));
        assert!(matches!(
            product.set_rental_weeks(10),
            Err(ProductError::NotExtended { .. })
        ));
        assert!(matches!(
            product.set_rental_weeks(0),
            Err(ProductError::InvalidRentalTime)
        ));
        assert_eq!(product.rental_weeks(), Some(10));
    }

    #[test]
    fn laptop_enforces_the_rental_ceiling() {
        let mut laptop = Product::laptop("Test Product A 1", 0.0).unwrap();
        assert_eq!(laptop.rental_ceiling(), Some(LAPTOP_MAX_RENTAL_WEEKS));

        assert!(matches!(
            laptop.rent(LAPTOP_MAX_RENTAL_WEEKS + 1),
            Err(ProductError::CeilingExceeded { requested: 13, max: 12 })
        ));
        assert!(laptop.available());

        assert_eq!(laptop.rent(LAPTOP_MAX_RENTAL_WEEKS).unwrap(), true);
        assert_eq!(laptop.rental_weeks(), Some(12));
    }

    #[test]
    fn laptop_extension_respects_the_ceiling() {
        let mut laptop = Product::laptop("Test Product A 1", 0.0).unwrap();
        laptop.rent(8).unwrap();

        assert!(matches!(
            laptop.set_rental_weeks(LAPTOP_MAX_RENTAL_WEEKS + 1),
            Err(ProductError::CeilingExceeded { .. })
        ));

        laptop.set_rental_weeks(10).unwrap();
        assert_eq!(laptop.rental_weeks(), Some(10));
    }

    #[test]
    fn laptops_are_not_buyable_by_default() {
        let laptop = Product::laptop("Test Product A 2", 10.0).unwrap();
        assert!(!laptop.buyable());
    }

    #[test]
    fn phones_are_buyable_by_default() {
        let phone = Product::phone("Test Product B 1", 0.0).unwrap();
        assert!(phone.buyable());

        let phone = Product::phone("Test Product B 2", 5.2).unwrap();
        assert!(phone.buyable());

        let phone = Product::phone_with_buyable("Test Product B 3", 5.2, false).unwrap();
        assert!(!phone.buyable());
    }

    #[test]
    fn laptop_from_list_arities() {
        let laptop = Product::laptop_from_list(&json!(["Test Product", 3.5])).unwrap();
        assert_eq!(laptop.name(), "Test Product");
        assert_eq!(laptop.price_per_week(), 3.5);

        let laptop = Product::laptop_from_list(&json!(["Test Product 2"])).unwrap();
        assert_eq!(laptop.name(), "Test Product 2");
        assert_eq!(laptop.price_per_week(), 0.0);

        assert!(matches!(
            Product::laptop_from_list(&json!([])),
            Err(ProductError::BadFieldCount(0))
        ));
        assert!(matches!(
            Product::laptop_from_list(&json!(["Test Product", 3.5, "third variable"])),
            Err(ProductError::BadFieldCount(3))
        ));
        assert!(matches!(
            Product::laptop_from_list(&json!("Test Product")),
            Err(ProductError::NotAList)
        ));
        assert!(matches!(
            Product::laptop_from_list(&json!([3.5])),
            Err(ProductError::WrongFieldType("name"))
        ));
        assert!(matches!(
            Product::laptop_from_list(&json!(["Test Product", "4"])),
            Err(ProductError::WrongFieldType("price_per_week"))
        ));
    }

    #[test]
    fn phone_from_map_requires_exact_keys() {
        let phone =
            Product::phone_from_map(&json!({"name": "Test Product", "price_per_week": 3.5}))
                .unwrap();
        assert_eq!(phone.name(), "Test Product");
        assert_eq!(phone.price_per_week(), 3.5);
        assert!(phone.buyable());

        let phone =
            Product::phone_from_map(&json!({"name": "Test Product 2", "price_per_week": 0}))
                .unwrap();
        assert_eq!(phone.price_per_week(), 0.0);

        assert!(matches!(
            Product::phone_from_map(&json!(["Test Product", 3.5])),
            Err(ProductError::NotAMapping)
        ));
        assert!(matches!(
            Product::phone_from_map(&json!({"product_name": "Test Product", "price_per_week": 3.5})),
            Err(ProductError::UnexpectedField(_))
        ));
        assert!(matches!(
            Product::phone_from_map(&json!({"name": "Test Product", "price": 3.5})),
            Err(ProductError::UnexpectedField(_))
        ));
        assert!(matches!(
            Product::phone_from_map(&json!({"name": "Test Product"})),
            Err(ProductError::MissingField("price_per_week"))
        ));
    }

    #[test]
    fn list_and_direct_construction_are_equivalent() {
        let from_list = Product::laptop_from_list(&json!(["Test Product", 3.5])).unwrap();
        let direct = Product::laptop("Test Product", 3.5).unwrap();

        assert_eq!(from_list.name(), direct.name());
        assert_eq!(from_list.price_per_week(), direct.price_per_week());
        assert_eq!(from_list.available(), direct.available());
        assert_eq!(from_list.buyable(), direct.buyable());
        assert_eq!(from_list.kind, direct.kind);
    }
}
