use std::fmt;

use chrono::{NaiveDate, Utc};
use rently_catalog::{ProductError, SharedProduct};
use rently_store::SharedStore;
use tracing::info;

/// One rental taken out by a customer: the product and its settlement flag.
///
/// Records are never deleted; a settled rental stays in the ledger with
/// `paid` flipped to true.
#[derive(Debug, Clone)]
pub struct RentalRecord {
    product: SharedProduct,
    paid: bool,
}

impl RentalRecord {
    pub fn product(&self) -> &SharedProduct {
        &self.product
    }

    pub fn paid(&self) -> bool {
        self.paid
    }
}

/// Outcome of a rent request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentOutcome {
    Rented,
    /// The product exists but is already rented out; nothing changed.
    Unavailable,
}

/// Outcome of a buy request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyOutcome {
    Purchased,
    /// The product has been rented at some point and cannot be bought.
    NotAvailable,
    /// The product is not for sale.
    NotBuyable,
}

/// Customer-related errors
#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    #[error("Product not found in store: {0}")]
    ProductNotFound(String),

    #[error("Payment amount must be positive: {0}")]
    InvalidAmount(f64),

    #[error("Payment of {amount} does not settle the invoice of {invoice}")]
    PaymentMismatch { amount: f64, invoice: f64 },

    #[error(transparent)]
    Product(#[from] ProductError),
}

/// A customer bound to one rental store.
///
/// Keeps the full rental history (not only the active rentals) and every
/// product bought outright. The rented and owned sequences only grow.
#[derive(Debug)]
pub struct Customer {
    name: String,
    store: SharedStore,
    rentals: Vec<RentalRecord>,
    owned: Vec<SharedProduct>,
}

impl Customer {
    pub fn new(name: impl Into<String>, store: SharedStore) -> Self {
        Self {
            name: name.into(),
            store,
            rentals: Vec::new(),
            owned: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Full rental history, oldest first.
    pub fn rentals(&self) -> &[RentalRecord] {
        &self.rentals
    }

    /// Products bought outright, oldest first.
    pub fn owned_items(&self) -> &[SharedProduct] {
        &self.owned
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn elapsed(record: &RentalRecord, as_of: NaiveDate) -> bool {
        matches!(record.product.borrow().rental_end(), Some(end) if end <= as_of)
    }

    /// Rentals whose period is still running.
    pub fn current_items(&self) -> Vec<SharedProduct> {
        self.current_items_on(Self::today())
    }

    pub fn current_items_on(&self, as_of: NaiveDate) -> Vec<SharedProduct> {
        self.rentals
            .iter()
            .filter(|r| matches!(r.product.borrow().rental_end(), Some(end) if end > as_of))
            .map(|r| r.product.clone())
            .collect()
    }

    /// Elapsed, unpaid rentals.
    pub fn due_items(&self) -> Vec<SharedProduct> {
        self.due_items_on(Self::today())
    }

    pub fn due_items_on(&self, as_of: NaiveDate) -> Vec<SharedProduct> {
        self.rentals
            .iter()
            .filter(|r| !r.paid && Self::elapsed(r, as_of))
            .map(|r| r.product.clone())
            .collect()
    }

    /// Elapsed, settled rentals.
    pub fn paid_items(&self) -> Vec<SharedProduct> {
        self.paid_items_on(Self::today())
    }

    pub fn paid_items_on(&self, as_of: NaiveDate) -> Vec<SharedProduct> {
        self.rentals
            .iter()
            .filter(|r| r.paid && Self::elapsed(r, as_of))
            .map(|r| r.product.clone())
            .collect()
    }

    /// Outstanding amount over all due rentals: weeks times weekly price.
    pub fn invoice(&self) -> f64 {
        self.invoice_on(Self::today())
    }

    pub fn invoice_on(&self, as_of: NaiveDate) -> f64 {
        self.rentals
            .iter()
            .filter(|r| !r.paid && Self::elapsed(r, as_of))
            .map(|r| {
                let product = r.product.borrow();
                f64::from(product.rental_weeks().unwrap_or(0)) * product.price_per_week()
            })
            .sum()
    }

    /// Settle the outstanding invoice.
    ///
    /// The amount must match the invoice exactly; partial payments are
    /// rejected before any flag flips. On success every due rental flips
    /// to paid in one step.
    pub fn pay_invoice(&mut self, amount: f64) -> Result<(), CustomerError> {
        self.pay_invoice_on(amount, Self::today())
    }

    pub fn pay_invoice_on(&mut self, amount: f64, as_of: NaiveDate) -> Result<(), CustomerError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CustomerError::InvalidAmount(amount));
        }
        let invoice = self.invoice_on(as_of);
        if amount != invoice {
            return Err(CustomerError::PaymentMismatch { amount, invoice });
        }
        for record in self.rentals.iter_mut() {
            if !record.paid && Self::elapsed(record, as_of) {
                record.paid = true;
            }
        }
        info!("Customer {} settled invoice of {:.2}", self.name, invoice);
        Ok(())
    }

    /// Rent `weeks` of the named product from the bound store.
    ///
    /// An unknown product name is an error; a product that is merely
    /// unavailable is not. In the latter case the catalog is listed and
    /// `Ok(RentOutcome::Unavailable)` is returned with nothing changed.
    pub fn rent(&mut self, item_name: &str, weeks: u32) -> Result<RentOutcome, CustomerError> {
        let product = self
            .store
            .borrow()
            .find_by_name(item_name)
            .ok_or_else(|| CustomerError::ProductNotFound(item_name.to_string()))?;

        let rented = product.borrow_mut().rent(weeks)?;
        if !rented {
            info!("{item_name} is not available right now");
            self.store.borrow().list_products();
            return Ok(RentOutcome::Unavailable);
        }

        info!("Customer {} rented {item_name} for {weeks} weeks", self.name);
        self.rentals.push(RentalRecord {
            product,
            paid: false,
        });
        Ok(RentOutcome::Rented)
    }

    /// Buy the named product outright.
    ///
    /// Only an available, buyable product can be purchased; it moves from
    /// the store catalog into the customer's owned items. A failed
    /// precondition lists the catalog and reports which condition failed,
    /// leaving all state unchanged.
    pub fn buy(&mut self, item_name: &str) -> Result<BuyOutcome, CustomerError> {
        let product = self
            .store
            .borrow()
            .find_by_name(item_name)
            .ok_or_else(|| CustomerError::ProductNotFound(item_name.to_string()))?;

        let (available, buyable) = {
            let product = product.borrow();
            (product.available(), product.buyable())
        };

        if !available {
            info!("{item_name} is not available for purchase");
            self.store.borrow().list_products();
            return Ok(BuyOutcome::NotAvailable);
        }
        if !buyable {
            info!("{item_name} is not for sale");
            self.store.borrow().list_products();
            return Ok(BuyOutcome::NotBuyable);
        }

        self.store.borrow_mut().remove_by_name(item_name);
        info!("Customer {} bought {item_name}", self.name);
        self.owned.push(product);
        Ok(BuyOutcome::Purchased)
    }

    /// One-line summary of the customer.
    pub fn summary(&self) -> String {
        format!("Customer: {}, {} items rented.", self.name, self.rentals.len())
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(items: &[SharedProduct]) -> String {
            items
                .iter()
                .map(|p| p.borrow().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }

        let rented: Vec<SharedProduct> =
            self.rentals.iter().map(|r| r.product.clone()).collect();

        writeln!(f, "{}", self.name)?;
        writeln!(f, "Owned items: [{}]", join(&self.owned))?;
        writeln!(f, "Rented items: [{}]", join(&rented))?;
        writeln!(f, "Due items: [{}]", join(&self.due_items()))?;
        write!(f, "Amount payable: {}", self.invoice())
    }
}
