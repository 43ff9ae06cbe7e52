use std::cell::RefCell;
use std::rc::Rc;

use rently_catalog::SharedProduct;
use tracing::info;

/// Shared handle to a store; one store may be observed by any number of
/// customers.
pub type SharedStore = Rc<RefCell<RentalStore>>;

/// Ordered product catalog of a rental store.
///
/// Insertion order is preserved for iteration and display. Products are
/// never mutated by the store itself; it only adds, removes, and lists.
#[derive(Debug, Default)]
pub struct RentalStore {
    products: Vec<SharedProduct>,
}

impl RentalStore {
    pub fn new(products: Vec<SharedProduct>) -> Self {
        Self { products }
    }

    /// Number of products currently in the catalog.
    pub fn size(&self) -> usize {
        self.products.len()
    }

    pub fn products(&self) -> &[SharedProduct] {
        &self.products
    }

    /// Append a product to the catalog. Returns the store for chaining.
    pub fn add(&mut self, product: SharedProduct) -> &mut Self {
        info!("Added product to store: {}", product.borrow().name());
        self.products.push(product);
        self
    }

    /// Remove the first product with the same name. Removing a product
    /// that is not in the catalog is a no-op, not an error.
    pub fn remove(&mut self, product: &SharedProduct) -> &mut Self {
        let name = product.borrow().name().to_string();
        self.remove_by_name(&name)
    }

    /// Remove the first product matching `name`, if any.
    pub fn remove_by_name(&mut self, name: &str) -> &mut Self {
        match self.products.iter().position(|p| p.borrow().name() == name) {
            Some(index) => {
                self.products.remove(index);
                info!("Removed product from store: {name}");
            }
            None => info!("No product named {name} in store, nothing removed"),
        }
        self
    }

    /// First product matching `name`, if any.
    pub fn find_by_name(&self, name: &str) -> Option<SharedProduct> {
        self.products
            .iter()
            .find(|p| p.borrow().name() == name)
            .cloned()
    }

    /// Display lines for the catalog, one per product.
    pub fn catalog_lines(&self) -> Vec<String> {
        self.products
            .iter()
            .map(|p| {
                let p = p.borrow();
                format!(
                    "Name: {}, Price per week: {:.2}€, Available: {}, Buyable: {}",
                    p.name(),
                    p.price_per_week(),
                    p.available(),
                    p.buyable()
                )
            })
            .collect()
    }

    /// Emit the catalog at info level.
    pub fn list_products(&self) {
        for line in self.catalog_lines() {
            info!("{line}");
        }
    }

    /// Store imprint.
    pub fn imprint() -> &'static str {
        "IMPRINT\nRentalStore GmbH\nDeposit Street 7\n44321 Rent City"
    }

    /// Wrap in a shared handle so customers can bind to the store.
    pub fn into_shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }
}
