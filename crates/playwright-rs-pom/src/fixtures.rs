// Test data generator
//
// Pure functions producing fixture records. Nothing here touches the
// database, the API or the browser; tests decide what to persist.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Collection holding [`User`] documents.
pub const USERS: &str = "users";

/// Collection holding [`Product`] documents.
pub const PRODUCTS: &str = "products";

/// Password shared by generated users.
pub const DEFAULT_PASSWORD: &str = "TestPassword123!";

const CATEGORIES: [&str; 5] = ["Electronics", "Clothing", "Books", "Sports", "Home"];

/// A user account as stored by the application and returned by its API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    #[serde(default)]
    pub is_active: bool,
    pub created_date: DateTime<Utc>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category: String,
    pub in_stock: bool,
    #[serde(default)]
    pub quantity: u32,
}

impl User {
    /// Builds a user with a fresh random id.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let username = username.into();
        Self {
            id: new_id(),
            email: username.clone(),
            username,
            first_name: first_name.into(),
            last_name: last_name.into(),
            password: password.into(),
            is_active: true,
            created_date: Utc::now(),
        }
    }
}

impl Product {
    /// Builds an in-stock product with an empty description.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            category: category.into(),
            in_stock: true,
            quantity: 1,
        }
    }

    pub fn out_of_stock(mut self) -> Self {
        self.in_stock = false;
        self.quantity = 0;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Random opaque document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Timestamp + short random suffix for usernames and emails that must not
/// collide with another case's data.
pub fn unique_suffix() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &random[..8])
}

/// `count` users numbered from 1; even-numbered users are active and user `i`
/// was created `i` days ago.
pub fn generate_users(count: usize) -> Vec<User> {
    let now = Utc::now();
    (1..=count)
        .map(|i| User {
            id: new_id(),
            username: format!("testuser{i}@example.com"),
            email: format!("testuser{i}@example.com"),
            first_name: format!("FirstName{i}"),
            last_name: format!("LastName{i}"),
            password: DEFAULT_PASSWORD.to_string(),
            is_active: i % 2 == 0,
            created_date: now - Duration::days(i as i64),
        })
        .collect()
}

/// `count` products with sequential ids starting at "1".
///
/// Categories cycle by `i % 5`; every third product is out of stock with a
/// zero quantity.
pub fn generate_products(count: usize) -> Vec<Product> {
    (1..=count)
        .map(|i| {
            let in_stock = i % 3 != 0;
            Product {
                id: i.to_string(),
                name: format!("Product {i}"),
                description: format!("Description for product {i}"),
                price: 10.0 + i as f64 * 5.5,
                category: CATEGORIES[i % CATEGORIES.len()].to_string(),
                in_stock,
                quantity: if in_stock { 10 + i as u32 } else { 0 },
            }
        })
        .collect()
}

/// The account the application under test always accepts.
pub fn valid_user() -> User {
    User::new("validuser@example.com", "ValidPassword123!", "Valid", "User")
}

/// An account the application under test rejects.
pub fn invalid_user() -> User {
    let mut user = User::new("invalid@example.com", "WrongPassword", "Invalid", "User");
    user.is_active = false;
    user
}

/// Named credentials used across login scenarios.
pub fn credentials() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("valid_user", "validuser@example.com"),
        ("valid_password", "ValidPassword123!"),
        ("invalid_user", "invalid@example.com"),
        ("invalid_password", "WrongPassword"),
        ("admin_user", "admin@example.com"),
        ("admin_password", "AdminPassword123!"),
    ])
}

/// The three products used by the cross-layer search scenario.
pub fn laptop_catalog() -> Vec<Product> {
    vec![
        Product::new("1", "Gaming Laptop", 1500.0, "Electronics")
            .describe("High refresh rate gaming laptop"),
        Product::new("2", "Office Laptop", 800.0, "Electronics")
            .describe("Lightweight laptop for office work"),
        Product::new("3", "Gaming Mouse", 50.0, "Accessories")
            .describe("Wired mouse with programmable buttons")
            .out_of_stock(),
    ]
}

/// A broader catalog for search scenarios that only look at the UI.
pub fn storefront_catalog() -> Vec<Product> {
    let mut catalog = laptop_catalog();
    catalog.extend([
        Product::new("4", "Desktop Computer", 1200.0, "Electronics")
            .describe("Tower computer with discrete graphics"),
        Product::new("5", "Computer Desk", 250.0, "Home")
            .describe("Standing desk sized for a computer setup"),
        Product::new("6", "Running Shoes", 90.0, "Sports").describe("Cushioned road shoes"),
        Product::new("7", "Rust in Action", 45.0, "Books")
            .describe("Systems programming with Rust"),
    ]);
    catalog
}
