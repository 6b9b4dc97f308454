use serde::{Deserialize, Serialize};

use super::format::format_dhms;

pub const ALL_TIME: &str = "ALL TIME";
pub const WORK_TIME: &str = "WORK TIME";
pub const RENDER_TIME: &str = "RENDER TIME";

/// Named accumulator of elapsed seconds. `display` always mirrors `seconds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    name: String,
    seconds: f64,
    #[serde(default)]
    display: String,
}

impl Category {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            seconds: 0.,
            display: format_dhms(0.),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    fn add(&mut self, delta: f64) {
        self.seconds += delta;
        self.display = format_dhms(self.seconds);
    }
}

/// Ordered set of categories, unique by name. Creation order is the display order.
///
/// Deserialization goes through [`From<Vec<Category>>`], so a stored document with repeated names
/// is folded back into one record per name.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Category>", into = "Vec<Category>")]
pub struct CategoryStore {
    categories: Vec<Category>,
}

impl CategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|v| v.name == name)
    }

    /// Returns the record for `name`, appending a zero valued one if there is none yet.
    pub fn get_or_create(&mut self, name: &str) -> &mut Category {
        let index = match self.categories.iter().position(|v| v.name == name) {
            Some(index) => index,
            None => {
                self.categories.push(Category::new(name));
                self.categories.len() - 1
            }
        };
        &mut self.categories[index]
    }

    pub fn add_seconds(&mut self, name: &str, delta: f64) -> &Category {
        let category = self.get_or_create(name);
        category.add(delta);
        category
    }

    pub fn clear_all(&mut self) {
        self.categories.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl From<Vec<Category>> for CategoryStore {
    fn from(value: Vec<Category>) -> Self {
        let mut store = CategoryStore::new();
        for category in value {
            store.add_seconds(&category.name, category.seconds);
        }
        store
    }
}

impl From<CategoryStore> for Vec<Category> {
    fn from(value: CategoryStore) -> Self {
        value.categories
    }
}
