//! Category and category-rule repository
//!
//! Categories and their rules share `categories.json`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::ForecastError;
use crate::models::{Category, CategoryId, CategoryRule, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct CategoryData {
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    rules: Vec<CategoryRule>,
}

pub struct CategoryRepository {
    path: PathBuf,
    categories: RwLock<HashMap<CategoryId, Category>>,
    rules: RwLock<Vec<CategoryRule>>,
}

impl CategoryRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            categories: RwLock::new(HashMap::new()),
            rules: RwLock::new(Vec::new()),
        }
    }

    pub fn load(&self) -> Result<(), ForecastError> {
        let file_data: CategoryData = read_json(&self.path)?;
        let mut categories = self.categories.write().map_err(lock_error)?;
        let mut rules = self.rules.write().map_err(lock_error)?;

        categories.clear();
        for category in file_data.categories {
            categories.insert(category.id, category);
        }
        *rules = file_data.rules;
        Ok(())
    }

    pub fn save(&self) -> Result<(), ForecastError> {
        let categories = self.categories.read().map_err(lock_error)?;
        let rules = self.rules.read().map_err(lock_error)?;

        let mut categories: Vec<_> = categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        let mut rules = rules.clone();
        rules.sort_by_key(|r| r.priority);

        write_json_atomic(&self.path, &CategoryData { categories, rules })
    }

    pub fn get(&self, id: CategoryId) -> Result<Option<Category>, ForecastError> {
        let categories = self.categories.read().map_err(lock_error)?;
        Ok(categories.get(&id).cloned())
    }

    pub fn get_by_user(&self, user_id: UserId) -> Result<Vec<Category>, ForecastError> {
        let categories = self.categories.read().map_err(lock_error)?;
        let mut list: Vec<_> = categories
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    pub fn get_all(&self) -> Result<Vec<Category>, ForecastError> {
        let categories = self.categories.read().map_err(lock_error)?;
        let mut list: Vec<_> = categories.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Category>, ForecastError> {
        let categories = self.categories.read().map_err(lock_error)?;
        Ok(categories
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    pub fn upsert(&self, category: Category) -> Result<(), ForecastError> {
        category
            .validate()
            .map_err(|e| ForecastError::Validation(e.to_string()))?;
        let mut categories = self.categories.write().map_err(lock_error)?;
        categories.insert(category.id, category);
        Ok(())
    }

    /// Rules whose category belongs to the user
    pub fn rules_for_user(&self, user_id: UserId) -> Result<Vec<CategoryRule>, ForecastError> {
        let categories = self.categories.read().map_err(lock_error)?;
        let rules = self.rules.read().map_err(lock_error)?;
        Ok(rules
            .iter()
            .filter(|r| {
                categories
                    .get(&r.category_id)
                    .is_some_and(|c| c.user_id == user_id)
            })
            .cloned()
            .collect())
    }

    pub fn all_rules(&self) -> Result<Vec<CategoryRule>, ForecastError> {
        Ok(self.rules.read().map_err(lock_error)?.clone())
    }

    /// Add rules, skipping any whose predicate already exists
    ///
    /// Returns how many were added.
    pub fn add_rules(&self, new_rules: Vec<CategoryRule>) -> Result<usize, ForecastError> {
        let categories = self.categories.read().map_err(lock_error)?;
        let mut rules = self.rules.write().map_err(lock_error)?;

        let mut added = 0;
        for rule in new_rules {
            if !categories.contains_key(&rule.category_id) {
                return Err(ForecastError::category_not_found(rule.category_id.to_string()));
            }
            if rules.iter().any(|r| r.same_predicate(&rule)) {
                continue;
            }
            rules.push(rule);
            added += 1;
        }
        Ok(added)
    }
}
