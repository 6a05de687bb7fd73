use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::node::Category;


/// Set of categories a children enumeration is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryFilter {
    allowed: HashSet<Category>,
}

impl CategoryFilter {
    pub fn on(categories: &[Category]) -> Self {
        Self {
            allowed: categories.iter().copied().collect(),
        }
    }

    pub fn accepts(&self, category: Category) -> bool {
        self.allowed.contains(&category)
    }
}

lazy_static! {
    pub static ref PAGE_STORE_FILTER: CategoryFilter =
        CategoryFilter::on(&[Category::PageFolder, Category::Page]);

    pub static ref REFERENCE_STORE_FILTER: CategoryFilter = CategoryFilter::on(&[
        Category::ReferenceFolder,
        Category::PageReference,
        Category::DocumentGroup,
    ]);

    pub static ref MEDIA_STORE_FILTER: CategoryFilter =
        CategoryFilter::on(&[Category::MediaFolder, Category::Media]);
}
