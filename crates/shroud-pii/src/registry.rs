//! Session-scoped tag assignment

use crate::mapping::Mapping;
use crate::tag::{Category, Tag, TagError};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct CategoryState {
    /// Next index to hand out (1-based); wider than a tag index so a stored
    /// `u32::MAX` tag cannot wrap it
    next: u64,
    assigned: HashMap<String, Tag>,
}

impl CategoryState {
    fn new() -> Self {
        Self {
            next: 1,
            assigned: HashMap::new(),
        }
    }
}

/// Assigns stable, unique tags per category for one logical session
///
/// Each distinct original string gets exactly one tag per category and
/// repeated lookups return the same tag. A registry is owned by its session;
/// there is no process-wide state, so two registries fed the same input
/// produce the same numbering independently.
#[derive(Debug, Default, Clone)]
pub struct TagRegistry {
    categories: HashMap<Category, CategoryState>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a mapping persisted for a session
    ///
    /// Counters resume after the highest index seen per category so newly
    /// minted tags never collide with the stored ones. A category whose stored
    /// tags reach `u32::MAX` is exhausted: further minting fails instead of
    /// reissuing a tag.
    pub fn from_mapping(mapping: &Mapping) -> Self {
        let mut registry = Self::new();
        for (original, tag) in mapping.iter() {
            let state = registry
                .categories
                .entry(tag.category().clone())
                .or_insert_with(CategoryState::new);
            state.next = state.next.max(u64::from(tag.index()) + 1);
            state
                .assigned
                .entry(original.to_string())
                .or_insert_with(|| tag.clone());
        }
        registry
    }

    /// Return the tag already assigned to `original`, or mint the next one
    ///
    /// Fails with [`TagError::Exhausted`] once the category has issued every
    /// index a tag can carry.
    pub fn get_or_assign(
        &mut self,
        category: &Category,
        original: &str,
    ) -> Result<Tag, TagError> {
        let state = self
            .categories
            .entry(category.clone())
            .or_insert_with(CategoryState::new);

        if let Some(tag) = state.assigned.get(original) {
            return Ok(tag.clone());
        }

        let index =
            u32::try_from(state.next).map_err(|_| TagError::Exhausted(category.clone()))?;
        let tag = Tag::from_parts(category.clone(), index);
        state.next += 1;
        state.assigned.insert(original.to_string(), tag.clone());
        Ok(tag)
    }

    /// Look up an existing assignment without minting
    pub fn get(&self, category: &Category, original: &str) -> Option<&Tag> {
        self.categories
            .get(category)
            .and_then(|state| state.assigned.get(original))
    }

    /// Index the next new original in `category` would receive
    pub fn next_index(&self, category: &Category) -> u64 {
        self.categories
            .get(category)
            .map(|state| state.next)
            .unwrap_or(1)
    }

    /// Number of originals assigned across all categories
    pub fn len(&self) -> usize {
        self.categories
            .values()
            .map(|state| state.assigned.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every counter and assignment; used when a session ends
    pub fn reset(&mut self) {
        self.categories.clear();
    }
}
