//! Composable query specifications.
//!
//! A [`Specification`] is a predicate plus a set of navigation paths to load
//! eagerly. Applying it never mutates it, so one value can be shared by any
//! number of queries.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::entity::Entity;

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Predicate + eager-load descriptor over entities of type `E`.
pub struct Specification<E> {
    criteria: Predicate<E>,
    includes: BTreeSet<String>,
}

impl<E> Clone for Specification<E> {
    fn clone(&self) -> Self {
        Self {
            criteria: Arc::clone(&self.criteria),
            includes: self.includes.clone(),
        }
    }
}

impl<E> fmt::Debug for Specification<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("includes", &self.includes)
            .finish_non_exhaustive()
    }
}

impl<E: 'static> Specification<E> {
    /// Matches entities satisfying `criteria`.
    pub fn new(criteria: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self {
            criteria: Arc::new(criteria),
            includes: BTreeSet::new(),
        }
    }

    /// Matches every entity. Useful as the base for include-only specifications.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    /// Adds a navigation path to materialize.
    pub fn include(mut self, navigation: impl Into<String>) -> Self {
        self.includes.insert(navigation.into());
        self
    }

    /// Matches entities satisfying both specifications; includes are merged.
    pub fn and(self, other: Specification<E>) -> Self {
        let (left, right) = (self.criteria, other.criteria);
        let mut includes = self.includes;
        includes.extend(other.includes);
        Self {
            criteria: Arc::new(move |e| left(e) && right(e)),
            includes,
        }
    }

    /// Matches entities satisfying either specification; includes are merged.
    pub fn or(self, other: Specification<E>) -> Self {
        let (left, right) = (self.criteria, other.criteria);
        let mut includes = self.includes;
        includes.extend(other.includes);
        Self {
            criteria: Arc::new(move |e| left(e) || right(e)),
            includes,
        }
    }

    /// Negates the predicate; includes are kept.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        let inner = self.criteria;
        Self {
            criteria: Arc::new(move |e| !inner(e)),
            includes: self.includes,
        }
    }

    pub fn is_satisfied_by(&self, entity: &E) -> bool {
        (self.criteria)(entity)
    }

    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.includes.iter().map(String::as_str)
    }

    pub fn has_include(&self, navigation: &str) -> bool {
        self.includes.contains(navigation)
    }
}

/// Shapes raw store results according to an optional specification.
///
/// Without a specification every entity is kept and no navigation is
/// materialized. With one, non-matching entities are dropped and only the
/// navigations it includes stay loaded.
pub fn apply<E: Entity>(entities: Vec<E>, specification: Option<&Specification<E>>) -> Vec<E> {
    entities
        .into_iter()
        .filter(|e| specification.is_none_or(|s| s.is_satisfied_by(e)))
        .map(|mut e| {
            for navigation in E::NAVIGATIONS {
                if !specification.is_some_and(|s| s.has_include(navigation)) {
                    e.unload(navigation);
                }
            }
            e
        })
        .collect()
}
