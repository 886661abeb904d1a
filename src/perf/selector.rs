use super::catalog::{self, MetricDescriptor};
use super::{Error, Result};

/// The outcome of resolving a metric spec against the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: Vec<usize>,
    unresolved: Vec<String>,
}

impl Selection {
    /// Catalog indices in spec order. Repeated names appear once per occurrence.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Names that matched no catalog entry, in spec order.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Iterates over the selected descriptors in selection order.
    pub fn descriptors(&self) -> impl Iterator<Item = &'static MetricDescriptor> + '_ {
        self.indices.iter().map(|&i| &catalog::CATALOG[i])
    }

    /// Returns the selected indices, failing if nothing resolved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySelection`] carrying `spec` when no name matched.
    pub fn into_indices(self, spec: &str) -> Result<Vec<usize>> {
        if self.indices.is_empty() {
            return Err(Error::EmptySelection {
                spec: spec.to_owned(),
            });
        }
        Ok(self.indices)
    }
}

/// Resolves a comma-separated list of metric names.
///
/// Names are matched exactly (case-sensitive, no trimming). Empty tokens are
/// skipped. Unknown names are logged and reported in [`Selection::unresolved`]
/// without affecting the rest of the list. Duplicates are kept: each occurrence
/// gets its own slot and is counted independently.
///
/// # Examples
///
/// ```
/// # use cgperf::perf::resolve;
/// let selection = resolve("instructions,bogus,page_faults,instructions");
/// assert_eq!(selection.indices(), &[1, 19, 1]);
/// assert_eq!(selection.unresolved(), &["bogus".to_string()]);
/// ```
pub fn resolve(spec: &str) -> Selection {
    let mut selection = Selection::default();
    for name in spec.split(',').filter(|s| !s.is_empty()) {
        match catalog::lookup(name) {
            Some(index) => selection.indices.push(index),
            None => {
                log::warn!("Unknown performance counter: {name}");
                selection.unresolved.push(name.to_owned());
            }
        }
    }
    selection
}
