use std::sync::Arc;

use crate::config::Clock;
use crate::document_export::DocumentExportEncoder;
use crate::encoder::ArchiveEncoder;
use crate::error::RegistryError;
use crate::page_capture::PageCaptureEncoder;
use crate::store::ArchiveStore;

/// Ordered, immutable set of encoders.
///
/// Registration order is the dispatch priority: when several encoders match a
/// content type, the earlier one is tried first.
pub struct ArchiverRegistry {
    encoders: Vec<Arc<dyn ArchiveEncoder>>,
}

impl ArchiverRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// `page-capture` followed by `document-export`, both writing into `store`.
    pub fn with_default_encoders(store: ArchiveStore, clock: Clock) -> Self {
        Self {
            encoders: vec![
                Arc::new(PageCaptureEncoder::new(store.clone(), clock.clone())),
                Arc::new(DocumentExportEncoder::new(store, clock)),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ArchiveEncoder>> {
        self.encoders.iter().find(|encoder| encoder.name() == name)
    }

    /// Encoders in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ArchiveEncoder>> {
        self.encoders.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.encoders.iter().map(|encoder| encoder.name()).collect()
    }

    /// Every encoder claiming `content_type`, highest priority first.
    pub fn matching<'a>(
        &'a self,
        content_type: &'a str,
    ) -> impl Iterator<Item = &'a Arc<dyn ArchiveEncoder>> + 'a {
        self.encoders
            .iter()
            .filter(move |encoder| encoder.matches(content_type))
    }

    pub fn first_match<'a>(&'a self, content_type: &'a str) -> Option<&'a Arc<dyn ArchiveEncoder>> {
        self.matching(content_type).next()
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    encoders: Vec<Arc<dyn ArchiveEncoder>>,
}

impl RegistryBuilder {
    /// Append an encoder at the lowest priority so far.
    pub fn register(self, encoder: impl ArchiveEncoder + 'static) -> Self {
        self.register_arc(Arc::new(encoder))
    }

    pub fn register_arc(mut self, encoder: Arc<dyn ArchiveEncoder>) -> Self {
        self.encoders.push(encoder);
        self
    }

    pub fn build(self) -> Result<ArchiverRegistry, RegistryError> {
        for (idx, encoder) in self.encoders.iter().enumerate() {
            let name = encoder.name();
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if self.encoders[..idx].iter().any(|other| other.name() == name) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }
        }
        Ok(ArchiverRegistry {
            encoders: self.encoders,
        })
    }
}
