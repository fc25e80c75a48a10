use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use uuid::Uuid;

use super::{Page, PageTemplate, Theme};

/// Thread-safe store of live pages, keyed by page id.
#[derive(Debug, Clone)]
pub struct PageStore {
    inner: Arc<PageStoreInner>,
}

#[derive(Debug)]
struct PageStoreInner {
    template: PageTemplate,
    pages: RwLock<HashMap<String, Page>>,
}

impl PageStore {
    #[must_use]
    pub fn new(template: PageTemplate) -> Self {
        Self {
            inner: Arc::new(PageStoreInner {
                template,
                pages: RwLock::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn template(&self) -> &PageTemplate {
        &self.inner.template
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Page>> {
        self.inner.pages.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Page>> {
        self.inner.pages.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a page load with a fresh id.
    #[must_use]
    pub fn create(&self, prefers_dark: bool) -> Page {
        let id = Uuid::new_v4().to_string();
        let page = Page::new(id.clone(), &self.inner.template, Theme::from_preference(prefers_dark));
        self.write().insert(id, page.clone());
        tracing::info!(name: "page.created", page_id = %page.id(), "Page created");
        page
    }

    /// Look up a page and mark it active.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Page> {
        let page = self.read().get(id).cloned();
        if let Some(page) = &page {
            page.touch();
        }
        page
    }

    pub fn remove(&self, id: &str) -> Option<Page> {
        self.write().remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop pages idle for longer than `timeout`. Returns how many went.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.write();
        let before = guard.len();
        guard.retain(|_, page| !page.is_expired_with_timeout(timeout));
        before - guard.len()
    }

    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }
}
