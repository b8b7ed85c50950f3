use serde::{Deserialize, Serialize};

/// Pagination request.
///
/// `per_page = None` falls back to the model's page size; a missing or zero
/// `page` means the first page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub per_page: Option<u64>,
    pub page_name: String,
    pub page: Option<u64>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            per_page: None,
            page_name: "page".to_string(),
            page: None,
        }
    }
}

impl PageRequest {
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: Some(per_page),
            ..Self::default()
        }
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_name(mut self, page_name: impl Into<String>) -> Self {
        self.page_name = page_name.into();
        self
    }

    /// 1-based page number actually requested.
    pub fn current_page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// A page of results with length-aware pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    pub page_name: String,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, current_page: u64, per_page: u64, total: u64, page_name: &str) -> Self {
        let last_page = if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        };
        Self {
            items,
            current_page,
            per_page,
            total,
            last_page,
            page_name: page_name.to_string(),
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn next_page(&self) -> Option<u64> {
        self.has_more_pages().then(|| self.current_page + 1)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
