use std::sync::Arc;

use log::warn;

use super::store::StateStore;

/// Page sizes offered by the page size selector.
pub const PAGE_SIZE_OPTIONS: [usize; 5] = [10, 20, 25, 50, 100];

const MAX_PAGE_BUTTONS: usize = 5;

/// Page-sized window over a list, with `pageSize` and `currentPage` stored
/// under `{key}_pageSize` / `{key}_currentPage`.
pub struct Paginator {
    key: String,
    page_size: usize,
    current_page: usize,
    total_items: usize,
    store: Arc<dyn StateStore>,
}

impl Paginator {
    pub fn new(key: &str, default_page_size: usize, store: Arc<dyn StateStore>) -> Self {
        let page_size = read_positive(store.as_ref(), &format!("{}_pageSize", key))
            .unwrap_or_else(|| default_page_size.max(1));
        let current_page = read_positive(store.as_ref(), &format!("{}_currentPage", key)).unwrap_or(1);
        Self {
            key: key.to_string(),
            page_size,
            current_page,
            total_items: 0,
            store,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn total_pages(&self) -> usize {
        (self.total_items + self.page_size - 1) / self.page_size
    }

    fn last_page(&self) -> usize {
        self.total_pages().max(1)
    }

    /// Record the length of the list being paged and pull the current page
    /// back into range if the list shrank.
    pub fn set_total_items(&mut self, total_items: usize) {
        self.total_items = total_items;
        let clamped = self.current_page.clamp(1, self.last_page());
        if clamped != self.current_page {
            self.set_current_page(clamped);
        }
    }

    pub fn goto_page(&mut self, page: i64) {
        let page = page.clamp(1, self.last_page() as i64) as usize;
        self.set_current_page(page);
    }

    pub fn next_page(&mut self) {
        self.goto_page(self.current_page as i64 + 1);
    }

    pub fn prev_page(&mut self) {
        self.goto_page(self.current_page as i64 - 1);
    }

    pub fn goto_first_page(&mut self) {
        self.goto_page(1);
    }

    pub fn goto_last_page(&mut self) {
        self.goto_page(self.total_pages() as i64);
    }

    /// A new density makes the old offset meaningless, so this always lands
    /// on page 1.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.save("pageSize", self.page_size);
        self.goto_first_page();
    }

    pub fn cycle_page_size(&mut self) {
        let next = PAGE_SIZE_OPTIONS
            .iter()
            .position(|size| *size == self.page_size)
            .map(|idx| PAGE_SIZE_OPTIONS[(idx + 1) % PAGE_SIZE_OPTIONS.len()])
            .unwrap_or(PAGE_SIZE_OPTIONS[0]);
        self.set_page_size(next);
    }

    pub fn page<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.current_page - 1).saturating_mul(self.page_size).min(items.len());
        let end = self.current_page.saturating_mul(self.page_size).min(items.len());
        &items[start..end]
    }

    /// 1-based numbers of the first and last item on the current page, or
    /// `(0, 0)` for an empty list.
    pub fn visible_range(&self) -> (usize, usize) {
        if self.total_items == 0 {
            return (0, 0);
        }
        let first = (self.current_page - 1) * self.page_size + 1;
        let last = (self.current_page * self.page_size).min(self.total_items);
        (first, last)
    }

    /// Up to five page numbers around the current page.
    pub fn page_buttons(&self) -> Vec<usize> {
        let total = self.total_pages();
        if total <= MAX_PAGE_BUTTONS {
            return (1..=total).collect();
        }
        let half = MAX_PAGE_BUTTONS / 2;
        let current = self.current_page.clamp(1, total);
        let mut start = current.saturating_sub(half).max(1);
        let mut end = (current + half).min(total);
        if current <= half {
            end = MAX_PAGE_BUTTONS;
        } else if current >= total - half {
            start = total - MAX_PAGE_BUTTONS + 1;
        }
        (start..=end).collect()
    }

    fn set_current_page(&mut self, page: usize) {
        self.current_page = page;
        self.save("currentPage", page);
    }

    fn save(&self, suffix: &str, value: usize) {
        let key = format!("{}_{}", self.key, suffix);
        if let Err(e) = self.store.set(&key, &value.to_string()) {
            warn!("Cannot persist {}: {}", key, e);
        }
    }
}

fn read_positive(store: &dyn StateStore, key: &str) -> Option<usize> {
    store
        .get(key)
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::store::MemoryStore;

    fn pager(total: usize, page_size: usize) -> (Paginator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut p = Paginator::new("nodes", page_size, store.clone());
        p.set_total_items(total);
        (p, store)
    }

    #[test]
    fn twenty_five_items_make_three_pages() {
        let (mut p, _) = pager(25, 10);
        assert_eq!(p.total_pages(), 3);
        p.goto_page(5);
        assert_eq!(p.current_page(), 3);
        p.next_page();
        assert_eq!(p.current_page(), 3);
    }

    #[test]
    fn goto_page_clamps_both_ends() {
        let (mut p, _) = pager(25, 10);
        for n in [-7, 0, 1, 2, 3, 4, 1000] {
            p.goto_page(n);
            assert!((1..=3).contains(&p.current_page()), "page {} escaped", n);
        }
        p.goto_page(-7);
        assert_eq!(p.current_page(), 1);
        p.prev_page();
        assert_eq!(p.current_page(), 1);
    }

    #[test]
    fn empty_list_stays_on_page_one() {
        let (mut p, _) = pager(0, 10);
        assert_eq!(p.total_pages(), 0);
        p.goto_last_page();
        assert_eq!(p.current_page(), 1);
        p.next_page();
        assert_eq!(p.current_page(), 1);
        assert_eq!(p.visible_range(), (0, 0));
        assert!(p.page_buttons().is_empty());
        let items: Vec<u8> = Vec::new();
        assert!(p.page(&items).is_empty());
    }

    #[test]
    fn set_page_size_resets_to_first_page() {
        let (mut p, _) = pager(100, 10);
        p.goto_page(7);
        p.set_page_size(20);
        assert_eq!(p.current_page(), 1);
        assert_eq!(p.total_pages(), 5);

        p.set_page_size(0);
        assert_eq!(p.page_size(), 1);
    }

    #[test]
    fn pages_concatenate_back_to_the_list() {
        let items: Vec<u32> = (0..23).collect();
        let (mut p, _) = pager(items.len(), 5);
        let mut seen = Vec::new();
        for page in 1..=p.total_pages() {
            p.goto_page(page as i64);
            seen.extend_from_slice(p.page(&items));
        }
        assert_eq!(seen, items);
        assert_eq!(p.page(&items), &[20u32, 21, 22][..]);
        assert_eq!(p.visible_range(), (21, 23));
    }

    #[test]
    fn shrinking_list_pulls_page_back() {
        let (mut p, _) = pager(50, 10);
        p.goto_last_page();
        assert_eq!(p.current_page(), 5);
        p.set_total_items(12);
        assert_eq!(p.current_page(), 2);
    }

    #[test]
    fn state_is_restored_from_the_store() {
        let (mut p, store) = pager(60, 10);
        p.set_page_size(20);
        p.goto_page(2);
        assert_eq!(store.get("nodes_pageSize").as_deref(), Some("20"));
        assert_eq!(store.get("nodes_currentPage").as_deref(), Some("2"));

        let restored = Paginator::new("nodes", 10, store.clone());
        assert_eq!(restored.page_size(), 20);
        assert_eq!(restored.current_page(), 2);

        let other = Paginator::new("containers", 25, store);
        assert_eq!(other.page_size(), 25);
        assert_eq!(other.current_page(), 1);
    }

    #[test]
    fn garbage_in_the_store_falls_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set("nodes_pageSize", "lots").unwrap();
        store.set("nodes_currentPage", "0").unwrap();
        let p = Paginator::new("nodes", 25, store);
        assert_eq!(p.page_size(), 25);
        assert_eq!(p.current_page(), 1);
    }

    #[test]
    fn page_buttons_window() {
        let (mut p, _) = pager(30, 10);
        assert_eq!(p.page_buttons(), vec![1, 2, 3]);

        p.set_total_items(100);
        p.goto_page(1);
        assert_eq!(p.page_buttons(), vec![1, 2, 3, 4, 5]);
        p.goto_page(6);
        assert_eq!(p.page_buttons(), vec![4, 5, 6, 7, 8]);
        p.goto_page(9);
        assert_eq!(p.page_buttons(), vec![6, 7, 8, 9, 10]);
        p.goto_last_page();
        assert_eq!(p.page_buttons(), vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn page_size_cycles_through_options() {
        let (mut p, _) = pager(10, 10);
        p.cycle_page_size();
        assert_eq!(p.page_size(), 20);
        p.set_page_size(100);
        p.cycle_page_size();
        assert_eq!(p.page_size(), 10);
        p.set_page_size(7);
        p.cycle_page_size();
        assert_eq!(p.page_size(), 10);
    }
}
