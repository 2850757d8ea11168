//! Generic list views: free-text filtering, sorting and pagination over any
//! record type, with the pagination state persisted between runs.

pub mod filter_sort;
pub mod pagination;
pub mod store;

pub use filter_sort::{
    apply_filter_and_sort, FieldValue, FilterSort, FilterSortState, Record, SortDirection,
};
pub use pagination::{Paginator, PAGE_SIZE_OPTIONS};
pub use store::{FileStore, MemoryStore, StateStore, StoreError};

use std::sync::Arc;

/// Everything one list on screen needs: its filter/sort state and its pager.
pub struct ListView {
    pub filter: FilterSort,
    pub pager: Paginator,
    filterable: &'static [&'static str],
}

impl ListView {
    pub fn new(
        key: &str,
        default_page_size: usize,
        filterable: &'static [&'static str],
        initial_sort: Option<&'static str>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            filter: FilterSort::new(initial_sort, SortDirection::Asc),
            pager: Paginator::new(key, default_page_size, store),
            filterable,
        }
    }

    /// Re-count the filtered list so the pager bounds follow the data and the
    /// search term.
    pub fn sync<T: Record>(&mut self, items: &[T]) {
        let total = self.filter.apply(items, self.filterable).len();
        self.pager.set_total_items(total);
    }

    /// The filtered, sorted rows on the current page.
    pub fn visible<'a, T: Record>(&self, items: &'a [T]) -> Vec<&'a T> {
        let view = self.filter.apply(items, self.filterable);
        self.pager.page(&view).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::NodeHead;

    fn node(id: u32, env: &str) -> NodeHead {
        NodeHead {
            id,
            name: format!("node-{:02}", id),
            agent_version: format!("1.4.{}-amd64", id),
            environment: env.to_string(),
            online: true,
            registered: true,
            container_base_url: None,
        }
    }

    #[test]
    fn pages_rebuild_the_filtered_sorted_list() {
        let nodes: Vec<NodeHead> = (1..=23)
            .map(|id| node(id, if id % 3 == 0 { "staging" } else { "Prod" }))
            .collect();
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let mut view = ListView::new("nodes", 4, &["name", "environment"], Some("name"), store);
        view.filter.request_sort("name");
        view.filter.set_search_term("prod");
        view.sync(&nodes);

        // 16 prod nodes, by name descending
        let expected: Vec<u32> = (1..=23).rev().filter(|id| id % 3 != 0).collect();
        assert_eq!(view.pager.total_items(), 16);
        assert_eq!(view.pager.total_pages(), 4);

        let mut rebuilt = Vec::new();
        for page in 1..=view.pager.total_pages() {
            view.pager.goto_page(page as i64);
            let visible: Vec<u32> = view.visible(&nodes).iter().map(|n| n.id).collect();
            assert_eq!(visible, expected[(page - 1) * 4..page * 4]);
            rebuilt.extend(visible);
        }
        assert_eq!(rebuilt, expected);

        // narrowing the search pulls the page back into range
        view.filter.set_search_term("node-2");
        view.sync(&nodes);
        assert_eq!(view.pager.current_page(), 1);
        let ids: Vec<u32> = view.visible(&nodes).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![23, 22, 21, 20]);
    }
}
