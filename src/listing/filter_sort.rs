use std::cmp::Ordering;

/// A scalar read out of a record by field name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Str(&'a str),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl FieldValue<'_> {
    fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Structural access to a record's fields.
///
/// `None` means the record has no value for that field, which the sort treats
/// as "leave it where it is".
pub trait Record {
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSortState {
    pub search_term: String,
    pub sort_key: Option<&'static str>,
    pub direction: SortDirection,
}

impl Default for FilterSortState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            sort_key: None,
            direction: SortDirection::Asc,
        }
    }
}

/// Derive the filtered and sorted view of `items`. `items` is left untouched.
pub fn apply_filter_and_sort<'a, T: Record>(
    items: &'a [T],
    state: &FilterSortState,
    filterable_fields: &[&str],
) -> Vec<&'a T> {
    let needle = state.search_term.to_lowercase();
    let filtered: Vec<&T> = items
        .iter()
        .filter(|item| needle.is_empty() || matches_search(*item, &needle, filterable_fields))
        .collect();

    match state.sort_key {
        None => filtered,
        Some(key) => stable_sort_by(&filtered, &mut |a: &&T, b: &&T| {
            let ord = compare_values(a.field(key), b.field(key));
            match state.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }),
    }
}

fn matches_search<T: Record>(item: &T, needle: &str, fields: &[&str]) -> bool {
    fields.iter().any(|field| match item.field(field) {
        Some(FieldValue::Str(value)) => value.to_lowercase().contains(needle),
        _ => false,
    })
}

fn compare_values(a: Option<FieldValue<'_>>, b: Option<FieldValue<'_>>) -> Ordering {
    match (a, b) {
        (Some(FieldValue::Str(a)), Some(FieldValue::Str(b))) => {
            a.to_lowercase().cmp(&b.to_lowercase())
        }
        (Some(FieldValue::Int(a)), Some(FieldValue::Int(b))) => a.cmp(&b),
        (Some(FieldValue::Bool(a)), Some(FieldValue::Bool(b))) => a.cmp(&b),
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

// "Undefined compares equal to anything" is not a total order, and
// `slice::sort_by` is allowed to panic on those. A plain merge sort only
// ever asks "is right strictly before left", which keeps it stable and
// panic free whatever the comparator says.
fn stable_sort_by<T: Copy, F>(items: &[T], cmp: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items.to_vec();
    }
    let mid = items.len() / 2;
    let left = stable_sort_by(&items[..mid], cmp);
    let right = stable_sort_by(&items[mid..], cmp);

    let mut merged = Vec::with_capacity(items.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if cmp(&right[j], &left[i]) == Ordering::Less {
            merged.push(right[j]);
            j += 1;
        } else {
            merged.push(left[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    merged
}

/// Filter and sort state owned by a single list view.
#[derive(Debug, Clone, Default)]
pub struct FilterSort {
    state: FilterSortState,
}

impl FilterSort {
    pub fn new(sort_key: Option<&'static str>, direction: SortDirection) -> Self {
        Self {
            state: FilterSortState {
                search_term: String::new(),
                sort_key,
                direction,
            },
        }
    }

    pub fn state(&self) -> &FilterSortState {
        &self.state
    }

    pub fn search_term(&self) -> &str {
        &self.state.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.state.search_term = term.into();
    }

    pub fn push_search_char(&mut self, c: char) {
        self.state.search_term.push(c);
    }

    pub fn pop_search_char(&mut self) {
        self.state.search_term.pop();
    }

    pub fn clear_search(&mut self) {
        self.state.search_term.clear();
    }

    /// Clicking the ascending column again flips it, anything else starts
    /// ascending on `key`.
    pub fn request_sort(&mut self, key: &'static str) {
        let direction = if self.state.sort_key == Some(key) && self.state.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        self.state.sort_key = Some(key);
        self.state.direction = direction;
    }

    pub fn apply<'a, T: Record>(&self, items: &'a [T], filterable_fields: &[&str]) -> Vec<&'a T> {
        apply_filter_and_sort(items, &self.state, filterable_fields)
    }
}
