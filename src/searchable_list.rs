//! Incrementally filtered list
//!
//! Holds the original items and a filtered view of them. Every filter call
//! starts again from the full list, so filtering never loses items.

use std::borrow::Cow;
use std::ops::Index;

/// Anything that exposes text to match search queries against
pub trait Searchable {
    fn text_to_be_searched(&self) -> Cow<'_, str>;
}

impl Searchable for String {
    fn text_to_be_searched(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl Searchable for &str {
    fn text_to_be_searched(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

/// Lowercases with full Unicode case mapping and strips accents from Latin
/// letters. å, ä and ö are letters of their own in Swedish and stay distinct.
fn fold(text: &str) -> String {
    text.to_lowercase().chars().map(strip_accent).collect()
}

fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ā' | 'ą' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'ī' => 'i',
        'ñ' | 'ń' | 'ň' => 'n',
        'ó' | 'ò' | 'ô' | 'õ' | 'ō' | 'ő' => 'o',
        'ś' | 'š' => 's',
        'ú' | 'ù' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        'ł' => 'l',
        'ř' => 'r',
        _ => c,
    }
}

/// Query split into folded whitespace-separated terms
fn terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(fold).collect()
}

/// True if `text` contains every term. An empty term list matches anything.
pub fn matches_all_terms(text: &str, terms: &[String]) -> bool {
    let text = fold(text);
    terms.iter().all(|term| text.contains(term.as_str()))
}

#[derive(Debug, Clone)]
pub struct SearchableList<T> {
    items: Vec<T>,
    /// Indices into `items`, ascending
    filtered: Vec<usize>,
}

impl<T: Searchable> SearchableList<T> {
    pub fn new(items: Vec<T>) -> Self {
        let filtered = (0..items.len()).collect();
        Self { items, filtered }
    }

    /// Number of items in the filtered view
    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    /// Item at `index` in the filtered view
    pub fn get(&self, index: usize) -> Option<&T> {
        self.filtered.get(index).map(|&i| &self.items[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.filtered.iter().map(move |&i| &self.items[i])
    }

    /// The unfiltered items, in original order
    pub fn all_items(&self) -> &[T] {
        &self.items
    }

    /// Restricts the view to items containing every whitespace-separated
    /// term of `query`, case-insensitively. A blank query shows everything.
    pub fn update_filtered_items_to_match_search_text(&mut self, query: &str) {
        let terms = terms(query);
        if terms.is_empty() {
            self.filtered = (0..self.items.len()).collect();
            return;
        }
        self.filtered = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches_all_terms(&item.text_to_be_searched(), &terms))
            .map(|(i, _)| i)
            .collect();
    }
}

impl<T: Searchable> Index<usize> for SearchableList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[self.filtered[index]]
    }
}

impl<T: Searchable> From<Vec<T>> for SearchableList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}
