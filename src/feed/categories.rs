//! Category derivations over a fetched feed
//!
//! Pure functions; they never touch the network.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::schemas::{CategoryGroup, NewsItem, NewsSourceDistribution};
use crate::value_count::ValueCount;

/// Label of the pseudo-category holding the whole feed
pub const LATEST_CATEGORY: &str = "Senaste";

/// Label of the group collecting categories missing from `CATEGORY_TYPES`
pub const FALLBACK_CATEGORY_TYPE: &str = "Övrigt";

/// Known categories by broader type, in display order
pub const CATEGORY_TYPES: &[(&str, &[&str])] = &[
    (
        "Världen",
        &[
            "Afrika",
            "Asien",
            "Europa",
            "Latinamerika",
            "Mellanöstern",
            "Nordamerika",
            "Norden",
            "Oceanien",
            "Ryssland",
            "Sverige",
            "Världen",
        ],
    ),
    (
        "Ämnen",
        &[
            "Brott",
            "Ekonomi",
            "Energi",
            "Feminism",
            "Hälsa",
            "Integritet",
            "Klimat",
            "Kultur",
            "Media",
            "Miljö",
            "Politik",
            "Sport",
            "Teknik",
            "Vetenskap",
        ],
    ),
];

/// True for `None` and the latest sentinel ("Senaste" or "latest", any case)
pub fn is_latest(category: Option<&str>) -> bool {
    match category {
        None => true,
        Some(c) => {
            let c = c.trim();
            c.eq_ignore_ascii_case("latest") || c.to_lowercase() == LATEST_CATEGORY.to_lowercase()
        }
    }
}

/// Type a category belongs to, if it is in the table
pub fn category_type_of(category: &str) -> Option<&'static str> {
    CATEGORY_TYPES
        .iter()
        .find(|(_, names)| names.contains(&category))
        .map(|(category_type, _)| *category_type)
}

/// Sort key placing å, ä, ö after z, as in the Swedish alphabet
fn swedish_sort_key(text: &str) -> Vec<char> {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'å' => '\u{7b}',
            'ä' | 'æ' => '\u{7c}',
            'ö' | 'ø' => '\u{7d}',
            other => other,
        })
        .collect()
}

pub fn compare_categories(a: &str, b: &str) -> Ordering {
    swedish_sort_key(a)
        .cmp(&swedish_sort_key(b))
        .then_with(|| a.cmp(b))
}

/// Distinct categories in first-seen order
pub fn categories_from_news_items(items: &[NewsItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.category.as_str()))
        .map(|item| item.category.clone())
        .collect()
}

/// Distinct categories sorted alphabetically, for topic pickers
pub fn sorted_categories(items: &[NewsItem]) -> Vec<String> {
    let mut categories = categories_from_news_items(items);
    categories.sort_by(|a, b| compare_categories(a, b));
    categories
}

/// Partitions the distinct categories into the table's groups plus a
/// trailing fallback group. Groups without categories are left out.
pub fn categories_with_types_from_news_items(items: &[NewsItem]) -> Vec<CategoryGroup> {
    let categories = categories_from_news_items(items);

    let mut groups: Vec<CategoryGroup> = CATEGORY_TYPES
        .iter()
        .map(|(category_type, _)| CategoryGroup {
            category_type: category_type.to_string(),
            categories: vec![],
        })
        .collect();
    let mut fallback = CategoryGroup {
        category_type: FALLBACK_CATEGORY_TYPE.to_string(),
        categories: vec![],
    };

    for category in categories {
        match CATEGORY_TYPES
            .iter()
            .position(|(_, names)| names.contains(&category.as_str()))
        {
            Some(index) => groups[index].categories.push(category),
            None => fallback.categories.push(category),
        }
    }

    groups.push(fallback);
    groups.retain(|group| !group.categories.is_empty());
    for group in &mut groups {
        group.categories.sort_by(|a, b| compare_categories(a, b));
    }
    groups
}

/// Item share per domain, in first-seen domain order
pub fn news_source_distribution_from_news_items(
    items: &[NewsItem],
) -> Vec<NewsSourceDistribution> {
    if items.is_empty() {
        return vec![];
    }

    let counts = items.iter().map(|item| item.domain.as_str()).value_count();
    let total = items.len() as f64;

    let mut seen = HashSet::new();
    items
        .iter()
        .map(|item| item.domain.as_str())
        .filter(|domain| seen.insert(*domain))
        .map(|domain| {
            let count = counts.get(domain).copied().unwrap_or_default();
            NewsSourceDistribution {
                domain: domain.to_string(),
                count,
                percentage: count as f64 / total,
            }
        })
        .collect()
}

/// Items whose category matches exactly; the latest sentinel keeps all
pub fn filter_by_category(items: Vec<NewsItem>, category: Option<&str>) -> Vec<NewsItem> {
    match category {
        Some(c) if !is_latest(Some(c)) => items.into_iter().filter(|i| i.category == c).collect(),
        _ => items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use url::Url;

    fn news(url: &str, category: &str) -> NewsItem {
        NewsItem::new(
            String::new(),
            Url::parse(url).unwrap(),
            Utc::now(),
            category.to_string(),
            String::new(),
            None,
            None,
            None,
            None,
        )
    }

    #[test]
    fn test_news_source_distribution() {
        let items = vec![
            news(
                "https://www.theguardian.com/world/2018/apr/25/peter-madsen-sentenced-life-murdering-kim-wall-submarine",
                "sverige",
            ),
            news(
                "https://www.expressen.se/nyheter/sd-begar-att-regeringens-lagforslag-om-flyktingamnesti-aterforvisas/",
                "sverige",
            ),
        ];
        let distribution = news_source_distribution_from_news_items(&items);
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution[0].domain, "theguardian.com");
        assert_eq!(distribution[0].count, 1);
        assert_eq!(distribution[0].percentage, 0.5);
        assert_eq!(distribution[1].count, 1);
        assert_eq!(distribution[1].percentage, 0.5);
    }

    #[test]
    fn test_distribution_sums() {
        assert!(news_source_distribution_from_news_items(&[]).is_empty());

        let items = vec![
            news("https://a.se/1", "x"),
            news("https://www.b.se/1", "x"),
            news("https://a.se/2", "x"),
        ];
        let distribution = news_source_distribution_from_news_items(&items);
        assert_eq!(distribution[0].domain, "a.se");
        assert_eq!(distribution[0].count, 2);
        assert_eq!(distribution.iter().map(|d| d.count).sum::<usize>(), 3);
        let total: f64 = distribution.iter().map(|d| d.percentage).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_categories_first_seen() {
        let items = vec![
            news("https://a.se", "Politik"),
            news("https://a.se", "Afrika"),
            news("https://a.se", "Politik"),
            news("https://a.se", "Asien"),
        ];
        assert_eq!(
            categories_from_news_items(&items),
            vec!["Politik", "Afrika", "Asien"]
        );
        assert_eq!(sorted_categories(&items), vec!["Afrika", "Asien", "Politik"]);
    }

    #[test]
    fn test_grouping_partitions_categories() {
        let items = vec![
            news("https://a.se", "Politik"),
            news("https://a.se", "Okänt"),
            news("https://a.se", "Europa"),
            news("https://a.se", "Afrika"),
            news("https://a.se", "Ekonomi"),
            news("https://a.se", "Annat"),
        ];
        let groups = categories_with_types_from_news_items(&items);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].category_type, "Världen");
        assert_eq!(groups[0].categories, vec!["Afrika", "Europa"]);
        assert_eq!(groups[1].category_type, "Ämnen");
        assert_eq!(groups[1].categories, vec!["Ekonomi", "Politik"]);
        assert_eq!(groups[2].category_type, FALLBACK_CATEGORY_TYPE);
        assert_eq!(groups[2].categories, vec!["Annat", "Okänt"]);

        let flattened: usize = groups.iter().map(|g| g.categories.len()).sum();
        assert_eq!(flattened, categories_from_news_items(&items).len());
    }

    #[test]
    fn test_swedish_ordering() {
        let mut names = vec!["Övrigt", "Ämnen", "Åland", "Zimbabwe", "alfa"];
        names.sort_by(|a, b| compare_categories(a, b));
        assert_eq!(names, vec!["alfa", "Zimbabwe", "Åland", "Ämnen", "Övrigt"]);
    }

    #[test]
    fn test_latest_sentinel() {
        assert!(is_latest(None));
        assert!(is_latest(Some("Senaste")));
        assert!(is_latest(Some("LATEST")));
        assert!(!is_latest(Some("Politik")));

        let items = vec![news("https://a.se", "Politik"), news("https://a.se", "Sport")];
        assert_eq!(filter_by_category(items.clone(), Some("Sport")).len(), 1);
        assert_eq!(filter_by_category(items.clone(), Some("sport")).len(), 0);
        assert_eq!(filter_by_category(items, None).len(), 2);
    }

    #[test]
    fn test_category_type_lookup() {
        assert_eq!(category_type_of("Asien"), Some("Världen"));
        assert_eq!(category_type_of("Teknik"), Some("Ämnen"));
        assert_eq!(category_type_of("Mode"), None);
    }
}
