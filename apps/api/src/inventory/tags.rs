use std::collections::BTreeSet;

use crate::models::bottle::Bottle;

/// Lowercases and trims a tag. Blank input yields `None`.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// Normalises and deduplicates a tag list, keeping it sorted.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|t| normalize_tag(t.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Tags derived from a user's in-stock bottles: grape varieties and colour.
/// Never persisted; rebuilt per request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BottleTagSet {
    tags: BTreeSet<String>,
}

impl BottleTagSet {
    pub fn from_bottles(bottles: &[Bottle]) -> Self {
        let tags = bottles
            .iter()
            .filter(|b| b.in_stock())
            .flat_map(|b| b.grapes.iter().map(String::as_str).chain(b.color.as_deref()))
            .filter_map(normalize_tag)
            .collect();
        Self { tags }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Sorted, deduplicated normalised tags shared with `other`.
    pub fn intersect(&self, other: &[String]) -> Vec<String> {
        other
            .iter()
            .filter_map(|t| normalize_tag(t))
            .filter(|t| self.tags.contains(t))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.tags.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn bottle(grapes: &[&str], color: Option<&str>, quantity: i32) -> Bottle {
        Bottle {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: "test".into(),
            grapes: grapes.iter().map(|g| g.to_string()).collect(),
            color: color.map(str::to_string),
            quantity,
        }
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("  Chardonnay "), Some("chardonnay".into()));
        assert_eq!(normalize_tag("   "), None);
    }

    #[test]
    fn test_collects_grapes_and_color() {
        let set = BottleTagSet::from_bottles(&[
            bottle(&["Grenache", "Syrah"], Some("Red"), 1),
            bottle(&["Chardonnay"], Some("white"), 4),
        ]);
        assert_eq!(
            set.to_vec(),
            vec!["chardonnay", "grenache", "red", "syrah", "white"]
        );
    }

    #[test]
    fn test_out_of_stock_bottles_contribute_nothing() {
        let set = BottleTagSet::from_bottles(&[bottle(&["Riesling"], Some("white"), 0)]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_intersect_is_case_insensitive() {
        let set = BottleTagSet::from_bottles(&[bottle(&["chardonnay"], None, 2)]);
        assert_eq!(set.intersect(&["Chardonnay".to_string()]), vec!["chardonnay"]);
        assert_eq!(set.intersect(&["CHARDONNAY".to_string()]), vec!["chardonnay"]);
    }

    #[test]
    fn test_intersect_is_exact_not_fuzzy() {
        let set = BottleTagSet::from_bottles(&[bottle(&["Pinot Noir"], None, 2)]);
        assert!(set.intersect(&["pinot".to_string()]).is_empty());
        assert_eq!(set.intersect(&["pinot noir".to_string()]), vec!["pinot noir"]);
    }

    #[test]
    fn test_normalize_tags_dedupes() {
        assert_eq!(
            normalize_tags(["Syrah", "syrah ", "", "Shiraz"]),
            vec!["shiraz", "syrah"]
        );
    }
}
