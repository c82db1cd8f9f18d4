use std::sync::LazyLock;

use ahash::AHashMap;

/// Spellings seen in source data mapped to the canonical island key.
static ISLANDS: LazyLock<AHashMap<&'static str, &'static str>> = LazyLock::new(|| {
    AHashMap::from_iter([
        ("big island", "hawaii"),
        ("hawaii", "hawaii"),
        ("hawai'i", "hawaii"),
        ("hawaiʻi", "hawaii"),
        ("kauai", "kauai"),
        ("kaua'i", "kauai"),
        ("kauaʻi", "kauai"),
        ("maui", "maui"),
        ("oahu", "oahu"),
        ("o'ahu", "oahu"),
        ("oʻahu", "oahu"),
        ("molokai", "molokai"),
        ("moloka'i", "molokai"),
        ("molokaʻi", "molokai"),
        ("lanai", "lanai"),
        ("lana'i", "lanai"),
        ("lanaʻi", "lanai"),
        ("lānaʻi", "lanai"),
        ("kahoolawe", "kahoolawe"),
        ("kahoʻolawe", "kahoolawe"),
        ("niihau", "niihau"),
        ("niʻihau", "niihau"),
    ])
});

/// Canonical island key; unknown names pass through lower-cased.
pub fn normalize_island(raw: &str) -> Option<String> {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    Some(ISLANDS.get(key.as_str()).map_or(key.clone(), |canonical| canonical.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_spellings_collapse() {
        assert_eq!(normalize_island("Big Island").as_deref(), Some("hawaii"));
        assert_eq!(normalize_island(" OAHU ").as_deref(), Some("oahu"));
        assert_eq!(normalize_island("Moloka'i").as_deref(), Some("molokai"));
    }

    #[test]
    fn unknown_names_pass_through_lowercased() {
        assert_eq!(normalize_island("Nihoa").as_deref(), Some("nihoa"));
        assert_eq!(normalize_island("  "), None);
    }
}
