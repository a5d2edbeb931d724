use std::collections::HashMap;

/// Maven packaging types whose main artifact extension differs from the packaging name.
pub fn default_packaging_extensions() -> HashMap<String, String> {
    [
        ("bundle", "jar"),
        ("ejb", "jar"),
        ("eclipse-plugin", "jar"),
        ("hk2-jar", "jar"),
        ("maven-archetype", "jar"),
        ("maven-plugin", "jar"),
        ("orbit", "jar"),
        ("test-jar", "jar"),
    ]
    .into_iter()
    .map(|(packaging, ext)| (packaging.to_string(), ext.to_string()))
    .collect()
}

/// Names end up in file and directory names, so they are kept to a safe alphabet.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_packaging_extensions() {
        let map = default_packaging_extensions();
        assert_eq!(map.get("maven-plugin").map(String::as_str), Some("jar"));
        assert_eq!(map.get("bundle").map(String::as_str), Some("jar"));
        assert!(!map.contains_key("war"));
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("default"));
        assert!(is_valid_name("maven-releases_2.x"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name(".hidden"));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("white space"));
    }
}
