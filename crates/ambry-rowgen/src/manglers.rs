//! Header manglers: normalize raw header text into column names.

use std::collections::HashSet;

use crate::error::BoxError;

/// Lower-case, underscore-separated, unique column names
///
/// Every run of characters that are not ASCII letters or digits becomes a
/// single `_`, leading and trailing `_` are removed, blank names become
/// `col{index}`, and repeats get a `_2`, `_3`, ... suffix.
pub fn snake_case(names: &[String]) -> Result<Vec<String>, BoxError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut mangled = Vec::with_capacity(names.len());

    for (index, name) in names.iter().enumerate() {
        let mut base = mangle_name(name);
        if base.is_empty() {
            base = format!("col{}", index);
        }

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}_{}", base, suffix);
        }

        seen.insert(candidate.clone());
        mangled.push(candidate);
    }

    Ok(mangled)
}

/// Mangle one column name
pub fn mangle_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_mangle_name() {
        assert_eq!(mangle_name("Sales Qty"), "sales_qty");
        assert_eq!(mangle_name("  % of Total (2020) "), "of_total_2020");
        assert_eq!(mangle_name("GEOID"), "geoid");
        assert_eq!(mangle_name("---"), "");
    }

    #[test]
    fn test_snake_case_dedupes() {
        let mangled = snake_case(&names(&["Name", "name", "", "NAME"])).unwrap();
        assert_eq!(mangled, names(&["name", "name_2", "col2", "name_3"]));
    }

    #[test]
    fn test_snake_case_suffix_skips_taken_names() {
        let mangled = snake_case(&names(&["a", "a", "a_2"])).unwrap();
        assert_eq!(mangled, names(&["a", "a_2", "a_2_2"]));

        let mangled = snake_case(&names(&["b_2", "b", "b"])).unwrap();
        assert_eq!(mangled, names(&["b_2", "b", "b_3"]));

        let unique: HashSet<&String> = mangled.iter().collect();
        assert_eq!(unique.len(), mangled.len());
    }
}
