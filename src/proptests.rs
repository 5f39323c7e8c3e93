//! Property-based tests for path handling, pointers, ordering and hashing.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use std::path::{Path, PathBuf};

    use proptest::prelude::*;
    use serde_yaml::{Mapping, Value as YamlValue};

    use crate::generators::content_hash;
    use crate::merge::{parse_field_path, parse_pointer, to_pointer, PathSegment};
    use crate::path::{clean, is_within, join_relative, resource_file_name, sanitize_component};
    use crate::phases::ordering::{execute as order, OutputOrder};
    use crate::resmap::ResourceMap;
    use crate::resource::Resource;

    fn resource(kind: &str, name: &str) -> Resource {
        Resource::from_yaml(&format!(
            "apiVersion: v1\nkind: {}\nmetadata:\n  name: {}\n",
            kind, name
        ))
        .unwrap()
    }

    // ============================================================================
    // path property tests
    // ============================================================================

    proptest! {
        /// Property: cleaning is idempotent
        #[test]
        fn clean_is_idempotent(parts in prop::collection::vec("(\\.|\\.\\.|[a-z]{1,5})", 0..8)) {
            let path: PathBuf = parts.iter().collect();
            let once = clean(&path);
            prop_assert_eq!(clean(&once), once);
        }

        /// Property: a cleaned relative path never contains `.` and only
        /// leading `..` components
        #[test]
        fn clean_leaves_only_leading_parent_dirs(parts in prop::collection::vec("(\\.|\\.\\.|[a-z]{1,5})", 0..8)) {
            let path: PathBuf = parts.iter().collect();
            let cleaned = clean(&path);
            let names: Vec<String> = cleaned
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            prop_assert!(!names.iter().any(|n| n == "."));
            let first_normal = names.iter().position(|n| n != "..").unwrap_or(names.len());
            prop_assert!(names[first_normal..].iter().all(|n| n != ".."));
        }

        /// Property: entries without `..` always stay within their directory
        #[test]
        fn plain_entries_stay_within_root(
            root in "[a-z]{1,6}(/[a-z]{1,6}){0,2}",
            entry in "[a-z]{1,6}(/[a-z.]{1,6}){0,3}",
        ) {
            prop_assume!(!entry.split('/').any(|p| p == ".."));
            let joined = join_relative(Path::new(&root), &entry);
            prop_assert!(is_within(Path::new(&root), &joined));
        }

        /// Property: output file names are lowercase, end in .yaml, and
        /// contain no path separators
        #[test]
        fn resource_file_names_are_safe(
            group in "[a-zA-Z.]{0,10}",
            kind in "[A-Z][a-zA-Z]{0,10}",
            name in "[a-z0-9/:.-]{1,20}",
        ) {
            let file = resource_file_name(&group, "v1", &kind, &name);
            prop_assert!(file.ends_with(".yaml"));
            prop_assert!(!file.contains('/'));
            prop_assert!(!file.contains(':'));
            prop_assert_eq!(file.to_lowercase(), file.clone());
        }

        /// Property: sanitizing keeps the character count
        #[test]
        fn sanitize_preserves_char_count(input in ".*") {
            prop_assert_eq!(sanitize_component(&input).chars().count(), input.chars().count());
        }
    }

    // ============================================================================
    // pointer property tests
    // ============================================================================

    proptest! {
        /// Property: encoding member names as a pointer and parsing it back
        /// yields the same names
        #[test]
        fn pointer_encoding_is_reversible(names in prop::collection::vec("[a-z~/.]{1,6}", 1..5)) {
            let pointer = to_pointer(&names);
            let parsed = parse_pointer(&pointer).unwrap();
            let keys: Vec<String> = parsed
                .into_iter()
                .map(|s| match s {
                    PathSegment::Key(k) => k,
                    PathSegment::End => "-".to_string(),
                })
                .collect();
            prop_assert_eq!(keys, names);
        }

        /// Property: a slash-separated field path splits into its parts
        #[test]
        fn field_paths_split_on_slashes(parts in prop::collection::vec("[a-zA-Z]{1,8}", 1..5)) {
            prop_assert_eq!(parse_field_path(&parts.join("/")), parts);
        }
    }

    // ============================================================================
    // ordering and hashing property tests
    // ============================================================================

    proptest! {
        /// Property: the legacy order does not depend on input order
        #[test]
        fn legacy_order_ignores_input_order(
            items in prop::collection::btree_set(
                (prop::sample::select(vec!["ConfigMap", "Service", "Namespace", "Widget", "Secret"]), "r[a-z]{1,6}"),
                1..10,
            ),
            seed in any::<u64>(),
        ) {
            let mut resources: Vec<Resource> = items.iter().map(|(k, n)| resource(k, n)).collect();
            let forward = order(resources.iter().cloned().collect::<ResourceMap>(), &OutputOrder::legacy());
            let len = resources.len();
            resources.rotate_left((seed as usize) % len);
            resources.reverse();
            let shuffled = order(resources.into_iter().collect::<ResourceMap>(), &OutputOrder::legacy());
            prop_assert_eq!(forward, shuffled);
        }

        /// Property: content hashes are ten characters from the safe alphabet
        #[test]
        fn content_hash_uses_safe_alphabet(name in "[a-z]{1,10}", value in ".*") {
            let mut data = Mapping::new();
            data.insert("key".into(), YamlValue::String(value));
            let mut metadata = Mapping::new();
            metadata.insert("name".into(), YamlValue::String(name));
            let mut doc = Mapping::new();
            doc.insert("apiVersion".into(), "v1".into());
            doc.insert("kind".into(), "ConfigMap".into());
            doc.insert("metadata".into(), YamlValue::Mapping(metadata));
            doc.insert("data".into(), YamlValue::Mapping(data));
            let cm = Resource::from_value(YamlValue::Mapping(doc)).unwrap();
            let hash = content_hash(&cm).unwrap();
            prop_assert_eq!(hash.len(), 10);
            prop_assert!(hash.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
            prop_assert!(!hash.chars().any(|c| matches!(c, '0' | '1' | '3' | 'a' | 'e')));
        }
    }
}
