// crates/clientbook-cli/src/tests/i18n.rs
// ============================================================================
// Module: CLI i18n Tests
// Description: Unit tests for catalog parity and locale parsing.
// Purpose: Ensure CLI localization stays consistent across supported locales.
// Dependencies: clientbook-cli i18n module
// ============================================================================

//! ## Overview
//! Verifies the message catalogs stay in sync, locale parsing is tolerant,
//! and every locale template keeps the English placeholder set.

use std::collections::BTreeSet;

use crate::i18n::Locale;
use crate::i18n::MessageArg;
use crate::i18n::SUPPORTED_LOCALES;
use crate::i18n::catalog_entries_for;
use crate::i18n::catalog_for;
use crate::i18n::translate;

fn parse_placeholder_names(template: &str) -> Result<BTreeSet<String>, String> {
    let mut placeholders = BTreeSet::new();
    let mut rest = template;
    let mut offset = 0usize;
    while let Some(start) = rest.find(['{', '}']) {
        if rest[start ..].starts_with('}') {
            return Err(format!("unmatched '}}' at byte {}", offset + start));
        }
        let Some(len) = rest[start + 1 ..].find('}') else {
            return Err(format!("unclosed '{{' at byte {}", offset + start));
        };
        let name = &rest[start + 1 .. start + 1 + len];
        if name.is_empty() || name.contains('{') {
            return Err(format!("malformed placeholder at byte {}", offset + start));
        }
        if !name.chars().all(|ch| ch.is_ascii_lowercase() || ch == '_') {
            return Err(format!("placeholder '{name}' must use [a-z_]"));
        }
        placeholders.insert(name.to_string());
        let consumed = start + len + 2;
        offset += consumed;
        rest = &rest[consumed ..];
    }
    Ok(placeholders)
}

#[test]
fn catalogs_have_matching_keys() {
    let en_keys: BTreeSet<&'static str> = catalog_for(Locale::En).keys().copied().collect();
    for locale in SUPPORTED_LOCALES {
        let locale_keys: BTreeSet<&'static str> = catalog_for(*locale).keys().copied().collect();
        assert_eq!(en_keys, locale_keys, "locale catalogs must stay in parity ({locale:?})");
    }
}

#[test]
fn catalogs_have_unique_keys_per_locale() {
    for locale in SUPPORTED_LOCALES {
        let entries = catalog_entries_for(*locale);
        let unique: BTreeSet<&str> = entries.iter().map(|(key, _)| *key).collect();
        assert_eq!(unique.len(), entries.len(), "duplicate catalog keys in {locale:?}");
    }
}

#[test]
fn catalogs_have_placeholder_parity_with_english() {
    let en_catalog = catalog_for(Locale::En);
    for (key, en_template) in en_catalog {
        let expected = parse_placeholder_names(en_template)
            .unwrap_or_else(|error| panic!("invalid placeholder in '{key}' (En): {error}"));
        for locale in SUPPORTED_LOCALES {
            let template = catalog_for(*locale)
                .get(key)
                .copied()
                .unwrap_or_else(|| panic!("missing key '{key}' in locale {locale:?}"));
            let actual = parse_placeholder_names(template).unwrap_or_else(|error| {
                panic!("invalid placeholder in '{key}' ({locale:?}): {error}")
            });
            assert_eq!(expected, actual, "placeholder mismatch for '{key}' in {locale:?}");
        }
    }
}

#[test]
fn italian_differs_for_curated_keys() {
    const CURATED_KEYS: &[&str] =
        &["config.validate.ok", "clients.add.ok", "i18n.disclaimer.machine_translated"];
    for key in CURATED_KEYS {
        let en = catalog_for(Locale::En).get(key).copied().expect("en key exists");
        let it = catalog_for(Locale::It).get(key).copied().expect("it key exists");
        assert_ne!(en, it, "Italian must differ from English for '{key}'");
    }
}

#[test]
fn locale_parse_accepts_region_tags_and_case() {
    assert_eq!(Locale::parse("en"), Some(Locale::En));
    assert_eq!(Locale::parse("EN-us"), Some(Locale::En));
    assert_eq!(Locale::parse("it_IT"), Some(Locale::It));
    assert_eq!(Locale::parse("it_IT.UTF-8"), Some(Locale::It));
    assert_eq!(Locale::parse(" IT "), Some(Locale::It));
    assert_eq!(Locale::parse(""), None);
    assert_eq!(Locale::parse("ca"), None);
}

#[test]
fn translate_substitutes_every_placeholder() {
    let output = translate(
        "columns.sync.ok",
        vec![
            MessageArg::new("added", "2"),
            MessageArg::new("present", "5"),
            MessageArg::new("skipped", "1"),
        ],
    );
    assert!(!output.contains('{'), "unsubstituted placeholder in {output}");
    assert!(output.contains('2') && output.contains('5') && output.contains('1'));
}
