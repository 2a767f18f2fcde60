//! Property tests for normalization, diff, extraction and scope deduction.

use configpump_testkit::prelude::*;
use configpump_xml::{deduce_xpath_entries, diff, extract, list_item_names, normalize};
use proptest::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn normalize_is_idempotent(doc in config_document_strategy()) {
        let (once, ok) = normalize(&doc);
        prop_assert!(ok);
        let (twice, ok) = normalize(&once);
        prop_assert!(ok);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn diff_against_self_is_empty(doc in config_document_strategy(), ignore_ws in any::<bool>()) {
        prop_assert!(diff(&doc, &doc, ignore_ws).is_empty());
    }

    #[test]
    fn extraction_is_idempotent(config in panorama_config_strategy()) {
        let entries = deduce_xpath_entries(&config.xml);
        let once = extract(&config.xml, &entries).unwrap();
        let twice = extract(&once, &entries).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn trailing_slashes_do_not_change_extraction(
        config in panorama_config_strategy(),
        slashes in trailing_slashes_strategy(),
    ) {
        let selector = "/config/shared".to_string();
        let plain = extract(&config.xml, &[selector.clone()]).unwrap();
        let slashed = extract(&config.xml, &[format!("{}{}", selector, slashes)]).unwrap();
        prop_assert_eq!(plain, slashed);
    }

    #[test]
    fn deduced_scope_covers_every_item(config in panorama_config_strategy()) {
        let entries = deduce_xpath_entries(&config.xml);
        prop_assert_eq!(entries.len(), config.templates.len() + config.device_groups.len());
        prop_assert_eq!(list_item_names(&config.xml, "template").unwrap(), config.templates.clone());
        prop_assert_eq!(list_item_names(&config.xml, "device-group").unwrap(), config.device_groups);
        for (entry, name) in entries.iter().zip(&config.templates) {
            let expected = format!("/template/entry[@name='{}']", name);
            prop_assert!(entry.ends_with(&expected));
        }
    }

    #[test]
    fn extraction_drops_unscoped_sections(
        config in panorama_config_strategy(),
        selector in selector_strategy(),
    ) {
        let extracted = extract(&config.xml, &[selector.clone()]).unwrap();
        if !selector.starts_with("/config/shared") {
            prop_assert!(!extracted.contains("<shared"));
        }
    }
}
