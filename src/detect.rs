//! Customization detection
//!
//! Compares the sections scanned from the customized source against the
//! fully parsed target and keeps only what the user changed.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

use deploy_scan::{QuotedProperty, ScalarValue, Section, SectionMap};

use crate::rules::IgnoreSet;

/// Customized properties of one section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionCustomization {
    /// Regular properties whose value differs from the target.
    pub regular_props: IndexMap<String, ScalarValue>,

    /// Quoted properties, always carried over.
    pub quoted_props: Vec<QuotedProperty>,

    pub is_array_table: bool,
}

impl SectionCustomization {
    pub fn is_empty(&self) -> bool {
        self.regular_props.is_empty() && self.quoted_props.is_empty()
    }

    /// Number of properties this customization carries.
    pub fn len(&self) -> usize {
        self.regular_props.len() + self.quoted_props.len()
    }
}

/// Customizations keyed by section name, in source order.
pub type CustomizationSet = IndexMap<String, SectionCustomization>;

/// Flatten a parsed TOML document into dotted keys.
///
/// Tables join keys with `.`. An array whose first element is a table is
/// expanded per element as `key[i].subkey`. Any other array stays a single
/// value.
pub fn flatten(table: &toml::Table) -> HashMap<String, ScalarValue> {
    let mut flat = HashMap::new();
    flatten_into(table, "", &mut flat);
    flat
}

fn flatten_into(table: &toml::Table, prefix: &str, flat: &mut HashMap<String, ScalarValue>) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            toml::Value::Table(inner) => flatten_into(inner, &full_key, flat),
            toml::Value::Array(items) if matches!(items.first(), Some(toml::Value::Table(_))) => {
                for (idx, item) in items.iter().enumerate() {
                    let item_key = format!("{full_key}[{idx}]");
                    match item {
                        toml::Value::Table(inner) => flatten_into(inner, &item_key, flat),
                        other => {
                            flat.insert(item_key, ScalarValue::from_toml(other));
                        }
                    }
                }
            }
            other => {
                flat.insert(full_key, ScalarValue::from_toml(other));
            }
        }
    }
}

/// Find the source properties that differ from the target.
///
/// A regular property is a customization when it does not match an ignore
/// pattern and the target lacks the key or renders it differently. For
/// array-tables, a match against any element of the target's array counts as
/// unchanged. Quoted properties are always customizations.
pub fn find_customizations(
    source: &SectionMap,
    target: &toml::Table,
    ignore: &IgnoreSet,
) -> CustomizationSet {
    let target_flat = flatten(target);
    let mut customizations = CustomizationSet::new();

    for (name, section) in source {
        let custom = section_customization(name, section, &target_flat, ignore);
        if custom.is_empty() {
            continue;
        }
        tracing::debug!(section = %name, properties = custom.len(), "section customized");
        customizations.insert(name.clone(), custom);
    }

    customizations
}

fn section_customization(
    name: &str,
    section: &Section,
    target_flat: &HashMap<String, ScalarValue>,
    ignore: &IgnoreSet,
) -> SectionCustomization {
    let mut custom = SectionCustomization {
        is_array_table: section.is_array_table,
        quoted_props: section.quoted_props.clone(),
        ..Default::default()
    };

    for (key, value) in &section.regular_props {
        let full_key = format!("{name}.{key}");

        if ignore.is_ignored(&full_key, value) {
            tracing::debug!(key = %full_key, "matches ignore pattern");
            continue;
        }

        let rendered = value.to_string();
        let unchanged = match target_flat.get(&full_key) {
            Some(target_value) => target_value.to_string() == rendered,
            None => {
                section.is_array_table
                    && array_table_values(name, key, target_flat).any(|v| v.to_string() == rendered)
            }
        };

        if !unchanged {
            custom.regular_props.insert(key.clone(), value.clone());
        }
    }

    custom
}

/// Values of `key` in every element of the target array-table `name`.
fn array_table_values<'a>(
    name: &'a str,
    key: &'a str,
    target_flat: &'a HashMap<String, ScalarValue>,
) -> impl Iterator<Item = &'a ScalarValue> + 'a {
    (0..)
        .map(move |idx| format!("{name}[{idx}]"))
        .take_while(move |prefix| {
            target_flat
                .keys()
                .any(|k| k.starts_with(prefix.as_str()) && k[prefix.len()..].starts_with('.'))
        })
        .filter_map(move |prefix| target_flat.get(&format!("{prefix}.{key}")))
}
