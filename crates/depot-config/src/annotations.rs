//! Turns `///` field docs into TOML comments for the generated default config.

use std::any::type_name;

use documented::{Documented, DocumentedFields};
use toml_edit::{ArrayOfTables, Decor, Item, RawString, Table};
use tracing::warn;

use crate::error::{ConfigError, Result};

/// Appends every line of `docs` as a `#` comment to the prefix of `decor`.
///
/// An existing non-blank prefix is separated from the new lines by a bare `#` line.
pub fn append_docs_as_toml_comments(decor: &mut Decor, docs: &str) {
    let mut prefix = decor
        .prefix()
        .and_then(RawString::as_str)
        .unwrap_or_default()
        .to_string();

    if prefix.lines().last().is_some_and(|line| !line.is_empty()) {
        prefix.push_str("#\n");
    }

    for line in docs.lines() {
        if line.is_empty() {
            prefix.push_str("#\n");
        } else {
            prefix.push_str("# ");
            prefix.push_str(line);
            prefix.push('\n');
        }
    }

    decor.set_prefix(prefix);
}

/// Annotates every key of `table` with the matching field docs of `T`.
///
/// Non-root tables also receive the container docs of `T`.
pub fn annotate_toml_table<T>(table: &mut Table, is_root: bool) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    if !is_root {
        append_docs_as_toml_comments(table.decor_mut(), T::DOCS);
    }

    for (mut key, item) in table.iter_mut() {
        let name = key.get().to_string();
        let Ok(docs) = T::get_field_docs(&name) else {
            warn!(
                field = %name,
                container = type_name::<T>(),
                "no documentation found for TOML key"
            );
            continue;
        };

        match item {
            Item::None => return Err(ConfigError::UnexpectedTomlItem(name)),
            Item::Value(_) => append_docs_as_toml_comments(key.leaf_decor_mut(), docs),
            Item::Table(sub_table) => append_docs_as_toml_comments(sub_table.decor_mut(), docs),
            Item::ArrayOfTables(array) => {
                if let Some(first) = array.iter_mut().next() {
                    append_docs_as_toml_comments(first.decor_mut(), docs);
                }
            }
        }
    }

    Ok(())
}

/// Annotates the first table of `array`; the remaining entries share its shape.
pub fn annotate_toml_array_of_tables<T>(array: &mut ArrayOfTables) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    match array.iter_mut().next() {
        Some(first) => annotate_toml_table::<T>(first, false)
            .map_err(|err| ConfigError::AnnotateFirstTable(err.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use toml_edit::{Decor, DocumentMut};

    use super::*;
    use crate::{blob_store::BlobStoreConfig, config::Config};

    fn prefix(decor: &Decor) -> String {
        decor
            .prefix()
            .and_then(|p| p.as_str())
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_append_docs_multiline_with_blank() {
        let mut decor = Decor::new("", "");
        append_docs_as_toml_comments(&mut decor, "Line 1\n\nLine 2");

        assert_eq!(prefix(&decor), "# Line 1\n#\n# Line 2\n");
    }

    #[test]
    fn test_append_docs_separates_existing_prefix() {
        let mut decor = Decor::new("# existing\n", "");
        append_docs_as_toml_comments(&mut decor, "Added");

        assert_eq!(prefix(&decor), "# existing\n#\n# Added\n");
    }

    #[test]
    fn test_annotate_array_of_tables() {
        let mut doc = "[[blob_stores]]\nname = \"default\"\n"
            .parse::<DocumentMut>()
            .unwrap();
        let array = doc
            .get_mut("blob_stores")
            .and_then(|item| item.as_array_of_tables_mut())
            .unwrap();
        annotate_toml_array_of_tables::<BlobStoreConfig>(array).unwrap();

        let rendered = doc.to_string();
        assert!(rendered.contains("# A file-backed blob store."));
        assert!(rendered.contains("# Unique name of the blob store."));
    }

    #[test]
    fn test_annotate_config_document() {
        let config = Config::default_config();
        let doc = config.to_annotated_document().unwrap();

        let rendered = doc.to_string();
        assert!(rendered.contains("# Root directory for all depot data."));
        assert!(rendered.contains("# Repository format"));
    }
}
