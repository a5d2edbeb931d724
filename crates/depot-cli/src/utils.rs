use std::{
    fmt::Display,
    sync::{LazyLock, RwLock},
};

use depot_core::{error::DepotError, DepotResult};
use nu_ansi_term::Color;
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{Panel, Style},
};

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));

pub fn set_color(enabled: bool) {
    if let Ok(mut color) = COLOR.write() {
        *color = enabled;
    }
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let color = COLOR.read().map(|c| *c).unwrap_or(false);
        if color {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> DepotResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| DepotError::Custom(format!("serializing output: {err}")))?;
    println!("{json}");
    Ok(())
}

/// Renders two-column rows under a header panel.
pub fn key_value_table<I>(title: &str, rows: I) -> String
where
    I: IntoIterator<Item = (&'static str, String)>,
{
    let mut builder = Builder::new();
    for (key, value) in rows {
        builder.push_record([key.to_string(), value]);
    }
    builder
        .build()
        .with(Panel::header(title))
        .with(Style::rounded())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_table_contains_rows() {
        let table = key_value_table("Store", [("Blobs", "3".to_string()), ("Size", "1 KiB".into())]);
        assert!(table.contains("Store"));
        assert!(table.contains("Blobs"));
        assert!(table.contains("1 KiB"));
    }
}
