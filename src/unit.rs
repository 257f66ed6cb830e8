//! Unit configuration files
//!
//! A unit file is a flat INI-like settings store:
//!
//! ```text
//! # relay credentials
//! [notify]
//! user=robot@example.com
//! pass=hunter2
//! smtp=relay.example.com
//!
//! [ops]
//! mail=alice@example.com,bob@example.com
//! ```
//!
//! Loading is fail-open throughout: an unreadable file, a missing section or
//! a missing key all degrade to empty lookups rather than errors. The caller
//! that consumes the values decides whether an empty value is fatal.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// Key/value view over the selected sections of a unit file
///
/// When `sections` is empty, keys appearing before the first section header
/// are selected. Duplicate keys resolve last-wins, in file order.
#[derive(Default, Clone, Debug)]
pub struct Unit {
    values: HashMap<String, String>,
}

impl Unit {
    /// Loads the named sections of the unit file at `path`
    pub fn load<P: AsRef<Path>>(path: P, sections: &[&str]) -> Unit {
        let mut unit = Unit::default();

        let file = match File::open(path.as_ref()) {
            Ok(file) => file,
            Err(_) => return unit,
        };

        let mut selected = sections.is_empty();
        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => return unit,
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                selected = sections.contains(&name.trim());
                continue;
            }
            if !selected {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                unit.values
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        unit
    }

    /// Returns the value for `key`, or the empty string when absent
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    /// Tells whether no keys were loaded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod test {
    use std::{env, fs, path::PathBuf};

    use pretty_assertions::assert_eq;

    use super::*;

    fn write_unit(name: &str, contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("relaynote-unit-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_selected_section() {
        let path = write_unit(
            "select",
            "[notify]\nuser=u@x.com\npass=secret\nsmtp=relay.x.com\n[other]\npass=nope\n",
        );
        let unit = Unit::load(&path, &["notify"]);
        assert_eq!(unit.get("user"), "u@x.com");
        assert_eq!(unit.get("pass"), "secret");
        assert_eq!(unit.get("smtp"), "relay.x.com");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn skips_comments_and_trims() {
        let path = write_unit(
            "trim",
            "# header\n[ops]\n; note\n mail = a@x.com,b@x.com \n\n",
        );
        let unit = Unit::load(&path, &["ops"]);
        assert_eq!(unit.get("mail"), "a@x.com,b@x.com");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_is_empty() {
        let unit = Unit::load("/nonexistent/relaynote.unit", &["notify"]);
        assert!(unit.is_empty());
        assert_eq!(unit.get("pass"), "");
    }

    #[test]
    fn missing_section_is_empty() {
        let path = write_unit("missing", "[notify]\nuser=u@x.com\n");
        let unit = Unit::load(&path, &["absent"]);
        assert!(unit.is_empty());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn top_level_keys_without_section_filter() {
        let path = write_unit("toplevel", "user=u@x.com\n[notify]\nuser=shadowed\n");
        let unit = Unit::load(&path, &[]);
        assert_eq!(unit.get("user"), "u@x.com");
        fs::remove_file(path).unwrap();
    }
}
