use std::{env, path::PathBuf};

use crate::error::{PathError, PathResult};

/// Resolves a user supplied path.
///
/// A leading `~` expands to the home directory, `$VAR` and `${VAR}` expand to environment
/// variables, and relative paths are made absolute against the current directory.
///
/// # Errors
///
/// * [`PathError::Empty`] if the path is empty
/// * [`PathError::MissingEnvVar`] if a referenced variable is not set
/// * [`PathError::CurrentDir`] if the current directory cannot be determined
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let expanded = PathBuf::from(expand_variables(path)?);
    if expanded.is_absolute() {
        return Ok(expanded);
    }

    env::current_dir()
        .map(|cwd| cwd.join(expanded))
        .map_err(|err| PathError::CurrentDir { source: err })
}

fn expand_variables(path: &str) -> PathResult<String> {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    if chars.peek() == Some(&'~') {
        chars.next();
        result.push_str(&home_dir().to_string_lossy());
    }

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if braced && next == '}' {
                chars.next();
                break;
            }
            if !braced && !(next.is_alphanumeric() || next == '_') {
                break;
            }
            name.push(next);
            chars.next();
        }

        if name.is_empty() {
            result.push('$');
            continue;
        }

        let value = env::var(&name).map_err(|_| PathError::MissingEnvVar {
            var: name.clone(),
            input: path.to_string(),
        })?;
        result.push_str(&value);
    }

    Ok(result)
}

pub fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/root"))
}

pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

pub fn xdg_data_home() -> PathBuf {
    env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_resolve_absolute() {
        assert_eq!(
            resolve_path("/var/lib/depot").unwrap(),
            PathBuf::from("/var/lib/depot")
        );
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve_path("  "), Err(PathError::Empty)));
    }

    #[test]
    #[serial]
    fn test_resolve_env_and_tilde() {
        env::set_var("HOME", "/home/depot");
        env::set_var("DEPOT_TEST_DIR", "/srv/blobs");

        assert_eq!(
            resolve_path("~/stores").unwrap(),
            PathBuf::from("/home/depot/stores")
        );
        assert_eq!(
            resolve_path("$DEPOT_TEST_DIR/default").unwrap(),
            PathBuf::from("/srv/blobs/default")
        );
        assert_eq!(
            resolve_path("${DEPOT_TEST_DIR}-x").unwrap(),
            PathBuf::from("/srv/blobs-x")
        );

        env::remove_var("DEPOT_TEST_DIR");
    }

    #[test]
    #[serial]
    fn test_resolve_missing_env() {
        env::remove_var("DEPOT_DEFINITELY_UNSET");
        assert!(matches!(
            resolve_path("$DEPOT_DEFINITELY_UNSET/x"),
            Err(PathError::MissingEnvVar { .. })
        ));
    }

    #[test]
    fn test_resolve_relative() {
        let resolved = resolve_path("relative/dir").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("relative/dir"));
    }
}
