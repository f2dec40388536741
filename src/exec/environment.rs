// src/exec/environment.rs

//! Layered environment construction and reference expansion.
//!
//! Per-service `environment` entries are layered over the inherited process
//! environment; entry values are themselves expanded against the layers
//! built so far, so `PATH: "./bin:$PATH"` works as expected. Unresolved
//! references expand to the empty string.

use std::collections::BTreeMap;

/// Build the combined environment: inherited variables first, then the
/// per-service entries (expanded) on top.
pub fn layered(extra: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut combined: BTreeMap<String, String> = std::env::vars().collect();

    for (name, value) in extra {
        let expanded = expand(value, &combined);
        combined.insert(name.clone(), expanded);
    }

    combined
}

/// Expand `$NAME` and `${NAME}` references in `input` against `env`.
pub fn expand(input: &str, env: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if closed {
                    out.push_str(lookup(env, &name));
                } else {
                    // No closing brace: keep the text as written.
                    out.push_str("${");
                    out.push_str(&name);
                }
            }
            Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(lookup(env, &name));
            }
            _ => out.push('$'),
        }
    }

    out
}

/// Resolve a leading tilde to the invoking user's home directory.
pub fn expand_tilde(input: &str) -> String {
    let home = match dirs::home_dir() {
        Some(home) => home,
        None => return input.to_string(),
    };

    if input == "~" {
        return home.to_string_lossy().into_owned();
    }
    if let Some(rest) = input.strip_prefix("~/") {
        return home.join(rest).to_string_lossy().into_owned();
    }
    input.to_string()
}

fn lookup<'a>(env: &'a BTreeMap<String, String>, name: &str) -> &'a str {
    env.get(name).map(String::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn expands_both_reference_styles() {
        let env = env(&[("PORT", "3000"), ("HOST", "localhost")]);
        assert_eq!(
            expand("http://$HOST:${PORT}/up", &env),
            "http://localhost:3000/up"
        );
    }

    #[test]
    fn unresolved_references_become_empty() {
        assert_eq!(expand("x=$MISSING.", &env(&[])), "x=.");
    }

    #[test]
    fn lone_dollar_is_preserved() {
        assert_eq!(expand("cost: 5$", &env(&[])), "cost: 5$");
    }

    #[test]
    fn service_entries_override_inherited() {
        // PATH is always present in the inherited environment.
        let combined = layered(&env(&[("PATH", "/custom/bin")]));
        assert_eq!(combined["PATH"], "/custom/bin");
    }

    #[test]
    fn service_entries_may_reference_inherited() {
        let combined = layered(&env(&[("COMPOSER_TEST_PREFIXED", "x:$PATH")]));
        assert!(combined["COMPOSER_TEST_PREFIXED"].len() > 2);
        assert!(combined["COMPOSER_TEST_PREFIXED"].starts_with("x:"));
    }

    #[test]
    fn tilde_expands_at_word_start_only() {
        let expanded = expand_tilde("~/app");
        assert!(!expanded.starts_with('~'));
        assert_eq!(expand_tilde("not~/app"), "not~/app");
    }
}
