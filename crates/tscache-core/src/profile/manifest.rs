//! Legacy `manifest.json` exports.
//!
//! Hand-edited manifests show up with comments, trailing commas and odd key
//! casing, so parsing is lenient about all three.

use crate::{Error, ModReference, Result};
use serde_json::Value;

/// Parse the `dependencies` array of a manifest into mod references.
///
/// Entries that are not `Author-Name-Version` strings are skipped.
pub fn parse(text: &str) -> Result<Vec<ModReference>> {
    let cleaned = strip_json_noise(text.trim_start_matches('\u{feff}'));
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| Error::Format(format!("manifest.json is not valid JSON: {e}")))?;

    let Value::Object(fields) = value else {
        return Err(Error::Format("manifest.json is not an object".into()));
    };

    let dependencies = fields
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("dependencies"))
        .map(|(_, value)| value);

    Ok(match dependencies {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(ModReference::from_dependency)
            .collect(),
        _ => Vec::new(),
    })
}

/// Drop `//` and `/* */` comments and trailing commas outside string literals.
fn strip_json_noise(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => out.extend(chars.next()),
                '"' => in_string = false,
                _ => {},
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            },
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            },
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
                out.push(' ');
            },
            ']' | '}' => {
                let trimmed = out.trim_end().len();
                if out[..trimmed].ends_with(',') {
                    out.truncate(trimmed - 1);
                }
                out.push(c);
            },
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rendered(mods: &[ModReference]) -> Vec<String> {
        mods.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parses_dependencies() {
        let text = r#"{
            "name": "Building",
            "version_number": "1.0.0",
            "dependencies": [
                "denikson-BepInExPack_Valheim-5.4.2202",
                "Org-My-Mod-2.0.0",
                "NotADependency",
                42
            ]
        }"#;
        let mods = parse(text).unwrap();
        assert_eq!(
            rendered(&mods),
            vec!["denikson-BepInExPack_Valheim-5.4.2202", "Org-My-Mod-2.0.0"]
        );
        assert_eq!(mods[1].original.as_deref(), Some("Org-My-Mod-2.0.0"));
    }

    #[test]
    fn test_lenient_syntax() {
        let text = r#"{
            // exported by hand
            "Dependencies": [
                "A-B-1.0.0", /* pinned */
                "C-D-2.0.0",
            ],
        }"#;
        assert_eq!(rendered(&parse(text).unwrap()), vec!["A-B-1.0.0", "C-D-2.0.0"]);
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        let text = r#"{"website_url": "https://example.com/a,]", "dependencies": ["A-B-1.0.0"]}"#;
        assert_eq!(rendered(&parse(text).unwrap()), vec!["A-B-1.0.0"]);
    }

    #[test]
    fn test_missing_dependencies_is_empty() {
        assert!(parse(r#"{"name": "x"}"#).unwrap().is_empty());
        assert!(parse(r#"{"dependencies": "nope"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_is_format_error() {
        assert!(matches!(parse("{not json"), Err(Error::Format(_))));
        assert!(matches!(parse("[]"), Err(Error::Format(_))));
    }
}
