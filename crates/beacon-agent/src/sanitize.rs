/// Fallback for most fingerprint fields.
pub const UNKNOWN: &str = "unknown";

/// Fallback for two-letter language and country codes.
pub const UNKNOWN_SHORT: &str = "zz";

/// Normalize a free-form value into a whitespace-free, non-empty token.
///
/// Missing or empty input becomes `fallback`. Every whitespace character is
/// removed; if nothing is left, `fallback` is returned instead.
pub fn sanitize(value: Option<&str>, fallback: &str) -> String {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    };
    let stripped: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if stripped.is_empty() {
        fallback.to_string()
    } else {
        stripped
    }
}

pub fn sanitize_long(value: Option<&str>) -> String {
    sanitize(value, UNKNOWN)
}

pub fn sanitize_short(value: Option<&str>) -> String {
    sanitize(value, UNKNOWN_SHORT)
}

/// Wrap a value in single quotes when it contains whitespace, for log lines.
pub fn quote(value: Option<&str>) -> Option<String> {
    let value = value?;
    if value.chars().any(char::is_whitespace) {
        Some(format!("'{}'", value))
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_all_whitespace() {
        assert_eq!(sanitize_long(Some("Nexus 5")), "Nexus5");
        assert_eq!(sanitize_long(Some(" a\tb\nc\r ")), "abc");
        assert_eq!(sanitize_long(Some("x\u{a0}y")), "xy");
    }

    #[test]
    fn falls_back_when_empty() {
        assert_eq!(sanitize_long(None), "unknown");
        assert_eq!(sanitize_long(Some("")), "unknown");
        assert_eq!(sanitize_long(Some(" \t\n")), "unknown");
        assert_eq!(sanitize_short(None), "zz");
        assert_eq!(sanitize_short(Some("   ")), "zz");
    }

    #[test]
    fn output_is_total() {
        let inputs = [None, Some(""), Some(" "), Some("\u{2003}"), Some("en"), Some("a b")];
        for input in inputs {
            for fallback in [UNKNOWN, UNKNOWN_SHORT] {
                let out = sanitize(input, fallback);
                assert!(!out.is_empty());
                assert!(!out.chars().any(char::is_whitespace));
            }
        }
    }

    #[test]
    fn quote_only_when_needed() {
        assert_eq!(quote(None), None);
        assert_eq!(quote(Some("plain")).as_deref(), Some("plain"));
        assert_eq!(quote(Some("two words")).as_deref(), Some("'two words'"));
    }
}
