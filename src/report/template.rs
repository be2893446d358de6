//! Keyword-substitution template renderer.
//!
//! Placeholders are delimited by `%` on both sides (`%KEY%`). `%%` renders a
//! literal `%`. A `%` with no closing delimiter is copied through verbatim
//! together with the rest of the input. Expansions are not re-scanned.

/// Placeholder delimiter, used on both sides of a key.
pub const DELIMITER: char = '%';

/// Expand every `%KEY%` placeholder in `template` using `resolve`.
///
/// Single left-to-right pass; pure function of the template and resolver.
/// Resolvers return an empty string for keys they do not know.
pub fn render<R>(template: &str, resolve: R) -> String
where
    R: Fn(&str) -> String,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(DELIMITER) {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(DELIMITER) {
            Some(end) => {
                let key = &after[..end];
                if key.is_empty() {
                    // %% is the escape for a literal delimiter
                    out.push(DELIMITER);
                } else {
                    out.push_str(&resolve(key));
                }
                rest = &after[end + 1..];
            }
            None => {
                // No closing delimiter: the remainder is literal text
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(key: &str) -> String {
        match key {
            "X" => "9".to_string(),
            "NAME" => "relay-7".to_string(),
            _ => String::new(),
        }
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("abc", resolver), "abc");
    }

    #[test]
    fn single_placeholder() {
        assert_eq!(render("%X%", resolver), "9");
    }

    #[test]
    fn escape_yields_literal_delimiter() {
        assert_eq!(render("%%", resolver), "%");
        assert_eq!(render("100%% done", resolver), "100% done");
    }

    #[test]
    fn unmatched_delimiter_is_verbatim() {
        assert_eq!(render("a%Y", resolver), "a%Y");
    }

    #[test]
    fn unknown_key_resolves_empty() {
        assert_eq!(render("%UNKNOWN%", resolver), "");
    }

    #[test]
    fn expansion_is_not_rescanned() {
        // A resolved value containing delimiters must not be re-expanded
        let r = |key: &str| if key == "A" { "%X%".to_string() } else { String::new() };
        assert_eq!(render("%A%", r), "%X%");
    }

    #[test]
    fn mixed_document() {
        assert_eq!(render("hello %NAME%, %X%%% load", resolver), "hello relay-7, 9% load");
    }
}
