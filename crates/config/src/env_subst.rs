use std::sync::LazyLock;

use regex::{Captures, Regex};

// Literal pattern, exercised by the tests below.
#[allow(clippy::unwrap_used)]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Replace `${ENV_VAR}` placeholders with values from the process environment.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace `${ENV_VAR}` placeholders using a custom lookup function.
pub fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    PLACEHOLDER
        .replace_all(input, |caps: &Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_var() {
        let lookup = |name: &str| (name == "PIXLIVE_TEST_VAR").then(|| "hello".to_string());
        assert_eq!(
            substitute_env_with("token = \"${PIXLIVE_TEST_VAR}\"", lookup),
            "token = \"hello\""
        );
    }

    #[test]
    fn leaves_unknown_and_malformed() {
        let lookup = |_: &str| None;
        assert_eq!(substitute_env_with("${NOPE_XYZ}", lookup), "${NOPE_XYZ}");
        assert_eq!(substitute_env_with("${unterminated", lookup), "${unterminated");
        assert_eq!(substitute_env_with("$PLAIN", lookup), "$PLAIN");
    }
}
