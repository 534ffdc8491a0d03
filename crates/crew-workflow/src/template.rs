//! Input interpolation for task text

use crew_core::{Error, Result};
use minijinja::{Environment, UndefinedBehavior};
use std::collections::BTreeMap;

/// Render `{{ name }}` placeholders from the kickoff inputs
///
/// A placeholder with no matching input is an error rather than an empty
/// string.
pub fn render(template: &str, inputs: &BTreeMap<String, String>) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);

    env.render_str(template, inputs)
        .map_err(|e| Error::Configuration(format!("cannot render template: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> BTreeMap<String, String> {
        BTreeMap::from([("company_stock".to_string(), "IBM".to_string())])
    }

    #[test]
    fn test_render_input() {
        let text = render("Collect data for {{ company_stock }}.", &inputs()).unwrap();
        assert_eq!(text, "Collect data for IBM.");
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        let text = render("- Risks and opportunities.\n", &inputs()).unwrap();
        assert_eq!(text, "- Risks and opportunities.\n");
    }

    #[test]
    fn test_missing_input_is_error() {
        let result = render("News for {{ ticker }}", &inputs());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
