//! `{{placeholder}}` substitution for defect templates.

pub const METADATA_TYPE: &str = "metadata.type";
pub const METADATA_VALUE: &str = "metadata.value";
pub const PERMALINK: &str = "permalink";

const ELLIPSIS: &str = "...";

/// Substitutes each binding into `template`.
///
/// Only the first occurrence of every `{{name}}` is replaced; later
/// occurrences are left as they are.
pub fn render(template: &str, bindings: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in bindings {
        let placeholder = format!("{{{{{}}}}}", name);
        rendered = rendered.replacen(&placeholder, value, 1);
    }
    rendered
}

/// Cuts `name` to `max_len` characters and appends an ellipsis when it is longer.
pub fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }
    let mut truncated: String = name.chars().take(max_len).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_metadata() {
        let result = render(
            "[{{metadata.type}}] {{metadata.value}}",
            &[(METADATA_TYPE, "TypeError"), (METADATA_VALUE, "x is undefined")],
        );
        assert_eq!(result, "[TypeError] x is undefined");
    }

    #[test]
    fn test_render_replaces_first_occurrence_only() {
        let result = render(
            "<a href=\"{{permalink}}\">{{permalink}}</a>",
            &[(PERMALINK, "https://s.io/1/")],
        );
        assert_eq!(result, "<a href=\"https://s.io/1/\">{{permalink}}</a>");
    }

    #[test]
    fn test_render_ignores_unknown_placeholders() {
        let result = render("{{culprit}} {{permalink}}", &[(PERMALINK, "p")]);
        assert_eq!(result, "{{culprit}} p");
    }

    #[test]
    fn test_render_value_containing_placeholder_is_not_expanded_again() {
        let result = render(
            "{{metadata.type}}: {{metadata.value}}",
            &[(METADATA_TYPE, "{{metadata.value}}"), (METADATA_VALUE, "v")],
        );
        // the type's literal text is the first occurrence now
        assert_eq!(result, "v: {{metadata.value}}");
    }

    #[test]
    fn test_truncate_name() {
        let name = render("[Sentry] {{metadata.value}}", &[(METADATA_VALUE, "NullPointerException")]);
        assert_eq!(truncate_name(&name, 10), "[Sentry] N...");
    }

    #[test]
    fn test_truncate_name_at_limit_is_unchanged() {
        assert_eq!(truncate_name("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_name("short", 110), "short");
    }

    #[test]
    fn test_truncate_name_counts_characters() {
        assert_eq!(truncate_name("ошибка сервера", 6), "ошибка...");
    }
}
