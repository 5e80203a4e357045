/// Placeholder replaced by the diff text in every review template.
pub const DIFF_PLACEHOLDER: &str = "{diff}";

/// Built-in review template, used unless a prompt file overrides it.
pub const DEFAULT_REVIEW_TEMPLATE: &str = include_str!("../../assets/prompts/review.md");

/// Substitutes `diff_text` into `template`.
///
/// Every occurrence of the placeholder is replaced; the diff is inserted verbatim.
pub fn build_prompt(template: &str, diff_text: &str) -> String {
    template.replace(DIFF_PLACEHOLDER, diff_text)
}
