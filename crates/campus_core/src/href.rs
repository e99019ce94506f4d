/// Turns a download reference into an absolute address.
///
/// Scheme-qualified references are returned as-is, root-relative ones are
/// joined onto `api_origin`, anything else (blob or data references) passes
/// through untouched.
pub fn resolve_href(api_origin: &str, reference: &str) -> String {
    if has_scheme(reference) {
        return reference.to_string();
    }
    if reference.starts_with('/') {
        return format!("{}{}", api_origin.trim_end_matches('/'), reference);
    }
    reference.to_string()
}

fn has_scheme(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
