//! Positional `{n}` string formatting.

use std::fmt::Display;

/// Replace every `{0}` in `template` with `args[0]`, then every `{1}` with
/// `args[1]`, and so on.
///
/// Substitution runs one index at a time, so a value that itself contains a
/// later placeholder is expanded by the later pass. Placeholders without a
/// matching argument are left as-is.
///
/// ```
/// assert_eq!(helper_core::format("{0} {1}", &["Hello", "World"]), "Hello World");
/// ```
pub fn format<T: Display>(template: &str, args: &[T]) -> String {
    let mut formatted = template.to_string();
    for (index, arg) in args.iter().enumerate() {
        let placeholder = format!("{{{index}}}");
        if formatted.contains(&placeholder) {
            formatted = formatted.replace(&placeholder, &arg.to_string());
        }
    }
    formatted
}
