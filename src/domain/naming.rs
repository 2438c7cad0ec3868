// ============================================================
// Layer 3 — Task Name Sanitising
// ============================================================
// Run names end up as directory names, so they are reduced to
// letters, digits, hyphens, underscores and Hangul syllables.
//
//   "Hello World!! v1.0" → "Hello_World_v1_0"

use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Z가-힣0-9\-_]+").expect("static pattern is valid")
});

/// Make a task or run name safe to use as a path component.
/// Spaces and dots become underscores, everything else outside
/// the allowed set is dropped.
pub fn trim_task_name(name: &str) -> String {
    let name = name.replace(' ', "_").replace('.', "_");
    DISALLOWED.replace_all(&name, "").into_owned()
}
