// src/text.rs
//! Display cleanup for headline text and model output.

use once_cell::sync::OnceCell;
use regex::Regex;

fn re_unit() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)([0-9])(billion|million|trillion)").unwrap())
}

fn re_camel() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"([a-z])([A-Z])").unwrap())
}

fn re_stars() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\*{2,}").unwrap())
}

/// Clean scraped or generated text for display. Never fails.
///
/// Rules, in order:
/// 1. `5billion` -> `5 billion` (also million/trillion, any case)
/// 2. `rateCut` -> `rate Cut` (ASCII lower/upper boundary)
/// 3. runs of two or more `*` collapse to `**`
/// 4. trim
pub fn clean_text(text: &str) -> String {
    let out = re_unit().replace_all(text, "$1 $2");
    let out = re_camel().replace_all(&out, "$1 $2");
    let out = re_stars().replace_all(&out, "**");
    out.trim().to_string()
}
