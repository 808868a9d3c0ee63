// tests/text_clean.rs
use treasury_lens::clean_text;

#[test]
fn unit_words_are_separated_from_numbers() {
    let out = clean_text("5billion USD");
    assert!(out.contains("5 billion"), "got {out}");
    assert_eq!(clean_text("Reserves fell 12Million"), "Reserves fell 12 Million");
}

#[test]
fn emphasis_has_one_pair_per_boundary() {
    let out = clean_text("****bold****");
    assert_eq!(out, "**bold**");
    assert_eq!(out.matches("**").count(), 2);
}

#[test]
fn model_bullet_is_display_ready() {
    let raw = "  ***Yen slides*** BOJ holds while theFed stays hawkish \n";
    let out = clean_text(raw);
    assert_eq!(out, "**Yen slides** BOJ holds while the Fed stays hawkish");
}

#[test]
fn cleaning_is_idempotent_on_samples() {
    for s in [
        "5billion USD",
        "****bold****",
        "ratesRise",
        "EUR/USD steady",
        "",
    ] {
        let once = clean_text(s);
        assert_eq!(clean_text(&once), once, "not idempotent for {s:?}");
    }
}
