//! Short title derivation from raw model output.
//!
//! [`derive_title`] is a heuristic with a strict fallback chain, first match
//! wins:
//!
//! 1. a `Title:` / `Titre :` line, optionally numbered, emphasized, under a
//!    markdown heading, or qualified (`1. Title of the document: …`).
//!    List bullets (`- `, `* `, `> `) never start a title line;
//! 2. the first two non-empty lines joined by a space;
//! 3. the fallback seed (the document's file name).

use std::sync::OnceLock;

use regex::Regex;

fn title_line() -> &'static Regex {
    static TITLE_LINE: OnceLock<Regex> = OnceLock::new();
    TITLE_LINE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:#{1,6}\s*)?(?:\d+\s*[.)\-:]\s*)?[*_]*(?:title|titre)\b[^:\n]*:\s*(.*)$")
            .expect("title pattern is valid")
    })
}

fn clean(fragment: &str) -> &str {
    fragment.trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_' | '"' | '«' | '»'))
}

/// Derives a short human title. Never fails; returns `fallback_seed` when
/// `raw_output` has no usable text.
pub fn derive_title(raw_output: &str, fallback_seed: &str) -> String {
    for line in raw_output.lines() {
        if let Some(caps) = title_line().captures(line) {
            let title = caps.get(1).map(|m| clean(m.as_str())).unwrap_or_default();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }

    let head: Vec<&str> = raw_output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(2)
        .collect();
    if !head.is_empty() {
        return head.join(" ");
    }

    fallback_seed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_french_title_line_with_spaced_colon() {
        assert_eq!(
            derive_title("Titre : Foo Bar\nRésumé :\n- x", "doc.pdf"),
            "Foo Bar"
        );
    }

    #[test]
    fn test_numbered_and_qualified_title_line() {
        let raw = "Voici la réponse.\n1. Title of the document:   Quarterly Report  \n2. Summary: ...";
        assert_eq!(derive_title(raw, "doc.pdf"), "Quarterly Report");
    }

    #[test]
    fn test_markdown_bold_title_line() {
        assert_eq!(
            derive_title("**Titre :** Plan de continuité\n\nRésumé : ...", "doc.pdf"),
            "Plan de continuité"
        );
    }

    #[test]
    fn test_case_insensitive_match() {
        assert_eq!(derive_title("TITLE: Loud", "seed"), "Loud");
    }

    #[test]
    fn test_word_starting_with_title_is_not_a_title_line() {
        assert_eq!(
            derive_title("Titleist: golf\nSecond line", "seed"),
            "Titleist: golf Second line"
        );
    }

    #[test]
    fn test_empty_title_value_falls_through() {
        assert_eq!(derive_title("Titre :\nHello\nWorld", "seed"), "Titre : Hello");
    }

    #[test]
    fn test_first_two_non_empty_lines() {
        assert_eq!(derive_title("Hello\nWorld", "doc.pdf"), "Hello World");
        assert_eq!(
            derive_title("\n\n  Hello  \n\n World \nThird", "doc.pdf"),
            "Hello World"
        );
    }

    #[test]
    fn test_single_line_output() {
        assert_eq!(derive_title("Only line", "doc.pdf"), "Only line");
    }

    #[test]
    fn test_bullet_starting_with_titre_is_not_a_title_line() {
        let raw = "Résumé : Vente d'un appartement.\nPoints clés :\n- Titre de propriété : transféré à l'acheteur\n- Prix : 250 000 €";
        assert_eq!(
            derive_title(raw, "acte.pdf"),
            "Résumé : Vente d'un appartement. Points clés :"
        );
    }

    #[test]
    fn test_star_and_quote_bullets_are_not_title_lines() {
        assert_eq!(
            derive_title("* Title: nope\n> Titre : non plus", "seed"),
            "* Title: nope > Titre : non plus"
        );
    }

    #[test]
    fn test_heading_title_line() {
        assert_eq!(derive_title("## Titre : Bilan annuel\nRésumé : ...", "seed"), "Bilan annuel");
    }

    #[test]
    fn test_empty_output_uses_seed() {
        assert_eq!(derive_title("", "doc.pdf"), "doc.pdf");
        assert_eq!(derive_title("  \n\t\n", "doc.pdf"), "doc.pdf");
    }
}
