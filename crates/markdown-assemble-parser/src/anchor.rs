/// Build a URL fragment from heading text: lowercase alphanumerics with single
/// dashes between words. Accented Latin letters fold to their base letter so
/// Dutch headings such as "Één overzicht" give ASCII ids.
pub fn generate_anchor(text: &str) -> String {
    let mut anchor = String::new();
    let mut last_was_dash = false;

    for ch in text.chars().flat_map(|c| c.to_lowercase()) {
        if let Some(folded) = fold(ch) {
            anchor.push_str(folded);
            last_was_dash = false;
        } else if ch.is_alphanumeric() {
            anchor.push(ch);
            last_was_dash = false;
        } else if (ch.is_whitespace() || ch == '-' || ch == '/')
            && !anchor.is_empty()
            && !last_was_dash
        {
            anchor.push('-');
            last_was_dash = true;
        }
    }

    if anchor.ends_with('-') {
        anchor.pop();
    }

    anchor
}

fn fold(ch: char) -> Option<&'static str> {
    let base = match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => "a",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => "o",
        'ú' | 'ù' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'ç' => "c",
        'ñ' => "n",
        'ĳ' => "ij",
        'ß' => "ss",
        _ => return None,
    };
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_punctuation_and_spaces() {
        assert_eq!(generate_anchor("1. Scope & Goals -- Draft"), "1-scope-goals-draft");
        assert_eq!(generate_anchor("In/out"), "in-out");
        assert_eq!(generate_anchor("!!!"), "");
    }

    #[test]
    fn folds_accented_letters() {
        assert_eq!(generate_anchor("Bijlage: Één overzicht"), "bijlage-een-overzicht");
        assert_eq!(generate_anchor("  Überblick  "), "uberblick");
        assert_eq!(generate_anchor("Coördinatie en ĳking"), "coordinatie-en-ijking");
        assert_eq!(generate_anchor("Straße"), "strasse");
    }
}
