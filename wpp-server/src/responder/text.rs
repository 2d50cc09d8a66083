//! Text folding for literal trigger matching

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// NFD-decompose, drop combining marks, lowercase
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_case() {
        assert_eq!(fold("Cardápio AÇAÍ"), "cardapio acai");
        assert_eq!(fold("Horário"), "horario");
    }

    #[test]
    fn folded_text_contains_folded_needle() {
        assert!(fold("Qual o HORÁRIO de vocês?").contains(&fold("horario")));
        assert!(!fold("endereço").contains(&fold("horário")));
    }
}
