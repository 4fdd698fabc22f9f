//! Arabic alphabet, diacritic stripping and letter-position matching

use crate::error::HarfError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

/// The selectable letters, in alphabet order.
pub const ALPHABET: [char; 28] = [
    'ا', 'ب', 'ت', 'ث', 'ج', 'ح', 'خ', 'د', 'ذ', 'ر', 'ز', 'س', 'ش', 'ص',
    'ض', 'ط', 'ظ', 'ع', 'غ', 'ف', 'ق', 'ك', 'ل', 'م', 'ن', 'ه', 'و', 'ي',
];

/// Combining marks and Quranic annotation signs.
pub fn is_diacritic(c: char) -> bool {
    matches!(c,
        '\u{064B}'..='\u{065F}'
        | '\u{0670}'
        | '\u{0610}'..='\u{061A}'
        | '\u{06D6}'..='\u{06ED}')
}

/// Canonically decompose `text`, then drop every diacritic.
///
/// Hamza and madda carriers (أ إ آ ؤ ئ) decompose into their base letter plus
/// a mark, so they strip down to ا, و and ي.
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_diacritic(*c)).collect()
}

pub fn base_letters(word: &str) -> Vec<char> {
    strip_diacritics(word).chars().collect()
}

/// A single letter of [`ALPHABET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Letter(char);

impl Letter {
    pub fn new(c: char) -> Option<Self> {
        ALPHABET.contains(&c).then_some(Letter(c))
    }

    pub fn as_char(self) -> char {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Letter> {
        ALPHABET.into_iter().map(Letter)
    }
}

impl FromStr for Letter {
    type Err = HarfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Letter::new(c).ok_or_else(|| {
                HarfError::InvalidQuery(format!("'{}' is not a letter of the alphabet", c))
            }),
            (None, _) => Err(HarfError::InvalidQuery("letter must not be empty".to_string())),
            _ => Err(HarfError::InvalidQuery(format!(
                "letter must be a single character, got '{}'",
                s.trim()
            ))),
        }
    }
}

impl TryFrom<String> for Letter {
    type Error = HarfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where within a word's base letters the target letter must occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    First,
    Middle,
    Last,
}

impl Position {
    /// Test an already-stripped word.
    ///
    /// `Middle` looks strictly between the first and last letters, so a base
    /// of two letters or fewer never matches it.
    pub fn matches_base(&self, base: &[char], letter: Letter) -> bool {
        let target = letter.as_char();
        match self {
            Position::First => base.first() == Some(&target),
            Position::Last => base.last() == Some(&target),
            Position::Middle => base.len() > 2 && base[1..base.len() - 1].contains(&target),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::First => "first",
            Position::Middle => "middle",
            Position::Last => "last",
        }
    }
}

impl FromStr for Position {
    type Err = HarfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "first" => Ok(Position::First),
            "middle" => Ok(Position::Middle),
            "last" => Ok(Position::Last),
            other => Err(HarfError::InvalidQuery(format!(
                "position must be one of first, middle, last; got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Does `letter` occur at `position` in `word`, ignoring diacritics?
pub fn matches(word: &str, letter: Letter, position: Position) -> bool {
    position.matches_base(&base_letters(word), letter)
}

/// Indices of the already-stripped `words` that match.
pub fn matching_base_indices(words: &[Vec<char>], letter: Letter, position: Position) -> Vec<u32> {
    words
        .iter()
        .enumerate()
        .filter(|(_, base)| position.matches_base(base, letter))
        .map(|(i, _)| i as u32)
        .collect()
}

/// Indices of the whitespace-separated words of `text` that match.
pub fn matching_word_indices(text: &str, letter: Letter, position: Position) -> Vec<u32> {
    let words: Vec<Vec<char>> = text.split_whitespace().map(base_letters).collect();
    matching_base_indices(&words, letter, position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn letter(c: char) -> Letter {
        Letter::new(c).unwrap()
    }

    #[test]
    fn test_strip_diacritics() {
        assert_eq!(strip_diacritics("بِسْمِ"), "بسم");
        assert_eq!(strip_diacritics("مِنَ"), "من");
        // Superscript alif and small high signs
        assert_eq!(strip_diacritics("إِلَٰهِ"), "اله");
        assert_eq!(strip_diacritics("لَّهُۥ"), "له");
    }

    #[test]
    fn test_hamza_carriers_decompose() {
        assert_eq!(strip_diacritics("أَحَدٌ"), "احد");
        assert_eq!(strip_diacritics("آمَنُوا"), "امنوا");
        assert_eq!(strip_diacritics("ؤ"), "و");
        assert_eq!(strip_diacritics("ئ"), "ي");
    }

    #[test]
    fn test_non_decomposing_letters_kept() {
        assert_eq!(strip_diacritics("ٱلَّذِى"), "ٱلذى");
        assert_eq!(strip_diacritics("ٱلْجِنَّةِ"), "ٱلجنة");
    }

    #[test]
    fn test_first() {
        assert!(matches("بِسْمِ", letter('ب'), Position::First));
        assert!(!matches("بِسْمِ", letter('س'), Position::First));
        assert!(matches("أَحَدٌ", letter('ا'), Position::First));
    }

    #[test]
    fn test_last() {
        assert!(matches("بِسْمِ", letter('م'), Position::Last));
        assert!(matches("أَحَدٌۢ", letter('د'), Position::Last));
        assert!(!matches("بِسْمِ", letter('ب'), Position::Last));
    }

    #[test]
    fn test_middle() {
        assert!(matches("بِسْمِ", letter('س'), Position::Middle));
        assert!(!matches("بِسْمِ", letter('ب'), Position::Middle));
        assert!(!matches("بِسْمِ", letter('م'), Position::Middle));
        assert!(matches("ٱلْوَسْوَاسِ", letter('و'), Position::Middle));
    }

    #[test]
    fn test_short_words_never_match_middle() {
        for l in Letter::all() {
            assert!(!matches("مِنَ", l, Position::Middle));
            assert!(!matches("فِى", l, Position::Middle));
            assert!(!matches("ب", l, Position::Middle));
        }
    }

    #[test]
    fn test_empty_word() {
        for p in [Position::First, Position::Middle, Position::Last] {
            assert!(!matches("", letter('ا'), p));
            assert!(!matches("\u{064E}\u{0651}", letter('ا'), p));
        }
    }

    #[test]
    fn test_parse_letter() {
        assert_eq!("ب".parse::<Letter>().unwrap(), letter('ب'));
        assert_eq!(" م ".parse::<Letter>().unwrap(), letter('م'));
        assert!("".parse::<Letter>().is_err());
        assert!("بب".parse::<Letter>().is_err());
        assert!("x".parse::<Letter>().is_err());
        assert!("ٱ".parse::<Letter>().is_err());
        assert!("بَ".parse::<Letter>().is_err());
    }

    #[test]
    fn test_parse_position() {
        assert_eq!("first".parse::<Position>().unwrap(), Position::First);
        assert_eq!("middle".parse::<Position>().unwrap(), Position::Middle);
        assert_eq!("last".parse::<Position>().unwrap(), Position::Last);
        let err = "start".parse::<Position>().unwrap_err();
        assert!(err.is_validation());
        assert!("First".parse::<Position>().is_err());
    }

    #[test]
    fn test_matching_word_indices() {
        let text = "مِن شَرِّ ٱلْوَسْوَاسِ ٱلْخَنَّاسِ";
        assert_eq!(matching_word_indices(text, letter('س'), Position::Last), vec![2, 3]);
        assert_eq!(matching_word_indices(text, letter('م'), Position::First), vec![0]);
        assert!(matching_word_indices(text, letter('ق'), Position::First).is_empty());
    }

    #[test]
    fn test_matching_base_indices() {
        let words = vec![base_letters("قُلْ"), base_letters("أَعُوذُ"), base_letters("بِرَبِّ")];
        assert_eq!(matching_base_indices(&words, letter('ب'), Position::First), vec![2]);
        assert_eq!(matching_base_indices(&words, letter('ب'), Position::Last), vec![2]);
        assert_eq!(matching_base_indices(&words, letter('و'), Position::Middle), vec![1]);
        assert!(matching_base_indices(&[], letter('ب'), Position::First).is_empty());
    }

    #[test]
    fn test_letter_serde() {
        assert_eq!(serde_json::to_string(&letter('ن')).unwrap(), "\"ن\"");
        let parsed: Letter = serde_json::from_str("\"ن\"").unwrap();
        assert_eq!(parsed, letter('ن'));
        assert!(serde_json::from_str::<Letter>("\"z\"").is_err());
        assert_eq!(serde_json::to_string(&Position::Middle).unwrap(), "\"middle\"");
    }

    fn arabic_word() -> impl Strategy<Value = String> {
        let base = prop::sample::select(ALPHABET.to_vec());
        let mark = prop::sample::select(vec!['\u{064E}', '\u{064F}', '\u{0650}', '\u{0651}', '\u{0652}', '\u{0670}', '\u{06E5}']);
        prop::collection::vec((base, prop::option::of(mark)), 0..8).prop_map(|parts| {
            let mut word = String::new();
            for (c, m) in parts {
                word.push(c);
                if let Some(m) = m {
                    word.push(m);
                }
            }
            word
        })
    }

    fn any_position() -> impl Strategy<Value = Position> {
        prop::sample::select(vec![Position::First, Position::Middle, Position::Last])
    }

    proptest! {
        #[test]
        fn prop_diacritic_invariance(word in arabic_word(), c in prop::sample::select(ALPHABET.to_vec()), p in any_position()) {
            let l = letter(c);
            prop_assert_eq!(matches(&word, l, p), matches(&strip_diacritics(&word), l, p));
        }

        #[test]
        fn prop_first_is_first_base_letter(word in arabic_word(), c in prop::sample::select(ALPHABET.to_vec())) {
            let first = word.chars().find(|ch| !is_diacritic(*ch));
            prop_assert_eq!(matches(&word, letter(c), Position::First), first == Some(c));
        }

        #[test]
        fn prop_short_bases_never_middle(word in arabic_word(), c in prop::sample::select(ALPHABET.to_vec())) {
            prop_assume!(base_letters(&word).len() <= 2);
            prop_assert!(!matches(&word, letter(c), Position::Middle));
        }
    }
}
