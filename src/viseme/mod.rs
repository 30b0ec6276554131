//! Phoneme to viseme classification for lip-sync animation.
//!
//! A viseme is a visual mouth shape shared by one or more phonemes. Pose
//! rules in [`crate::blendshape`] are keyed by viseme class, never by the
//! phoneme itself, so the grouping below is a fixed contract.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Viseme classes. The discriminant is the class index (0–26).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Viseme {
    /// Silence / neutral resting face.
    Sil = 0,
    /// /ɑ/ as in "father"
    Aa = 1,
    /// /æ/ as in "cat"
    Ae = 2,
    /// /ʌ/ as in "cut"
    Ah = 3,
    /// /ɔ/ as in "thought"
    Ao = 4,
    /// /aʊ/ as in "cow"
    Aw = 5,
    /// /aɪ/ as in "hide"
    Ay = 6,
    /// /ɛ/ as in "bed"
    Eh = 7,
    /// /ɝ/ as in "bird"
    Er = 8,
    /// /eɪ/ as in "say"
    Ey = 9,
    /// /ɪ/ as in "sit"
    Ih = 10,
    /// /i/ as in "see", also /j/
    Iy = 11,
    /// /oʊ/ as in "go"
    Ow = 12,
    /// /ɔɪ/ as in "boy"
    Oy = 13,
    /// /ʊ/ as in "book"
    Uh = 14,
    /// /u/ as in "too", also /w/
    Uw = 15,
    /// /p/, /b/, /m/ (lips pressed together)
    Bilabial = 16,
    /// /tʃ/, /dʒ/, /ʃ/, /ʒ/ (lips funnelled)
    Palatal = 17,
    /// /t/, /d/, /n/ (tongue at the ridge)
    Alveolar = 18,
    /// /ð/ (tongue between teeth)
    Dental = 19,
    /// /f/, /v/ (teeth on lower lip)
    Labiodental = 20,
    /// /k/, /g/, /ŋ/ (back of tongue up)
    Velar = 21,
    /// /h/
    Glottal = 22,
    /// /l/
    Lateral = 23,
    /// /r/
    Rhotic = 24,
    /// /s/, /z/
    Sibilant = 25,
    /// /θ/
    DentalFricative = 26,
}

impl Viseme {
    /// Every viseme class in index order.
    pub const ALL: [Viseme; 27] = [
        Viseme::Sil,
        Viseme::Aa,
        Viseme::Ae,
        Viseme::Ah,
        Viseme::Ao,
        Viseme::Aw,
        Viseme::Ay,
        Viseme::Eh,
        Viseme::Er,
        Viseme::Ey,
        Viseme::Ih,
        Viseme::Iy,
        Viseme::Ow,
        Viseme::Oy,
        Viseme::Uh,
        Viseme::Uw,
        Viseme::Bilabial,
        Viseme::Palatal,
        Viseme::Alveolar,
        Viseme::Dental,
        Viseme::Labiodental,
        Viseme::Velar,
        Viseme::Glottal,
        Viseme::Lateral,
        Viseme::Rhotic,
        Viseme::Sibilant,
        Viseme::DentalFricative,
    ];

    /// Class index in `0..=26`.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Look up a class by index. Returns `None` outside `0..=26`.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Whether this is the silence / neutral class.
    pub fn is_silence(self) -> bool {
        self == Viseme::Sil
    }
}

/// ARPABET phoneme symbol to viseme class, upper-cased.
pub const PHONEME_TABLE: &[(&str, Viseme)] = &[
    // Silence
    ("SIL", Viseme::Sil),
    ("PAU", Viseme::Sil),
    // Vowels
    ("AA", Viseme::Aa),
    ("AE", Viseme::Ae),
    ("AH", Viseme::Ah),
    ("AO", Viseme::Ao),
    ("AW", Viseme::Aw),
    ("AY", Viseme::Ay),
    ("EH", Viseme::Eh),
    ("ER", Viseme::Er),
    ("EY", Viseme::Ey),
    ("IH", Viseme::Ih),
    ("IY", Viseme::Iy),
    ("OW", Viseme::Ow),
    ("OY", Viseme::Oy),
    ("UH", Viseme::Uh),
    ("UW", Viseme::Uw),
    // Glides share the nearest vowel shape
    ("Y", Viseme::Iy),
    ("W", Viseme::Uw),
    // Bilabial
    ("B", Viseme::Bilabial),
    ("M", Viseme::Bilabial),
    ("P", Viseme::Bilabial),
    // Palatal
    ("CH", Viseme::Palatal),
    ("JH", Viseme::Palatal),
    ("SH", Viseme::Palatal),
    ("ZH", Viseme::Palatal),
    // Alveolar
    ("D", Viseme::Alveolar),
    ("N", Viseme::Alveolar),
    ("T", Viseme::Alveolar),
    // Dental
    ("DH", Viseme::Dental),
    ("TH", Viseme::DentalFricative),
    // Labiodental
    ("F", Viseme::Labiodental),
    ("V", Viseme::Labiodental),
    // Velar
    ("G", Viseme::Velar),
    ("K", Viseme::Velar),
    ("NG", Viseme::Velar),
    // Remaining consonants
    ("HH", Viseme::Glottal),
    ("L", Viseme::Lateral),
    ("R", Viseme::Rhotic),
    ("S", Viseme::Sibilant),
    ("Z", Viseme::Sibilant),
];

static PHONEME_INDEX: LazyLock<HashMap<&'static str, Viseme>> =
    LazyLock::new(|| PHONEME_TABLE.iter().copied().collect());

/// Classify a phoneme symbol into its viseme class.
///
/// Matching is case-insensitive and ignores trailing ARPABET stress markers
/// (`AA1` is `AA`). Unknown symbols map to [`Viseme::Sil`].
pub fn classify(phoneme: &str) -> Viseme {
    let bare = phoneme.trim().trim_end_matches(['0', '1', '2']);
    if bare.is_empty() {
        return Viseme::Sil;
    }
    let key = bare.to_ascii_uppercase();
    PHONEME_INDEX
        .get(key.as_str())
        .copied()
        .unwrap_or(Viseme::Sil)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn vowel_groups() {
        assert_eq!(classify("AA"), Viseme::Aa);
        assert_eq!(classify("AE"), Viseme::Ae);
        assert_eq!(classify("AH"), Viseme::Ah);
        assert_eq!(classify("AE").index(), 2);
        assert_eq!(classify("AH").index(), 3);
        assert_eq!(classify("AO"), Viseme::Ao);
        assert_eq!(classify("OW"), Viseme::Ow);
        assert_eq!(classify("AW"), Viseme::Aw);
        assert_eq!(classify("AY"), Viseme::Ay);
        assert_eq!(classify("EH"), Viseme::Eh);
        assert_eq!(classify("EY"), Viseme::Ey);
        assert_eq!(classify("Y"), Viseme::Iy);
        assert_eq!(classify("W"), Viseme::Uw);
    }

    #[test]
    fn consonant_groups() {
        for p in ["B", "M", "P"] {
            assert_eq!(classify(p), Viseme::Bilabial);
        }
        for p in ["CH", "JH", "SH", "ZH"] {
            assert_eq!(classify(p), Viseme::Palatal);
        }
        for p in ["D", "N", "T"] {
            assert_eq!(classify(p), Viseme::Alveolar);
        }
        for p in ["G", "K", "NG"] {
            assert_eq!(classify(p), Viseme::Velar);
        }
        assert_eq!(classify("F"), Viseme::Labiodental);
        assert_eq!(classify("V"), Viseme::Labiodental);
        assert_eq!(classify("DH"), Viseme::Dental);
        assert_eq!(classify("TH"), Viseme::DentalFricative);
        assert_eq!(classify("L"), Viseme::Lateral);
        assert_eq!(classify("R"), Viseme::Rhotic);
        assert_eq!(classify("S"), Viseme::Sibilant);
        assert_eq!(classify("Z"), Viseme::Sibilant);
        assert_eq!(classify("HH"), Viseme::Glottal);
    }

    #[test]
    fn class_indices_match_table() {
        assert_eq!(classify("sil").index(), 0);
        assert_eq!(classify("pau").index(), 0);
        assert_eq!(classify("AA").index(), 1);
        assert_eq!(classify("UW").index(), 15);
        assert_eq!(classify("B").index(), 16);
        assert_eq!(classify("TH").index(), 26);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(classify("aa"), Viseme::Aa);
        assert_eq!(classify("Sh"), Viseme::Palatal);
        assert_eq!(classify("SIL"), Viseme::Sil);
    }

    #[test]
    fn stress_markers_are_ignored() {
        assert_eq!(classify("AA1"), Viseme::Aa);
        assert_eq!(classify("ow0"), Viseme::Ow);
        assert_eq!(classify("IY2"), Viseme::Iy);
    }

    #[test]
    fn unknown_symbols_are_silence() {
        assert_eq!(classify(""), Viseme::Sil);
        assert_eq!(classify("XX"), Viseme::Sil);
        assert_eq!(classify("  "), Viseme::Sil);
        assert_eq!(classify("ʃ"), Viseme::Sil);
    }

    #[test]
    fn every_table_entry_round_trips() {
        for (symbol, viseme) in PHONEME_TABLE {
            assert_eq!(classify(symbol), *viseme, "symbol {symbol}");
            assert_eq!(classify(&symbol.to_ascii_lowercase()), *viseme);
        }
    }

    #[test]
    fn from_index_covers_all_classes() {
        for (i, v) in Viseme::ALL.iter().enumerate() {
            assert_eq!(Viseme::from_index(i as u8), Some(*v));
            assert_eq!(v.index() as usize, i);
        }
        assert_eq!(Viseme::from_index(27), None);
        assert!(Viseme::Sil.is_silence());
        assert!(!Viseme::Aa.is_silence());
    }
}
