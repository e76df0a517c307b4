//! Spanish text helpers shared by extraction and replies.
//!
//! Matching runs on accent-free lowercase words so "Compresoras" and
//! "compresoras" hit the same keywords.

use once_cell::sync::Lazy;

use super::fields::MachineryType;

/// Keywords per machinery type, written accent-free and lowercase.
static MACHINERY_KEYWORDS: Lazy<Vec<(MachineryType, &'static [&'static str])>> = Lazy::new(|| {
    vec![
        (MachineryType::Soldadoras, &["soldadora", "soldadoras", "soldar", "soldadura"][..]),
        (MachineryType::Compresor, &["compresor", "compresores", "compresora"][..]),
        (
            MachineryType::TorreIluminacion,
            &["torre de iluminacion", "torres de iluminacion", "torre de luz", "luminaria"][..],
        ),
        (
            MachineryType::Lgmg,
            &["lgmg", "plataforma", "plataformas", "elevador", "elevadores", "tijera"][..],
        ),
        (MachineryType::Generadores, &["generador", "generadores", "planta de luz"][..]),
        (MachineryType::Rompedores, &["rompedor", "rompedores", "martillo", "martillos"][..]),
    ]
});

/// Lowercases and strips Spanish diacritics.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

/// Alphanumeric words of `text`, punctuation dropped.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

/// Every machinery type mentioned in already-normalised text, in catalogue order.
pub fn machinery_mentions(normalized: &str) -> Vec<MachineryType> {
    let tokens: Vec<&str> = words(normalized).collect();
    let joined = format!(" {} ", tokens.join(" "));
    MACHINERY_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| joined.contains(&format!(" {} ", k))))
        .map(|(machinery, _)| *machinery)
        .collect()
}
