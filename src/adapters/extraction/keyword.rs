//! Keyword-based field extractor.
//!
//! A deterministic extractor for deployments without an extraction service.
//! It reads the latest lead message and, when that message is a bare
//! confirmation ("así es", "correcto"), resolves it against the context
//! message the lead is answering. Context counts whether or not it was
//! phrased as a question.

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::domain::conversation::{
    machinery_mentions, normalize, words, FieldName, Message, SenderRole, HELP_MACHINERY,
    HELP_OTHER,
};
use crate::ports::{ExtractionError, FieldExtractor};

/// Short replies that confirm whatever the context message proposed.
static AFFIRMATIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "si", "asi es", "correcto", "exacto", "claro", "efectivamente", "eso es", "afirmativo",
        "si claro", "claro que si", "si por favor", "ok", "va",
    ]
});

static NEGATIONS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["no", "no gracias", "por ahora no", "todavia no", "aun no"]);

/// Answers to the help question that route the lead into the machinery flow.
static MACHINERY_HELP_WORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec!["maquinaria", "maquinarias", "maquina", "maquinas", "equipo", "equipos", "renta", "rentar"]
});

const NAME_QUESTION: &[&str] = &["con quien tengo el gusto", "tu nombre", "como te llamas"];

const HELP_QUESTION: &[&str] = &["en que te puedo ayudar", "buscas maquinaria o algo mas"];

#[derive(Debug, Clone, Default)]
pub struct KeywordFieldExtractor;

impl KeywordFieldExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_from(&self, text: &str, context: Option<&str>) -> HashMap<String, String> {
        let mut found = HashMap::new();
        let normalized = normalize(text);
        let context = context.map(normalize).unwrap_or_default();
        let reply = Reply::classify(&normalized);

        if let Some(machinery) = machinery_mentions(&normalized).first() {
            found.insert(FieldName::TipoMaquinaria.to_string(), machinery.to_string());
        } else if reply == Reply::Affirmative {
            // A confirmation only settles the type when the context proposed exactly one.
            if let [machinery] = machinery_mentions(&context).as_slice() {
                found.insert(FieldName::TipoMaquinaria.to_string(), machinery.to_string());
            }
        }

        if context.contains("cotizacion") {
            match reply {
                Reply::Affirmative => {
                    found.insert(FieldName::QuiereCotizacion.to_string(), "sí".to_string());
                }
                Reply::Negative => {
                    found.insert(FieldName::QuiereCotizacion.to_string(), "no".to_string());
                }
                Reply::Other => {}
            }
        }

        if let Some(name) = find_introduction(text) {
            found.insert(FieldName::Nombre.to_string(), name);
        } else if reply == Reply::Other && asks_for(&context, NAME_QUESTION) {
            if let Some(name) = bare_name(text) {
                found.insert(FieldName::Nombre.to_string(), name);
            }
        }

        if reply == Reply::Other && context.contains("apellido") {
            if let Some(surname) = bare_name(text) {
                found.insert(FieldName::Apellido.to_string(), surname);
            }
        }

        if asks_for(&context, HELP_QUESTION) {
            if let Some(help) = help_answer(&normalized) {
                found.insert(FieldName::TipoAyuda.to_string(), help.to_string());
            }
        }

        for raw in text.split_whitespace() {
            let token = raw.trim_matches(|c: char| {
                matches!(c, ',' | ';' | '(' | ')' | '<' | '>') || c == '.' && !raw.contains('@')
            });
            let token = token.trim_end_matches('.');
            if is_email(token) {
                found.insert(FieldName::Correo.to_string(), token.to_lowercase());
            } else if let Some(phone) = as_phone(token) {
                found.insert(FieldName::Telefono.to_string(), phone);
            }
        }

        found
    }
}

#[async_trait]
impl FieldExtractor for KeywordFieldExtractor {
    async fn extract(
        &self,
        history: &[Message],
        context: Option<&Message>,
    ) -> Result<HashMap<String, String>, ExtractionError> {
        let Some(latest) = history.iter().rev().find(|m| m.is_from(SenderRole::Lead)) else {
            return Ok(HashMap::new());
        };
        Ok(self.extract_from(&latest.text, context.map(|m| m.text.as_str())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Affirmative,
    Negative,
    Other,
}

impl Reply {
    fn classify(normalized: &str) -> Self {
        let bare: String = words(normalized).collect::<Vec<_>>().join(" ");
        if AFFIRMATIONS.iter().any(|a| bare == *a || bare.starts_with(&format!("{} ", a))) {
            Reply::Affirmative
        } else if NEGATIONS.iter().any(|n| bare == *n || bare.starts_with(&format!("{} ", n))) {
            Reply::Negative
        } else {
            Reply::Other
        }
    }
}

/// Classifies an answer to "¿Buscas maquinaria o algo más?".
fn help_answer(normalized: &str) -> Option<&'static str> {
    let tokens: Vec<&str> = words(normalized).collect();
    let joined = tokens.join(" ");
    let other = tokens
        .iter()
        .any(|w| matches!(*w, "otro" | "otra" | "otros" | "otras"));
    if other || joined.contains("algo mas") {
        Some(HELP_OTHER)
    } else if tokens.iter().any(|w| MACHINERY_HELP_WORDS.contains(w)) {
        Some(HELP_MACHINERY)
    } else {
        None
    }
}

fn asks_for(context: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| context.contains(p))
}

/// "Me llamo Ana", "Mi nombre es Ana López", "Soy Ana".
fn find_introduction(text: &str) -> Option<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let lowered: Vec<String> = tokens
        .iter()
        .map(|t| normalize(t.trim_matches(|c: char| !c.is_alphanumeric())))
        .collect();

    let start = (0..tokens.len()).find_map(|i| {
        let rest = &lowered[i..];
        if rest.starts_with(&["me".to_string(), "llamo".to_string()]) {
            Some(i + 2)
        } else if rest.starts_with(&["mi".to_string(), "nombre".to_string(), "es".to_string()]) {
            Some(i + 3)
        } else if rest.first().map(String::as_str) == Some("soy")
            && tokens
                .get(i + 1)
                .and_then(|t| t.chars().next())
                .map(char::is_uppercase)
                .unwrap_or(false)
        {
            Some(i + 1)
        } else {
            None
        }
    })?;

    let mut name = Vec::new();
    for token in tokens.iter().skip(start).take(3) {
        let word = token.trim_matches(|c: char| !c.is_alphabetic());
        if word.is_empty() || !word.chars().all(char::is_alphabetic) {
            break;
        }
        name.push(word);
        if token.ends_with(|c: char| matches!(c, ',' | '.' | '!' | '?')) {
            break;
        }
    }
    (!name.is_empty()).then(|| name.join(" "))
}

/// Accepts a reply made only of one to three alphabetic words.
fn bare_name(text: &str) -> Option<String> {
    let parts: Vec<&str> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphabetic()))
        .filter(|w| !w.is_empty())
        .collect();
    let plausible = (1..=3).contains(&parts.len())
        && parts.iter().all(|w| w.chars().all(char::is_alphabetic));
    plausible.then(|| parts.join(" "))
}

fn is_email(token: &str) -> bool {
    match token.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    }
}

fn as_phone(token: &str) -> Option<String> {
    let digits: String = token.chars().filter(char::is_ascii_digit).collect();
    let only_phone_chars = token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')'));
    (only_phone_chars && (10..=13).contains(&digits.len())).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn extract(text: &str, context: Option<&str>) -> HashMap<String, String> {
        KeywordFieldExtractor::new().extract_from(text, context)
    }

    #[test]
    fn direct_machinery_mention_is_extracted() {
        let found = extract("Necesito un Rompedor eléctrico", None);
        assert_eq!(found.get("tipo_maquinaria").map(String::as_str), Some("rompedores"));
    }

    #[test]
    fn unknown_machinery_is_not_guessed() {
        let found = extract("me interesa una excavadora", None);
        assert!(found.get("tipo_maquinaria").is_none());
    }

    #[test]
    fn confirmation_resolves_against_declarative_context() {
        let found = extract("Así es", Some("Supongo que necesitas un rompedor"));
        assert_eq!(found.get("tipo_maquinaria").map(String::as_str), Some("rompedores"));
    }

    #[test]
    fn confirmation_of_a_catalogue_listing_fills_nothing() {
        let listing = "¿Qué tipo de maquinaria necesitas? Manejamos soldadoras, compresores, \
                       torres de iluminación, plataformas LGMG, generadores y rompedores.";
        let found = extract("Sí", Some(listing));
        assert!(found.get("tipo_maquinaria").is_none());
    }

    #[test]
    fn confirmation_between_two_options_fills_nothing() {
        let found = extract("Así es", Some("¿Un compresor o un generador?"));
        assert!(found.get("tipo_maquinaria").is_none());
    }

    #[test]
    fn help_question_answers_set_help_type() {
        let question = Some("¿En qué te puedo ayudar? ¿Buscas maquinaria o algo más?");

        for answer in ["Maquinaria", "Busco maquinaria", "quiero rentar un equipo"] {
            let found = extract(answer, question);
            assert_eq!(found.get("tipo_ayuda").map(String::as_str), Some("maquinaria"), "{}", answer);
        }
        for answer in ["Otra cosa", "algo más"] {
            let found = extract(answer, question);
            assert_eq!(found.get("tipo_ayuda").map(String::as_str), Some("otro"), "{}", answer);
        }
    }

    #[test]
    fn help_words_outside_the_help_question_are_ignored() {
        let found = extract("Maquinaria", Some("¿Me das más detalles del equipo que necesitas?"));
        assert!(found.get("tipo_ayuda").is_none());
    }

    #[test]
    fn confirmation_without_context_yields_nothing() {
        assert!(extract("Correcto", None).is_empty());
    }

    #[test]
    fn quote_answers_follow_the_question() {
        let yes = extract("Sí, por favor", Some("¿Te gustaría recibir una cotización?"));
        assert_eq!(yes.get("quiere_cotizacion").map(String::as_str), Some("sí"));

        let no = extract("No gracias", Some("¿Te gustaría recibir una cotización?"));
        assert_eq!(no.get("quiere_cotizacion").map(String::as_str), Some("no"));
    }

    #[test]
    fn introductions_yield_names() {
        let found = extract("Hola, me llamo Ana López.", None);
        assert_eq!(found.get("nombre").map(String::as_str), Some("Ana López"));

        let found = extract("Soy Beto", None);
        assert_eq!(found.get("nombre").map(String::as_str), Some("Beto"));

        assert!(extract("soy de Puebla", None).get("nombre").is_none());
    }

    #[test]
    fn bare_answer_to_name_question_is_a_name() {
        let found = extract("Ana", Some("¡Hola! ¿Con quién tengo el gusto?"));
        assert_eq!(found.get("nombre").map(String::as_str), Some("Ana"));
    }

    #[test]
    fn email_and_phone_are_detected() {
        let found = extract("Mi correo es ana@sur.mx y mi cel 55-1234-5678", None);
        assert_eq!(found.get("correo").map(String::as_str), Some("ana@sur.mx"));
        assert_eq!(found.get("telefono").map(String::as_str), Some("5512345678"));
    }

    #[tokio::test]
    async fn reads_latest_lead_message_from_history() {
        let history = vec![
            Message::from_lead("Hola", Timestamp::now()),
            Message::from_agent("Supongo que necesitas un rompedor", Timestamp::now()),
            Message::from_lead("Así es", Timestamp::now()),
        ];

        let found = KeywordFieldExtractor::new()
            .extract(&history, Some(&history[1]))
            .await
            .unwrap();

        assert_eq!(found.get("tipo_maquinaria").map(String::as_str), Some("rompedores"));
    }
}
