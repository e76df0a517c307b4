//! Machinery inventory answers.
//!
//! Leads often ask what is available before answering the qualification
//! questions. Those questions get a short inventory answer ahead of the
//! scripted question.

use once_cell::sync::Lazy;

use crate::domain::conversation::{machinery_mentions, normalize, words, MachineryType};

/// How many models a single answer lists before summarising the rest.
const MAX_LISTED_MODELS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub model: &'static str,
    pub machinery: MachineryType,
    pub highlights: &'static str,
}

const fn item(
    model: &'static str,
    machinery: MachineryType,
    highlights: &'static str,
) -> InventoryItem {
    InventoryItem {
        model,
        machinery,
        highlights,
    }
}

static INVENTORY: Lazy<Vec<InventoryItem>> = Lazy::new(|| {
    use MachineryType::{Compresor, Lgmg};
    vec![
        item("LGMG AR60JE-2", Lgmg, "articulada, 20.12 m de trabajo, eléctrica"),
        item("LGMG AR60J-2", Lgmg, "articulada, 20.12 m de trabajo, combustión"),
        item("LGMG AR65J", Lgmg, "articulada, 21.58 m de trabajo, combustión"),
        item("LGMG AR65JE-LI", Lgmg, "articulada, 21.58 m de trabajo, eléctrica"),
        item("LGMG AR52J", Lgmg, "articulada, 17.70 m de trabajo, combustión"),
        item("LGMG A45JE-LI", Lgmg, "articulada, 16.09 m de trabajo, eléctrica"),
        item("LGMG A30JE", Lgmg, "articulada, 11 m de trabajo, eléctrica"),
        item("LGMG SS1230E", Lgmg, "tijera, 5.6 m de trabajo, eléctrica"),
        item("LGMG SS1932E", Lgmg, "tijera, 7.5 m de trabajo, eléctrica"),
        item("LGMG S2632E II", Lgmg, "tijera, 10 m de trabajo, eléctrica"),
        item("LGMG S3246E II", Lgmg, "tijera, 12 m de trabajo, eléctrica"),
        item("LGMG S4046E II", Lgmg, "tijera, 14 m de trabajo, eléctrica"),
        item("LGMG S4650EII", Lgmg, "tijera, 15.8 m de trabajo, eléctrica"),
        item("AIRMAN SAS75VD-E", Compresor, "eléctrico, 501.47 CFM, 100 PSI"),
        item("AIRMAN SAS55VD-E", Compresor, "eléctrico, 367.27 CFM, 100 PSI"),
        item("AIRMAN SAS37VD-E", Compresor, "eléctrico, 247.2 CFM, 100 PSI"),
        item("AIRMAN SAS75RD6E", Compresor, "eléctrico, 490.87 CFM, 100 PSI"),
        item("AIRMAN SAS55RD6E", Compresor, "eléctrico, 360.21 CFM, 100 PSI"),
        item("AIRMAN SAS37RD6E", Compresor, "eléctrico, 243.67 CFM, 100 PSI"),
        item("AIRMAN SAS22RD6E", Compresor, "eléctrico, 144.79 CFM, 100 PSI"),
        item("AIRMAN SAS15RD6E", Compresor, "eléctrico, 93.58 CFM, 100 PSI"),
        item("AIRMAN SAS8SD6C", Compresor, "eléctrico, 35.31 CFM, 135 PSI"),
        item("AIRMAN SAS4SD6C", Compresor, "eléctrico, 15.53 CFM, 120 PSI"),
        item("AIRMAN PDSF830S", Compresor, "portátil, 830 CFM, 150 PSI"),
        item("AIRMAN PDSG750VRS-4C5", Compresor, "portátil, 750-900 CFM, 200 PSI"),
        item("AIRMAN PDS750S-4B1", Compresor, "portátil, 750 CFM, 100 PSI"),
        item("AIRMAN PDS400S", Compresor, "portátil, 400 CFM, 100 PSI"),
        item("AIRMAN PDSF375S-DP", Compresor, "portátil, 375 CFM, 100/150 PSI"),
        item("AIRMAN PDS185S-6C2", Compresor, "portátil, 185 CFM, 100 PSI"),
    ]
});

/// Phrases that mark a message as asking about stock, models or prices.
const INVENTORY_CUES: &[&str] = &[
    "tienen", "manejan", "venden", "rentan", "modelos", "inventario", "disponibles", "catalogo",
    "precio", "precios", "cuesta", "cuestan", "costo", "entregan", "que tipos", "que maquinaria",
    "que equipos",
];

const PRICE_CUES: &[&str] = &["precio", "precios", "cuesta", "cuestan", "costo"];

/// True when the lead is asking about the inventory rather than answering.
pub fn is_inventory_question(text: &str) -> bool {
    let normalized = normalize(text);
    let joined = format!(" {} ", words(&normalized).collect::<Vec<_>>().join(" "));
    INVENTORY_CUES
        .iter()
        .any(|cue| joined.contains(&format!(" {} ", cue)))
}

/// Models on hand for one machinery type.
pub fn models_for(machinery: MachineryType) -> Vec<&'static InventoryItem> {
    INVENTORY.iter().filter(|i| i.machinery == machinery).collect()
}

/// Answers an inventory question with the models of each machinery type it
/// names, or with the catalogue when it names none.
pub fn inventory_answer(text: &str) -> String {
    let normalized = normalize(text);
    let mentioned = machinery_mentions(&normalized);

    let mut parts: Vec<String> = if mentioned.is_empty() {
        vec![format!("Manejamos {}.", catalogue_sentence())]
    } else {
        mentioned.into_iter().map(models_paragraph).collect()
    };

    if words(&normalized).any(|w| PRICE_CUES.contains(&w)) {
        parts.push(
            "Los precios dependen del modelo y del tiempo de renta; con gusto te preparamos una cotización."
                .to_string(),
        );
    }
    parts.join("\n\n")
}

fn models_paragraph(machinery: MachineryType) -> String {
    let models = models_for(machinery);
    if models.is_empty() {
        return format!(
            "Sí manejamos {}. Un asesor te compartirá los modelos disponibles.",
            label(machinery)
        );
    }

    let mut text = format!("Estos son algunos modelos de {} que manejamos:", label(machinery));
    for model in models.iter().take(MAX_LISTED_MODELS) {
        text.push_str(&format!("\n- {} ({})", model.model, model.highlights));
    }
    if models.len() > MAX_LISTED_MODELS {
        text.push_str(&format!("\n…y {} modelos más.", models.len() - MAX_LISTED_MODELS));
    }
    text
}

fn label(machinery: MachineryType) -> &'static str {
    match machinery {
        MachineryType::Soldadoras => "soldadoras",
        MachineryType::Compresor => "compresores",
        MachineryType::TorreIluminacion => "torres de iluminación",
        MachineryType::Lgmg => "plataformas de elevación LGMG",
        MachineryType::Generadores => "generadores",
        MachineryType::Rompedores => "rompedores",
    }
}

fn catalogue_sentence() -> String {
    let labels: Vec<&str> = MachineryType::ALL.iter().map(|m| label(*m)).collect();
    match labels.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} y {}", rest.join(", "), last),
        Some((last, _)) => last.to_string(),
        None => String::new(),
    }
}
