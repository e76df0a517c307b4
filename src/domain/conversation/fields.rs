//! Lead fields collected through slot-filling.
//!
//! Fields are kept in a fixed precedence order. Extraction only ever writes
//! into unfilled fields, walking that order; a filled field is never reset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Name of a lead field, declared in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Nombre,
    Apellido,
    TipoAyuda,
    TipoMaquinaria,
    DetallesMaquinaria,
    QuiereCotizacion,
    NombreEmpresa,
    GiroEmpresa,
    LugarRequerimiento,
    UsoEmpresaOVenta,
    Correo,
    Telefono,
    SitioWeb,
}

impl FieldName {
    /// All fields, highest precedence first.
    pub const PRECEDENCE: [FieldName; 13] = [
        FieldName::Nombre,
        FieldName::Apellido,
        FieldName::TipoAyuda,
        FieldName::TipoMaquinaria,
        FieldName::DetallesMaquinaria,
        FieldName::QuiereCotizacion,
        FieldName::NombreEmpresa,
        FieldName::GiroEmpresa,
        FieldName::LugarRequerimiento,
        FieldName::UsoEmpresaOVenta,
        FieldName::Correo,
        FieldName::Telefono,
        FieldName::SitioWeb,
    ];

    /// Company details requested together once the lead wants a quote.
    pub const COMPANY_DETAILS: [FieldName; 5] = [
        FieldName::NombreEmpresa,
        FieldName::GiroEmpresa,
        FieldName::LugarRequerimiento,
        FieldName::UsoEmpresaOVenta,
        FieldName::Correo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Nombre => "nombre",
            FieldName::Apellido => "apellido",
            FieldName::TipoAyuda => "tipo_ayuda",
            FieldName::TipoMaquinaria => "tipo_maquinaria",
            FieldName::DetallesMaquinaria => "detalles_maquinaria",
            FieldName::QuiereCotizacion => "quiere_cotizacion",
            FieldName::NombreEmpresa => "nombre_empresa",
            FieldName::GiroEmpresa => "giro_empresa",
            FieldName::LugarRequerimiento => "lugar_requerimiento",
            FieldName::UsoEmpresaOVenta => "uso_empresa_o_venta",
            FieldName::Correo => "correo",
            FieldName::Telefono => "telefono",
            FieldName::SitioWeb => "sitio_web",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::PRECEDENCE
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("field_name", format!("unknown field '{}'", s))
            })
    }
}

/// Machinery catalogue accepted for `tipo_maquinaria`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineryType {
    Soldadoras,
    Compresor,
    TorreIluminacion,
    Lgmg,
    Generadores,
    Rompedores,
}

impl MachineryType {
    pub const ALL: [MachineryType; 6] = [
        MachineryType::Soldadoras,
        MachineryType::Compresor,
        MachineryType::TorreIluminacion,
        MachineryType::Lgmg,
        MachineryType::Generadores,
        MachineryType::Rompedores,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MachineryType::Soldadoras => "soldadoras",
            MachineryType::Compresor => "compresor",
            MachineryType::TorreIluminacion => "torre_iluminacion",
            MachineryType::Lgmg => "lgmg",
            MachineryType::Generadores => "generadores",
            MachineryType::Rompedores => "rompedores",
        }
    }
}

impl fmt::Display for MachineryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        MachineryType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                ValidationError::invalid_format(
                    FieldName::TipoMaquinaria.as_str(),
                    format!("'{}' is not in the machinery catalogue", s),
                )
            })
    }
}

/// `tipo_ayuda` value that routes the lead into the machinery flow.
pub const HELP_MACHINERY: &str = "maquinaria";
/// `tipo_ayuda` value for leads that need something else.
pub const HELP_OTHER: &str = "otro";

/// One slot of lead data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadField {
    pub name: FieldName,
    pub value: Option<String>,
}

impl LeadField {
    pub fn is_filled(&self) -> bool {
        self.value.is_some()
    }
}

/// What the bot should ask for next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingField {
    Field(FieldName),
    /// Machinery details for the chosen machinery type.
    MachineryDetails(Option<MachineryType>),
    /// Remaining company details, asked for in a single message.
    CompanyDetails(Vec<FieldName>),
}

/// The ordered set of lead fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadFields {
    fields: Vec<LeadField>,
}

impl LeadFields {
    /// All fields, unfilled, in precedence order.
    pub fn new() -> Self {
        Self {
            fields: FieldName::PRECEDENCE
                .iter()
                .map(|&name| LeadField { name, value: None })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LeadField> {
        self.fields.iter()
    }

    pub fn get(&self, name: FieldName) -> Option<&str> {
        self.slot(name).and_then(|f| f.value.as_deref())
    }

    pub fn is_filled(&self, name: FieldName) -> bool {
        self.get(name).is_some()
    }

    pub fn filled_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_filled()).count()
    }

    fn slot(&self, name: FieldName) -> Option<&LeadField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn slot_mut(&mut self, name: FieldName) -> &mut LeadField {
        // The constructor creates every slot, so the lookup cannot miss.
        let idx = self
            .fields
            .iter()
            .position(|f| f.name == name)
            .unwrap_or_else(|| unreachable!("lead field {} missing", name));
        &mut self.fields[idx]
    }

    /// Sets a field regardless of its current state.
    ///
    /// Used when rebuilding a conversation from storage.
    pub fn restore(&mut self, name: FieldName, value: Option<String>) {
        self.slot_mut(name).value = value;
    }

    /// Writes extracted values into unfilled fields, walking the precedence order.
    ///
    /// Blank values, unknown names and values rejected by field validation are
    /// skipped. Returns the fields filled by this call, in precedence order.
    pub fn fill_unfilled(&mut self, extracted: &HashMap<String, String>) -> Vec<FieldName> {
        for key in extracted.keys() {
            if key.parse::<FieldName>().is_err() {
                tracing::debug!(field = %key, "ignoring unknown extracted field");
            }
        }

        let mut filled = Vec::new();
        for name in FieldName::PRECEDENCE {
            let Some(raw) = extracted.get(name.as_str()) else {
                continue;
            };
            if self.is_filled(name) {
                tracing::debug!(field = %name, "field already filled, not overwriting");
                continue;
            }
            match normalize_value(name, raw) {
                Ok(Some(value)) => {
                    self.slot_mut(name).value = Some(value);
                    filled.push(name);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(field = %name, error = %e, "rejected extracted value"),
            }
        }

        if self.is_filled(FieldName::TipoMaquinaria) && !self.is_filled(FieldName::TipoAyuda) {
            self.slot_mut(FieldName::TipoAyuda).value = Some(HELP_MACHINERY.to_string());
            filled.push(FieldName::TipoAyuda);
            filled.sort();
        }

        filled
    }

    pub fn machinery_type(&self) -> Option<MachineryType> {
        self.get(FieldName::TipoMaquinaria).and_then(|v| v.parse().ok())
    }

    fn has_full_name(&self) -> bool {
        match self.get(FieldName::Nombre) {
            Some(nombre) => {
                self.is_filled(FieldName::Apellido) || nombre.split_whitespace().count() >= 2
            }
            None => false,
        }
    }

    fn declined_quote(&self) -> bool {
        self.get(FieldName::QuiereCotizacion)
            .map(|v| {
                v.to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|w| w == "no")
            })
            .unwrap_or(false)
    }

    /// Next piece of information the bot should ask for, or `None` when complete.
    pub fn next_pending(&self) -> Option<PendingField> {
        if !self.is_filled(FieldName::Nombre) {
            return Some(PendingField::Field(FieldName::Nombre));
        }
        if !self.has_full_name() {
            return Some(PendingField::Field(FieldName::Apellido));
        }
        match self.get(FieldName::TipoAyuda) {
            None => return Some(PendingField::Field(FieldName::TipoAyuda)),
            Some(HELP_OTHER) => return None,
            Some(_) => {}
        }
        if !self.is_filled(FieldName::TipoMaquinaria) {
            return Some(PendingField::Field(FieldName::TipoMaquinaria));
        }
        if !self.is_filled(FieldName::DetallesMaquinaria) {
            return Some(PendingField::MachineryDetails(self.machinery_type()));
        }
        if !self.is_filled(FieldName::QuiereCotizacion) {
            return Some(PendingField::Field(FieldName::QuiereCotizacion));
        }
        if self.declined_quote() {
            return None;
        }
        let missing: Vec<FieldName> = FieldName::COMPANY_DETAILS
            .iter()
            .copied()
            .filter(|&name| !self.is_filled(name))
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some(PendingField::CompanyDetails(missing))
        }
    }

    /// True when every field the qualification flow needs has been collected.
    pub fn is_complete(&self) -> bool {
        self.next_pending().is_none()
    }
}

impl Default for LeadFields {
    fn default() -> Self {
        Self::new()
    }
}

/// Trims the value and applies per-field validation.
///
/// `Ok(None)` means the value carries no information.
fn normalize_value(name: FieldName, raw: &str) -> Result<Option<String>, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match name {
        FieldName::TipoMaquinaria => Ok(Some(value.parse::<MachineryType>()?.to_string())),
        FieldName::TipoAyuda => Ok(Some(value.to_lowercase())),
        _ => Ok(Some(value.to_string())),
    }
}
