//! HubSpot contact sync.
//!
//! Each conversation maps to one contact keyed by the custom property
//! `id_conversacion_bot`. Syncs use the batch upsert endpoint so the first
//! sync creates the contact and later ones update it.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;

use crate::domain::conversation::{Conversation, FieldName, MachineryType};
use crate::ports::{CrmSync, SyncError};

const HUBSPOT_API_BASE: &str = "https://api.hubapi.com";
const ID_PROPERTY: &str = "id_conversacion_bot";

/// Industry values accepted by the `giro_de_la_empresa_` property.
const INDUSTRIES: [&str; 7] = [
    "Venta de maquinaria",
    "Renta de maquinaria",
    "Distribuidor",
    "Comercializadora",
    "Minería",
    "Construcción",
    "Otro",
];

/// Values accepted by the `estado___region` property.
const STATES: [&str; 32] = [
    "Aguascalientes",
    "Baja California",
    "Baja California Sur",
    "Campeche",
    "Chiapas",
    "Chihuahua",
    "Ciudad de México",
    "Coahuila",
    "Colima",
    "Durango",
    "Estado de México",
    "Guanajuato",
    "Guerrero",
    "Hidalgo",
    "Jalisco",
    "Michoacán",
    "Morelos",
    "Nayarit",
    "Nuevo León",
    "Oaxaca",
    "Puebla",
    "Querétaro",
    "Quintana Roo",
    "San Luis Potosí",
    "Sinaloa",
    "Sonora",
    "Tabasco",
    "Tamaulipas",
    "Tlaxcala",
    "Veracruz",
    "Yucatán",
    "Zacatecas",
];

#[derive(Debug, Clone)]
pub struct HubSpotClientConfig {
    access_token: Secret<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl HubSpotClientConfig {
    pub fn new(access_token: Secret<String>) -> Self {
        Self {
            access_token,
            base_url: HUBSPOT_API_BASE.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

pub struct HubSpotCrmSync {
    config: HubSpotClientConfig,
    client: Client,
}

impl HubSpotCrmSync {
    pub fn new(config: HubSpotClientConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn upsert_url(&self) -> String {
        format!("{}/crm/v3/objects/contacts/batch/upsert", self.config.base_url)
    }
}

#[derive(Debug, Serialize)]
struct UpsertBatch {
    inputs: Vec<UpsertInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertInput {
    id_property: &'static str,
    id: String,
    properties: BTreeMap<&'static str, String>,
}

fn product_label(machinery: MachineryType) -> &'static str {
    match machinery {
        MachineryType::Soldadoras => "Soldadoras Shindaiwa",
        MachineryType::Compresor => "Compresores eléctricos Airman",
        MachineryType::TorreIluminacion => "Torres de iluminación Trime",
        MachineryType::Lgmg => "Plataformas de elevación LGMG",
        MachineryType::Generadores => "Generadores",
        MachineryType::Rompedores => "Martillos neumáticos Toku",
    }
}

/// Picks the catalogue entry, or the first one when the value is not listed.
fn constrained(value: &str, allowed: &[&'static str]) -> String {
    allowed
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(value.trim()))
        .or_else(|| allowed.first())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Maps filled lead fields onto HubSpot contact properties.
fn contact_properties(conversation: &Conversation) -> BTreeMap<&'static str, String> {
    let fields = conversation.fields();
    let mut properties = BTreeMap::new();
    properties.insert("lifecyclestage", "lead".to_string());
    properties.insert("phone", conversation.id().to_string());

    let full_name = [fields.get(FieldName::Nombre), fields.get(FieldName::Apellido)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !full_name.is_empty() {
        properties.insert("firstname", full_name);
    }

    if let Some(machinery) = fields.machinery_type() {
        properties.insert(
            "en_que_producto_estas_interesado_",
            product_label(machinery).to_string(),
        );
    }

    for field in fields.iter() {
        let Some(value) = field.value.as_deref() else {
            continue;
        };
        match field.name {
            FieldName::DetallesMaquinaria => {
                properties.insert("caracteristicas_de_maquinaria_de_interes", value.to_string());
            }
            FieldName::NombreEmpresa => {
                properties.insert("company", value.to_string());
            }
            FieldName::GiroEmpresa => {
                properties.insert("giro_de_la_empresa_", constrained(value, &INDUSTRIES));
            }
            FieldName::LugarRequerimiento => {
                properties.insert("estado___region", constrained(value, &STATES));
            }
            FieldName::Telefono => {
                properties.insert("phone", value.to_string());
            }
            FieldName::Correo => {
                properties.insert("email", value.to_string());
            }
            FieldName::SitioWeb => {
                properties.insert("pgina_web_de_tu_negocio", value.to_string());
            }
            _ => {}
        }
    }

    properties
}

#[async_trait]
impl CrmSync for HubSpotCrmSync {
    async fn sync(&self, snapshot: &Conversation) -> Result<(), SyncError> {
        let batch = UpsertBatch {
            inputs: vec![UpsertInput {
                id_property: ID_PROPERTY,
                id: format!("conv_{}", snapshot.id()),
                properties: contact_properties(snapshot),
            }],
        };

        let response = self
            .client
            .post(self.upsert_url())
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&batch)
            .send()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Rejected(format!("status {}: {}", status, body)));
        }

        tracing::info!(lead_id = %snapshot.id(), "contact synced to HubSpot");
        Ok(())
    }
}
