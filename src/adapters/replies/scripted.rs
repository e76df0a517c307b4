//! Scripted reply generator.
//!
//! Asks for the next pending field in precedence order and closes the
//! conversation once everything needed has been collected. An inventory
//! question from the lead is answered first, then the script continues.

use async_trait::async_trait;

use crate::domain::conversation::{
    Conversation, FieldName, MachineryType, PendingField, SenderRole, HELP_OTHER,
};
use crate::ports::{ReplyError, ReplyGenerator};

use super::inventory::{inventory_answer, is_inventory_question};

pub const CLOSING_REPLY: &str =
    "Gracias por la información. Pronto te contactará nuestro asesor especializado.";
pub const CLOSING_REPLY_OTHER: &str = "Claro, en un momento te comparto la información.";

#[derive(Debug, Clone, Default)]
pub struct ScriptedReplyGenerator;

impl ScriptedReplyGenerator {
    pub fn new() -> Self {
        Self
    }

    fn question(pending: &PendingField) -> String {
        match pending {
            PendingField::Field(name) => field_question(*name).to_string(),
            PendingField::MachineryDetails(machinery) => machinery_question(*machinery).to_string(),
            PendingField::CompanyDetails(missing) => {
                let mut text = String::from(
                    "Necesito los siguientes datos de tu empresa para continuar con la cotización:",
                );
                for name in missing {
                    text.push_str("\n- ");
                    text.push_str(field_label(*name));
                }
                text
            }
        }
    }
}

fn field_question(name: FieldName) -> &'static str {
    match name {
        FieldName::Nombre => "¡Hola! ¿Con quién tengo el gusto?",
        FieldName::Apellido => "¿Me compartes tu apellido?",
        FieldName::TipoAyuda => "¿En qué te puedo ayudar? ¿Buscas maquinaria o algo más?",
        FieldName::TipoMaquinaria => {
            "¿Qué tipo de maquinaria necesitas? Manejamos soldadoras, compresores, torres de iluminación, plataformas LGMG, generadores y rompedores."
        }
        FieldName::DetallesMaquinaria => "¿Me das más detalles del equipo que necesitas?",
        FieldName::QuiereCotizacion => "¿Te gustaría recibir una cotización?",
        other => field_label(other),
    }
}

fn field_label(name: FieldName) -> &'static str {
    match name {
        FieldName::NombreEmpresa => "Nombre de la empresa",
        FieldName::GiroEmpresa => "Giro de la empresa",
        FieldName::LugarRequerimiento => "Lugar donde se requiere el equipo",
        FieldName::UsoEmpresaOVenta => "¿Es para uso de la empresa o para venta?",
        FieldName::Correo => "Correo electrónico",
        FieldName::Telefono => "Teléfono de contacto",
        FieldName::SitioWeb => "Sitio web",
        FieldName::Nombre => "Nombre",
        FieldName::Apellido => "Apellido",
        FieldName::TipoAyuda => "Tipo de ayuda",
        FieldName::TipoMaquinaria => "Tipo de maquinaria",
        FieldName::DetallesMaquinaria => "Detalles de la maquinaria",
        FieldName::QuiereCotizacion => "¿Desea cotización?",
    }
}

fn machinery_question(machinery: Option<MachineryType>) -> &'static str {
    match machinery {
        Some(MachineryType::Soldadoras) => "¿Qué amperaje requiere o qué electrodo quema?",
        Some(MachineryType::Compresor) => {
            "¿Qué capacidad de volumen de aire requiere o qué herramienta le va a conectar?"
        }
        Some(MachineryType::TorreIluminacion) => "¿La requiere de LED?",
        Some(MachineryType::Lgmg) => "¿Qué altura de trabajo necesita y qué actividad va a realizar?",
        Some(MachineryType::Generadores) => "¿Para qué actividad lo requiere y de qué capacidad (kVA o kW)?",
        Some(MachineryType::Rompedores) => "¿Para qué lo vas a utilizar? ¿Lo requieres eléctrico o neumático?",
        None => "¿Me das más detalles del equipo que necesitas?",
    }
}

#[async_trait]
impl ReplyGenerator for ScriptedReplyGenerator {
    async fn generate(&self, conversation: &Conversation) -> Result<String, ReplyError> {
        let fields = conversation.fields();
        let scripted = match fields.next_pending() {
            Some(pending) => Self::question(&pending),
            None if fields.get(FieldName::TipoAyuda) == Some(HELP_OTHER) => {
                CLOSING_REPLY_OTHER.to_string()
            }
            None => CLOSING_REPLY.to_string(),
        };

        match conversation.last_message_from(SenderRole::Lead) {
            Some(asked) if is_inventory_question(&asked.text) => {
                tracing::debug!(lead_id = %conversation.id(), "answering inventory question");
                Ok(format!("{}\n\n{}", inventory_answer(&asked.text), scripted))
            }
            _ => Ok(scripted),
        }
    }
}
