//! Quick contact actions from a lead card.
//!
//! The board only picks the contact channel and builds a URI; opening it is
//! the launcher's job. A lead without the needed contact field is a no-op.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::models::{Lead, LeadId};
use crate::errors::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    Call,
    Email,
    /// Instant message via WhatsApp.
    #[serde(alias = "whatsapp")]
    Message,
}

impl QuickAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Email => "email",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for QuickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuickAction {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "email" => Ok(Self::Email),
            "message" | "whatsapp" => Ok(Self::Message),
            _ => Err(PipelineError::InvalidQuickAction(s.to_string())),
        }
    }
}

/// An external-contact request handed to the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactIntent {
    pub lead_id: LeadId,
    pub action: QuickAction,
    pub uri: String,
}

/// Opens contact URIs (dialer, mail client, messaging app).
#[async_trait]
pub trait ContactLauncher: Send + Sync {
    async fn launch(&self, intent: &ContactIntent) -> Result<()>;
}

/// Launcher that only logs; used when no platform launcher is wired in.
pub struct LoggingLauncher;

#[async_trait]
impl ContactLauncher for LoggingLauncher {
    async fn launch(&self, intent: &ContactIntent) -> Result<()> {
        debug!(lead_id = %intent.lead_id, uri = %intent.uri, "contact intent");
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Build the contact intent for `action`, or `None` if the lead lacks the field.
pub fn contact_intent(lead: &Lead, action: QuickAction) -> Option<ContactIntent> {
    let uri = match action {
        QuickAction::Call => format!("tel:{}", non_blank(lead.contact.phone.as_deref())?),
        QuickAction::Email => format!("mailto:{}", non_blank(lead.contact.email.as_deref())?),
        QuickAction::Message => {
            let digits: String = non_blank(lead.contact.phone.as_deref())?
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            if digits.is_empty() {
                return None;
            }
            format!("https://wa.me/{}", digits)
        }
    };
    Some(ContactIntent {
        lead_id: lead.id.clone(),
        action,
        uri,
    })
}

/// Build and launch the intent. Launcher failures are logged, never returned.
pub async fn dispatch(
    launcher: &dyn ContactLauncher,
    lead: &Lead,
    action: QuickAction,
) -> Option<ContactIntent> {
    let Some(intent) = contact_intent(lead, action) else {
        debug!(lead_id = %lead.id, %action, "lead has no contact field for action");
        return None;
    };
    if let Err(e) = launcher.launch(&intent).await {
        warn!(lead_id = %lead.id, %action, error = %e, "contact launcher failed");
    }
    Some(intent)
}
