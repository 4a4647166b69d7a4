use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque lead identifier as issued by the lead repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(String);

impl LeadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LeadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for LeadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sales-funnel position of a lead.
///
/// Serialized as its lowercase name. A stage name the board does not know is
/// kept verbatim in `Unrecognized` so a newer repository never breaks
/// deserialization; such leads are simply not shown on the board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeadStatus {
    New,
    Contacted,
    Visited,
    Negotiating,
    Closed,
    Lost,
    Unrecognized(String),
}

impl LeadStatus {
    /// Pipeline stages in board column order.
    pub const STAGES: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Visited,
        LeadStatus::Negotiating,
        LeadStatus::Closed,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Visited => "visited",
            Self::Negotiating => "negotiating",
            Self::Closed => "closed",
            Self::Lost => "lost",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_stage(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Column index of this stage, `None` for unrecognized values.
    pub fn column_index(&self) -> Option<usize> {
        Self::STAGES.iter().position(|s| s == self)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse: only the six pipeline stages are accepted.
impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "visited" => Ok(Self::Visited),
            "negotiating" => Ok(Self::Negotiating),
            "closed" => Ok(Self::Closed),
            "lost" => Ok(Self::Lost),
            _ => Err(format!("Invalid lead status: {}", s)),
        }
    }
}

impl From<String> for LeadStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::Unrecognized(s))
    }
}

impl From<LeadStatus> for String {
    fn from(status: LeadStatus) -> Self {
        match status {
            LeadStatus::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// Where a lead came in from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Zonaprop,
    Argenprop,
    Mercadolibre,
    Properati,
    Website,
    Referral,
    WalkIn,
    Phone,
    Other,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zonaprop => "zonaprop",
            Self::Argenprop => "argenprop",
            Self::Mercadolibre => "mercadolibre",
            Self::Properati => "properati",
            Self::Website => "website",
            Self::Referral => "referral",
            Self::WalkIn => "walk_in",
            Self::Phone => "phone",
            Self::Other => "other",
        }
    }
}

impl FromStr for LeadSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zonaprop" => Ok(Self::Zonaprop),
            "argenprop" => Ok(Self::Argenprop),
            "mercadolibre" => Ok(Self::Mercadolibre),
            "properati" => Ok(Self::Properati),
            "website" => Ok(Self::Website),
            "referral" => Ok(Self::Referral),
            "walk_in" => Ok(Self::WalkIn),
            "phone" => Ok(Self::Phone),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid lead source: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Call,
    Email,
    #[serde(alias = "whatsapp")]
    Message,
    Visit,
    Note,
    StatusChange,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Email => "email",
            Self::Message => "message",
            Self::Visit => "visit",
            Self::Note => "note",
            Self::StatusChange => "status_change",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a lead's append-only activity history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadActivity {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl LeadActivity {
    pub fn new(activity_type: ActivityType, description: impl Into<String>, created_by: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            activity_type,
            description: description.into(),
            created_at: Utc::now(),
            created_by: created_by.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactChannel {
    #[default]
    Phone,
    Email,
    #[serde(alias = "whatsapp")]
    Message,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_contact: ContactChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Usd,
    Ars,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyingTimeline {
    Immediate,
    #[serde(rename = "1_3_months")]
    OneToThreeMonths,
    #[serde(rename = "3_6_months")]
    ThreeToSixMonths,
    #[serde(rename = "6_12_months")]
    SixToTwelveMonths,
    Exploring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qualification {
    pub budget: f64,
    pub budget_currency: Currency,
    pub has_financing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financing_approved: Option<bool>,
    pub timeline: BuyingTimeline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub property_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_title: Option<String>,
    pub status: LeadStatus,
    #[serde(default = "default_source")]
    pub source: LeadSource,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<Qualification>,
    /// Oldest first. Use `activities_newest_first` for display.
    #[serde(default)]
    pub activities: Vec<LeadActivity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_follow_up: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contacted_at: Option<DateTime<Utc>>,
}

fn default_source() -> LeadSource {
    LeadSource::Other
}

impl Lead {
    /// Minimal lead with the given identity and stage; everything else defaulted.
    pub fn new(id: impl Into<LeadId>, name: impl Into<String>, status: LeadStatus) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            contact: ContactInfo::default(),
            property_id: String::new(),
            property_title: None,
            status,
            source: LeadSource::Other,
            priority: Priority::Medium,
            qualification: None,
            activities: Vec::new(),
            next_follow_up: None,
            assigned_to: None,
            notes: None,
            created_at: now,
            updated_at: now,
            last_contacted_at: None,
        }
    }

    pub fn activities_newest_first(&self) -> impl Iterator<Item = &LeadActivity> {
        self.activities.iter().rev()
    }
}

/// Input for creating a lead through the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLead {
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub property_id: String,
    pub source: LeadSource,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub qualification: Option<Qualification>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Repository-side listing filter. Empty vectors mean "any".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadFilter {
    #[serde(default)]
    pub statuses: Vec<LeadStatus>,
    #[serde(default)]
    pub sources: Vec<LeadSource>,
    #[serde(default)]
    pub priorities: Vec<Priority>,
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&lead.status) {
            return false;
        }
        if !self.sources.is_empty() && !self.sources.contains(&lead.source) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&lead.priority) {
            return false;
        }
        if let Some(property_id) = &self.property_id
            && &lead.property_id != property_id
        {
            return false;
        }
        if let Some(from) = self.created_from
            && lead.created_at < from
        {
            return false;
        }
        if let Some(to) = self.created_to
            && lead.created_at > to
        {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = lead.name.to_lowercase().contains(&needle);
            let in_email = lead
                .contact
                .email
                .as_deref()
                .is_some_and(|e| e.to_lowercase().contains(&needle));
            let in_phone = lead
                .contact
                .phone
                .as_deref()
                .is_some_and(|p| p.contains(search.as_str()));
            if !(in_name || in_email || in_phone) {
                return false;
            }
        }
        true
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// A rendered board column: the stage and its leads in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnView {
    pub status: LeadStatus,
    pub leads: Vec<Lead>,
}

impl ColumnView {
    pub fn lead_ids(&self) -> Vec<&str> {
        self.leads.iter().map(|l| l.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_status_roundtrip() {
        for s in &["new", "contacted", "visited", "negotiating", "closed", "lost"] {
            let parsed: LeadStatus = s.parse().unwrap();
            assert_eq!(parsed.as_str(), *s);
            assert!(parsed.is_stage());
        }
        assert!("archived".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn test_unknown_status_deserializes_as_unrecognized() {
        let status: LeadStatus = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(status, LeadStatus::Unrecognized("archived".to_string()));
        assert!(!status.is_stage());
        assert_eq!(status.column_index(), None);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"archived\"");
    }

    #[test]
    fn test_serde_produces_lowercase_strings() {
        assert_eq!(
            serde_json::to_string(&LeadStatus::Negotiating).unwrap(),
            "\"negotiating\""
        );
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        assert_eq!(
            serde_json::to_string(&ActivityType::StatusChange).unwrap(),
            "\"status_change\""
        );
        assert_eq!(
            serde_json::to_string(&LeadSource::WalkIn).unwrap(),
            "\"walk_in\""
        );
    }

    #[test]
    fn test_whatsapp_is_accepted_as_message() {
        assert_eq!(
            serde_json::from_str::<ActivityType>("\"whatsapp\"").unwrap(),
            ActivityType::Message
        );
        assert_eq!(
            serde_json::from_str::<ContactChannel>("\"whatsapp\"").unwrap(),
            ContactChannel::Message
        );
    }

    #[test]
    fn test_stage_order_matches_column_index() {
        for (i, stage) in LeadStatus::STAGES.iter().enumerate() {
            assert_eq!(stage.column_index(), Some(i));
        }
    }

    #[test]
    fn test_lead_json_uses_defaults_for_missing_fields() {
        let json = r#"{
            "id": "L1",
            "name": "Ana",
            "status": "new",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let lead: Lead = serde_json::from_str(json).unwrap();
        assert_eq!(lead.id.as_str(), "L1");
        assert_eq!(lead.priority, Priority::Medium);
        assert_eq!(lead.source, LeadSource::Other);
        assert!(lead.activities.is_empty());
    }

    #[test]
    fn test_activities_newest_first_reverses_storage_order() {
        let mut lead = Lead::new("L1", "Ana", LeadStatus::New);
        lead.activities.push(LeadActivity::new(ActivityType::Call, "first", "agent"));
        lead.activities.push(LeadActivity::new(ActivityType::Note, "second", "agent"));
        let newest: Vec<_> = lead
            .activities_newest_first()
            .map(|a| a.description.as_str())
            .collect();
        assert_eq!(newest, vec!["second", "first"]);
    }

    #[test]
    fn test_filter_matches_status_priority_and_search() {
        let mut lead = Lead::new("L1", "Ana Gomez", LeadStatus::Contacted);
        lead.priority = Priority::High;
        lead.contact.email = Some("ana@example.com".to_string());
        lead.contact.phone = Some("+54 11 5555-0000".to_string());

        let mut filter = LeadFilter {
            statuses: vec![LeadStatus::Contacted],
            ..Default::default()
        };
        assert!(filter.matches(&lead));

        filter.priorities = vec![Priority::Low];
        assert!(!filter.matches(&lead));

        let by_email = LeadFilter {
            search: Some("EXAMPLE.com".to_string()),
            ..Default::default()
        };
        assert!(by_email.matches(&lead));

        let by_phone = LeadFilter {
            search: Some("5555".to_string()),
            ..Default::default()
        };
        assert!(by_phone.matches(&lead));

        let miss = LeadFilter {
            search: Some("pedro".to_string()),
            ..Default::default()
        };
        assert!(!miss.matches(&lead));
    }
}
