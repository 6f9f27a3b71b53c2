//! # Graph Entity Model
//!
//! The three node kinds of the knowledge graph, `Jurisdiction`, `Regulator`
//! and `Obligation`, plus the closed vocabularies they carry (`RiskLevel`,
//! `ObligationKind`, `JurisdictionScope`, `LegalSystem`).
//!
//! ## Serialization
//!
//! Field names are `snake_case`, enum values are `SCREAMING_SNAKE_CASE` for
//! regulatory vocabularies and `lowercase` for structural ones. These shapes
//! are what the content digest covers, so renaming a field is a hash-breaking
//! change.
//!
//! ## Bookkeeping Stamps
//!
//! `last_updated` is assigned by the store on every write. Callers leave it
//! as `None`; the store drops it from the content digest.

use std::fmt;
use std::str::FromStr;

use jkg_core::{JurisdictionCode, ObligationId, RegulatorId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::subject::SubjectCriteria;

// ---------------------------------------------------------------------------
// RiskLevel
// ---------------------------------------------------------------------------

/// Risk classification of an obligation.
///
/// Ordering follows severity: `Info < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Informational only.
    Info,
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
    /// Critical risk.
    Critical,
}

impl RiskLevel {
    /// All risk levels, most severe first.
    pub const ALL: [RiskLevel; 5] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Info,
    ];

    /// Weight used by the continuous risk score.
    ///
    /// `Info` carries the fallback weight of 0.5.
    pub fn weight(self) -> f64 {
        match self {
            Self::Critical => 4.0,
            Self::High => 3.0,
            Self::Medium => 2.0,
            Self::Low => 1.0,
            Self::Info => 0.5,
        }
    }

    /// Wire name of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    /// Case-insensitive parse of a risk level name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// ObligationKind
// ---------------------------------------------------------------------------

/// What an obligation asks of the regulated entity.
///
/// The first five are the base deontic kinds; the rest are domain kinds
/// used by adapter feeds (privacy, AI, security, crypto-asset regimes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationKind {
    /// Something the entity must not do.
    Prohibition,
    /// Something the entity must do.
    Requirement,
    /// Something the entity may do.
    Permission,
    /// A periodic or event-driven report to a regulator.
    Reporting,
    /// A licence, authorization or registration to obtain.
    Registration,
    /// Data transfer restrictions.
    DataTransfer,
    /// Data subject rights handling.
    DataSubjectRights,
    /// Retention periods and deletion duties.
    Retention,
    /// Incident or breach notification.
    BreachNotification,
    /// Consent collection and management.
    Consent,
    /// Algorithmic or AI transparency.
    AiTransparency,
    /// Risk or impact assessment.
    RiskAssessment,
    /// Human oversight of automated decisions.
    HumanOversight,
    /// Bias and fairness controls.
    BiasMitigation,
    /// Cybersecurity controls.
    Cybersecurity,
    /// Sanctions screening.
    Sanctions,
    /// Public disclosure duties.
    Disclosure,
}

impl ObligationKind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prohibition => "PROHIBITION",
            Self::Requirement => "REQUIREMENT",
            Self::Permission => "PERMISSION",
            Self::Reporting => "REPORTING",
            Self::Registration => "REGISTRATION",
            Self::DataTransfer => "DATA_TRANSFER",
            Self::DataSubjectRights => "DATA_SUBJECT_RIGHTS",
            Self::Retention => "RETENTION",
            Self::BreachNotification => "BREACH_NOTIFICATION",
            Self::Consent => "CONSENT",
            Self::AiTransparency => "AI_TRANSPARENCY",
            Self::RiskAssessment => "RISK_ASSESSMENT",
            Self::HumanOversight => "HUMAN_OVERSIGHT",
            Self::BiasMitigation => "BIAS_MITIGATION",
            Self::Cybersecurity => "CYBERSECURITY",
            Self::Sanctions => "SANCTIONS",
            Self::Disclosure => "DISCLOSURE",
        }
    }
}

impl fmt::Display for ObligationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Jurisdiction
// ---------------------------------------------------------------------------

/// Territorial level of a jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JurisdictionScope {
    /// A sovereign country.
    Country,
    /// A state, province or other sub-national entity.
    State,
    /// A union or treaty body spanning several countries.
    Supranational,
}

/// Legal tradition of a jurisdiction, used as a hint by downstream tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalSystem {
    /// Civil law tradition.
    CivilLaw,
    /// Common law tradition.
    CommonLaw,
    /// Mixed tradition.
    Mixed,
    /// Religious law tradition.
    Religious,
}

/// A legal jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jurisdiction {
    /// Jurisdiction code (`"EU"`, `"BG"`, `"US-CA"`).
    pub code: JurisdictionCode,
    /// Display name.
    pub name: String,
    /// Regulators active in this jurisdiction.
    #[serde(default)]
    pub regulators: Vec<RegulatorId>,
    /// Parent jurisdiction (a member state's union, a state's country).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<JurisdictionCode>,
    /// Treaty memberships (`"Schengen"`, `"EU-Single-Market"`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub treaties: Vec<String>,
    /// IANA timezone of the jurisdiction's seat.
    #[serde(default)]
    pub timezone: String,
    /// Territorial level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<JurisdictionScope>,
    /// Legal tradition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_system: Option<LegalSystem>,
    /// Store-assigned write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

impl Jurisdiction {
    /// A jurisdiction with only its code and name set.
    pub fn new(code: impl Into<JurisdictionCode>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            regulators: Vec::new(),
            parent_code: None,
            treaties: Vec::new(),
            timezone: String::new(),
            scope: None,
            legal_system: None,
            last_updated: None,
        }
    }

    /// Set the parent jurisdiction.
    pub fn with_parent(mut self, parent: impl Into<JurisdictionCode>) -> Self {
        self.parent_code = Some(parent.into());
        self
    }

    /// Set the timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Set the regulator list.
    pub fn with_regulators<I, R>(mut self, regulators: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RegulatorId>,
    {
        self.regulators = regulators.into_iter().map(Into::into).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// Regulator
// ---------------------------------------------------------------------------

/// A regulatory authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regulator {
    /// Regulator identifier (`"EU-ESMA"`).
    pub id: RegulatorId,
    /// Display name.
    pub name: String,
    /// Home jurisdiction.
    pub jurisdiction: JurisdictionCode,
    /// Supervisory scope tags (`"crypto"`, `"securities"`).
    #[serde(default)]
    pub scope: Vec<String>,
    /// Public website.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub website: String,
    /// Machine-readable publication feed, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
    /// Enforcement powers (`"fines"`, `"license_revocation"`).
    #[serde(default)]
    pub enforcement_powers: Vec<String>,
    /// Store-assigned write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

impl Regulator {
    /// A regulator with only its identifier, name and home jurisdiction.
    pub fn new(
        id: impl Into<RegulatorId>,
        name: impl Into<String>,
        jurisdiction: impl Into<JurisdictionCode>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            jurisdiction: jurisdiction.into(),
            scope: Vec::new(),
            website: String::new(),
            feed_url: None,
            enforcement_powers: Vec::new(),
            last_updated: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Obligation
// ---------------------------------------------------------------------------

/// A single regulatory obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    /// Caller-assigned identifier, unique across the graph.
    pub obligation_id: ObligationId,
    /// Home jurisdiction.
    pub jurisdiction_code: JurisdictionCode,
    /// Issuing regulator.
    pub regulator_id: RegulatorId,
    /// Framework name (`"MiCA"`, `"BSA"`).
    pub framework: String,
    /// Article or section reference.
    #[serde(default)]
    pub article_ref: String,
    /// Obligation kind.
    #[serde(rename = "type")]
    pub kind: ObligationKind,
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Legal text or summary; this is what the policy compiler consumes.
    #[serde(default)]
    pub description: String,
    /// Subject-matching expression, see [`SubjectCriteria`].
    #[serde(default)]
    pub subject_criteria: String,
    /// What the obligation acts upon (free text).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub object_criteria: String,
    /// Start of the obligation's validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_from: Option<Timestamp>,
    /// End of the obligation's validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset_at: Option<Timestamp>,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Maximum penalty (free text).
    #[serde(default)]
    pub penalty_max: String,
    /// Evidence an auditor would expect.
    #[serde(default)]
    pub evidence_requirements: Vec<String>,
    /// Link to the legal source.
    #[serde(default)]
    pub source_url: String,
    /// Content version.
    #[serde(default)]
    pub version: u32,
    /// Replacement obligation, once superseded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<ObligationId>,
    /// Store-assigned write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

impl Obligation {
    /// A requirement with only its keys, framework and risk level set.
    pub fn new(
        id: impl Into<ObligationId>,
        jurisdiction: impl Into<JurisdictionCode>,
        regulator: impl Into<RegulatorId>,
        framework: impl Into<String>,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            obligation_id: id.into(),
            jurisdiction_code: jurisdiction.into(),
            regulator_id: regulator.into(),
            framework: framework.into(),
            article_ref: String::new(),
            kind: ObligationKind::Requirement,
            title: String::new(),
            description: String::new(),
            subject_criteria: String::new(),
            object_criteria: String::new(),
            effective_from: None,
            sunset_at: None,
            risk_level,
            penalty_max: String::new(),
            evidence_requirements: Vec::new(),
            source_url: String::new(),
            version: 1,
            superseded_by: None,
            last_updated: None,
        }
    }

    /// Set the obligation kind.
    pub fn with_kind(mut self, kind: ObligationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the article reference.
    pub fn with_article_ref(mut self, article_ref: impl Into<String>) -> Self {
        self.article_ref = article_ref.into();
        self
    }

    /// Set the subject-matching expression.
    pub fn with_subject_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.subject_criteria = criteria.into();
        self
    }

    /// Set the start of the validity window.
    pub fn with_effective_from(mut self, at: Timestamp) -> Self {
        self.effective_from = Some(at);
        self
    }

    /// Set the end of the validity window.
    pub fn with_sunset_at(mut self, at: Timestamp) -> Self {
        self.sunset_at = Some(at);
        self
    }

    /// True once `now` is strictly past the sunset date.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.sunset_at.is_some_and(|sunset| now > sunset)
    }

    /// True if `at` lies inside the validity window (both ends inclusive).
    pub fn is_effective_at(&self, at: Timestamp) -> bool {
        if self.effective_from.is_some_and(|from| at < from) {
            return false;
        }
        !self.sunset_at.is_some_and(|sunset| at > sunset)
    }

    /// Parsed form of [`Obligation::subject_criteria`].
    pub fn subject(&self) -> SubjectCriteria {
        SubjectCriteria::parse(&self.subject_criteria)
    }

    /// True if the obligation applies to entities of `entity_type`.
    pub fn applies_to(&self, entity_type: &str) -> bool {
        self.subject().matches(entity_type)
    }
}
