//! # Built-in Seed Data
//!
//! A small, real-world starting graph: the EU and two member states, the
//! US and the UK, their financial regulators, the MiCA / EU AI Act / AML
//! obligations most crypto-asset businesses meet first, and one declared
//! conflict (AMLD6 customer due diligence vs BSA suspicious activity
//! reporting).

use chrono::{TimeZone, Utc};
use jkg_core::Timestamp;

use crate::edge::Edge;
use crate::model::{
    Jurisdiction, JurisdictionScope, LegalSystem, Obligation, ObligationKind, Regulator, RiskLevel,
};
use crate::seed::GraphSeed;

const EUR_LEX_MICA: &str = "https://eur-lex.europa.eu/legal-content/EN/TXT/?uri=CELEX:32023R1114";
const EUR_LEX_AI_ACT: &str = "https://eur-lex.europa.eu/legal-content/EN/TXT/?uri=CELEX:32024R1689";
const EUR_LEX_AMLD6: &str = "https://eur-lex.europa.eu/legal-content/EN/TXT/?uri=CELEX:32024L1640";
const FINCEN_GUIDANCE: &str = "https://www.fincen.gov/resources/statutes-regulations/guidance";

fn date(year: i32, month: u32, day: u32) -> Option<Timestamp> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .map(Timestamp::from_utc)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The built-in jurisdictions.
pub fn jurisdictions() -> Vec<Jurisdiction> {
    let mut eu = Jurisdiction::new("EU", "European Union")
        .with_regulators(["EU-ESMA", "EU-EBA"])
        .with_timezone("CET");
    eu.scope = Some(JurisdictionScope::Supranational);
    eu.legal_system = Some(LegalSystem::CivilLaw);

    let mut us = Jurisdiction::new("US", "United States")
        .with_regulators(["US-FinCEN", "US-SEC"])
        .with_timezone("EST");
    us.scope = Some(JurisdictionScope::Country);
    us.legal_system = Some(LegalSystem::CommonLaw);

    let mut gb = Jurisdiction::new("GB", "United Kingdom")
        .with_regulators(["GB-FCA", "GB-PRA"])
        .with_timezone("GMT");
    gb.scope = Some(JurisdictionScope::Country);
    gb.legal_system = Some(LegalSystem::CommonLaw);

    let mut bg = Jurisdiction::new("BG", "Bulgaria")
        .with_regulators(["BG-FSC", "BG-NRA"])
        .with_parent("EU")
        .with_timezone("EET");
    bg.treaties = strings(&["EU-Single-Market", "Schengen"]);
    bg.scope = Some(JurisdictionScope::Country);
    bg.legal_system = Some(LegalSystem::CivilLaw);

    let mut cy = Jurisdiction::new("CY", "Cyprus")
        .with_regulators(["CY-CySEC"])
        .with_parent("EU")
        .with_timezone("EET");
    cy.scope = Some(JurisdictionScope::Country);
    cy.legal_system = Some(LegalSystem::Mixed);

    vec![eu, us, gb, bg, cy]
}

fn regulator(
    id: &str,
    name: &str,
    jurisdiction: &str,
    scope: &[&str],
    website: &str,
    feed_url: Option<&str>,
    powers: &[&str],
) -> Regulator {
    let mut r = Regulator::new(id, name, jurisdiction);
    r.scope = strings(scope);
    r.website = website.to_string();
    r.feed_url = feed_url.map(str::to_string);
    r.enforcement_powers = strings(powers);
    r
}

/// The built-in regulators.
pub fn regulators() -> Vec<Regulator> {
    vec![
        regulator(
            "EU-ESMA",
            "European Securities and Markets Authority",
            "EU",
            &["securities", "crypto", "markets"],
            "https://www.esma.europa.eu",
            Some("https://www.esma.europa.eu/rss"),
            &["fines", "bans", "warnings"],
        ),
        regulator(
            "EU-EBA",
            "European Banking Authority",
            "EU",
            &["banking", "payments", "aml"],
            "https://www.eba.europa.eu",
            None,
            &["guidelines", "recommendations"],
        ),
        regulator(
            "US-FinCEN",
            "Financial Crimes Enforcement Network",
            "US",
            &["aml", "kyc", "msb"],
            "https://www.fincen.gov",
            Some("https://www.fincen.gov/rss"),
            &["civil_penalties", "criminal_referral"],
        ),
        regulator(
            "US-SEC",
            "Securities and Exchange Commission",
            "US",
            &["securities", "investment"],
            "https://www.sec.gov",
            None,
            &["civil_penalties", "disgorgement", "bans"],
        ),
        regulator(
            "GB-FCA",
            "Financial Conduct Authority",
            "GB",
            &["banking", "crypto", "payments", "insurance"],
            "https://www.fca.org.uk",
            Some("https://www.fca.org.uk/news-and-publications/rss-feeds"),
            &["fines", "prohibition_orders", "restitution"],
        ),
        regulator(
            "GB-PRA",
            "Prudential Regulation Authority",
            "GB",
            &["prudential", "banking", "insurance"],
            "https://www.bankofengland.co.uk/prudential-regulation",
            None,
            &["capital_requirements", "restrictions"],
        ),
        regulator(
            "BG-FSC",
            "Financial Supervision Commission",
            "BG",
            &["securities", "insurance", "pensions"],
            "https://www.fsc.bg",
            None,
            &["fines", "license_revocation"],
        ),
        regulator(
            "BG-NRA",
            "National Revenue Agency",
            "BG",
            &["tax", "reporting"],
            "https://www.nra.bg",
            None,
            &["tax_penalties", "audits"],
        ),
        regulator(
            "CY-CySEC",
            "Cyprus Securities and Exchange Commission",
            "CY",
            &["securities", "crypto", "forex"],
            "https://www.cysec.gov.cy",
            None,
            &["fines", "license_revocation", "warnings"],
        ),
    ]
}

struct ObligationRow<'a> {
    id: &'a str,
    jurisdiction: &'a str,
    regulator: &'a str,
    framework: &'a str,
    article: &'a str,
    kind: ObligationKind,
    title: &'a str,
    description: &'a str,
    effective_from: Option<Timestamp>,
    risk: RiskLevel,
    penalty: &'a str,
    evidence: &'a [&'a str],
    source: &'a str,
}

impl ObligationRow<'_> {
    fn build(self) -> Obligation {
        let mut o = Obligation::new(
            self.id,
            self.jurisdiction,
            self.regulator,
            self.framework,
            self.risk,
        )
        .with_kind(self.kind)
        .with_article_ref(self.article)
        .with_title(self.title)
        .with_description(self.description);
        o.effective_from = self.effective_from;
        o.penalty_max = self.penalty.to_string();
        o.evidence_requirements = strings(self.evidence);
        o.source_url = self.source.to_string();
        o
    }
}

/// Markets in Crypto-Assets obligations.
pub fn mica_obligations() -> Vec<Obligation> {
    vec![
        ObligationRow {
            id: "MICA-CASP-AUTH",
            jurisdiction: "EU",
            regulator: "EU-ESMA",
            framework: "MiCA",
            article: "Article 59",
            kind: ObligationKind::Registration,
            title: "CASP Authorization Requirement",
            description: "Crypto-asset service providers must obtain authorization from competent authority",
            effective_from: date(2024, 12, 30),
            risk: RiskLevel::Critical,
            penalty: "€5M or 3% annual turnover",
            evidence: &["authorization_certificate", "compliance_program", "aml_policy"],
            source: EUR_LEX_MICA,
        }
        .build(),
        ObligationRow {
            id: "MICA-WP-PUB",
            jurisdiction: "EU",
            regulator: "EU-ESMA",
            framework: "MiCA",
            article: "Article 6",
            kind: ObligationKind::Requirement,
            title: "White Paper Publication",
            description: "Issuers must publish a white paper before offering crypto-assets",
            effective_from: date(2024, 6, 30),
            risk: RiskLevel::High,
            penalty: "€700K",
            evidence: &["white_paper", "publication_proof", "esma_notification"],
            source: EUR_LEX_MICA,
        }
        .build(),
        ObligationRow {
            id: "MICA-ART-EMT",
            jurisdiction: "EU",
            regulator: "EU-EBA",
            framework: "MiCA",
            article: "Article 48",
            kind: ObligationKind::Requirement,
            title: "E-Money Token Requirements",
            description: "E-money token issuers must be authorized credit/e-money institution",
            effective_from: date(2024, 6, 30),
            risk: RiskLevel::Critical,
            penalty: "€5M or 3% annual turnover",
            evidence: &["emi_license", "reserve_attestation", "redemption_policy"],
            source: EUR_LEX_MICA,
        }
        .build(),
    ]
}

/// EU AI Act obligations.
pub fn eu_ai_act_obligations() -> Vec<Obligation> {
    vec![
        ObligationRow {
            id: "EUAI-PROHIB-001",
            jurisdiction: "EU",
            regulator: "EU-ESMA",
            framework: "EU AI Act",
            article: "Article 5",
            kind: ObligationKind::Prohibition,
            title: "Prohibited AI Practices",
            description: "Ban on social scoring, predictive policing, emotion recognition in workplace/education",
            effective_from: date(2025, 2, 2),
            risk: RiskLevel::Critical,
            penalty: "€35M or 7% global turnover",
            evidence: &["ai_inventory", "risk_assessment", "compliance_declaration"],
            source: EUR_LEX_AI_ACT,
        }
        .build(),
        ObligationRow {
            id: "EUAI-GPAI-001",
            jurisdiction: "EU",
            regulator: "EU-ESMA",
            framework: "EU AI Act",
            article: "Article 53",
            kind: ObligationKind::Requirement,
            title: "GPAI Model Transparency",
            description: "General-purpose AI model providers must provide technical documentation",
            effective_from: date(2025, 8, 2),
            risk: RiskLevel::High,
            penalty: "€15M or 3% global turnover",
            evidence: &["model_card", "training_data_summary", "capability_assessment"],
            source: EUR_LEX_AI_ACT,
        }
        .build(),
    ]
}

/// Anti-money-laundering obligations.
pub fn aml_obligations() -> Vec<Obligation> {
    vec![
        ObligationRow {
            id: "US-BSA-SAR",
            jurisdiction: "US",
            regulator: "US-FinCEN",
            framework: "BSA/AML",
            article: "31 CFR 1020.320",
            kind: ObligationKind::Reporting,
            title: "Suspicious Activity Report",
            description: "File SAR for transactions over $5,000 that are suspicious",
            effective_from: date(1992, 1, 1),
            risk: RiskLevel::Critical,
            penalty: "$500K per violation",
            evidence: &["sar_filing", "investigation_memo", "escalation_record"],
            source: FINCEN_GUIDANCE,
        }
        .build(),
        ObligationRow {
            id: "US-BSA-CTR",
            jurisdiction: "US",
            regulator: "US-FinCEN",
            framework: "BSA/AML",
            article: "31 CFR 1010.311",
            kind: ObligationKind::Reporting,
            title: "Currency Transaction Report",
            description: "File CTR for cash transactions over $10,000",
            effective_from: date(1970, 1, 1),
            risk: RiskLevel::High,
            penalty: "$500K per violation",
            evidence: &["ctr_filing", "transaction_records"],
            source: FINCEN_GUIDANCE,
        }
        .build(),
        ObligationRow {
            id: "EU-AMLD6-CDD",
            jurisdiction: "EU",
            regulator: "EU-EBA",
            framework: "AMLD6",
            article: "Article 13",
            kind: ObligationKind::Requirement,
            title: "Customer Due Diligence",
            description: "Obliged entities must apply CDD measures to customers",
            effective_from: date(2024, 12, 3),
            risk: RiskLevel::Critical,
            penalty: "€5M or 10% annual turnover",
            evidence: &["kyc_records", "risk_rating", "ongoing_monitoring"],
            source: EUR_LEX_AMLD6,
        }
        .build(),
    ]
}

/// Declared conflicts between built-in obligations.
pub fn conflicts() -> Vec<Edge> {
    vec![Edge::conflict(
        &"EU-AMLD6-CDD".into(),
        &"US-BSA-SAR".into(),
        "Privacy vs reporting requirements",
        "medium",
    )]
}

/// Everything above as one seed bundle.
pub fn seed() -> GraphSeed {
    let mut obligations = mica_obligations();
    obligations.extend(eu_ai_act_obligations());
    obligations.extend(aml_obligations());
    GraphSeed {
        jurisdictions: jurisdictions(),
        regulators: regulators(),
        obligations,
        edges: conflicts(),
    }
}
