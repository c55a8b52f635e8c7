//! Static curriculum graph and the time / exercise lookup tables.

use crate::model::{DifficultyLevel, LearningStyle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    #[default]
    Bitcoin,
    Stacks,
}

impl Domain {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" => Some(Domain::Bitcoin),
            "stacks" => Some(Domain::Stacks),
            _ => None,
        }
    }
}

const BITCOIN_BEGINNER: &[&str] = &[
    "what-is-bitcoin",
    "digital-signatures",
    "transactions-basics",
    "wallets-and-keys",
    "bitcoin-network",
];
const BITCOIN_INTERMEDIATE: &[&str] = &[
    "mining-and-consensus",
    "script-language",
    "lightning-network",
    "privacy-concepts",
    "economic-incentives",
];
const BITCOIN_ADVANCED: &[&str] = &[
    "taproot-upgrade",
    "layer-2-solutions",
    "bitcoin-development",
    "security-analysis",
    "protocol-governance",
];
const BITCOIN_EXPERT: &[&str] = &[
    "core-development",
    "research-frontiers",
    "cryptographic-proofs",
    "consensus-improvements",
    "scaling-solutions",
];

const STACKS_BEGINNER: &[&str] = &[
    "stacks-overview",
    "clarity-basics",
    "smart-contracts-intro",
    "wallet-integration",
    "simple-dapp",
];
const STACKS_INTERMEDIATE: &[&str] = &[
    "advanced-clarity",
    "nft-development",
    "defi-protocols",
    "testing-contracts",
    "deployment-strategies",
];
const STACKS_ADVANCED: &[&str] = &[
    "complex-defi",
    "cross-chain-interactions",
    "performance-optimization",
    "security-auditing",
    "governance-systems",
];

/// Ordered topics for a tier, or `None` when the domain has no such tier.
pub fn sequence(domain: Domain, level: DifficultyLevel) -> Option<&'static [&'static str]> {
    use DifficultyLevel::*;
    match (domain, level) {
        (Domain::Bitcoin, Beginner) => Some(BITCOIN_BEGINNER),
        (Domain::Bitcoin, Intermediate) => Some(BITCOIN_INTERMEDIATE),
        (Domain::Bitcoin, Advanced) => Some(BITCOIN_ADVANCED),
        (Domain::Bitcoin, Expert) => Some(BITCOIN_EXPERT),
        (Domain::Stacks, Beginner) => Some(STACKS_BEGINNER),
        (Domain::Stacks, Intermediate) => Some(STACKS_INTERMEDIATE),
        (Domain::Stacks, Advanced) => Some(STACKS_ADVANCED),
        (Domain::Stacks, Expert) => None,
    }
}

/// Three exercise formats per learning style.
pub fn exercise_types(style: LearningStyle) -> [&'static str; 3] {
    match style {
        LearningStyle::Visual => ["diagram-creation", "flowchart-analysis", "visual-simulation"],
        LearningStyle::Auditory => ["podcast-analysis", "discussion-questions", "verbal-explanation"],
        LearningStyle::Kinesthetic => ["hands-on-coding", "interactive-demo", "practical-project"],
        LearningStyle::ReadingWriting => {
            ["technical-writing", "code-review", "documentation-analysis"]
        }
    }
}

/// Minutes per exercise format.
pub fn exercise_minutes(kind: &str) -> u32 {
    match kind {
        "hands-on-coding" => 45,
        "diagram-creation" => 30,
        "discussion-questions" => 20,
        "technical-writing" => 35,
        "interactive-demo" => 25,
        _ => 30,
    }
}

/// Nominal minutes to study a topic before the learning-speed adjustment.
pub fn topic_base_minutes(topic: &str) -> u32 {
    match topic {
        "bitcoin-basics" => 120,
        "smart-contracts" => 180,
        "defi-concepts" => 150,
        "stacks-development" => 240,
        _ => 150,
    }
}

/// Minutes for a generated remediation module on `topic`.
pub fn module_minutes(topic: &str) -> u32 {
    match topic {
        "bitcoin-basics" => 180,
        "blockchain-fundamentals" => 240,
        "cryptography" => 300,
        "smart-contracts" => 360,
        "stacks-ecosystem" => 240,
        "defi-concepts" => 300,
        _ => 240,
    }
}
