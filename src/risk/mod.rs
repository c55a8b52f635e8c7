mod engine;

pub use engine::{RiskEngine, RiskFactor, Severity, RISK_FACTORS};
