//! Capacity arithmetic and bundle validation.
//
//  This module is deliberately pure: no async, no IO. The auctioneer feeds
//  it market rows; everything here is plain math over the four-resource
//  vector.

use serde::Deserialize;

use economy::error::{EconomyError, Result};
use economy::model::{ResourceBundle, ResourceKind, new_id};

pub const MIN_PRICE: f64 = 0.01;
pub const MAX_PRICE: f64 = 1000.0;

/// Seed rows for a fresh market: `(kind, available supply, starting price)`.
pub const MARKET_RESOURCES: [(ResourceKind, f64, f64); 4] = [
    (ResourceKind::Cpu, 10.0, 1.0),
    (ResourceKind::Memory, 1024.0, 0.1),
    (ResourceKind::Tokens, 1_000_000.0, 0.001),
    (ResourceKind::Attention, 1.0, 10.0),
];

pub fn clamp_price(price: f64) -> f64 {
    price.clamp(MIN_PRICE, MAX_PRICE)
}

/// A quantity per resource kind, indexed in `ResourceKind::ALL` order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceVector([f64; 4]);

impl ResourceVector {
    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.0[Self::index(kind)]
    }

    pub fn set(&mut self, kind: ResourceKind, value: f64) {
        self.0[Self::index(kind)] = value;
    }

    pub fn add(&mut self, kind: ResourceKind, value: f64) {
        self.0[Self::index(kind)] += value;
    }

    pub fn from_bundle(bundle: &ResourceBundle) -> Self {
        let mut v = Self::default();
        for kind in ResourceKind::ALL {
            v.set(kind, bundle.fraction(kind));
        }
        v
    }

    fn index(kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Cpu => 0,
            ResourceKind::Memory => 1,
            ResourceKind::Tokens => 2,
            ResourceKind::Attention => 3,
        }
    }
}

/// All-or-nothing feasibility: the request fits only if every resource
/// dimension fits on top of what earlier winners already consumed.
pub fn fits(request: &ResourceVector, consumed: &ResourceVector, supply: &ResourceVector) -> bool {
    ResourceKind::ALL
        .iter()
        .all(|&kind| consumed.get(kind) + request.get(kind) <= supply.get(kind))
}

/// Reject bundles outside the contract: fractions in [0,1], positive duration.
pub fn validate_bundle(bundle: &ResourceBundle) -> Result<()> {
    for kind in ResourceKind::ALL {
        let fraction = bundle.fraction(kind);
        if !(0.0..=1.0).contains(&fraction) {
            return Err(EconomyError::InvalidState(format!(
                "{kind} fraction {fraction} outside [0,1]"
            )));
        }
    }
    if bundle.duration_seconds <= 0.0 {
        return Err(EconomyError::InvalidState(format!(
            "duration_seconds must be positive, got {}",
            bundle.duration_seconds
        )));
    }
    Ok(())
}

/// Surface-side bundle description. Canonical fields are the fractional
/// ones; the legacy absolute fields are accepted for old submitters and
/// normalized against configured supply at ingestion. Only the fractional
/// form is ever persisted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleRequest {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub tokens_percent: Option<f64>,
    pub attention_percent: Option<f64>,
    pub duration_seconds: Option<f64>,

    // Legacy absolute fields.
    pub cpu_seconds: Option<f64>,
    pub memory_mb: Option<f64>,
    pub tokens: Option<f64>,
    pub attention_share: Option<f64>,
}

impl BundleRequest {
    pub fn normalize(&self, supply: &ResourceVector) -> Result<ResourceBundle> {
        let fraction = |canonical: Option<f64>, legacy: Option<f64>, kind: ResourceKind| {
            canonical.unwrap_or_else(|| {
                let total = supply.get(kind);
                match legacy {
                    Some(absolute) if total > 0.0 => absolute / total,
                    _ => 0.0,
                }
            })
        };

        let bundle = ResourceBundle {
            id: new_id(),
            cpu_percent: fraction(self.cpu_percent, self.cpu_seconds, ResourceKind::Cpu),
            memory_percent: fraction(self.memory_percent, self.memory_mb, ResourceKind::Memory),
            tokens_percent: fraction(self.tokens_percent, self.tokens, ResourceKind::Tokens),
            // The legacy attention field was already a share, not an amount.
            attention_percent: self.attention_percent.or(self.attention_share).unwrap_or(0.0),
            duration_seconds: self.duration_seconds.or(self.cpu_seconds).unwrap_or(0.0),
        };

        validate_bundle(&bundle)?;
        Ok(bundle)
    }
}

/// Default supply vector from `MARKET_RESOURCES`.
pub fn default_supply() -> ResourceVector {
    let mut v = ResourceVector::default();
    for (kind, supply, _) in MARKET_RESOURCES {
        v.set(kind, supply);
    }
    v
}
