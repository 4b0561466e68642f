//! Environmental metrics and the aggregate sustainability score.

use serde::{Deserialize, Serialize};

use crate::registry;
use crate::store::{StoreKey, Transaction};
use crate::types::{AccommodationId, CallContext, Height};
use crate::{Error, Result};

pub const MAX_PERCENT_METRIC: u32 = 100;
pub const MAX_CARBON_RATING: u32 = 10;

/// Raw metric inputs. Every update resupplies all six.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub energy_efficiency: u32,
    pub water_conservation: u32,
    pub waste_management: u32,
    pub renewable_energy: u32,
    /// Lower is better.
    pub carbon_footprint: u32,
    pub local_sourcing: u32,
}

impl Metrics {
    /// Worst-case metrics written at registration.
    pub fn seed() -> Self {
        Self {
            energy_efficiency: 0,
            water_conservation: 0,
            waste_management: 0,
            renewable_energy: 0,
            carbon_footprint: MAX_CARBON_RATING,
            local_sourcing: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let percent_fields = [
            ("energy_efficiency", self.energy_efficiency),
            ("water_conservation", self.water_conservation),
            ("waste_management", self.waste_management),
            ("renewable_energy", self.renewable_energy),
            ("local_sourcing", self.local_sourcing),
        ];
        for (field, value) in percent_fields {
            if value > MAX_PERCENT_METRIC {
                return Err(Error::InvalidInput(format!(
                    "{field} must be within 0..={MAX_PERCENT_METRIC}, got {value}"
                )));
            }
        }
        if self.carbon_footprint > MAX_CARBON_RATING {
            return Err(Error::InvalidInput(format!(
                "carbon_footprint must be within 0..={MAX_CARBON_RATING}, got {}",
                self.carbon_footprint
            )));
        }
        Ok(())
    }

    /// Truncated mean of the five percentages and the inverted carbon rating.
    pub fn sustainability_score(&self) -> u32 {
        let carbon_term = 100u32.saturating_sub(self.carbon_footprint.saturating_mul(10));
        let total: u64 = [
            self.energy_efficiency,
            self.water_conservation,
            self.waste_management,
            self.renewable_energy,
            carbon_term,
            self.local_sourcing,
        ]
        .into_iter()
        .map(u64::from)
        .sum();
        u32::try_from(total / 6).unwrap_or(u32::MAX)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalStandards {
    #[serde(flatten)]
    pub metrics: Metrics,
    pub overall_sustainability_score: u32,
    pub last_updated: Height,
}

impl EnvironmentalStandards {
    fn from_metrics(metrics: Metrics, height: Height) -> Self {
        Self {
            overall_sustainability_score: metrics.sustainability_score(),
            metrics,
            last_updated: height,
        }
    }
}

pub fn get(tx: &Transaction<'_>, id: AccommodationId) -> Result<Option<EnvironmentalStandards>> {
    tx.read(&StoreKey::Standards(id))
}

pub(crate) fn seed(tx: &mut Transaction<'_>, id: AccommodationId, height: Height) -> Result<()> {
    let record = EnvironmentalStandards::from_metrics(Metrics::seed(), height);
    tx.write(&StoreKey::Standards(id), &record)
}

pub(crate) fn update(
    tx: &mut Transaction<'_>,
    ctx: &CallContext,
    id: AccommodationId,
    metrics: Metrics,
) -> Result<u32> {
    let may_update = registry::is_owner(tx, id, &ctx.caller)?
        || registry::is_authorized_auditor(tx, &ctx.caller)?;
    if !may_update {
        return Err(Error::NotAuthorized(format!(
            "{} is neither the owner of accommodation {id} nor an authorized auditor",
            ctx.caller
        )));
    }

    let accommodation = registry::require_accommodation(tx, id)?;
    metrics.validate()?;
    registry::require_active(&accommodation)?;

    let record = EnvironmentalStandards::from_metrics(metrics, ctx.height);
    let score = record.overall_sustainability_score;
    tx.write(&StoreKey::Standards(id), &record)?;
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(e: u32, w: u32, wa: u32, r: u32, c: u32, l: u32) -> Metrics {
        Metrics {
            energy_efficiency: e,
            water_conservation: w,
            waste_management: wa,
            renewable_energy: r,
            carbon_footprint: c,
            local_sourcing: l,
        }
    }

    #[test]
    fn score_is_truncated_mean_with_inverted_carbon() {
        assert_eq!(metrics(80, 80, 80, 20, 2, 50).sustainability_score(), 65);
        assert_eq!(metrics(100, 100, 100, 100, 0, 100).sustainability_score(), 100);
        // 0+0+0+0+0+5 = 5 -> 0
        assert_eq!(metrics(0, 0, 0, 0, 10, 5).sustainability_score(), 0);
        // 91+90+90+90+90+90 = 541 -> 90
        assert_eq!(metrics(91, 90, 90, 90, 1, 90).sustainability_score(), 90);
    }

    #[test]
    fn seed_scores_zero() {
        assert_eq!(Metrics::seed().sustainability_score(), 0);
    }

    #[test]
    fn out_of_range_metrics_rejected() {
        assert!(metrics(101, 0, 0, 0, 0, 0).validate().is_err());
        assert!(metrics(0, 0, 0, 0, 11, 0).validate().is_err());
        assert!(metrics(0, 0, 0, 0, 0, 101).validate().is_err());
        assert!(metrics(100, 100, 100, 100, 10, 100).validate().is_ok());
    }

    #[test]
    fn serialized_record_is_flat() {
        let record = EnvironmentalStandards::from_metrics(metrics(80, 80, 80, 20, 2, 50), 9);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["carbonFootprint"], 2);
        assert_eq!(json["overallSustainabilityScore"], 65);
        assert_eq!(json["lastUpdated"], 9);
    }
}
