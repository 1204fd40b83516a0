//! Asset criticality component.

use super::{within, ComponentResult, WeightedMean};
use crate::types::Asset;

/// Share of the blended value taken from the criticality enum.
const ENUM_BLEND: f64 = 0.6;

/// Share of the blended value taken from the external device-risk signal.
const EXTERNAL_BLEND: f64 = 0.4;

/// Weighted mean of per-asset criticality, scaled by exposure.
///
/// Per asset: the criticality base value (1–5), blended 60/40 with the
/// external risk signal when one is present, multiplied by the exposure
/// factor. Each asset is weighted by the number of services depending on it
/// (at least 1). Assets whose external signal lies outside 0–5 are skipped.
pub fn asset_criticality(assets: &[Asset]) -> ComponentResult {
    let mut mean = WeightedMean::default();

    for asset in assets {
        let base = asset.criticality.base_value();
        let blended = match asset.external_risk_score {
            Some(external) if !within(external, 0.0, 5.0) => {
                mean.skip();
                continue;
            }
            Some(external) => base * ENUM_BLEND + external * EXTERNAL_BLEND,
            None => base,
        };

        let value = blended * asset.exposure.factor();
        let weight = asset.service_ids.len().max(1) as f64;
        mean.add(value, weight);
    }

    mean.finish()
}
