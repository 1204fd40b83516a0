//! Service criticality component.

use super::{within, ComponentResult, WeightedMean};
use crate::types::Service;

const MAX_SERVICE_SCORE: f64 = 10.0;

/// Weighted mean of per-service criticality.
///
/// Per service, starting from its 0–10 criticality score, add:
/// - `(1 - availability_requirement) * 10`
/// - `log10(max(user_impact, 1)) / 3`
/// - `min(financial_impact_per_hour / 10000, 5)`
/// - `min(dependencies * 0.5, 3)`
///
/// The per-service total is capped at 10 and weighted by
/// `1 + dependencies * 0.1`.
pub fn service_criticality(services: &[Service]) -> ComponentResult {
    let mut mean = WeightedMean::default();

    for service in services {
        if !is_well_formed(service) {
            mean.skip();
            continue;
        }

        let dependencies = f64::from(service.dependencies);
        let availability = (1.0 - service.availability_requirement) * 10.0;
        let user_impact = (service.user_impact.max(1) as f64).log10() / 3.0;
        let financial = (service.financial_impact_per_hour / 10_000.0).min(5.0);
        let dependency = (dependencies * 0.5).min(3.0);

        let score = (service.criticality_score + availability + user_impact + financial + dependency)
            .min(MAX_SERVICE_SCORE);
        mean.add(score, 1.0 + dependencies * 0.1);
    }

    mean.finish()
}

fn is_well_formed(service: &Service) -> bool {
    within(service.criticality_score, 0.0, 10.0)
        && within(service.availability_requirement, 0.0, 1.0)
        && service.financial_impact_per_hour.is_finite()
        && service.financial_impact_per_hour >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ServiceId;

    fn service(criticality: f64, availability: f64, users: u64, financial: f64, deps: u32) -> Service {
        Service {
            id: ServiceId::new(),
            name: "payments".to_string(),
            criticality_score: criticality,
            availability_requirement: availability,
            user_impact: users,
            financial_impact_per_hour: financial,
            dependencies: deps,
        }
    }

    #[test]
    fn test_no_services() {
        assert_eq!(service_criticality(&[]), ComponentResult::empty(0));
    }

    #[test]
    fn test_single_service_formula() {
        // 4 + (1 - 0.9) * 10 + log10(1000) / 3 + min(20000/10000, 5) + min(2 * 0.5, 3)
        // = 4 + 1 + 1 + 2 + 1 = 9
        let result = service_criticality(&[service(4.0, 0.9, 1000, 20_000.0, 2)]);
        assert!((result.value - 9.0).abs() < 1e-9);
        assert_eq!(result.evaluated, 1);
    }

    #[test]
    fn test_service_score_capped() {
        let result = service_criticality(&[service(9.0, 0.0, 1_000_000, 1_000_000.0, 20)]);
        assert!((result.value - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_users_treated_as_one() {
        let result = service_criticality(&[service(2.0, 1.0, 0, 0.0, 0)]);
        assert!((result.value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_by_dependencies() {
        // First: 1 + 0 + 0 + 0 + min(10 * 0.5, 3) = 4, weight 2.0
        // Second: 1, weight 1.0
        let result = service_criticality(&[
            service(1.0, 1.0, 1, 0.0, 10),
            service(1.0, 1.0, 1, 0.0, 0),
        ]);
        assert!((result.value - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_service_skipped() {
        let result = service_criticality(&[
            service(11.0, 0.5, 1, 0.0, 0),
            service(2.0, 1.5, 1, 0.0, 0),
            service(2.0, 1.0, 1, 0.0, 0),
        ]);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.evaluated, 1);
        assert!((result.value - 2.0).abs() < 1e-12);
    }
}
