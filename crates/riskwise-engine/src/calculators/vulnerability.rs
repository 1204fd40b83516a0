//! Vulnerability exposure component.

use super::{within, ComponentResult, WeightedMean};
use crate::types::Vulnerability;

const MAX_VULNERABILITY_SCORE: f64 = 10.0;
const EXPLOIT_AVAILABLE_MULTIPLIER: f64 = 1.5;
const PUBLIC_EXPLOIT_MULTIPLIER: f64 = 2.0;
const UNPATCHED_MULTIPLIER: f64 = 1.3;
const STALE_PATCH_MULTIPLIER: f64 = 1.2;
const STALE_PATCH_DAYS: u32 = 30;

/// Plain average of adjusted CVSS scores across all vulnerabilities.
///
/// Per vulnerability the CVSS base score is multiplied by:
/// - 1.5 when an exploit is available,
/// - 2.0 more when the exploit is public,
/// - 1.3 when no patch exists, otherwise 1.2 when the patch has been
///   available for more than 30 days,
/// - the attack complexity factor (low 1.5, medium 1.0, high 0.7),
///
/// and capped at 10. Findings with a CVSS outside 0–10 are skipped.
pub fn vulnerability_score(vulnerabilities: &[Vulnerability]) -> ComponentResult {
    let mut mean = WeightedMean::default();

    for vuln in vulnerabilities {
        if !within(vuln.cvss_score, 0.0, 10.0) {
            mean.skip();
            continue;
        }
        mean.add(adjusted_score(vuln), 1.0);
    }

    mean.finish()
}

fn adjusted_score(vuln: &Vulnerability) -> f64 {
    let mut score = vuln.cvss_score;

    if vuln.exploit_available {
        score *= EXPLOIT_AVAILABLE_MULTIPLIER;
    }
    if vuln.public_exploit {
        score *= PUBLIC_EXPLOIT_MULTIPLIER;
    }

    if !vuln.patch_available {
        score *= UNPATCHED_MULTIPLIER;
    } else if vuln
        .days_since_patch
        .is_some_and(|days| days > STALE_PATCH_DAYS)
    {
        score *= STALE_PATCH_MULTIPLIER;
    }

    score *= vuln.attack_complexity.multiplier();
    score.min(MAX_VULNERABILITY_SCORE)
}
