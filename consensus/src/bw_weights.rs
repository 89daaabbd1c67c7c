//! Bandwidth-weight balancing.
//!
//! Given the bandwidth of Guard-only (G), Middle (M), Exit-only (E) and
//! Guard+Exit (D) routers out of a total T, solve for the weights clients
//! apply when picking a router for each path position. All arithmetic is
//! integer; divisions truncate, so solutions are checked against a small
//! margin rather than exactly.

use std::fmt;

/// Default `bwweightscale`.
pub const BW_WEIGHT_SCALE: i64 = 10_000;

/// Tolerance used when validating candidate solutions.
pub const BW_WEIGHT_MARGIN: i64 = 10;

// ── Inputs ──────────────────────────────────────────────────────────────────

/// Bandwidth pools accumulated over the consensus routers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BandwidthTotals {
    pub guard: i64,
    pub middle: i64,
    pub exit: i64,
    pub both: i64,
    pub total: i64,
}

impl BandwidthTotals {
    /// Add one router's bandwidth. `guardfraction` is the percentage of time
    /// it is used as a guard; the remainder counts as non-guard bandwidth
    /// in its pool but not towards the total.
    pub fn add_router(&mut self, bandwidth: u32, guardfraction: Option<u32>, is_exit: bool, is_guard: bool) {
        let bandwidth = i64::from(bandwidth);
        let (default_bw, non_guard_bw) = match guardfraction {
            Some(fraction) => {
                let guard_bw = (bandwidth * i64::from(fraction) + 50) / 100;
                (guard_bw, Some(bandwidth - guard_bw))
            }
            None => (bandwidth, None),
        };

        match (is_exit, is_guard) {
            (true, true) => {
                self.both += default_bw;
                self.exit += non_guard_bw.unwrap_or(0);
            }
            (true, false) => self.exit += default_bw,
            (false, true) => {
                self.guard += default_bw;
                self.middle += non_guard_bw.unwrap_or(0);
            }
            (false, false) => self.middle += default_bw,
        }
        self.total += default_bw;
    }
}

// ── Weights ─────────────────────────────────────────────────────────────────

/// The seven independent weights; Wmm and the `b` weights always equal the
/// scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeightSet {
    pub wgg: i64,
    pub wgd: i64,
    pub wmg: i64,
    pub wme: i64,
    pub wmd: i64,
    pub wee: i64,
    pub wed: i64,
}

impl WeightSet {
    /// The `bandwidth-weights` line's key/value pairs, in document order.
    pub fn to_pairs(&self, scale: i64) -> Vec<(String, i64)> {
        [
            ("Wbd", self.wmd),
            ("Wbe", self.wme),
            ("Wbg", self.wmg),
            ("Wbm", scale),
            ("Wdb", scale),
            ("Web", scale),
            ("Wed", self.wed),
            ("Wee", self.wee),
            ("Weg", self.wed),
            ("Wem", self.wee),
            ("Wgb", scale),
            ("Wgd", self.wgd),
            ("Wgg", self.wgg),
            ("Wgm", self.wgg),
            ("Wmb", scale),
            ("Wmd", self.wmd),
            ("Wme", self.wme),
            ("Wmg", self.wmg),
            ("Wmm", scale),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

/// Which balancing case produced a solution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightCase {
    /// Neither guards nor exits are scarce.
    Case1,
    Case2aExitScarce,
    Case2aGuardScarce,
    Case2b1,
    Case2b2,
    /// 2b2 with Wmd clamped to zero.
    Case2b3,
    Case3aGuardScarce,
    Case3aExitScarce,
    Case3bGuardScarce,
    Case3bExitScarce,
}

impl fmt::Display for WeightCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeightCase::Case1 => "Case 1 (Wgd=Wmd=Wed)",
            WeightCase::Case2aExitScarce => "Case 2a (E scarce)",
            WeightCase::Case2aGuardScarce => "Case 2a (G scarce)",
            WeightCase::Case2b1 => "Case 2b1 (Wgg=weight_scale, Wmd=Wgd)",
            WeightCase::Case2b2 => "Case 2b2 (Wgg=weight_scale, Wee=weight_scale)",
            WeightCase::Case2b3 => "Case 2b3 (Wmd=0)",
            WeightCase::Case3aGuardScarce => "Case 3a (G scarce)",
            WeightCase::Case3aExitScarce => "Case 3a (E scarce)",
            WeightCase::Case3bGuardScarce => "Case 3bg (G scarce, Wgg=weight_scale, Wmd == Wed)",
            WeightCase::Case3bExitScarce => "Case 3be (E scarce, Wee=weight_scale, Wmd == Wgd)",
        };
        f.write_str(name)
    }
}

/// A violated weight constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightCheckError {
    Range = 1,
    SumG = 2,
    SumE = 3,
    SumD = 4,
    BalanceMid = 5,
    BalanceEg = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightSolveError {
    /// One of the pools is empty.
    InsufficientData,
    /// The totals fit none of the cases.
    Inconsistent,
    /// The case's solution violates a constraint.
    Unbalanced {
        case: WeightCase,
        error: WeightCheckError,
    },
}

fn within(a: i64, b: i64, margin: i64) -> bool {
    (a - b).abs() <= margin
}

/// Validate a candidate solution.
pub fn check_weights(
    w: &WeightSet,
    t: &BandwidthTotals,
    scale: i64,
    margin: i64,
    balance: bool,
) -> Result<(), WeightCheckError> {
    let (g, m, e, d, total) = (t.guard, t.middle, t.exit, t.both, t.total);

    if !within(w.wed + w.wmd + w.wgd, scale, margin) {
        return Err(WeightCheckError::SumD);
    }
    if !within(w.wmg + w.wgg, scale, margin) {
        return Err(WeightCheckError::SumG);
    }
    if !within(w.wme + w.wee, scale, margin) {
        return Err(WeightCheckError::SumE);
    }
    let all = [w.wgg, w.wgd, w.wmg, w.wme, w.wmd, w.wee, w.wed];
    if all.iter().any(|v| *v < 0 || *v > scale) {
        return Err(WeightCheckError::Range);
    }

    if balance {
        let guard_side = w.wgg * g + w.wgd * d;
        if !within(guard_side, w.wee * e + w.wed * d, (margin * total) / 3) {
            return Err(WeightCheckError::BalanceEg);
        }
        let middle_side = m * scale + w.wmd * d + w.wme * e + w.wmg * g;
        if !within(guard_side, middle_side, (margin * total) / 3) {
            return Err(WeightCheckError::BalanceMid);
        }
    }
    Ok(())
}

// ── Solver ──────────────────────────────────────────────────────────────────

/// Solve for the weights of `totals` at `scale`.
pub fn solve(totals: &BandwidthTotals, scale: i64) -> Result<(WeightCase, WeightSet), WeightSolveError> {
    assert!(scale > 0 && scale <= i64::from(i32::MAX), "weight scale out of range");

    let (g, m, e, d, t) = (
        totals.guard,
        totals.middle,
        totals.exit,
        totals.both,
        totals.total,
    );
    if g <= 0 || m <= 0 || e <= 0 || d <= 0 {
        tracing::warn!(g, m, e, d, t, "consensus with empty bandwidth");
        return Err(WeightSolveError::InsufficientData);
    }

    let s = scale;
    let check = |w: &WeightSet| check_weights(w, totals, s, BW_WEIGHT_MARGIN, true);

    if 3 * e >= t && 3 * g >= t {
        let wee = (s * (e + g + m)) / (3 * e);
        let wmg = (s * (2 * g - e - m)) / (3 * g);
        let w = WeightSet {
            wgd: s / 3,
            wed: s / 3,
            wmd: s / 3,
            wee,
            wme: s - wee,
            wmg,
            wgg: s - wmg,
        };
        return match check(&w) {
            Ok(()) => Ok((WeightCase::Case1, w)),
            Err(error) => Err(unbalanced(WeightCase::Case1, error, totals)),
        };
    }

    if 3 * e < t && 3 * g < t {
        let r = e.min(g);
        let big = e.max(g);
        if r + d < big {
            let (case, wed, wgd) = if e < g {
                (WeightCase::Case2aExitScarce, s, 0)
            } else {
                (WeightCase::Case2aGuardScarce, 0, s)
            };
            let w = WeightSet {
                wgg: s,
                wee: s,
                wmg: 0,
                wme: 0,
                wmd: 0,
                wed,
                wgd,
            };
            return Ok((case, w));
        }

        let wed = (s * (d - 2 * e + 4 * g - 2 * m)) / (3 * d);
        let mut case = WeightCase::Case2b1;
        let mut w = WeightSet {
            wgg: s,
            wee: (s * (e - g + m)) / e,
            wed,
            wme: (s * (g - m)) / e,
            wmg: 0,
            wgd: (s - wed) / 2,
            wmd: (s - wed) / 2,
        };
        let mut result = check(&w);

        if result.is_err() {
            case = WeightCase::Case2b2;
            let wed = (s * (d - 2 * e + g + m)) / (3 * d);
            let mut wmd = (s * (d - 2 * m + g + e)) / (3 * d);
            if wmd < 0 {
                case = WeightCase::Case2b3;
                wmd = 0;
                tracing::warn!(
                    g, m, e, d, t,
                    "too much middle bandwidth on the network to calculate balanced bandwidth-weights; consider increasing the number of guards"
                );
            }
            w = WeightSet {
                wgg: s,
                wee: s,
                wed,
                wmd,
                wme: 0,
                wmg: 0,
                wgd: s - wed - wmd,
            };
            result = check(&w);
        }

        return match result {
            Ok(()) | Err(WeightCheckError::BalanceMid) => Ok((case, w)),
            Err(error) => Err(unbalanced(case, error, totals)),
        };
    }

    // Exactly one of guard or exit bandwidth is scarce.
    if !(3 * e < t || 3 * g < t) || !(3 * g >= t || 3 * e >= t) {
        tracing::warn!(g, m, e, d, t, "bandwidth-weights case 3 without exactly one scarce pool");
        return Err(WeightSolveError::Inconsistent);
    }
    let scarce = e.min(g);

    if 3 * (scarce + d) < t {
        if g < e {
            let wme = if e < m { 0 } else { (s * (e - m)) / (2 * e) };
            let w = WeightSet {
                wgg: s,
                wgd: s,
                wmd: 0,
                wed: 0,
                wmg: 0,
                wme,
                wee: s - wme,
            };
            Ok((WeightCase::Case3aGuardScarce, w))
        } else {
            let wmg = if g < m { 0 } else { (s * (g - m)) / (2 * g) };
            let w = WeightSet {
                wee: s,
                wed: s,
                wmd: 0,
                wgd: 0,
                wme: 0,
                wmg,
                wgg: s - wmg,
            };
            Ok((WeightCase::Case3aExitScarce, w))
        }
    } else {
        let (case, w) = if g < e {
            let wgd = (s * (d - 2 * g + e + m)) / (3 * d);
            let wee = (s * (e + m)) / (2 * e);
            (
                WeightCase::Case3bGuardScarce,
                WeightSet {
                    wgg: s,
                    wgd,
                    wmg: 0,
                    wee,
                    wme: s - wee,
                    wmd: (s - wgd) / 2,
                    wed: (s - wgd) / 2,
                },
            )
        } else {
            let wed = (s * (d - 2 * e + g + m)) / (3 * d);
            let wgg = (s * (g + m)) / (2 * g);
            (
                WeightCase::Case3bExitScarce,
                WeightSet {
                    wee: s,
                    wed,
                    wme: 0,
                    wgg,
                    wmg: s - wgg,
                    wmd: (s - wed) / 2,
                    wgd: (s - wed) / 2,
                },
            )
        };
        match check(&w) {
            Ok(()) => Ok((case, w)),
            Err(error) => Err(unbalanced(case, error, totals)),
        }
    }
}

fn unbalanced(case: WeightCase, error: WeightCheckError, t: &BandwidthTotals) -> WeightSolveError {
    tracing::warn!(
        case = %case,
        error = ?error,
        g = t.guard,
        m = t.middle,
        e = t.exit,
        d = t.both,
        total = t.total,
        "bandwidth-weight solution failed validation"
    );
    WeightSolveError::Unbalanced { case, error }
}

/// The `bandwidth-weights` pairs for `totals`, or `None` when no balanced
/// solution exists.
pub fn compute_bandwidth_weights(totals: &BandwidthTotals, scale: i64) -> Option<Vec<(String, i64)>> {
    match solve(totals, scale) {
        Ok((case, w)) => {
            tracing::info!(case = %case, "computed bandwidth weights");
            Some(w.to_pairs(scale))
        }
        Err(_) => None,
    }
}
