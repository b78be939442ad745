//! Fair-share distribution of a capped effort pool.
//!
//! # Algorithm
//!
//! Each round weights the open requests by remaining work and offers every
//! request `effort × weight`, cut down to its own cap (`max × period`) and
//! to its remaining work. Requests that were cut are settled at their cut
//! share and leave the pool; the rest of the effort is re-weighted among the
//! others. When no request is cut, everyone left takes the offered share.
//!
//! Every round settles at least one request or terminates, so at most
//! `n` rounds run. Uncapped requests end with equal effort/remaining ratios.
//!
//! # Reference
//! Bertsekas & Gallager (1992), "Data Networks", Ch. 6.5.2 (Max-Min Fairness)

/// One participant in a distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareRequest {
    /// Remaining work.
    pub remaining: f64,
    /// Resources per day of period. `None` = unbounded.
    pub max_per_period: Option<f64>,
}

impl ShareRequest {
    /// Creates a request.
    pub fn new(remaining: f64, max_per_period: Option<f64>) -> Self {
        Self {
            remaining,
            max_per_period,
        }
    }

    fn limit(&self, period: f64) -> f64 {
        let cap = self.max_per_period.map_or(f64::INFINITY, |m| m * period);
        cap.min(self.remaining)
    }
}

/// Splits `effort` among `requests`. Returns one share per request, in order.
///
/// # Examples
///
/// ```
/// use u_capacity::scheduler::{distribute, ShareRequest};
///
/// let shares = distribute(
///     &[ShareRequest::new(10.0, Some(1.0)), ShareRequest::new(30.0, Some(6.0))],
///     30.0,
///     5.0,
/// );
/// assert!((shares[0] - 5.0).abs() < 1e-10);
/// assert!((shares[1] - 25.0).abs() < 1e-10);
/// ```
pub fn distribute(requests: &[ShareRequest], effort: f64, period: f64) -> Vec<f64> {
    let mut shares = vec![0.0; requests.len()];
    if effort <= 0.0 {
        return shares;
    }

    let mut open: Vec<usize> = (0..requests.len()).collect();
    let mut pool = effort;

    while !open.is_empty() {
        if open.len() == 1 {
            let only = open[0];
            shares[only] = requests[only].limit(period).min(pool).max(0.0);
            break;
        }

        let total: f64 = open.iter().map(|&i| requests[i].remaining).sum();
        if total <= 0.0 {
            break;
        }

        let mut still_open = Vec::with_capacity(open.len());
        let mut settled = 0.0;
        for &i in &open {
            let fair = pool * requests[i].remaining / total;
            let share = fair.min(requests[i].limit(period));
            shares[i] = share.max(0.0);
            if share < fair {
                settled += share;
            } else {
                still_open.push(i);
            }
        }

        if still_open.len() == open.len() {
            break;
        }
        pool -= settled;
        open = still_open;
    }

    shares
}
