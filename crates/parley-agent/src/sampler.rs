//! Sampling from the bid space.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{Bid, Domain, Value};
use crate::profile::LinearAdditiveProfile;

/// Two weighted value utilities closer than this are treated as tied.
const TIE_TOLERANCE: f64 = 1e-9;

/// Black-box access to the full combinatorial bid space.
pub trait BidSampler {
    /// Draws a complete bid uniformly at random from the whole space.
    fn random_bid<R: Rng + ?Sized>(&self, rng: &mut R) -> Bid;

    /// All complete bids tied for maximum own utility.
    fn max_utility_bids(&self) -> &[Bid];
}

/// Bid space of a [`LinearAdditiveProfile`].
///
/// Random bids pick every issue's value independently and uniformly, which
/// is uniform over the product space without enumerating it. The maximum
/// bids are the product of each issue's best values.
#[derive(Debug, Clone)]
pub struct LinearBidSpace {
    domain: Domain,
    max_bids: Vec<Bid>,
}

impl LinearBidSpace {
    /// Builds the bid space for a profile.
    #[must_use]
    pub fn new(profile: &LinearAdditiveProfile) -> Self {
        let best_values: Vec<(&str, Vec<&Value>)> = profile
            .domain
            .issues
            .iter()
            .map(|issue| {
                let best = issue
                    .values
                    .iter()
                    .map(|v| profile.weighted_value_utility(&issue.name, v))
                    .fold(f64::NEG_INFINITY, f64::max);
                let tied = issue
                    .values
                    .iter()
                    .filter(|v| {
                        (profile.weighted_value_utility(&issue.name, v) - best).abs() <= TIE_TOLERANCE
                    })
                    .collect();
                (issue.name.as_str(), tied)
            })
            .collect();

        let mut partials: Vec<Vec<(&str, &Value)>> = vec![Vec::new()];
        for (issue, values) in &best_values {
            partials = partials
                .into_iter()
                .flat_map(|partial| {
                    values.iter().map(move |value| {
                        let mut next = partial.clone();
                        next.push((*issue, *value));
                        next
                    })
                })
                .collect();
        }
        let max_bids = partials
            .into_iter()
            .map(|pairs| Bid::new(pairs.into_iter().map(|(i, v)| (i, v.clone()))))
            .collect();

        Self {
            domain: profile.domain.clone(),
            max_bids,
        }
    }

    /// The domain this space spans.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }
}

impl BidSampler for LinearBidSpace {
    fn random_bid<R: Rng + ?Sized>(&self, rng: &mut R) -> Bid {
        let mut pairs = Vec::with_capacity(self.domain.issue_count());
        for issue in &self.domain.issues {
            if let Some(value) = issue.values.choose(rng) {
                pairs.push((issue.name.as_str(), value.clone()));
            }
        }
        Bid::new(pairs)
    }

    fn max_utility_bids(&self) -> &[Bid] {
        &self.max_bids
    }
}
