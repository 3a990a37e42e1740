//! Pure match-timeline algorithms.
//!
//! Everything in here works on in-memory snapshots of a [`MatchEntity`] and takes
//! its randomness as an injected [`rand::Rng`], so seeded generators give
//! reproducible results in tests. Persistence and locking live in the service
//! layer.
//!
//! [`MatchEntity`]: crate::dao::models::MatchEntity

pub mod balancer;
pub mod clock;
pub mod dealing;
pub mod duel;
pub mod lifecycle;
pub mod placeholder;
pub mod scheduler;
pub mod victory;
pub mod visibility;

#[cfg(test)]
pub(crate) mod test_support;
