/// The middleware factory trait for constructible units.
pub mod middleware;

/// Chain steps, the owned chain tail, and step outcomes.
pub mod step;
