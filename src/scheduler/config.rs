/// Tunable constants of a scheduling run.
///
/// Defaults match the reference behavior of the problem: half the network
/// capacity reserved before admission stops, at most 128 vehicles on the
/// road, and a fifty-percent preference for the ideal path on departure.
///
/// # Example
/// ```
/// use traffic_sched_core::scheduler::config::SchedulerConfig;
/// let config = SchedulerConfig::default()
///     .with_on_road_soft_cap(64)
///     .with_rng_seed(7);
/// assert_eq!(config.on_road_soft_cap, 64);
/// assert_eq!(config.capacity_threshold, 0.5);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Fraction of the total network cell capacity reserved as the admission
    /// block cap.
    pub capacity_threshold: f64,
    /// Fraction of a single road's capacity reserved before the road itself
    /// stops admitting. Zero keeps roads open until their lanes saturate.
    pub road_block_threshold: f64,
    /// Upper bound on concurrently on-road vehicles.
    pub on_road_soft_cap: usize,
    /// Probability of departing along the ideal path when it is open.
    pub p_ideal: f64,
    /// Maximum simple paths collected per routing call.
    pub path_enum_max: usize,
    /// Maximum simple-path probes spent per routing call.
    pub path_probe_max: usize,
    /// Seed of the run's random generator.
    pub rng_seed: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            capacity_threshold: 0.5,
            road_block_threshold: 0.0,
            on_road_soft_cap: 128,
            p_ideal: 0.5,
            path_enum_max: 10,
            path_probe_max: 100,
            rng_seed: 2019,
        }
    }
}

impl SchedulerConfig {
    /// Sets the network admission block fraction.
    pub fn with_capacity_threshold(mut self, threshold: f64) -> Self {
        self.capacity_threshold = threshold;
        self
    }

    /// Sets the per-road block fraction.
    pub fn with_road_block_threshold(mut self, threshold: f64) -> Self {
        self.road_block_threshold = threshold;
        self
    }

    /// Sets the upper bound on concurrently on-road vehicles.
    pub fn with_on_road_soft_cap(mut self, cap: usize) -> Self {
        self.on_road_soft_cap = cap;
        self
    }

    /// Sets the probability of departing along the ideal path.
    pub fn with_p_ideal(mut self, p: f64) -> Self {
        self.p_ideal = p;
        self
    }

    /// Sets the maximum simple paths collected per routing call.
    pub fn with_path_enum_max(mut self, max: usize) -> Self {
        self.path_enum_max = max;
        self
    }

    /// Sets the maximum simple-path probes per routing call.
    pub fn with_path_probe_max(mut self, max: usize) -> Self {
        self.path_probe_max = max;
        self
    }

    /// Sets the seed of the run's random generator.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }
}
