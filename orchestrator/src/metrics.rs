use std::time::Duration;

/// Counters and timings accumulated over the life of an orchestrator.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PipelineMetrics {
    pub generating_time: Duration,
    pub training_time: Duration,
    pub waiting_time: Duration,

    pub cycles: u64,
    pub episodes: u64,
    pub failed_episodes: u64,
    pub diverged_cycles: u64,
}

impl PipelineMetrics {
    #[inline]
    pub fn bump_cycle(&mut self) {
        self.cycles += 1;
    }

    #[inline]
    pub fn bump_episode(&mut self) {
        self.episodes += 1;
    }

    #[inline]
    pub fn bump_failed_episode(&mut self) {
        self.failed_episodes += 1;
    }

    #[inline]
    pub fn bump_diverged_cycle(&mut self) {
        self.diverged_cycles += 1;
    }
}
