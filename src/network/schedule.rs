use crate::network::spec::NetworkConfig;

/// Table maintenance due after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Maintenance {
    pub rehash: bool,
    pub rebuild: bool,
}

/// Decides, per batch step, when hashed layers rehash or rebuild.
///
/// Periods are counted in batches: `interval / batch_size`, at least 1. A
/// maintenance kind is due on the last batch of each period, i.e. when
/// `step % period == period - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RehashSchedule {
    pub rehash_period: usize,
    pub rebuild_period: usize,
    /// False when the layer mode never maintains its tables.
    pub enabled: bool,
}

impl RehashSchedule {
    pub fn from_config(config: &NetworkConfig) -> RehashSchedule {
        let batch = config.batch_size.max(1);
        let rehash_period = (config.rehash_interval / batch).max(1);
        // Older runs computed the rebuild trigger with the rehash divisor.
        let rebuild_period = if config.legacy_rebuild_trigger {
            rehash_period
        } else {
            (config.rebuild_interval / batch).max(1)
        };
        RehashSchedule {
            rehash_period,
            rebuild_period,
            enabled: config.layer_mode.maintains_tables(),
        }
    }

    pub fn due(&self, step: usize) -> Maintenance {
        if !self.enabled {
            return Maintenance::default();
        }
        Maintenance {
            rehash: step % self.rehash_period == self.rehash_period - 1,
            rebuild: step % self.rebuild_period == self.rebuild_period - 1,
        }
    }
}
