//! Aggregate statistics collected while the simulation runs, and the
//! final human-readable report derived from them.

use bevy_ecs::prelude::Resource;

#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct Statistics {
    pub total_assignments: u64,
    pub expired_resources: u64,
    pub total_resources_seen: u64,
    pub total_cruise_time: u64,
    pub total_approach_time: u64,
    pub total_search_time: u64,
    pub total_wait_time: u64,
    pub total_benefit: f64,
    pub pool_count: u64,
    pub total_pool_time: u64,
}

fn average(total: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

/// A point-in-time snapshot of [`Statistics`], reduced to the averages and
/// totals the external interface reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulationReport {
    pub total_assignments: u64,
    pub average_search_time: f64,
    pub average_cruise_time: f64,
    pub average_approach_time: f64,
    pub average_wait_time: f64,
    pub expired_resources: u64,
    pub total_resources_seen: u64,
    pub expiration_rate: f64,
    pub pool_count: u64,
    pub total_pool_time: u64,
    pub average_pool_time: f64,
    pub average_benefit_per_agent: f64,
}

impl Statistics {
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            total_assignments: self.total_assignments,
            average_search_time: average(self.total_search_time, self.total_assignments),
            average_cruise_time: average(self.total_cruise_time, self.total_assignments),
            average_approach_time: average(self.total_approach_time, self.total_assignments),
            average_wait_time: average(self.total_wait_time, self.total_assignments),
            expired_resources: self.expired_resources,
            total_resources_seen: self.total_resources_seen,
            expiration_rate: average(self.expired_resources, self.total_resources_seen),
            pool_count: self.pool_count,
            total_pool_time: self.total_pool_time,
            average_pool_time: if self.pool_count == 0 {
                0.0
            } else {
                self.total_pool_time as f64 / self.pool_count as f64
            },
            average_benefit_per_agent: if self.total_assignments == 0 {
                0.0
            } else {
                self.total_benefit / self.total_assignments as f64
            },
        }
    }
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Simulation report")?;
        writeln!(f, "  total assignments:       {}", self.total_assignments)?;
        writeln!(f, "  average search time:     {:.2}s", self.average_search_time)?;
        writeln!(f, "  average cruise time:     {:.2}s", self.average_cruise_time)?;
        writeln!(f, "  average approach time:   {:.2}s", self.average_approach_time)?;
        writeln!(f, "  average wait time:       {:.2}s", self.average_wait_time)?;
        writeln!(f, "  resources seen:          {}", self.total_resources_seen)?;
        writeln!(f, "  resources expired:       {}", self.expired_resources)?;
        writeln!(f, "  expiration rate:         {:.2}%", self.expiration_rate * 100.0)?;
        writeln!(f, "  pools closed:            {}", self.pool_count)?;
        writeln!(f, "  total pool time:         {}s", self.total_pool_time)?;
        writeln!(f, "  average pool time:       {:.2}s", self.average_pool_time)?;
        write!(f, "  average benefit/agent:   {:.4}", self.average_benefit_per_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_handles_zero_assignments_without_dividing_by_zero() {
        let stats = Statistics::default();
        let report = stats.report();
        assert_eq!(report.average_cruise_time, 0.0);
        assert_eq!(report.expiration_rate, 0.0);
        assert_eq!(report.average_benefit_per_agent, 0.0);
    }

    #[test]
    fn report_averages_accumulated_totals() {
        let stats = Statistics {
            total_assignments: 2,
            total_cruise_time: 100,
            total_approach_time: 40,
            total_search_time: 140,
            total_wait_time: 20,
            total_benefit: 1.5,
            expired_resources: 1,
            total_resources_seen: 4,
            pool_count: 3,
            total_pool_time: 90,
        };
        let report = stats.report();
        assert_eq!(report.average_cruise_time, 50.0);
        assert_eq!(report.average_approach_time, 20.0);
        assert_eq!(report.expiration_rate, 0.25);
        assert_eq!(report.average_pool_time, 30.0);
        assert_eq!(report.average_benefit_per_agent, 0.75);
    }
}
