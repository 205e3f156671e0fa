//! Rounding of usage values into resource quantities

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::fmt;

/// Resources the sizer manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Millicores
    Cpu,
    /// Mebibytes
    Memory,
}

impl Resource {
    /// Key in a container's `requests`/`limits` map
    pub fn key(&self) -> &'static str {
        match self {
            Resource::Cpu => "cpu",
            Resource::Memory => "memory",
        }
    }

    /// Unit suffix appended to rounded values
    pub fn unit(&self) -> &'static str {
        match self {
            Resource::Cpu => "m",
            Resource::Memory => "Mi",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Round `value` up to the next multiple of 100 and attach the unit.
///
/// `None` for NaN and +Inf, which have no quantity representation; callers
/// keep the existing value. Negative values render as zero.
pub fn round_up(value: f64, resource: Resource) -> Option<Quantity> {
    if value.is_nan() || value == f64::INFINITY {
        return None;
    }
    let value = value.max(0.0);

    let hundreds = (value / 100.0).ceil() as u64;
    Some(Quantity(format!(
        "{}{}",
        hundreds.saturating_mul(100),
        resource.unit()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rounded(value: f64, resource: Resource) -> String {
        round_up(value, resource).unwrap().0
    }

    #[test]
    fn test_cpu_rounding() {
        assert_eq!(rounded(0.0, Resource::Cpu), "0m");
        assert_eq!(rounded(73.0, Resource::Cpu), "100m");
        assert_eq!(rounded(100.0, Resource::Cpu), "100m");
        assert_eq!(rounded(101.0, Resource::Cpu), "200m");
        assert_eq!(rounded(340.0, Resource::Cpu), "400m");
    }

    #[test]
    fn test_memory_rounding() {
        assert_eq!(rounded(150.0, Resource::Memory), "200Mi");
        assert_eq!(rounded(0.4, Resource::Memory), "100Mi");
        assert_eq!(rounded(2048.0, Resource::Memory), "2100Mi");
    }

    #[test]
    fn test_degenerate_values() {
        assert_eq!(rounded(-5.0, Resource::Memory), "0Mi");
        assert_eq!(rounded(f64::NEG_INFINITY, Resource::Cpu), "0m");
        assert!(round_up(f64::NAN, Resource::Cpu).is_none());
        assert!(round_up(f64::INFINITY, Resource::Cpu).is_none());
    }

    #[test]
    fn test_resource_keys() {
        assert_eq!(Resource::Cpu.key(), "cpu");
        assert_eq!(Resource::Memory.key(), "memory");
        assert_eq!(Resource::Memory.to_string(), "memory");
    }
}
