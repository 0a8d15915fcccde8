use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of compute device a scorer runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
}

/// Identifies the device and worker thread a scorer instance belongs to.
///
/// The thread pool creates one scorer per `DeviceInfo`; scorers never
/// share anything mutable, so two instances may run concurrently even
/// on the same device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub kind: DeviceKind,
    pub device_id: usize,
    pub thread_id: usize,
}

impl DeviceInfo {
    pub fn cpu(thread_id: usize) -> Self {
        DeviceInfo {
            kind: DeviceKind::Cpu,
            device_id: 0,
            thread_id,
        }
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self::cpu(0)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DeviceKind::Cpu => write!(f, "cpu{}/thread{}", self.device_id, self.thread_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(DeviceInfo::cpu(3).to_string(), "cpu0/thread3");
    }
}
