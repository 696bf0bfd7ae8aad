//! Backend detection and auto-selection.

use super::Backend;

/// Information about a compute backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Backend type.
    pub backend: Backend,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether backend is available.
    pub available: bool,
    /// Priority for auto-selection (higher = preferred).
    pub priority: u32,
    /// Description.
    pub description: &'static str,
}

/// Detect all available backends, best first.
pub fn detect_backends() -> Vec<BackendInfo> {
    let mut backends = vec![
        BackendInfo {
            backend: Backend::Cpu,
            name: "CPU",
            available: super::CpuBackend::is_available(),
            priority: 10,
            description: "CPU with rayon parallelization",
        },
        BackendInfo {
            backend: Backend::Scalar,
            name: "Scalar",
            available: true,
            priority: 1,
            description: "single-threaded reference",
        },
    ];

    backends.sort_by(|a, b| b.priority.cmp(&a.priority));
    backends
}

/// Select the best available backend.
pub fn select_best_backend() -> Backend {
    detect_backends()
        .into_iter()
        .filter(|b| b.available)
        .max_by_key(|b| b.priority)
        .map(|b| b.backend)
        .unwrap_or(Backend::Scalar)
}

/// Get description of available backends.
pub fn describe_backends() -> String {
    let mut desc = String::new();
    for info in detect_backends() {
        let status = if info.available { "+" } else { "-" };
        desc.push_str(&format!("[{}] {}: {}\n", status, info.name, info.description));
    }
    desc
}
