use crate::dto::HealthRes;

/// Simple health service shared by the REST API and the CLI.
///
/// Reports liveness only; it does not probe the narrative backend, so a missing API key does
/// not make the service unhealthy.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "CXR report service is alive".into(),
        }
    }
}
