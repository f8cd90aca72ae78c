//! Kernel constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// Status reported when the transport could not complete a call.
pub const TRANSPORT_FAILURE_STATUS: i32 = -2;

/// Redirects followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Default Kubernetes API server address.
pub const KUBE_DEFAULT_ADDR: &str = "http://localhost:8080";

/// Request timeout for the Kubernetes bridge.
pub const KUBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default Terraform Enterprise address (the SaaS endpoint).
pub const TFE_DEFAULT_ADDR: &str = "https://app.terraform.io";

/// Request timeout for the Terraform Enterprise bridge.
pub const TFE_TIMEOUT: Duration = Duration::from_secs(5);

/// Status the Kubernetes API answers a PUT to a missing object with.
pub const KUBE_MISSING_STATUS: u16 = 400;
