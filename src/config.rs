/// Packager tuning knobs.
///
/// Defaults follow common LL-HLS deployments: a three-segment window and a
/// one-second part target.
#[derive(Debug, Clone)]
pub struct PackagerConfig {
    /// Maximum number of segments kept in the sliding window.
    pub window_size: usize,
    /// Target duration of a partial segment, in seconds.
    pub part_target: f64,
    /// Program number to select from the PAT; `None` picks the first
    /// program found.
    pub service_id: Option<u16>,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            window_size: 3,
            part_target: 1.0,
            service_id: None,
        }
    }
}

impl PackagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_size(mut self, count: usize) -> Self {
        self.window_size = count;
        self
    }

    pub fn with_part_target(mut self, seconds: f64) -> Self {
        self.part_target = seconds;
        self
    }

    pub fn with_service_id(mut self, service_id: u16) -> Self {
        self.service_id = Some(service_id);
        self
    }
}
