/// Enable/capture flags and the configured surface path for one loaded
/// bridge. Everything starts disabled; nothing here is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Simulation and frame upload run.
    pub enabled: bool,
    /// The surface is drawn into the host UI.
    pub render_on_overlay: bool,
    /// Host keyboard input is routed into the input buffer.
    pub capture_input: bool,
    /// Host resource path of the surface; empty means unset.
    pub surface_path: String,
}

impl SessionState {
    /// Map loads invalidate host resources, so the surface path is dropped
    /// and the bridge stops until it is configured and resumed again.
    pub fn reset_for_map_load(&mut self) {
        self.surface_path.clear();
        self.enabled = false;
    }
}
