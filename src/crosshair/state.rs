#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Stopped,
    Rendering,
    /// Terminal: the surface has been released.
    Released,
}

impl RendererState {
    pub fn is_initialized(self) -> bool {
        matches!(self, Self::Stopped | Self::Rendering)
    }
}

pub fn can_transition(from: RendererState, to: RendererState) -> bool {
    matches!(
        (from, to),
        (RendererState::Uninitialized, RendererState::Stopped)
            | (RendererState::Stopped, RendererState::Rendering)
            | (RendererState::Rendering, RendererState::Stopped)
            | (RendererState::Uninitialized, RendererState::Released)
            | (RendererState::Stopped, RendererState::Released)
            | (RendererState::Rendering, RendererState::Released)
    ) || from == to
}
