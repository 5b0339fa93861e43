/// What to do after a failed surface acquisition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The surface was reconfigured; acquisition can be retried.
    Reconfigured,
    /// Transient failure; the frame renders nothing to the surface.
    SkipFrame,
    /// Unrecoverable (commonly OOM).
    Fatal,
}
