use crate::frame::OwnedFrame;

/// Fournit des frames RGB24 décodées au pipeline.
///
/// Implémenté par : `ImageSource`, `VideoSource`.
///
/// # Example
/// ```
/// use es_core::traits::FrameSource;
/// use es_core::frame::OwnedFrame;
///
/// struct DummySource;
/// impl FrameSource for DummySource {
///     fn next_frame(&mut self) -> Option<OwnedFrame> { None }
///     fn native_size(&self) -> (u32, u32) { (0, 0) }
///     fn frame_rate(&self) -> Option<f64> { None }
/// }
/// ```
pub trait FrameSource: Send {
    /// Retourne la prochaine frame décodée.
    ///
    /// Retourne `None` quand la source est épuisée (fin de vidéo, image déjà livrée).
    fn next_frame(&mut self) -> Option<OwnedFrame>;

    /// Dimensions natives de la source.
    fn native_size(&self) -> (u32, u32);

    /// Images par seconde, `None` pour une image fixe.
    fn frame_rate(&self) -> Option<f64>;

    /// Délai nominal entre deux frames, 1/24 s par défaut.
    fn frame_delay(&self) -> std::time::Duration {
        let fps = self.frame_rate().filter(|f| f.is_finite() && *f > 0.0);
        std::time::Duration::from_secs_f64(1.0 / fps.unwrap_or(24.0))
    }
}
