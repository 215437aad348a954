use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// No frame has been processed since the engine was built or resized.
    #[error("Aucune frame traitée")]
    NoFrame,

    /// The frame arena cannot satisfy an allocation. Fatal for the current frame only.
    #[error("Arena épuisée : {requested} octets demandés, {remaining} disponibles")]
    ArenaExhausted {
        /// Aligned size of the failed request.
        requested: usize,
        /// Bytes left before the request.
        remaining: usize,
    },

    /// The arena block could not be reserved.
    #[error("Impossible d'allouer l'arena : {bytes} octets")]
    ArenaAllocation {
        /// Aligned size of the block.
        bytes: usize,
    },

    /// The same arena region was requested twice for writing.
    #[error("Régions d'arena qui se chevauchent")]
    OverlappingAllocations,

    /// An arena handle was used after the arena was reset.
    #[error("Allocation périmée : génération {allocated}, arena en génération {current}")]
    StaleAllocation {
        /// Generation the handle was issued in.
        allocated: u64,
        /// Current arena generation.
        current: u64,
    },
}
