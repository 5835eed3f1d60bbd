use thiserror::Error;

/// Errors surfaced by the hook.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("failed to register mouse hook: {0}")]
    Register(String),

    #[error("failed to unregister mouse hook: {0}")]
    Unregister(String),

    #[error("failed to spawn hook pump thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("a mouse hook has already been created for this process")]
    AlreadyCreated,

    #[error("no native mouse hook backend is available on this platform")]
    Unsupported,
}

pub type Result<T> = std::result::Result<T, HookError>;
