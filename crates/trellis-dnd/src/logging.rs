#![forbid(unsafe_code)]

//! Log targets and optional subscriber setup.
//!
//! Every event the engine emits uses one of the targets below, so hosts can
//! filter with directives such as `trellis.commit=info,trellis.drag=debug`.
//! With the `tracing-json` feature, [`init_json`] and [`init_env_filter`]
//! install a ready-made subscriber for hosts that do not bring their own.

/// Ancestry walks over the tree snapshot.
pub const TARGET_TREE: &str = "trellis.tree";
/// Drop rule rejections.
pub const TARGET_VALIDATOR: &str = "trellis.validator";
/// Drag session transitions.
pub const TARGET_DRAG: &str = "trellis.drag";
/// Move commits.
pub const TARGET_COMMIT: &str = "trellis.commit";

/// All targets used by the engine.
pub const TARGETS: [&str; 4] = [TARGET_TREE, TARGET_VALIDATOR, TARGET_DRAG, TARGET_COMMIT];

/// Env var consulted by [`init_env_filter`].
pub const LOG_ENV: &str = "TRELLIS_LOG";

/// Filter directives enabling every engine target at `level`.
///
/// Commits are always kept at `info` or more verbose so successful moves
/// remain visible.
#[must_use]
pub fn default_directives(level: tracing::Level) -> String {
    let commit_level = level.max(tracing::Level::INFO);
    TARGETS
        .iter()
        .map(|target| {
            let level = if *target == TARGET_COMMIT {
                commit_level
            } else {
                level
            };
            format!("{target}={}", level.as_str().to_ascii_lowercase())
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Install a global JSON subscriber honoring [`LOG_ENV`], defaulting to
/// [`default_directives`] at `INFO`.
///
/// Returns `false` if a global subscriber was already set.
#[cfg(feature = "tracing-json")]
pub fn init_json() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(tracing::Level::INFO)));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Install a global human-readable subscriber honoring [`LOG_ENV`], falling
/// back to `default` directives.
///
/// Returns `false` if a global subscriber was already set.
#[cfg(feature = "tracing-json")]
pub fn init_env_filter(default: &str) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
