//! Fixed parsing constants and scan bounds.

/// Keyword a message must start with to be treated as a backblast.
pub const BACKBLAST_KEYWORD: &str = "backblast";

/// Values of `FNGs:` that mean "no FNGs" (compared case-insensitively).
pub const DEFAULT_FNG_ZERO_SENTINELS: &[&str] =
    &["", "none", "none listed", "na", "n/a", "zero", "-", "0", "no", "nope"];

/// Separator between FNG names.
pub const FNG_SEPARATOR: char = ',';

/// Default number of messages fetched per channel scan.
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Maximum messages a single history request may return (platform limit).
pub const MAX_HISTORY_REQUEST: usize = 100;

/// Default timeout for a parser-triggered channel lookup (milliseconds).
///
/// Kept well under the per-channel scan budget so a hung lookup fails the
/// message, not the channel.
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;
