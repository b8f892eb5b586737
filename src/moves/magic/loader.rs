// src/moves/magic/loader.rs
// Builds the magic tables the engine uses at runtime, once, behind a
// process-wide cache. The fixed seed keeps attack lookups reproducible
// across runs the same way the Zobrist keys are.

use super::precompute::{MagicTableSeed, generate_magic_tables};
use super::structs::MagicTables;
use crate::error::EngineError;
use once_cell::sync::OnceCell;

const MAGIC_SEED: u64 = 0x5F3759DF;

static TABLES: OnceCell<Result<MagicTables, EngineError>> = OnceCell::new();

/// Fatal-startup entry point (§6.4): a corrupt/failed magic-table build is
/// the one way this engine can fail to start, and the caller decides the
/// process exit code rather than this function panicking. Shares the same
/// cached build as [`load_magic_tables`] so calling both costs one build.
pub fn try_load_magic_tables() -> Result<MagicTables, EngineError> {
    TABLES
        .get_or_init(|| generate_magic_tables(MagicTableSeed::Fixed(MAGIC_SEED)))
        .clone()
}

pub fn load_magic_tables() -> MagicTables {
    try_load_magic_tables().expect("magic table generation failed with the fixed seed")
}
