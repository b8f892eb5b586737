// src/moves/magic/precompute.rs
// Builds rook/bishop magic tables from scratch: relevant-occupancy masks,
// every blocker subset of each mask (Carry-Rippler enumeration), the
// scan-based attack set for each subset, and a magic multiplier that hashes
// subsets into table slots without collision.

use super::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use super::search::find_magic_number_for_square;
use super::structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
use crate::error::EngineError;
use rand::{SeedableRng, rngs::StdRng};

pub enum MagicTableSeed {
    Fixed(u64),
}

fn rook_mask(square: usize) -> u64 {
    let rank = (square / 8) as isize;
    let file = (square % 8) as isize;
    let mut mask = 0u64;

    for r in (rank + 1)..7 {
        mask |= 1u64 << (r as usize * 8 + file as usize);
    }
    for r in (1..rank).rev() {
        mask |= 1u64 << (r as usize * 8 + file as usize);
    }
    for f in (file + 1)..7 {
        mask |= 1u64 << (rank as usize * 8 + f as usize);
    }
    for f in (1..file).rev() {
        mask |= 1u64 << (rank as usize * 8 + f as usize);
    }

    mask
}

fn bishop_mask(square: usize) -> u64 {
    let rank = (square / 8) as isize;
    let file = (square % 8) as isize;
    let mut mask = 0u64;

    let (mut r, mut f) = (rank + 1, file + 1);
    while r < 7 && f < 7 {
        mask |= 1u64 << (r as usize * 8 + f as usize);
        r += 1;
        f += 1;
    }
    let (mut r, mut f) = (rank - 1, file + 1);
    while r > 0 && f < 7 {
        mask |= 1u64 << (r as usize * 8 + f as usize);
        r -= 1;
        f += 1;
    }
    let (mut r, mut f) = (rank + 1, file - 1);
    while r < 7 && f > 0 {
        mask |= 1u64 << (r as usize * 8 + f as usize);
        r += 1;
        f -= 1;
    }
    let (mut r, mut f) = (rank - 1, file - 1);
    while r > 0 && f > 0 {
        mask |= 1u64 << (r as usize * 8 + f as usize);
        r -= 1;
        f -= 1;
    }

    mask
}

/// Enumerates every subset of `mask`, including the empty subset, via the
/// standard Carry-Rippler trick. Yields exactly 2^popcount(mask) values.
fn subsets_of(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1usize << mask.count_ones());
    let mut subset = 0u64;
    loop {
        subsets.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    subsets
}

fn build_entry(
    square: usize,
    mask: u64,
    attacks_fn: fn(usize, u64) -> u64,
    rng: &mut StdRng,
) -> Result<MagicEntry, String> {
    let blockers = subsets_of(mask);
    let attacks: Vec<u64> = blockers.iter().map(|&b| attacks_fn(square, b)).collect();
    let shift = 64 - mask.count_ones();

    let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)
        .map_err(|e| format!("square {square}: {e}"))?;

    let mut table = vec![0u64; 1usize << mask.count_ones()];
    for (&b, &a) in blockers.iter().zip(attacks.iter()) {
        let index = (b.wrapping_mul(magic) >> shift) as usize;
        table[index] = a;
    }

    Ok(MagicEntry {
        magic,
        shift,
        mask,
        table: table.into_boxed_slice(),
    })
}

pub fn generate_magic_tables(seed: MagicTableSeed) -> Result<MagicTables, EngineError> {
    let MagicTableSeed::Fixed(s) = seed;
    let mut rng = StdRng::seed_from_u64(s);

    let mut rook_entries = Vec::with_capacity(64);
    for square in 0..64 {
        rook_entries.push(
            build_entry(square, rook_mask(square), rook_attacks_per_square, &mut rng)
                .map_err(EngineError::Magic)?,
        );
    }

    let mut bishop_entries = Vec::with_capacity(64);
    for square in 0..64 {
        bishop_entries.push(
            build_entry(
                square,
                bishop_mask(square),
                bishop_attacks_per_square,
                &mut rng,
            )
            .map_err(EngineError::Magic)?,
        );
    }

    Ok(MagicTables {
        rook: RookMagicTables {
            entries: rook_entries,
        },
        bishop: BishopMagicTables {
            entries: bishop_entries,
        },
    })
}
