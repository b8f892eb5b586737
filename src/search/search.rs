use crate::board::Board;
use crate::moves::execute::{
    is_legal_move, make_move_basic, make_null_move, undo_move_basic, undo_null_move,
};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::in_check;
use crate::moves::types::Move;
use crate::search::context::{MAX_PLY, SearchContext};
use crate::search::eval::static_eval;
use crate::search::picker::MovePicker;
use crate::search::see::SeeExt;
use crate::search::tt::{NodeType, TranspositionTable};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

const INF: i32 = 32000;
const MATE_SCORE: i32 = 31000;
const MATE_THRESHOLD: i32 = MATE_SCORE - 1000; // 30000 - buffer for mate distance
const MAX_Q_SEARCH_DEPTH: usize = 100;

// --- Tuning Constants ---

// Reverse Futility Pruning (RFP) / static null move — SPEC_FULL §4.9 step 7:
// depth <= 6, static_eval - 85 * depth >= beta.
const RFP_DEPTH_LIMIT: i32 = 6;
const RFP_MARGIN_MULT: i32 = 85;

// Futility Pruning (FP) — SPEC_FULL §4.9 step 11: depth <= 3,
// futility_margin = [0, 200, 300, 500] indexed by depth.
const FP_DEPTH_LIMIT: i32 = 3;
const FUTILITY_MARGINS: [i32; 4] = [0, 200, 300, 500];

// Late Move Pruning (LMP) — SPEC_FULL §4.9 step 11: depth <= 4,
// late_move_threshold = [0, 4, 6, 10, 14] indexed by depth.
const LMP_DEPTH_LIMIT: i32 = 4;
const LMP_THRESHOLDS: [i32; 5] = [0, 4, 6, 10, 14];

// Late Move Reduction (LMR) — SPEC_FULL §4.9 step 11: quiet, non-check-giving
// moves at depth >= 3 beyond the fourth reduce by 1 + (moves_searched >= 8).
const LMR_MIN_DEPTH: i32 = 3;
const LMR_MIN_MOVES: i32 = 4;

// Null move pruning — SPEC_FULL §4.9 step 7: depth >= 3, R = 3 when
// depth >= 6 else 2.
const NULL_MOVE_MIN_DEPTH: i32 = 3;
const NULL_MOVE_DEEP_DEPTH: i32 = 6;

// --- TT Score Adjustment Helpers ---
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}
// -----------------------------------

/// Whether making `mv` gives check. Used only by the futility/LMR gates
/// that need to tell a quiet check-giving move apart from an ordinary
/// quiet move (§4.9 steps 7/11), so it is restricted to moves already
/// filtered down to "quiet" — make/undo is cheap relative to the search
/// call it is deciding whether to skip.
fn gives_check(board: &mut Board, tables: &MagicTables, mv: Move) -> bool {
    let undo = make_move_basic(board, mv);
    let check = in_check(board, board.side_to_move, tables);
    undo_move_basic(board, undo);
    check
}

pub struct TimeManager {
    pub start_time: Instant,
    pub allotted: Option<Duration>,
    pub stop_signal: bool,
    /// Shared cooperative-cancellation flag flipped by the UCI thread on
    /// `stop`/`quit`. `None` for callers (tests, benches) that drive the
    /// search directly with no outside thread to observe.
    external_stop: Option<Arc<AtomicBool>>,
    /// `go nodes N` hard cap (§6.1); `None` when the search is otherwise
    /// time- or depth-bounded.
    node_limit: Option<u64>,
}

impl TimeManager {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start_time: Instant::now(),
            allotted: limit,
            stop_signal: false,
            external_stop: None,
            node_limit: None,
        }
    }

    pub fn with_external_stop(limit: Option<Duration>, external_stop: Arc<AtomicBool>) -> Self {
        Self {
            start_time: Instant::now(),
            allotted: limit,
            stop_signal: false,
            external_stop: Some(external_stop),
            node_limit: None,
        }
    }

    pub fn with_node_limit(mut self, node_limit: Option<u64>) -> Self {
        self.node_limit = node_limit;
        self
    }

    #[inline(always)]
    pub fn check_time(&mut self, nodes: u64) {
        if self.stop_signal {
            return;
        }

        if let Some(flag) = &self.external_stop
            && flag.load(Ordering::Acquire)
        {
            self.stop_signal = true;
            return;
        }

        if let Some(limit) = self.node_limit
            && nodes >= limit
        {
            self.stop_signal = true;
            return;
        }

        if let Some(limit) = self.allotted {
            let elapsed = self.start_time.elapsed();

            // Hard Stop: Abort immediately if we hit the limit
            if elapsed >= limit {
                self.stop_signal = true;
            }
        }
    }

    /// Returns the allocated time limit
    #[inline(always)]
    pub fn allocated_time(&self) -> Option<Duration> {
        self.allotted
    }

    /// Returns elapsed time since search started
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn quiescence(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> i32 {
    // SAFETY BRAKE: Prevent Q-search explosions
    if ply > MAX_Q_SEARCH_DEPTH {
        return static_eval(board, tables, alpha, beta);
    }

    // §4.9 qsearch step 1: in check there is no quiet position to stand pat
    // on, so search every legal evasion (not just captures) at full
    // qsearch depth instead of the captures-only picker below.
    if in_check(board, board.side_to_move, tables) {
        let mut moves = Vec::with_capacity(64);
        let mut scratch = Vec::with_capacity(256);
        crate::moves::execute::generate_legal(board, tables, &mut moves, &mut scratch);

        if moves.is_empty() {
            return -MATE_SCORE + ply as i32;
        }

        for mv in moves {
            *nodes += 1;
            if *nodes & 63 == 0 {
                time.check_time(*nodes);
            }
            if time.stop_signal {
                return alpha;
            }

            let undo = make_move_basic(board, mv);
            let score = -quiescence(board, tables, ctx, tt, ply + 1, -beta, -alpha, nodes, time);
            undo_move_basic(board, undo);

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }
        return alpha;
    }

    let stand_pat = static_eval(board, tables, alpha, beta);

    if stand_pat >= beta {
        return beta;
    }
    if stand_pat >= alpha {
        alpha = stand_pat;
    }

    // Use MovePicker in captures-only mode for quiescence
    let empty_killers = [None, None];
    let empty_history = [[0i32; 64]; 64];
    let mut picker = MovePicker::new(None, empty_killers, true);

    while let Some(mv) = picker.next(board, tables, &empty_history) {
        *nodes += 1;
        if *nodes & 63 == 0 {
            time.check_time(*nodes);
        }
        if time.stop_signal {
            return stand_pat;
        }

        let mut captured_value = 0;
        if let Some(piece) = board.piece_type_at(mv.to) {
            captured_value = piece.value();
        }

        // DELTA PRUNING SAFETY
        // Don't prune if it's a promotion (potentially huge value)
        // Don't prune if it's En Passant (captured_value is 0, but it captures a pawn)
        let is_prom = mv.is_promotion();
        let is_ep = mv.is_en_passant();

        // "Blindness" Fix: Only prune standard captures.
        if !is_prom && !is_ep && stand_pat + captured_value + 200 < alpha {
            continue;
        }

        // SEE Pruning: Skip captures that lose material
        // Note: MovePicker already filters bad captures for us, but we keep this
        // for promotions and en passant which bypass SEE classification
        if !is_prom && !is_ep && !board.static_exchange_eval(mv, 0, tables) {
            continue;
        }

        let undo = make_move_basic(board, mv);
        let score = -quiescence(board, tables, ctx, tt, ply + 1, -beta, -alpha, nodes, time);
        undo_move_basic(board, undo);

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }
    alpha
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn alpha_beta(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
    null_allowed: bool,
) -> (i32, Option<Move>) {
    // Check every 1024 nodes instead of 2047 for tighter control
    if *nodes & 63 == 0 {
        time.check_time(*nodes);
    }

    if time.stop_signal {
        return (0, None);
    }
    *nodes += 1;

    // A long forced-check sequence can keep re-extending depth via the
    // check extension below; cap recursion at MAX_PLY so `ctx.killer_moves`
    // indexing below can never go out of bounds on valid input.
    if ply >= MAX_PLY {
        return (static_eval(board, tables, alpha, beta), None);
    }

    // 2. Draw detection & TT Probing (Standard)
    if ply > 0 && crate::status::is_draw(board) {
        return (0, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let hash = board.zobrist;
    let mut hash_move = None;

    // TT PROBE WITH MATE SCORE ADJUSTMENT
    if let Some((tt_move, raw_score, tt_depth, tt_bound)) =
        tt.probe(hash, depth as u8, alpha, beta, ply as i32)
    {
        if let Some(tm) = tt_move {
            hash_move = Some(tm);
        }

        if tt_depth >= depth as u8 {
            // Convert the stored independent score back to relative score
            let tt_score = score_from_tt(raw_score, ply as i32);

            if ply > 0 {
                match tt_bound {
                    0 => return (tt_score, tt_move),
                    1 if tt_score >= beta => return (tt_score, tt_move),
                    2 if tt_score <= alpha => return (tt_score, tt_move),
                    _ => {}
                }
            }
        }
    }

    let in_check_now = in_check(board, board.side_to_move, tables);

    // FIX 6: CHECK EXTENSION
    // If we are in check, extend the search by 1 ply.
    // This resolves forced mates and prevents the horizon effect.
    let extension = if in_check_now { 1 } else { 0 };

    if depth <= 0 && !in_check_now {
        let score = quiescence(board, tables, ctx, tt, ply, alpha, beta, nodes, time);
        return (score, None);
    }

    // [STEP 1] Calculate Eval Early
    // We lift this out so both RFP and SFP can share it.
    let static_eval_val = if !in_check_now {
        static_eval(board, tables, alpha, beta)
    } else {
        0 // Dummy value, we won't use it if in check
    };

    // Reverse futility / static null move (§4.9 step 7): depth <= 6 and
    // static_eval - 85*depth >= beta returns static_eval.
    if depth <= RFP_DEPTH_LIMIT && !in_check_now && ply > 0 {
        let margin = RFP_MARGIN_MULT * depth;
        if static_eval_val - margin >= beta {
            return (static_eval_val, None);
        }
    }

    // Null move pruning (§4.9 step 7): not in the endgame, null_allowed,
    // depth >= 3; R = 3 when depth >= 6 else 2.
    if depth >= NULL_MOVE_MIN_DEPTH
        && !in_check_now
        && null_allowed
        && !board.is_endgame()
    {
        let r = if depth >= NULL_MOVE_DEEP_DEPTH { 3 } else { 2 };

        let undo = make_null_move(board);

        let (val, _) = alpha_beta(
            board,
            tables,
            ctx,
            tt,
            depth - r - 1,
            ply + 1,
            -beta,
            -beta + 1,
            nodes,
            time,
            false,
        );
        let score = -val;
        undo_null_move(board, undo);

        if score >= beta && !time.stop_signal {
            return (beta, None);
        }
    }

    // Use MovePicker for staged move generation
    let mut picker = MovePicker::new(hash_move, ctx.killer_moves[ply], false);

    let mut best_move = None;
    let mut best_score = -INF;
    let original_alpha = alpha;
    let mut move_count = 0;

    while let Some(mv) = picker.next(board, tables, &ctx.history) {
        let is_quiet = !mv.is_capture() && !mv.is_promotion();

        // Futility pruning (§4.9 step 11): depth <= 3, not in check,
        // moves_searched > 0, the move is quiet and doesn't give check, and
        // static_eval + futility_margin(depth) <= alpha.
        if depth <= FP_DEPTH_LIMIT && !in_check_now && is_quiet && move_count > 0 {
            let idx = (depth.max(0) as usize).min(FUTILITY_MARGINS.len() - 1);
            let margin = FUTILITY_MARGINS[idx];
            if static_eval_val + margin <= alpha && !gives_check(board, tables, mv) {
                continue;
            }
        }

        // Late-move pruning (§4.9 step 11): depth <= 4, not in check, the
        // move is quiet, and moves_searched >= late_move_threshold(depth).
        if depth <= LMP_DEPTH_LIMIT && !in_check_now && is_quiet && alpha == original_alpha {
            let idx = (depth.max(0) as usize).min(LMP_THRESHOLDS.len() - 1);
            let threshold = LMP_THRESHOLDS[idx];
            if move_count >= threshold as usize {
                continue;
            }
        }

        let undo = make_move_basic(board, mv);
        let mut score;

        if move_count == 0 {
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 + extension,
                ply + 1,
                -beta,
                -alpha,
                nodes,
                time,
                true,
            );
            score = -val;
        } else {
            // Late move reduction (§4.9 step 11): quiet, non-check-giving
            // moves beyond the fourth at depth >= 3 reduce by
            // 1 + (moves_searched >= 8), bounded so the reduced depth is
            // never negative.
            let mut r = 0;
            let reduces = depth >= LMR_MIN_DEPTH
                && move_count >= LMR_MIN_MOVES as usize
                && is_quiet
                && !in_check_now
                && !gives_check(board, tables, mv);
            if reduces {
                r = 1 + if move_count >= 8 { 1 } else { 0 };
                r = r.min(depth - 1 + extension);
            }

            // Reduced (or un-reduced) search with a null window.
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                (depth - 1 + extension - r).max(0),
                ply + 1,
                -alpha - 1,
                -alpha,
                nodes,
                time,
                true,
            );
            score = -val;

            // A reduced move that beats alpha is re-checked at full depth
            // with the same null window before the fail-high is trusted.
            if score > alpha && r > 0 {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1 + extension,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    nodes,
                    time,
                    true,
                );
                score = -val;
            }

            if score > alpha && score < beta {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1 + extension,
                    ply + 1,
                    -beta,
                    -alpha,
                    nodes,
                    time,
                    true,
                );
                score = -val;
            }
        }

        undo_move_basic(board, undo);
        move_count += 1;

        if time.stop_signal {
            return (0, None);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                best_move = Some(mv);
            }
            if score >= beta {
                // TT SAVE WITH MATE SCORE ADJUSTMENT (LowerBound/Beta Cutoff)
                let tt_score = score_to_tt(beta, ply as i32);
                tt.save(
                    hash,
                    Some(mv),
                    tt_score,
                    depth as u8,
                    NodeType::LowerBound as u8,
                    ply as i32,
                );

                if !mv.is_capture() {
                    ctx.update_killer(ply, mv);

                    let bonus = depth * depth;
                    ctx.update_history(mv, bonus);
                }

                return (beta, Some(mv));
            }
        }
    }

    // No legal moves found - checkmate or stalemate
    if move_count == 0 {
        if in_check_now {
            return (-MATE_SCORE + ply as i32, None);
        }
        return (0, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let node_type = if best_score >= beta {
        NodeType::LowerBound
    } else if best_score > original_alpha {
        NodeType::Exact
    } else {
        NodeType::UpperBound
    };

    // TT SAVE WITH MATE SCORE ADJUSTMENT (Best Score)
    // We save 'best_score' (which is alpha if exact, or the best failed low score if UpperBound)
    let tt_score = score_to_tt(best_score, ply as i32);
    tt.save(
        hash,
        best_move,
        tt_score,
        depth as u8,
        node_type as u8,
        ply as i32,
    );

    (best_score, best_move)
}

pub fn search(
    board: &mut Board,
    tables: &MagicTables,
    max_depth: i32,
    time_limit: Option<Duration>,
) -> (i32, Option<Move>) {
    let mut last_completed_best_move = None;
    let mut last_completed_best_score = 0;
    let mut nodes = 0;
    let mut tt = TranspositionTable::new(512);
    let mut ctx = SearchContext::new();
    let mut time = TimeManager::new(time_limit);
    let mut last_iter_duration = Duration::from_millis(0);

    for depth in 1..=max_depth {
        let iter_start = Instant::now();

        // --- ITERATIVE DEEPENING SAFETY CHECK ---
        // Predict if we can afford the next depth before starting it.
        // Conservative estimate: Next depth takes ~3x longer than previous.
        // (Using 3x instead of 2x because branching factor can spike in tactical positions)
        if depth > 1
            && let Some(limit) = time.allocated_time()
        {
            let total_elapsed = time.elapsed();
            let predicted_next = last_iter_duration * 3;

            // If predicting the next depth would push us over the limit: STOP.
            if total_elapsed + predicted_next > limit {
                break;
            }
        }
        // -----------------------------------------

        for from in 0..64 {
            for to in 0..64 {
                ctx.history[from][to] /= 8;
            }
        }

        // --- Aspiration Window Logic (§4.9 step 3): delta=15, doubled each
        // re-search but only on the failing bound, widening to +/-INF once
        // delta overflows it.
        let mut alpha = -INF;
        let mut beta = INF;
        let mut delta = 15;

        // Only apply aspiration windows at depth > 4 for stability
        if depth > 4 {
            alpha = last_completed_best_score - delta;
            beta = last_completed_best_score + delta;
        }

        let mut score;
        let mut mv;

        loop {
            // Perform the search with the current window
            let result = alpha_beta(
                board, tables, &mut ctx, &mut tt, depth, 0, alpha, beta, &mut nodes, &mut time, true,
            );

            score = result.0;
            mv = result.1;

            // If we ran out of time during the search, stop immediately
            if time.stop_signal {
                break;
            }

            // 1. Fail Low (Score <= Alpha): widen alpha by delta only.
            if score <= alpha {
                alpha = (alpha - delta).max(-INF);
                delta += delta / 2;
                continue;
            }

            // 2. Fail High (Score >= Beta): widen beta by delta only.
            if score >= beta {
                beta = (beta + delta).min(INF);
                delta += delta / 2;
                continue;
            }

            // 3. Success: Score is within the window.
            break;
        }
        // -------------------------------

        // Record duration for the NEXT prediction check
        last_iter_duration = iter_start.elapsed();

        // CRITICAL FIX: If the stop signal was triggered, DO NOT update the best move.
        // The search at this depth is incomplete and likely contains blunders.
        if time.stop_signal {
            break;
        }

        // Only update if the depth actually finished
        last_completed_best_score = score;
        last_completed_best_move = mv;

        // Output info for GUI (standard UCI)
        if let Some(valid_mv) = last_completed_best_move {
            let score_str = if last_completed_best_score.abs() >= MATE_THRESHOLD {
                let moves = (MATE_SCORE - last_completed_best_score.abs() + 1) / 2;
                if last_completed_best_score > 0 {
                    format!("mate {}", moves)
                } else {
                    format!("mate -{}", moves)
                }
            } else {
                format!("cp {}", last_completed_best_score)
            };

            println!(
                "info depth {} score {} nodes {} time {} pv {}",
                depth,
                score_str,
                nodes,
                time.start_time.elapsed().as_millis(),
                valid_mv.to_uci()
            );
        }

        // Optimization: If we found a mate, stop searching deeper
        if score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    (last_completed_best_score, last_completed_best_move)
}

/// Walk the transposition table from `board`, following stored best moves,
/// to recover the principal variation for `info ... pv ...` output. Stops on
/// a TT miss, a decompressed move that is not legal in the position it was
/// stored for (the "no TT move" case from the TT invariant), or a repeated
/// key (a PV that would otherwise cycle forever through a drawn line).
fn reconstruct_pv(
    board: &Board,
    tables: &MagicTables,
    tt: &TranspositionTable,
    root_move: Move,
    max_len: usize,
) -> Vec<Move> {
    let mut pv = vec![root_move];
    let mut scratch = board.clone();
    let _ = make_move_basic(&mut scratch, root_move);
    let mut seen = vec![scratch.zobrist];

    while pv.len() < max_len {
        let Some((Some(mv), _, _, _)) = tt.probe(scratch.zobrist, 0, -INF, INF, 0) else {
            break;
        };
        if !is_legal_move(&mut scratch, mv, tables) {
            break;
        }
        make_move_basic(&mut scratch, mv);
        if seen.contains(&scratch.zobrist) {
            break;
        }
        seen.push(scratch.zobrist);
        pv.push(mv);
    }
    pv
}

/// Iterative deepening driven by the UCI adapter: the transposition table is
/// owned by the caller (so it survives across `go` commands within one game)
/// and cancellation is cooperative through a shared flag the `stop`/`quit`
/// handlers flip from the UCI thread. Emits the same `info depth ...` stream
/// as [`search`] plus `nodes`, `nps`, and a multi-move `pv`, and returns the
/// best move together with the reconstructed principal variation.
///
/// `info_tx` carries formatted `info ...` lines back to the UCI thread (§5):
/// this function never touches stdout itself, so a worker running on its own
/// thread can never interleave output with the protocol handler.
#[allow(clippy::too_many_arguments)]
pub fn search_session(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    max_depth: i32,
    time_limit: Option<Duration>,
    stop: Arc<AtomicBool>,
    info_tx: &Sender<String>,
) -> (i32, Option<Move>, Vec<Move>) {
    let mut ctx = SearchContext::new();
    let mut last_completed_best_move = None;
    let mut last_completed_best_score = 0;
    let mut last_pv = Vec::new();
    let mut nodes: u64 = 0;
    let mut time = TimeManager::with_external_stop(time_limit, stop);
    let mut last_iter_duration = Duration::from_millis(0);

    tt.new_search();

    for depth in 1..=max_depth {
        let iter_start = Instant::now();

        if depth > 1
            && let Some(limit) = time.allocated_time()
        {
            let total_elapsed = time.elapsed();
            let predicted_next = last_iter_duration * 3;
            if total_elapsed + predicted_next > limit {
                break;
            }
        }

        for from in 0..64 {
            for to in 0..64 {
                ctx.history[from][to] /= 8;
            }
        }

        let mut alpha = -INF;
        let mut beta = INF;
        let mut delta = 15;

        if depth > 4 {
            alpha = last_completed_best_score - delta;
            beta = last_completed_best_score + delta;
        }

        let mut score;
        let mut mv;

        loop {
            let result = alpha_beta(
                board, tables, &mut ctx, tt, depth, 0, alpha, beta, &mut nodes, &mut time, true,
            );
            score = result.0;
            mv = result.1;

            if time.stop_signal {
                break;
            }
            if score <= alpha {
                alpha = (alpha - delta).max(-INF);
                delta += delta / 2;
                continue;
            }
            if score >= beta {
                beta = (beta + delta).min(INF);
                delta += delta / 2;
                continue;
            }
            break;
        }

        last_iter_duration = iter_start.elapsed();

        if time.stop_signal {
            break;
        }

        last_completed_best_score = score;
        last_completed_best_move = mv;

        if let Some(valid_mv) = last_completed_best_move {
            last_pv = reconstruct_pv(board, tables, tt, valid_mv, depth.max(1) as usize);

            let score_str = if last_completed_best_score.abs() >= MATE_THRESHOLD {
                let mate_in = (MATE_SCORE - last_completed_best_score.abs() + 1) / 2;
                if last_completed_best_score > 0 {
                    format!("mate {mate_in}")
                } else {
                    format!("mate -{mate_in}")
                }
            } else {
                format!("cp {last_completed_best_score}")
            };

            let elapsed_ms = time.start_time.elapsed().as_millis();
            let nps = if elapsed_ms > 0 {
                (nodes as u128 * 1000) / elapsed_ms
            } else {
                0
            };
            let pv_str = last_pv
                .iter()
                .map(Move::to_uci)
                .collect::<Vec<_>>()
                .join(" ");

            // A closed receiver just means the UCI thread has moved on
            // (e.g. `quit`); losing an info line at that point is harmless.
            let _ = info_tx.send(format!(
                "info depth {depth} score {score_str} nodes {nodes} time {elapsed_ms} nps {nps} pv {pv_str}"
            ));
        }

        if score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    (last_completed_best_score, last_completed_best_move, last_pv)
}
