// src/uci.rs
// The boundary component: translates the line-oriented UCI wire protocol
// into calls against the Position/Search/TT triple. Owns the one worker
// thread a search runs on; everything here is otherwise single-threaded.

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::board::{Board, Color};
use crate::moves::execute::{generate_legal, make_move_basic};
use crate::moves::magic::MagicTables;
use crate::moves::magic::loader::load_magic_tables;
use crate::moves::types::Move;
use crate::search::search::search_session;
use crate::search::tt::TranspositionTable;

const ENGINE_NAME: &str = "Brindle";
const ENGINE_AUTHOR: &str = "Brindle contributors";

const DEFAULT_HASH_MB: usize = 128;
const MIN_HASH_MB: usize = 1;
const MAX_HASH_MB: usize = 2048;

/// Parsed `go` parameters, valid for the lifetime of a single search.
#[derive(Debug, Clone, Default)]
struct GoSettings {
    wtime: Option<u64>,
    btime: Option<u64>,
    winc: u64,
    binc: u64,
    movestogo: Option<u64>,
    movetime: Option<u64>,
    depth: Option<i32>,
    infinite: bool,
}

impl GoSettings {
    fn parse(parts: &[&str]) -> Self {
        let mut out = GoSettings::default();
        let mut i = 1;
        while i < parts.len() {
            match parts[i] {
                "wtime" => {
                    out.wtime = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "btime" => {
                    out.btime = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "winc" => {
                    out.winc = parts.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(0);
                    i += 2;
                }
                "binc" => {
                    out.binc = parts.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(0);
                    i += 2;
                }
                "movestogo" => {
                    out.movestogo = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "movetime" => {
                    out.movetime = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "depth" => {
                    out.depth = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "infinite" => {
                    out.infinite = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        out
    }

    /// §4.9 time management: a hard `movetime` cap takes priority; otherwise
    /// the soft budget is derived from the side to move's clock.
    fn time_limit(&self, stm: Color) -> Option<Duration> {
        if self.infinite {
            return None;
        }
        if let Some(ms) = self.movetime {
            return Some(Duration::from_millis(ms));
        }

        let (remaining, increment) = match stm {
            Color::White => (self.wtime?, self.winc),
            Color::Black => (self.btime?, self.binc),
        };
        let remaining = remaining as f64;
        let increment = increment as f64;

        let budget_ms = match self.movestogo {
            Some(mtg) if mtg < 8 => {
                (remaining / 2.0).min(remaining / (mtg as f64 + 12.0) + 0.4 * increment)
            }
            Some(_) => (remaining / 4.0).min(remaining / 27.0 + 0.95 * increment),
            None if increment > 0.0 => (remaining / 4.0).min(remaining / 27.0 + 0.95 * increment),
            None => remaining / 41.0,
        };

        Some(Duration::from_millis(budget_ms.max(1.0) as u64))
    }

    fn depth_limit(&self) -> i32 {
        self.depth.unwrap_or(64)
    }
}

type WorkerResult = TranspositionTable;

/// Owns the position, the persistent transposition table, and the single
/// search worker. Lives for the whole UCI session; `ucinewgame` and
/// `setoption name Hash` are the only things that reset the table.
///
/// Per §5, the search worker never writes to stdout directly: it sends
/// formatted protocol lines over `output_tx` to a dedicated printer thread,
/// so the only code in the process that ever calls `println!` against the
/// wire protocol is either this struct's own handlers or that one sink.
pub struct Engine {
    board: Board,
    tables: Arc<MagicTables>,
    tt: Option<TranspositionTable>,
    hash_mb: usize,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<WorkerResult>>,
    output_tx: Sender<String>,
    printer: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn new() -> Self {
        let (output_tx, output_rx) = mpsc::channel::<String>();
        let printer = thread::spawn(move || {
            let stdout = io::stdout();
            for line in output_rx {
                let mut handle = stdout.lock();
                let _ = writeln!(handle, "{line}");
                let _ = handle.flush();
            }
        });

        Self {
            board: Board::new(),
            tables: Arc::new(load_magic_tables()),
            tt: Some(TranspositionTable::new(DEFAULT_HASH_MB)),
            hash_mb: DEFAULT_HASH_MB,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            output_tx,
            printer: Some(printer),
        }
    }

    /// Run the UCI loop against stdin/stdout until `quit` or EOF.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();

            match parts[0] {
                "uci" => self.handle_uci(),
                "isready" => {
                    self.join_worker();
                    self.send("readyok".to_string());
                }
                "ucinewgame" => self.handle_ucinewgame(),
                "position" => self.handle_position(&parts),
                "go" => self.handle_go(&parts),
                "setoption" => self.handle_setoption(&parts),
                "stop" => self.handle_stop(),
                "quit" => {
                    self.handle_stop();
                    break;
                }
                "d" | "display" => self.handle_display(),
                _ => {
                    // Unknown command: UCI convention is to ignore it.
                }
            }
        }
        self.shutdown();
    }

    /// Drain any in-flight worker, then drop this engine's sender so the
    /// printer thread's channel closes and join it — stdout only ever sees
    /// complete lines, none left buffered in the channel when the process
    /// exits.
    fn shutdown(&mut self) {
        self.join_worker();
        let (dummy_tx, _unused_rx) = mpsc::channel::<String>();
        drop(std::mem::replace(&mut self.output_tx, dummy_tx));
        if let Some(handle) = self.printer.take() {
            let _ = handle.join();
        }
    }

    /// Every protocol line funnels through the same sender as the worker's
    /// `info`/`bestmove` output, so nothing the UCI thread writes can race
    /// with the printer thread's interleaving of worker output.
    fn send(&self, line: String) {
        let _ = self.output_tx.send(line);
    }

    fn handle_uci(&mut self) {
        self.send(format!("id name {ENGINE_NAME}"));
        self.send(format!("id author {ENGINE_AUTHOR}"));
        self.send(format!(
            "option name Hash type spin default {DEFAULT_HASH_MB} min {MIN_HASH_MB} max {MAX_HASH_MB}"
        ));
        self.send("uciok".to_string());
    }

    /// `d`/`display`: debug-only, writes to stderr so it can never be
    /// mistaken for part of the stdout wire protocol (§6.1).
    fn handle_display(&mut self) {
        self.join_worker();
        eprintln!("{}", self.board);
        eprintln!("fen {}", self.board.to_fen());
    }

    fn handle_ucinewgame(&mut self) {
        self.join_worker();
        self.board = Board::new();
        self.tt = Some(TranspositionTable::new(self.hash_mb));
    }

    fn handle_setoption(&mut self, parts: &[&str]) {
        self.join_worker();
        // setoption name Hash value N
        let Some(name_idx) = parts.iter().position(|&p| p == "name") else {
            return;
        };
        let value_idx = parts.iter().position(|&p| p == "value");
        let name_end = value_idx.unwrap_or(parts.len());
        let name = parts[name_idx + 1..name_end].join(" ");

        if name.eq_ignore_ascii_case("Hash")
            && let Some(vi) = value_idx
            && let Some(mb) = parts.get(vi + 1).and_then(|s| s.parse::<usize>().ok())
        {
            self.hash_mb = mb.clamp(MIN_HASH_MB, MAX_HASH_MB);
            self.tt = Some(TranspositionTable::new(self.hash_mb));
        }
        // Unknown options are ignored per UCI convention.
    }

    fn handle_position(&mut self, parts: &[&str]) {
        self.join_worker();

        let mut board = if parts.len() > 1 && parts[1] == "startpos" {
            Board::new()
        } else if parts.len() > 1 && parts[1] == "fen" {
            let fen_start = 2;
            let fen_end = parts
                .iter()
                .enumerate()
                .skip(fen_start)
                .find(|(_, &p)| p == "moves")
                .map(|(i, _)| i)
                .unwrap_or(parts.len());
            let fen_string = parts[fen_start..fen_end].join(" ");
            match Board::from_str(&fen_string) {
                Ok(b) => b,
                Err(msg) => {
                    self.send(format!("info string invalid FEN: {msg}"));
                    return;
                }
            }
        } else {
            // Malformed `position` command: leave the board untouched.
            return;
        };

        if let Some(moves_idx) = parts.iter().position(|&p| p == "moves") {
            for move_str in &parts[moves_idx + 1..] {
                match self.parse_uci_move(&board, move_str) {
                    Some(mv) => {
                        make_move_basic(&mut board, mv);
                    }
                    None => {
                        self.send(format!(
                            "info string illegal move in position command: {move_str}"
                        ));
                        break;
                    }
                }
            }
        }

        self.board = board;
    }

    fn parse_uci_move(&self, board: &Board, move_str: &str) -> Option<Move> {
        let mut moves = Vec::with_capacity(256);
        let mut scratch = Vec::with_capacity(256);
        let mut board_copy = board.clone();
        generate_legal(&mut board_copy, &self.tables, &mut moves, &mut scratch);
        moves.into_iter().find(|mv| mv.to_uci() == move_str)
    }

    fn handle_go(&mut self, parts: &[&str]) {
        // A `go` received while one is already in flight first requests the
        // running search to stop, the same way `handle_stop` does, so the
        // join below cannot block forever on an `infinite`/long-`movetime`
        // search that nothing has told to finish yet.
        self.stop.store(true, Ordering::Release);
        self.join_worker();

        let settings = GoSettings::parse(parts);
        let depth_limit = settings.depth_limit();
        let time_limit = settings.time_limit(self.board.side_to_move);

        let mut board = self.board.clone();
        let tables = Arc::clone(&self.tables);
        let mut tt = self.tt.take().unwrap_or(TranspositionTable::new(self.hash_mb));
        self.stop = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&self.stop);
        let output_tx = self.output_tx.clone();

        let handle = thread::spawn(move || {
            let (_score, best_move, _pv) = search_session(
                &mut board,
                &tables,
                &mut tt,
                depth_limit,
                time_limit,
                stop,
                &output_tx,
            );
            let mv_str = best_move.map(|m| m.to_uci()).unwrap_or_else(|| "0000".to_string());
            let _ = output_tx.send(format!("bestmove {mv_str}"));
            tt
        });

        self.worker = Some(handle);
    }

    fn handle_stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.join_worker();
    }

    /// Block until any in-flight search finishes, reclaiming its TT. A
    /// no-op when no search is running. The worker sends its own `bestmove`
    /// line over the output channel when it returns, so there is nothing to
    /// emit here.
    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(tt) => self.tt = Some(tt),
                Err(_) => self.tt = Some(TranspositionTable::new(self.hash_mb)),
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point used by `src/bin/cli.rs`.
pub fn run() {
    Engine::new().run();
}
