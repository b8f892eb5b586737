// src/error.rs
// Boundary error type: parse failures and fatal startup conditions.

use std::fmt;

#[derive(Debug, Clone)]
pub enum EngineError {
    Fen(String),
    Move(String),
    Option(String),
    Magic(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Fen(msg) => write!(f, "invalid FEN: {msg}"),
            EngineError::Move(msg) => write!(f, "invalid move: {msg}"),
            EngineError::Option(msg) => write!(f, "invalid option: {msg}"),
            EngineError::Magic(msg) => write!(f, "magic table generation failed: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
