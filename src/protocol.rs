//! Line-oriented text protocol for driving an [`Engine`].
//!
//! A presentation front end (or a human at a terminal) sends one command
//! per line and reads back one response. The format follows GTP: an
//! optional numeric id, the command, then arguments. Success responses
//! start with `=`, failures with `?`, each followed by the id (if any) and
//! terminated by a blank line.
//!
//! ## Supported Commands
//!
//! - `name` - Return engine name
//! - `version` - Return engine version
//! - `protocol_version` - Return protocol version (1)
//! - `list_commands` - List all supported commands
//! - `known_command <cmd>` - Check if a command is supported
//! - `quit` - Exit the program
//! - `showboard` - Print the board, top row first
//! - `new_board [seed]` - Generate a fresh board from the session config
//! - `load_board <row> / <row> / ...` - Replace the board with the given rows
//! - `swap <a> <b>` - Swap two tiles by index and resolve the chain
//! - `swap_xy <x1> <y1> <x2> <y2>` - Same, by coordinates
//! - `probe <index>` - Show what a match through `index` would clear
//!
//! Swap responses list one event per line.

use std::io::{self, BufRead, Write};

use log::warn;

use crate::board::Board;
use crate::config::BoardConfig;
use crate::engine::{Engine, Event};

/// The list of known commands.
const KNOWN_COMMANDS: &[&str] = &[
    "known_command",
    "list_commands",
    "load_board",
    "name",
    "new_board",
    "probe",
    "protocol_version",
    "quit",
    "showboard",
    "swap",
    "swap_xy",
    "version",
];

/// Protocol session: the engine plus the config used to regenerate boards.
pub struct ProtocolSession {
    engine: Engine,
    config: BoardConfig,
}

impl ProtocolSession {
    pub fn new(config: BoardConfig) -> anyhow::Result<Self> {
        let engine = Engine::new(&config)?;
        Ok(Self { engine, config })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Run the command loop, reading from stdin and writing to stdout.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        self.serve(stdin.lock(), &mut stdout)
    }

    /// Run the command loop over arbitrary input and output.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, output: &mut W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some(first) = parts.first() else {
                continue;
            };
            let command = first.to_lowercase();
            let args = &parts[1..];

            let (success, message) = self.execute(&command, args);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();

            writeln!(output, "{prefix}{id_str} {message}\n")?;
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command id from the beginning of the line.
    pub fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        if end == 0 {
            return (None, trimmed);
        }
        match trimmed[..end].parse::<u32>() {
            Ok(id) => (Some(id), trimmed[end..].trim()),
            Err(_) => (None, trimmed),
        }
    }

    /// Execute a command and return (success, response).
    pub fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "name" => (true, env!("CARGO_PKG_NAME").to_string()),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => (true, "1".to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => {
                let Some(name) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                let known = KNOWN_COMMANDS.contains(&name.to_lowercase().as_str());
                (true, known.to_string())
            }

            "quit" => (true, String::new()),

            "showboard" => (true, format!("\n{}", self.engine.board())),

            "new_board" => {
                let mut config = self.config.clone();
                if let Some(seed) = args.first() {
                    match seed.parse::<u64>() {
                        Ok(seed) => config.seed = Some(seed),
                        Err(_) => return (false, "invalid seed".to_string()),
                    }
                }
                if self.engine.is_busy() {
                    return (false, "busy".to_string());
                }
                match Engine::new(&config) {
                    Ok(engine) => {
                        self.engine = engine;
                        (true, String::new())
                    }
                    Err(e) => (false, e.to_string()),
                }
            }

            "load_board" => {
                let joined = args.join(" ");
                let rows: Vec<&str> = joined.split('/').map(str::trim).collect();
                let board = match Board::from_rows(&rows) {
                    Ok(board) => board,
                    Err(e) => return (false, e.to_string()),
                };
                match self.engine.load_board(board) {
                    Ok(()) => (true, String::new()),
                    Err(reason) => (false, reason.to_string()),
                }
            }

            "swap" => {
                let indices: Option<Vec<usize>> =
                    args.iter().take(2).map(|a| a.parse().ok()).collect();
                match indices.as_deref() {
                    Some(&[a, b]) => self.swap(a, b),
                    _ => (false, "expected two indices".to_string()),
                }
            }

            "swap_xy" => {
                let coords: Option<Vec<usize>> =
                    args.iter().take(4).map(|a| a.parse().ok()).collect();
                match coords.as_deref() {
                    Some(&[x1, y1, x2, y2]) => {
                        let grid = *self.engine.board().grid();
                        let inside = |x: usize, y: usize| x < grid.width && y < grid.height;
                        if !inside(x1, y1) || !inside(x2, y2) {
                            return (false, "coordinate outside the board".to_string());
                        }
                        self.swap(grid.coord_to_index(x1, y1), grid.coord_to_index(x2, y2))
                    }
                    _ => (false, "expected four coordinates".to_string()),
                }
            }

            "probe" => {
                let Some(index) = args.first().and_then(|a| a.parse::<usize>().ok()) else {
                    return (false, "expected an index".to_string());
                };
                match self.engine.probe(index) {
                    Ok(Some(expansion)) => {
                        let cells: Vec<String> =
                            expansion.cleared.iter().map(usize::to_string).collect();
                        (true, cells.join(" "))
                    }
                    Ok(None) => (true, "none".to_string()),
                    Err(e) => (false, e.to_string()),
                }
            }

            _ => (false, format!("unknown command: {command}")),
        }
    }

    fn swap(&mut self, a: usize, b: usize) -> (bool, String) {
        match self.engine.swap(a, b) {
            Ok(events) => {
                let accepted = !matches!(events.first(), Some(Event::SwapRejected(_)));
                let lines: Vec<String> = events.iter().map(Event::to_string).collect();
                (accepted, lines.join("\n"))
            }
            Err(e) => {
                warn!("swap {a} <-> {b} failed: {e}");
                (false, e.to_string())
            }
        }
    }
}
