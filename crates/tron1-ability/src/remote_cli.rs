//! Remote CLI: a line-based TCP console for the ability manager.
//!
//! **Entry**: `tron1-ability` starts it on `remote_cli_port` (default 8888).
//!
//! One client is served at a time. Each line is split on spaces, with double
//! quotes grouping words into one argument:
//!
//! ```text
//! tron1> switch "walk idle" "stand"
//! Stopped: walk
//! Stopped: idle
//! Started: stand
//! ```

use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::manager::AbilityManager;

const WELCOME: &str = "TRON1 Remote CLI\nType 'help' for available commands.\n";
const PROMPT: &str = "tron1> ";
/// Longest accepted command line in bytes, newline excluded.
const MAX_LINE_LEN: usize = 1024;

/// What a command handler sees.
pub struct CommandContext<'a> {
    pub manager: &'a AbilityManager,
    pub help: &'a str,
}

/// 命令处理器：接收完整参数列表（含命令名），返回回复文本
pub type CommandHandler = Arc<dyn Fn(&CommandContext<'_>, &[String]) -> String + Send + Sync>;

/// Command name → (handler, help text). Sorted so `help` output is stable.
pub struct CommandTable {
    handlers: BTreeMap<String, (CommandHandler, String)>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    pub fn register<F>(&mut self, command: &str, help: &str, handler: F)
    where
        F: Fn(&CommandContext<'_>, &[String]) -> String + Send + Sync + 'static,
    {
        self.handlers
            .insert(command.to_string(), (Arc::new(handler), help.to_string()));
    }

    pub fn help_text(&self) -> String {
        let mut text = String::from("\nAvailable commands:\n");
        for (name, (_, help)) in &self.handlers {
            text.push_str(&format!("  {}: {}\n", name, help));
        }
        text
    }

    /// Run `args[0]` with the full argument list. Unknown commands get the help text.
    pub fn execute(&self, manager: &AbilityManager, args: &[String]) -> String {
        let Some(command) = args.first() else {
            return String::new();
        };
        let help = self.help_text();
        match self.handlers.get(command) {
            Some((handler, _)) => handler(
                &CommandContext {
                    manager,
                    help: &help,
                },
                args,
            ),
            None => format!("Unknown command: {}\n{}", command, help),
        }
    }

    /// `help`, `list`, `start`, `stop`, `switch`, `exit`.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.register("help", "Show this help message", |ctx, _| {
            ctx.help.to_string()
        });
        table.register("list", "List all available abilities", |ctx, _| {
            format!("Available abilities:{}", ctx.manager.list_abilities())
        });
        table.register("start", "Start an ability", |ctx, args| {
            let Some(name) = args.get(1) else {
                return format!("Usage: start <ability_name>{}", ctx.help);
            };
            match ctx.manager.start_ability(name) {
                Ok(_) => format!("Successfully started ability: {}", name),
                Err(e) => {
                    tracing::warn!("{}", e);
                    format!("Failed to start ability: {}", name)
                }
            }
        });
        table.register("stop", "Stop an ability", |ctx, args| {
            let Some(name) = args.get(1) else {
                return format!("Usage: stop <ability_name>{}", ctx.help);
            };
            match ctx.manager.stop_ability(name) {
                Ok(_) => format!("Successfully stopped ability: {}", name),
                Err(e) => {
                    tracing::warn!("{}", e);
                    format!("Failed to stop ability: {}", name)
                }
            }
        });
        table.register(
            "switch",
            "Switch between abilities: switch \"<stop abilities>\" \"<start abilities>\"",
            |ctx, args| {
                if args.len() < 2 {
                    return format!(
                        "Usage: switch \"<stop ability1> <stop ability2> ...\" \"<start ability3> <start ability4> ...\"\n{}",
                        ctx.help
                    );
                }
                let stop_list = args[1].split_whitespace();
                let start_list = args.get(2).map(|s| s.split_whitespace());

                let mut out = String::new();
                for name in stop_list {
                    match ctx.manager.stop_ability(name) {
                        Ok(_) => out.push_str(&format!("Stopped: {}\n", name)),
                        Err(_) => out.push_str(&format!("Failed to stop: {}\n", name)),
                    }
                }
                for name in start_list.into_iter().flatten() {
                    match ctx.manager.start_ability(name) {
                        Ok(_) => out.push_str(&format!("Started: {}\n", name)),
                        Err(_) => out.push_str(&format!("Failed to start: {}\n", name)),
                    }
                }
                out
            },
        );
        table.register("exit", "Exit the CLI", |_, _| "Goodbye!".to_string());
        table
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a command line on spaces; double quotes group and are removed.
pub fn parse_command(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

pub struct RemoteCliServer {
    port: u16,
    manager: Arc<AbilityManager>,
    commands: Arc<CommandTable>,
    running: Arc<AtomicBool>,
    local_addr: Mutex<Option<SocketAddr>>,
    client: Arc<Mutex<Option<TcpStream>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl RemoteCliServer {
    /// `port` 0 picks a free port; see [`RemoteCliServer::start`] for the bound address.
    pub fn new(port: u16, manager: Arc<AbilityManager>) -> Self {
        Self {
            port,
            manager,
            commands: Arc::new(CommandTable::builtin()),
            running: Arc::new(AtomicBool::new(false)),
            local_addr: Mutex::new(None),
            client: Arc::new(Mutex::new(None)),
            thread: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind on all interfaces and serve on a background thread.
    pub fn start(&self) -> io::Result<SocketAddr> {
        let mut thread_slot = lock(&self.thread);
        if let (true, Some(addr)) = (self.is_running(), *lock(&self.local_addr)) {
            return Ok(addr);
        }

        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, self.port))?;
        let addr = listener.local_addr()?;
        *lock(&self.local_addr) = Some(addr);
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let manager = Arc::clone(&self.manager);
        let commands = Arc::clone(&self.commands);
        let client = Arc::clone(&self.client);
        let spawned = thread::Builder::new()
            .name("remote-cli".to_string())
            .spawn(move || accept_loop(listener, running, manager, commands, client));
        match spawned {
            Ok(handle) => *thread_slot = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        tracing::info!(port = addr.port(), "Remote CLI server started");
        Ok(addr)
    }

    pub fn stop(&self) {
        let mut thread_slot = lock(&self.thread);
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(stream) = lock(&self.client).take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        // Wake the blocking accept().
        if let Some(addr) = *lock(&self.local_addr) {
            let _ = TcpStream::connect((Ipv4Addr::LOCALHOST, addr.port()));
        }
        if let Some(handle) = thread_slot.take() {
            let _ = handle.join();
        }
        tracing::info!("Remote CLI server stopped");
    }
}

impl Drop for RemoteCliServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    running: Arc<AtomicBool>,
    manager: Arc<AbilityManager>,
    commands: Arc<CommandTable>,
    client: Arc<Mutex<Option<TcpStream>>>,
) {
    for stream in listener.incoming() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Failed to accept client connection: {}", e);
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        tracing::info!(peer = %peer, "New client connected");

        if let Ok(clone) = stream.try_clone() {
            *lock(&client) = Some(clone);
        }
        if let Err(e) = handle_client(stream, &running, &manager, &commands) {
            tracing::debug!(peer = %peer, "Client connection ended: {}", e);
        }
        lock(&client).take();
        tracing::info!(peer = %peer, "Client disconnected");
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    Line,
    Eof,
    TooLong,
}

/// Read one line into `line` without buffering more than [`MAX_LINE_LEN`] bytes of it.
fn read_command_line<R: BufRead>(reader: &mut R, line: &mut String) -> io::Result<LineRead> {
    line.clear();
    let n = reader
        .take(MAX_LINE_LEN as u64 + 2)
        .read_line(line)?;
    if n == 0 {
        return Ok(LineRead::Eof);
    }
    let content = line.trim_end_matches(['\r', '\n']).len();
    if content > MAX_LINE_LEN {
        return Ok(LineRead::TooLong);
    }
    Ok(LineRead::Line)
}

fn handle_client(
    stream: TcpStream,
    running: &AtomicBool,
    manager: &AbilityManager,
    commands: &CommandTable,
) -> io::Result<()> {
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    writer.write_all(WELCOME.as_bytes())?;

    let mut line = String::new();
    while running.load(Ordering::SeqCst) {
        writer.write_all(PROMPT.as_bytes())?;
        writer.flush()?;

        match read_command_line(&mut reader, &mut line)? {
            LineRead::Line => {}
            LineRead::Eof => break,
            LineRead::TooLong => {
                tracing::warn!("Command line over {} bytes, dropping client", MAX_LINE_LEN);
                writer.write_all(
                    format!("Line too long (max {} bytes), closing connection\n", MAX_LINE_LEN)
                        .as_bytes(),
                )?;
                break;
            }
        }
        let command_line: String = line.chars().filter(|c| *c != '\r' && *c != '\n').collect();
        let args = parse_command(&command_line);
        if args.is_empty() {
            continue;
        }

        let mut response = commands.execute(manager, &args);
        response.push('\n');
        writer.write_all(response.as_bytes())?;

        if args[0] == "exit" {
            break;
        }
    }
    Ok(())
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
