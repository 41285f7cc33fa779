use std::io::{BufRead, BufReader, Stdin};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostCommand {
    /// Simulates loading `map`, firing the map-load events.
    MapLoad(String),
    Quit,
    /// Anything else is handed to the bridge verbatim.
    Bridge(String),
}

pub(crate) fn parse_host_command(line: &str) -> Option<HostCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (name, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (trimmed, ""),
    };
    if name.eq_ignore_ascii_case("quit") && rest.is_empty() {
        return Some(HostCommand::Quit);
    }
    if name.eq_ignore_ascii_case("map_load") && !rest.is_empty() {
        return Some(HostCommand::MapLoad(rest.to_string()));
    }
    Some(HostCommand::Bridge(trimmed.to_string()))
}

/// Operator lines read on a background thread and handed to the main loop.
pub(crate) struct CommandInbox {
    receiver: Receiver<String>,
    closed: bool,
}

impl CommandInbox {
    pub(crate) fn spawn_stdin() -> Self {
        Self::spawn_reader(stdin_reader())
    }

    pub(crate) fn spawn_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("stdin_commands".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    match line {
                        Ok(line) => {
                            if sender.send(line).is_err() {
                                break;
                            }
                        }
                        Err(error) => {
                            warn!(error = %error, "stdin_read_failed");
                            break;
                        }
                    }
                }
                debug!("stdin_closed");
            });
        if let Err(error) = spawned {
            warn!(error = %error, "stdin_thread_spawn_failed");
        }
        Self {
            receiver,
            closed: false,
        }
    }

    pub(crate) fn drain_into(&mut self, out: &mut Vec<String>) {
        if self.closed {
            return;
        }
        loop {
            match self.receiver.try_recv() {
                Ok(line) => out.push(line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }
}

// Must be `Send`; a `StdinLock` is not.
fn stdin_reader() -> BufReader<Stdin> {
    BufReader::new(std::io::stdin())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn host_commands_are_recognized_before_bridge_forwarding() {
        assert_eq!(parse_host_command("   "), None);
        assert_eq!(parse_host_command("quit"), Some(HostCommand::Quit));
        assert_eq!(parse_host_command("QUIT"), Some(HostCommand::Quit));
        assert_eq!(
            parse_host_command("map_load  levels\\a10\\a10 "),
            Some(HostCommand::MapLoad("levels\\a10\\a10".to_string()))
        );
        assert_eq!(
            parse_host_command("map_load"),
            Some(HostCommand::Bridge("map_load".to_string()))
        );
        assert_eq!(
            parse_host_command(" render_on_screen true "),
            Some(HostCommand::Bridge("render_on_screen true".to_string()))
        );
    }

    fn assert_thread_reader<R: BufRead + Send + 'static>(_reader: &R) {}

    #[test]
    fn stdin_reader_can_move_to_the_reader_thread() {
        assert_thread_reader(&stdin_reader());
    }

    #[test]
    fn inbox_delivers_lines_in_order_then_closes() {
        let mut inbox = CommandInbox::spawn_reader(Cursor::new("resume\npause\n"));
        let mut lines = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);

        while !inbox.closed && Instant::now() < deadline {
            inbox.drain_into(&mut lines);
            thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(lines, vec!["resume", "pause"]);
        assert!(inbox.closed);
    }
}
