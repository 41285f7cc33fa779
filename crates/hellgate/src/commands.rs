use std::collections::HashMap;

use thiserror::Error;

pub const HELP_COMMAND: &str = "hellgate_help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    /// `None` reports the current value instead of changing it.
    RenderOnScreen(Option<bool>),
    SetScreenBitmap(Option<String>),
    Resume,
    Pause,
    CaptureInput(Option<bool>),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("error: {0}. usage: {}", HELP_COMMAND)]
    Tokenize(String),
    #[error("error: unknown command '{0}'. try: {}", HELP_COMMAND)]
    Unknown(String),
    #[error("error: {reason}. usage: {usage}")]
    Usage { reason: String, usage: String },
}

type ParseFn = dyn Fn(&[String]) -> Result<BridgeCommand, CommandError> + Send + Sync;

pub struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    min_args: usize,
    max_args: usize,
    parse: Box<ParseFn>,
}

impl CommandSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn usage(&self) -> String {
        if self.arg_schema.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.arg_schema)
        }
    }

    fn check_arity(&self, args: &[String]) -> Result<(), CommandError> {
        let reason = if args.len() < self.min_args {
            format!("expected at least {} argument(s)", self.min_args)
        } else if args.len() > self.max_args {
            if self.max_args == 0 {
                "unexpected extra arguments".to_string()
            } else {
                format!("expected at most {} argument(s)", self.max_args)
            }
        } else {
            return Ok(());
        };
        Err(CommandError::Usage {
            reason,
            usage: self.usage(),
        })
    }
}

/// Commands in registration order with case-insensitive lookup.
pub struct CommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_bridge_builtins()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub fn with_bridge_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(
                "render_on_screen",
                "Draw the screen bitmap over the host UI",
                "[enabled:bool]",
                0..=1,
                parse_render_on_screen_command,
            )
            .expect("built-in command registration should not fail");
        registry
            .register(
                "set_screen_bitmap",
                "Set the bitmap path the game renders into",
                "[path:string]",
                0..=1,
                parse_set_screen_bitmap_command,
            )
            .expect("built-in command registration should not fail");
        registry
            .register(
                "resume",
                "Resume the game",
                "",
                0..=0,
                |_| Ok(BridgeCommand::Resume),
            )
            .expect("built-in command registration should not fail");
        registry
            .register(
                "pause",
                "Pause the game",
                "",
                0..=0,
                |_| Ok(BridgeCommand::Pause),
            )
            .expect("built-in command registration should not fail");
        registry
            .register(
                "capture_input",
                "Forward keyboard input to the game",
                "[enabled:bool]",
                0..=1,
                parse_capture_input_command,
            )
            .expect("built-in command registration should not fail");
        registry
            .register(HELP_COMMAND, "List commands", "", 0..=0, |_| {
                Ok(BridgeCommand::Help)
            })
            .expect("built-in command registration should not fail");
        registry
    }

    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        arity: std::ops::RangeInclusive<usize>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<BridgeCommand, CommandError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        if arity.is_empty() {
            return Err(format!("empty argument range for command: {name}"));
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }

        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            min_args: *arity.start(),
            max_args: *arity.end(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name.insert(lower, self.specs.len() - 1);
        Ok(())
    }

    pub fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let lower = input_name.to_ascii_lowercase();
        let index = self.lookup_by_lower_name.get(&lower)?;
        self.specs.get(*index)
    }

    /// Parses one operator line. Blank lines yield `Ok(None)`.
    pub fn parse_line(&self, raw_line: &str) -> Result<Option<BridgeCommand>, CommandError> {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let tokens = tokenize_line(trimmed).map_err(CommandError::Tokenize)?;
        let Some((command_name, args)) = tokens.split_first() else {
            return Ok(None);
        };
        let spec = self
            .lookup(command_name)
            .ok_or_else(|| CommandError::Unknown(command_name.clone()))?;

        spec.check_arity(args)?;
        (spec.parse)(args).map(Some)
    }

    pub fn help_lines(&self) -> Vec<String> {
        self.specs
            .iter()
            .map(|spec| {
                if spec.arg_schema.is_empty() {
                    format!("{} - {}", spec.name, spec.help)
                } else {
                    format!("{} {} - {}", spec.name, spec.arg_schema, spec.help)
                }
            })
            .collect()
    }
}

pub fn parse_bool(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

pub fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut seen_token_content = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                seen_token_content = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if seen_token_content {
                    tokens.push(std::mem::take(&mut current));
                    seen_token_content = false;
                }
            }
            _ => {
                current.push(ch);
                seen_token_content = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if seen_token_content {
        tokens.push(current);
    }

    Ok(tokens)
}

fn parse_flag_argument(args: &[String], usage: &str) -> Result<Option<bool>, CommandError> {
    let Some(token) = args.first() else {
        return Ok(None);
    };
    parse_bool(token).map(Some).ok_or_else(|| CommandError::Usage {
        reason: format!("invalid boolean '{token}' (expected true|false)"),
        usage: usage.to_string(),
    })
}

fn parse_render_on_screen_command(args: &[String]) -> Result<BridgeCommand, CommandError> {
    parse_flag_argument(args, "render_on_screen [enabled:bool]").map(BridgeCommand::RenderOnScreen)
}

fn parse_capture_input_command(args: &[String]) -> Result<BridgeCommand, CommandError> {
    parse_flag_argument(args, "capture_input [enabled:bool]").map(BridgeCommand::CaptureInput)
}

fn parse_set_screen_bitmap_command(args: &[String]) -> Result<BridgeCommand, CommandError> {
    Ok(BridgeCommand::SetScreenBitmap(args.first().cloned()))
}
