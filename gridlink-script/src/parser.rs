//! Command-script parser.
//!
//! Grammar, per line:
//!
//! ```text
//! line     := ';' comment | command (':' command)*
//! command  := ('[' address ']')? name (param (',' param)*)?
//! param    := (name '=')? value
//! value    := bare-word | '\'' text '\'' | '"' text '"'
//! ```
//!
//! `#NAME#` sequences are replaced with parser variables before scanning
//! (only when `NAME` is a defined variable, so address forms like
//! `node#task` survive). A command name equal to a registered alias is
//! replaced by the alias text. Unaddressed commands post to `@this`;
//! `core.flush_events` without an address executes synchronously against
//! the bound scheduler so later commands in the same script observe its
//! side effects.

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use tracing::trace;

// Layer 3: Internal module imports
use super::error::ScriptError;
use gridlink_rt::message::Params;
use gridlink_rt::scheduler::Scheduler;

/// One command extracted from a script line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    /// Empty means "this scheduler".
    pub address: String,
    pub command: String,
    pub params: Params,
}

/// Parses script lines into commands and posts them to a scheduler.
#[derive(Debug, Default)]
pub struct CommandParser {
    vars: HashMap<String, String>,
    aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Ctx {
    Start,
    Command,
    ParamName,
    ParamValue,
}

impl CommandParser {
    pub fn new() -> Self {
        Self::default()
    }

    // --- variables and aliases ---

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn is_var_defined(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn set_alias(&mut self, name: impl Into<String>, command: impl Into<String>) {
        self.aliases.insert(name.into(), command.into());
    }

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    // --- execution ---

    /// Parse one line and execute its commands in order. Returns how many
    /// commands ran.
    pub fn run_line(
        &mut self,
        scheduler: &mut Scheduler,
        line: &str,
    ) -> Result<usize, ScriptError> {
        let commands = self.parse_line(line)?;
        let count = commands.len();
        for command in commands {
            if command.address.is_empty() && command.command == "core.flush_events" {
                // executed in place so later commands see its effects
                scheduler.flush_events();
                continue;
            }
            let address = if command.address.is_empty() {
                "@this".to_owned()
            } else {
                command.address
            };
            let params = if command.params.is_empty() {
                None
            } else {
                Some(command.params)
            };
            scheduler.post_message(&address, &command.command, params, 0, None)?;
        }
        Ok(count)
    }

    /// Parse one line without executing anything.
    pub fn parse_line(&self, line: &str) -> Result<Vec<ParsedCommand>, ScriptError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            return Ok(Vec::new());
        }
        let expanded = self.replace_vars(trimmed);
        trace!(line = %expanded, "parsing command line");
        self.scan(&expanded)
    }

    /// Replace `#NAME#` with the variable's value when NAME is defined;
    /// anything else (including address `#` uses) is left alone.
    fn replace_vars(&self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut out = String::with_capacity(line.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '#' {
                if let Some(end) = Self::find_var_end(&chars, i) {
                    let name: String = chars[i + 1..end].iter().collect();
                    if let Some(value) = self.vars.get(&name) {
                        out.push_str(value);
                        i = end + 1;
                        continue;
                    }
                }
            }
            out.push(chars[i]);
            i += 1;
        }
        out
    }

    fn find_var_end(chars: &[char], start: usize) -> Option<usize> {
        let mut i = start + 1;
        while i < chars.len() {
            let c = chars[i];
            if c == '#' {
                return if i > start + 1 { Some(i) } else { None };
            }
            if !(c.is_ascii_alphanumeric() || c == '_') {
                return None;
            }
            i += 1;
        }
        None
    }

    fn scan(&self, line: &str) -> Result<Vec<ParsedCommand>, ScriptError> {
        let chars: Vec<char> = line.chars().collect();
        let mut commands = Vec::new();

        let mut address = String::new();
        let mut command = String::new();
        let mut params = Params::new();
        let mut param_name = String::new();
        let mut value = String::new();
        let mut value_seen = false;
        let mut ctx = Ctx::Start;

        let syntax = |position: usize, character: char| ScriptError::Syntax {
            position,
            character,
            line: line.to_owned(),
        };

        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if !c.is_ascii() {
                return Err(syntax(i, c));
            }
            match c {
                '[' => {
                    if ctx != Ctx::Start || !address.is_empty() {
                        return Err(syntax(i, c));
                    }
                    let Some(end) = chars[i..].iter().position(|&x| x == ']').map(|p| p + i) else {
                        return Err(syntax(i, c));
                    };
                    address = chars[i + 1..end].iter().collect();
                    i = end + 1;
                    continue;
                }
                ']' => return Err(syntax(i, c)),
                ':' => {
                    Self::finish_param(
                        &mut params,
                        &mut param_name,
                        &mut value,
                        &mut value_seen,
                        ctx,
                    );
                    if command.is_empty() {
                        return Err(syntax(i, c));
                    }
                    commands.push(self.build_command(&mut address, &mut command, &mut params));
                    ctx = Ctx::Start;
                }
                ',' => match ctx {
                    Ctx::ParamName | Ctx::ParamValue => {
                        Self::finish_param(
                            &mut params,
                            &mut param_name,
                            &mut value,
                            &mut value_seen,
                            ctx,
                        );
                        ctx = Ctx::ParamName;
                    }
                    _ => return Err(syntax(i, c)),
                },
                '=' => match ctx {
                    Ctx::ParamName if !value.is_empty() && param_name.is_empty() => {
                        param_name = std::mem::take(&mut value);
                        value_seen = false;
                        ctx = Ctx::ParamValue;
                    }
                    _ => return Err(syntax(i, c)),
                },
                '\'' | '"' => match ctx {
                    Ctx::ParamName | Ctx::ParamValue => {
                        let Some(end) = chars[i + 1..]
                            .iter()
                            .position(|&x| x == c)
                            .map(|p| p + i + 1)
                        else {
                            return Err(ScriptError::UnterminatedQuote {
                                position: i,
                                line: line.to_owned(),
                            });
                        };
                        value.push_str(&chars[i + 1..end].iter().collect::<String>());
                        value_seen = true;
                        i = end + 1;
                        continue;
                    }
                    _ => return Err(syntax(i, c)),
                },
                ' ' | '\t' => {
                    if ctx == Ctx::Command && !command.is_empty() {
                        ctx = Ctx::ParamName;
                    }
                    // separators between params are commas; spaces just pad
                }
                _ => match ctx {
                    Ctx::Start => {
                        ctx = Ctx::Command;
                        command.push(c);
                    }
                    Ctx::Command => command.push(c),
                    Ctx::ParamName | Ctx::ParamValue => {
                        value.push(c);
                        value_seen = true;
                    }
                },
            }
            i += 1;
        }

        Self::finish_param(&mut params, &mut param_name, &mut value, &mut value_seen, ctx);
        if !command.is_empty() {
            commands.push(self.build_command(&mut address, &mut command, &mut params));
        } else if !address.is_empty() || !params.is_empty() {
            return Err(syntax(chars.len().saturating_sub(1), ':'));
        }
        Ok(commands)
    }

    fn finish_param(
        params: &mut Params,
        param_name: &mut String,
        value: &mut String,
        value_seen: &mut bool,
        ctx: Ctx,
    ) {
        if !matches!(ctx, Ctx::ParamName | Ctx::ParamValue) {
            return;
        }
        if !*value_seen && param_name.is_empty() {
            return;
        }
        let value = std::mem::take(value);
        *value_seen = false;
        if param_name.is_empty() {
            params.push_unnamed(value);
        } else {
            params.push(std::mem::take(param_name), value);
        }
    }

    fn build_command(
        &self,
        address: &mut String,
        command: &mut String,
        params: &mut Params,
    ) -> ParsedCommand {
        let mut name = std::mem::take(command);
        if let Some(expansion) = self.aliases.get(&name) {
            name = expansion.clone();
        }
        ParsedCommand {
            address: std::mem::take(address),
            command: name,
            params: std::mem::take(params),
        }
    }
}
