//! IRC command types.
//!
//! The typed variants cover the commands the bridge handles. Commands with an
//! unexpected number of arguments, and every other verb, become
//! [`Command::Raw`] rather than a parse error.

use std::fmt::{self, Write};

use crate::error::MessageParseError;
use crate::response::Response;

/// An IRC command with its parameters.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `PASS <password>`
    PASS(String),
    /// `NICK <nickname>`
    NICK(String),
    /// `USER <user> <mode> * :<realname>`
    USER(String, String, String),
    /// `PING <token> [<server>]`
    PING(String, Option<String>),
    /// `PONG <token> [<server>]`
    PONG(String, Option<String>),
    /// `QUIT [:<reason>]`
    QUIT(Option<String>),
    /// `JOIN <channels> [<keys>]`
    JOIN(String, Option<String>),
    /// `PART <channels> [:<reason>]`
    PART(String, Option<String>),
    /// `MODE <target> [<modes> [<args>...]]`
    MODE(String, Vec<String>),
    /// `PRIVMSG <target> :<text>`
    PRIVMSG(String, String),
    /// `NOTICE <target> :<text>`
    NOTICE(String, String),
    /// `NAMES [<channels>]`
    NAMES(Option<String>),
    /// `WHO [<mask>]`
    WHO(Option<String>),
    /// `ERROR :<message>`
    ERROR(String),
    /// Numeric reply with its parameters.
    Response(Response, Vec<String>),
    /// Any other command, kept verbatim.
    Raw(String, Vec<String>),
}

impl Command {
    /// Build a command from its name and parameters.
    pub fn new(cmd: &str, args: Vec<&str>) -> Result<Command, MessageParseError> {
        if cmd.is_empty() {
            return Err(MessageParseError::InvalidCommand);
        }
        let upper = cmd.to_ascii_uppercase();

        let command = match (upper.as_str(), args.as_slice()) {
            ("PASS", [pass]) => Command::PASS((*pass).to_owned()),
            ("NICK", [nick, ..]) => Command::NICK((*nick).to_owned()),
            ("USER", [user, rest @ ..]) => {
                let mode = rest.first().filter(|_| rest.len() > 1).unwrap_or(&"0");
                let realname = rest.last().unwrap_or(user);
                Command::USER((*user).to_owned(), (*mode).to_owned(), (*realname).to_owned())
            }
            ("PING", [token]) => Command::PING((*token).to_owned(), None),
            ("PING", [token, server]) => {
                Command::PING((*token).to_owned(), Some((*server).to_owned()))
            }
            ("PONG", [token]) => Command::PONG((*token).to_owned(), None),
            ("PONG", [token, server]) => {
                Command::PONG((*token).to_owned(), Some((*server).to_owned()))
            }
            ("QUIT", []) => Command::QUIT(None),
            ("QUIT", [reason]) => Command::QUIT(Some((*reason).to_owned())),
            ("JOIN", [chans]) => Command::JOIN((*chans).to_owned(), None),
            ("JOIN", [chans, keys]) => Command::JOIN((*chans).to_owned(), Some((*keys).to_owned())),
            ("PART", [chans]) => Command::PART((*chans).to_owned(), None),
            ("PART", [chans, reason]) => {
                Command::PART((*chans).to_owned(), Some((*reason).to_owned()))
            }
            ("MODE", [target, rest @ ..]) => Command::MODE(
                (*target).to_owned(),
                rest.iter().map(|s| (*s).to_owned()).collect(),
            ),
            ("PRIVMSG", [target, text]) => {
                Command::PRIVMSG((*target).to_owned(), (*text).to_owned())
            }
            ("NOTICE", [target, text]) => Command::NOTICE((*target).to_owned(), (*text).to_owned()),
            ("NAMES", []) => Command::NAMES(None),
            ("NAMES", [chans, ..]) => Command::NAMES(Some((*chans).to_owned())),
            ("WHO", []) => Command::WHO(None),
            ("WHO", [mask, ..]) => Command::WHO(Some((*mask).to_owned())),
            ("ERROR", [text]) => Command::ERROR((*text).to_owned()),
            _ => match upper.parse::<u16>().ok().and_then(Response::from_code) {
                Some(resp) if upper.len() == 3 => {
                    Command::Response(resp, args.iter().map(|s| (*s).to_owned()).collect())
                }
                _ => Command::Raw(upper, args.iter().map(|s| (*s).to_owned()).collect()),
            },
        };
        Ok(command)
    }

    /// The verb of this command, upper-cased (numerics as three digits).
    pub fn name(&self) -> String {
        match self {
            Command::PASS(_) => "PASS".into(),
            Command::NICK(_) => "NICK".into(),
            Command::USER(..) => "USER".into(),
            Command::PING(..) => "PING".into(),
            Command::PONG(..) => "PONG".into(),
            Command::QUIT(_) => "QUIT".into(),
            Command::JOIN(..) => "JOIN".into(),
            Command::PART(..) => "PART".into(),
            Command::MODE(..) => "MODE".into(),
            Command::PRIVMSG(..) => "PRIVMSG".into(),
            Command::NOTICE(..) => "NOTICE".into(),
            Command::NAMES(_) => "NAMES".into(),
            Command::WHO(_) => "WHO".into(),
            Command::ERROR(_) => "ERROR".into(),
            Command::Response(resp, _) => resp.to_string(),
            Command::Raw(cmd, _) => cmd.clone(),
        }
    }
}

/// Check if a string needs colon-prefixing as a trailing IRC argument.
pub fn needs_colon_prefix(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

/// Write `cmd` and its arguments; the last argument is colon-prefixed only
/// when it has to be.
fn write_cmd(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    let len = args.len();
    for (i, arg) in args.iter().enumerate() {
        f.write_char(' ')?;
        if i == len - 1 && needs_colon_prefix(arg) {
            f.write_char(':')?;
        }
        f.write_str(arg)?;
    }
    Ok(())
}

/// Write `cmd` and its arguments; the last argument is always free-form text.
fn write_cmd_freeform(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    let len = args.len();
    for (i, arg) in args.iter().enumerate() {
        f.write_char(' ')?;
        if i == len - 1 {
            f.write_char(':')?;
        }
        f.write_str(arg)?;
    }
    Ok(())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(p) => write_cmd(f, "PASS", &[p]),
            Command::NICK(n) => write_cmd(f, "NICK", &[n]),
            Command::USER(u, m, r) => write_cmd_freeform(f, "USER", &[u, m, "*", r]),
            Command::PING(t, None) => write_cmd(f, "PING", &[t]),
            Command::PING(t, Some(s)) => write_cmd(f, "PING", &[t, s]),
            Command::PONG(t, None) => write_cmd(f, "PONG", &[t]),
            Command::PONG(s, Some(t)) => write_cmd(f, "PONG", &[s, t]),
            Command::QUIT(Some(m)) => write_cmd_freeform(f, "QUIT", &[m]),
            Command::QUIT(None) => write_cmd(f, "QUIT", &[]),
            Command::JOIN(c, Some(k)) => write_cmd(f, "JOIN", &[c, k]),
            Command::JOIN(c, None) => write_cmd(f, "JOIN", &[c]),
            Command::PART(c, Some(m)) => write_cmd_freeform(f, "PART", &[c, m]),
            Command::PART(c, None) => write_cmd(f, "PART", &[c]),
            Command::MODE(t, args) => {
                let mut all: Vec<&str> = Vec::with_capacity(args.len() + 1);
                all.push(t);
                all.extend(args.iter().map(String::as_str));
                write_cmd(f, "MODE", &all)
            }
            Command::PRIVMSG(t, m) => write_cmd_freeform(f, "PRIVMSG", &[t, m]),
            Command::NOTICE(t, m) => write_cmd_freeform(f, "NOTICE", &[t, m]),
            Command::NAMES(Some(c)) => write_cmd(f, "NAMES", &[c]),
            Command::NAMES(None) => write_cmd(f, "NAMES", &[]),
            Command::WHO(Some(m)) => write_cmd(f, "WHO", &[m]),
            Command::WHO(None) => write_cmd(f, "WHO", &[]),
            Command::ERROR(m) => write_cmd_freeform(f, "ERROR", &[m]),
            Command::Response(resp, args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                write_cmd(f, &resp.to_string(), &args)
            }
            Command::Raw(c, args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                write_cmd(f, c, &args)
            }
        }
    }
}
