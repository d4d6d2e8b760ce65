//! IRC message prefix types.
//!
//! A prefix identifies the origin of a message: either the server itself or
//! a user's `nick!user@host` mask.

use std::fmt;

/// IRC message prefix.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// Server name (e.g., "smilebasic").
    ServerName(String),
    /// User prefix: (nickname, username, hostname).
    Nickname(String, String, String),
}

impl Prefix {
    /// Create a new user prefix from nick, user, and host components.
    pub fn new(
        nick: impl Into<String>,
        user: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Prefix::Nickname(nick.into(), user.into(), host.into())
    }

    /// Parse a prefix string leniently.
    ///
    /// Anything containing `!` or `@` is a user mask. A bare token is a
    /// server name if it contains a dot, otherwise a nickname.
    pub fn new_from_str(s: &str) -> Self {
        if !s.contains(['!', '@']) {
            return if s.contains('.') {
                Prefix::ServerName(s.to_string())
            } else {
                Prefix::Nickname(s.to_string(), String::new(), String::new())
            };
        }

        let (rest, host) = match s.split_once('@') {
            Some((rest, host)) => (rest, host),
            None => (s, ""),
        };
        let (nick, user) = match rest.split_once('!') {
            Some((nick, user)) => (nick, user),
            None => (rest, ""),
        };
        Prefix::new(nick, user, host)
    }

    /// The nickname component, if this is a user prefix.
    pub fn nickname(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) => Some(nick),
            Prefix::ServerName(_) => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(name, user, host) => match (&name[..], &user[..], &host[..]) {
                (name, "", "") => write!(f, "{}", name),
                (name, user, "") => write!(f, "{}!{}", name, user),
                (name, "", host) => write!(f, "{}@{}", name, host),
                (name, user, host) => write!(f, "{}!{}@{}", name, user, host),
            },
        }
    }
}
