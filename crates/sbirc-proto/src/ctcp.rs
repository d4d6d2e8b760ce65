//! CTCP (Client-to-Client Protocol) helpers.
//!
//! CTCP payloads travel inside PRIVMSG/NOTICE text wrapped in `\x01`. The
//! bridge only cares about `ACTION`, which clients send for `/me`.
//!
//! ```
//! use sbirc_proto::ctcp::Ctcp;
//!
//! let ctcp = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
//! assert!(ctcp.is_action());
//! assert_eq!(ctcp.params, Some("waves hello"));
//!
//! assert_eq!(Ctcp::action("dances"), "\x01ACTION dances\x01");
//! ```

/// The CTCP delimiter character (`\x01`).
pub const CTCP_DELIM: char = '\x01';

/// A borrowed CTCP payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// The CTCP command, e.g. `ACTION`.
    pub command: &'a str,
    /// Everything after the first space, if anything.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse text that is fully wrapped in CTCP delimiters.
    ///
    /// Returns `None` for ordinary text.
    pub fn parse(text: &'a str) -> Option<Self> {
        let inner = text
            .strip_prefix(CTCP_DELIM)?
            .strip_suffix(CTCP_DELIM)?;
        if inner.is_empty() {
            return None;
        }
        let (command, params) = match inner.split_once(' ') {
            Some((command, params)) => (command, Some(params)),
            None => (inner, None),
        };
        Some(Ctcp { command, params })
    }

    /// True for `ACTION`, compared case-sensitively as clients send it.
    pub fn is_action(&self) -> bool {
        self.command == "ACTION"
    }

    /// Wrap `text` as a CTCP ACTION payload.
    pub fn action(text: &str) -> String {
        format!("{CTCP_DELIM}ACTION {text}{CTCP_DELIM}")
    }
}
