//! IRC message model and parsing.
//!
//! A framed line decomposes into an optional origin prefix, a command
//! token, and a parameter list. The command stays an uninterpreted token
//! (word or three-digit numeric): the console must pass unknown commands
//! through untouched, so there is no closed command enum here.
//!
//! The trailing-parameter rule is honored exactly both ways: the final
//! parameter may start with `:` and contain spaces when parsing, and
//! serialization re-applies the `:` marker whenever the last parameter
//! needs it.

use std::str::FromStr;

use crate::error::WireError;
use crate::prefix::Prefix;

/// A parsed IRC protocol line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Message origin, present when the line began with `:`.
    pub prefix: Option<Prefix>,
    /// Command token, uppercase word or numeric string.
    pub command: String,
    /// Positional parameters; the last may contain spaces.
    pub params: Vec<String>,
}

impl Message {
    /// Build a message without a prefix.
    pub fn new(command: impl Into<String>, params: Vec<String>) -> Self {
        Message {
            prefix: None,
            command: command.into(),
            params,
        }
    }

    /// Numeric reply code for three-digit commands, `None` otherwise.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Nickname of the sender, when the prefix carries one.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Parameter at `idx`, or `""` when absent.
    pub fn param(&self, idx: usize) -> &str {
        self.params.get(idx).map(String::as_str).unwrap_or("")
    }

    /// The trailing (final) parameter, or `""` when there are none.
    pub fn trailing(&self) -> &str {
        self.params.last().map(String::as_str).unwrap_or("")
    }
}

impl FromStr for Message {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_end_matches(['\r', '\n']);

        let (prefix, rest) = match s.strip_prefix(':') {
            Some(rest) => {
                let (raw_prefix, rest) = rest.split_once(' ').unwrap_or((rest, ""));
                (Some(Prefix::parse(raw_prefix)), rest)
            }
            None => (None, s),
        };

        let mut params = Vec::new();
        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return Err(WireError::EmptyMessage);
        }

        loop {
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_owned());
                break;
            }
            match rest.split_once(' ') {
                Some((param, next)) => {
                    if !param.is_empty() {
                        params.push(param.to_owned());
                    }
                    rest = next;
                }
                None => {
                    params.push(rest.to_owned());
                    break;
                }
            }
        }

        Ok(Message {
            prefix,
            command: command.to_owned(),
            params,
        })
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        write!(f, "{}", self.command)?;
        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {param}")?;
            }
            if last.is_empty() || last.starts_with(':') || last.contains(' ') {
                write!(f, " :{last}")?;
            } else {
                write!(f, " {last}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg() {
        let msg: Message = ":nick!user@host PRIVMSG #room :hello there"
            .parse()
            .unwrap();
        assert_eq!(msg.source_nick(), Some("nick"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#room", "hello there"]);
    }

    #[test]
    fn test_parse_no_prefix() {
        let msg: Message = "PING :irc.example.com".parse().unwrap();
        assert!(msg.prefix.is_none());
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.trailing(), "irc.example.com");
    }

    #[test]
    fn test_parse_numeric() {
        let msg: Message = ":server 322 me #chat 42 :A topic here".parse().unwrap();
        assert_eq!(msg.numeric(), Some(322));
        assert_eq!(msg.params, vec!["me", "#chat", "42", "A topic here"]);
    }

    #[test]
    fn test_numeric_rejects_words() {
        let msg: Message = "JOIN #room".parse().unwrap();
        assert_eq!(msg.numeric(), None);
    }

    #[test]
    fn test_trailing_colon_preserved_in_body() {
        let msg: Message = "PRIVMSG #room ::)".parse().unwrap();
        assert_eq!(msg.params, vec!["#room", ":)"]);
    }

    #[test]
    fn test_serialize_round_trip() {
        for raw in [
            ":nick!user@host PRIVMSG #room :hello there",
            "JOIN #room",
            ":server 318 me target :End of /WHOIS list.",
        ] {
            let msg: Message = raw.parse().unwrap();
            assert_eq!(msg.to_string(), raw);
        }
    }

    #[test]
    fn test_single_word_trailing_loses_marker() {
        // The `:` on a spaceless trailing parameter is presentation, not
        // content; re-serialization emits the compact form.
        let msg: Message = "PING :token".parse().unwrap();
        assert_eq!(msg.trailing(), "token");
        assert_eq!(msg.to_string(), "PING token");
    }

    #[test]
    fn test_serialize_adds_trailing_marker() {
        let msg = Message::new("PRIVMSG", vec!["#room".into(), "two words".into()]);
        assert_eq!(msg.to_string(), "PRIVMSG #room :two words");
    }

    #[test]
    fn test_empty_line_rejected() {
        assert!("".parse::<Message>().is_err());
        assert!("   ".parse::<Message>().is_err());
    }
}
