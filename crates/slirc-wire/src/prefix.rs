//! Message origin (prefix) parsing.
//!
//! An IRC line may begin with `:nick!user@host `, identifying who sent it.
//! Servers send their own name in the nick position; every sub-part is
//! optional, so the console keeps all three as plain optional fields and
//! lets callers decide what they need.

/// Parsed `nick!user@host` origin of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Prefix {
    /// Nickname (or server name).
    pub nick: Option<String>,
    /// Username (ident).
    pub user: Option<String>,
    /// Hostname.
    pub host: Option<String>,
}

impl Prefix {
    /// Parse a raw prefix string (without the leading `:`).
    ///
    /// This is a lenient parser that does not validate the components.
    pub fn parse(s: &str) -> Self {
        let (before, host) = match s.find('@') {
            Some(at) => (&s[..at], Some(&s[at + 1..])),
            None => (s, None),
        };

        let (nick, user) = match before.find('!') {
            Some(bang) => (&before[..bang], Some(&before[bang + 1..])),
            None => (before, None),
        };

        fn non_empty(s: &str) -> Option<String> {
            if s.is_empty() {
                None
            } else {
                Some(s.to_owned())
            }
        }

        Prefix {
            nick: non_empty(nick),
            user: user.and_then(non_empty),
            host: host.and_then(non_empty),
        }
    }

    /// Nickname of the sender, if present.
    pub fn nick(&self) -> Option<&str> {
        self.nick.as_deref()
    }

    /// The `user@host` pair, when either half was reported.
    ///
    /// A lone user or host is returned without the missing half, matching
    /// how hostmasks are displayed to operators.
    pub fn hostmask(&self) -> Option<String> {
        match (self.user.as_deref(), self.host.as_deref()) {
            (Some(u), Some(h)) => Some(format!("{u}@{h}")),
            (Some(u), None) => Some(u.to_owned()),
            (None, Some(h)) => Some(h.to_owned()),
            (None, None) => None,
        }
    }
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(nick) = &self.nick {
            write!(f, "{nick}")?;
        }
        if let Some(user) = &self.user {
            write!(f, "!{user}")?;
        }
        if let Some(host) = &self.host {
            write!(f, "@{host}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let p = Prefix::parse("nick!user@host.com");
        assert_eq!(p.nick(), Some("nick"));
        assert_eq!(p.user.as_deref(), Some("user"));
        assert_eq!(p.host.as_deref(), Some("host.com"));
        assert_eq!(p.hostmask().as_deref(), Some("user@host.com"));
    }

    #[test]
    fn test_parse_server_name() {
        let p = Prefix::parse("irc.example.com");
        assert_eq!(p.nick(), Some("irc.example.com"));
        assert_eq!(p.hostmask(), None);
    }

    #[test]
    fn test_parse_nick_host_only() {
        let p = Prefix::parse("nick@host");
        assert_eq!(p.nick(), Some("nick"));
        assert_eq!(p.user, None);
        assert_eq!(p.hostmask().as_deref(), Some("host"));
    }

    #[test]
    fn test_display_round_trip() {
        for raw in ["nick!user@host", "nick@host", "nick", "irc.example.com"] {
            assert_eq!(Prefix::parse(raw).to_string(), raw);
        }
    }
}
