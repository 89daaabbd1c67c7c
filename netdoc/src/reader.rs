//! Tokenizer for the line-oriented directory document grammar.
//!
//! A document is a sequence of items. Each item is one line made of a
//! keyword and its arguments, optionally followed by a base64 object framed
//! by `-----BEGIN <label>-----` / `-----END <label>-----`.

use std::iter::Peekable;
use std::net::{Ipv4Addr, SocketAddrV6};
use std::str::FromStr;
use std::vec::IntoIter;

use dirauth_types::{IdentityDigest, Timestamp};

use crate::encode::decode_b64;
use crate::NetdocError;

/// A decoded object attached to an item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Object {
    pub label: String,
    pub data: Vec<u8>,
}

/// One keyword line and its optional object.
#[derive(Clone, Debug)]
pub struct Item<'a> {
    /// 1-based line number of the keyword line.
    pub line: usize,
    pub keyword: &'a str,
    /// Everything after the keyword, trimmed.
    pub args: &'a str,
    pub object: Option<Object>,
}

impl<'a> Item<'a> {
    pub fn tokens(&self) -> Vec<&'a str> {
        self.args.split_whitespace().collect()
    }

    pub fn error(&self, reason: impl Into<String>) -> NetdocError {
        NetdocError::bad(self.line, self.keyword, reason)
    }

    /// The `n`th whitespace-separated argument.
    pub fn arg(&self, n: usize) -> Result<&'a str, NetdocError> {
        self.args
            .split_whitespace()
            .nth(n)
            .ok_or_else(|| self.error(format!("missing argument {}", n + 1)))
    }

    pub fn parse_arg<T: FromStr>(&self, n: usize) -> Result<T, NetdocError> {
        let raw = self.arg(n)?;
        raw.parse()
            .map_err(|_| self.error(format!("cannot parse argument {:?}", raw)))
    }

    pub fn fingerprint_arg(&self, n: usize) -> Result<IdentityDigest, NetdocError> {
        IdentityDigest::from_hex(self.arg(n)?).map_err(|e| self.error(e.to_string()))
    }

    pub fn ipv4_arg(&self, n: usize) -> Result<Ipv4Addr, NetdocError> {
        self.parse_arg(n)
    }

    /// A timestamp made of the date and time arguments at `n` and `n + 1`.
    pub fn timestamp_arg(&self, n: usize) -> Result<Timestamp, NetdocError> {
        let joined = format!("{} {}", self.arg(n)?, self.arg(n + 1)?);
        Timestamp::parse_iso(&joined).map_err(|e| self.error(e.to_string()))
    }

    /// The whole argument string parsed as a timestamp.
    pub fn timestamp(&self) -> Result<Timestamp, NetdocError> {
        self.timestamp_arg(0)
    }

    pub fn ipv6_arg(&self, n: usize) -> Result<SocketAddrV6, NetdocError> {
        self.parse_arg(n)
    }

    pub fn object_data(&self) -> Result<&[u8], NetdocError> {
        self.object
            .as_ref()
            .map(|o| o.data.as_slice())
            .ok_or_else(|| self.error("missing object"))
    }
}

/// Split `text` into items. Blank lines are skipped.
pub fn tokenize(text: &str) -> Result<Vec<Item<'_>>, NetdocError> {
    let mut items: Vec<Item<'_>> = Vec::new();
    let mut lines = text.lines().enumerate();

    while let Some((idx, raw)) = lines.next() {
        let line = idx + 1;
        let trimmed = raw.trim_end();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(label) = begin_label(trimmed) {
            let label = label.to_string();
            let end_marker = format!("-----END {label}-----");
            let mut body = String::new();
            let mut terminated = false;
            for (_, obj_line) in lines.by_ref() {
                let obj_line = obj_line.trim_end();
                if obj_line == end_marker {
                    terminated = true;
                    break;
                }
                body.push_str(obj_line);
            }
            if !terminated {
                return Err(NetdocError::UnterminatedObject { line });
            }
            let item = items
                .last_mut()
                .ok_or_else(|| NetdocError::bad(line, "object", "object without keyword"))?;
            if item.object.is_some() {
                return Err(item.error("more than one object"));
            }
            let data = decode_b64(&body).map_err(|e| item.error(e))?;
            item.object = Some(Object { label, data });
            continue;
        }

        let (keyword, args) = match trimmed.split_once(' ') {
            Some((k, rest)) => (k, rest.trim()),
            None => (trimmed, ""),
        };
        items.push(Item {
            line,
            keyword,
            args,
            object: None,
        });
    }

    Ok(items)
}

fn begin_label(line: &str) -> Option<&str> {
    line.strip_prefix("-----BEGIN ")?.strip_suffix("-----")
}

/// Forward-only cursor over a document's items.
pub struct Cursor<'a> {
    items: Peekable<IntoIter<Item<'a>>>,
    last_line: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Result<Self, NetdocError> {
        let items = tokenize(text)?;
        Ok(Self {
            items: items.into_iter().peekable(),
            last_line: 0,
        })
    }

    pub fn peek_keyword(&mut self) -> Option<&'a str> {
        self.items.peek().map(|i| i.keyword)
    }

    pub fn next_item(&mut self) -> Option<Item<'a>> {
        let item = self.items.next()?;
        self.last_line = item.line;
        Some(item)
    }

    /// Consume the next item if its keyword is `keyword`.
    pub fn take(&mut self, keyword: &str) -> Option<Item<'a>> {
        if self.peek_keyword() == Some(keyword) {
            self.next_item()
        } else {
            None
        }
    }

    /// Consume the next item, which must be `keyword`.
    pub fn expect(&mut self, keyword: &'static str) -> Result<Item<'a>, NetdocError> {
        self.take(keyword).ok_or(NetdocError::Missing {
            line: self.last_line + 1,
            keyword,
        })
    }

    /// Consume every consecutive item whose keyword is `keyword`.
    pub fn take_all(&mut self, keyword: &str) -> Vec<Item<'a>> {
        let mut taken = Vec::new();
        while let Some(item) = self.take(keyword) {
            taken.push(item);
        }
        taken
    }

    /// Skip items until one of `stops` (or the end) is next.
    pub fn skip_until(&mut self, stops: &[&str]) {
        while let Some(k) = self.peek_keyword() {
            if stops.contains(&k) {
                break;
            }
            tracing::trace!(keyword = k, "skipping unrecognized item");
            self.next_item();
        }
    }

    pub fn is_done(&mut self) -> bool {
        self.items.peek().is_none()
    }
}
