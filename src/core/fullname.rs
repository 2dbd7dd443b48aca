// Type-tagged identifiers (`t1_abc123`) used to address things across endpoints.
use crate::core::error::{Error, ErrorKind};
use std::fmt;

pub const COMMENT_TAG: &str = "t1";
pub const ACCOUNT_TAG: &str = "t2";
pub const LINK_TAG: &str = "t3";
pub const MESSAGE_TAG: &str = "t4";
pub const SUBREDDIT_TAG: &str = "t5";

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Fullname {
    tag: String,
    id: String,
}

impl Fullname {
    pub fn new(tag: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: id.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, Error> {
        let Some((tag, id)) = raw.split_once('_') else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("fullname `{raw}` is missing a type tag")));
        };
        let tag_ok = tag.len() == 2
            && tag.starts_with('t')
            && tag[1..].chars().all(|c| c.is_ascii_digit());
        if !tag_ok || id.is_empty() {
            return Err(
                Error::new(ErrorKind::Usage).with_message(format!("invalid fullname `{raw}`"))
            );
        }
        Ok(Self::new(tag, id))
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Fullname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.tag, self.id)
    }
}

/// Strip `tag_` from `raw` when present; bare ids pass through.
pub fn strip_tag<'a>(raw: &'a str, tag: &str) -> &'a str {
    raw.strip_prefix(tag)
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(raw)
}
