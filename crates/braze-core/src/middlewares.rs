//! Ready-made middlewares for the common matching patterns.
//!
//! Each constructor returns a [`Middleware`] that can be chained onto any
//! handler. Matchers that extract something record a typed match result in
//! the context bag under the `KEY_*` keys defined here, for later
//! middlewares and the terminal action to consume.
//!
//! # Example
//!
//! ```rust,ignore
//! engine
//!     .new_handler(&[EventName::MESSAGE])
//!     .use_middleware(middlewares::command(&["roll"]))
//!     .handle(|ctx: Arc<Context>| async move {
//!         let cmd = ctx.get::<CommandMatch>(middlewares::KEY_COMMAND).unwrap();
//!         let _ = ctx.reply(format!("rolling {:?}", cmd.args)).await;
//!     });
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use regex::Regex;
use tokio::time::Instant;

use crate::context::Context;
use crate::event::{EventField, EventName};
use crate::handler::Middleware;

/// Bag key for [`PrefixMatch`].
pub const KEY_PREFIX_MATCH: &str = "prefix_match";
/// Bag key for [`SuffixMatch`].
pub const KEY_SUFFIX_MATCH: &str = "suffix_match";
/// Bag key for [`KeywordHit`].
pub const KEY_KEYWORD: &str = "keyword";
/// Bag key for [`CommandMatch`].
pub const KEY_COMMAND: &str = "command";
/// Bag key for [`RegexMatch`].
pub const KEY_REGEX: &str = "regex_match";
/// Bag key for [`ShellCommand`].
#[cfg(feature = "command")]
pub const KEY_SHELL_COMMAND: &str = "shell_command";

/// Result of [`starts_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatch {
    pub prefix: String,
    pub remainder: String,
}

/// Result of [`ends_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixMatch {
    pub suffix: String,
    pub remainder: String,
}

/// Result of [`keyword`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordHit {
    pub keyword: String,
}

/// Result of [`command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatch {
    /// The configured prefix that introduced the command.
    pub prefix: String,
    pub name: String,
    /// Whitespace-split arguments.
    pub args: Vec<String>,
    /// Everything after the name, trimmed but not split.
    pub remainder: String,
}

/// Result of [`regex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexMatch {
    /// The whole matched text.
    pub matched: String,
    /// Capture groups in order; unmatched optional groups are empty.
    pub captures: Vec<String>,
}

/// Result of [`shell_command`], wrapping the clap-parsed options.
#[cfg(feature = "command")]
#[derive(Debug, Clone)]
pub struct ShellCommand<T>(pub T);

// =============================================================================
// Event shape
// =============================================================================

/// Passes only events carrying exactly this name. Tier matching is the
/// registry's job; this is a plain equality check.
pub fn on_event(name: EventName) -> Middleware {
    Middleware::check(move |ctx| ctx.event_name() == name)
}

/// Passes only events addressed to the bot itself.
pub fn only_to_me() -> Middleware {
    Middleware::check(|ctx| ctx.event().is_to_me())
}

/// Passes only events from the given session.
pub fn from_session(session_id: impl Into<String>) -> Middleware {
    let session_id = session_id.into();
    Middleware::check(move |ctx| ctx.event().session_id() == session_id)
}

/// Passes events sent by one of the given users. An empty slice passes any
/// event that carries a user id at all.
pub fn from_user(ids: &[i64]) -> Middleware {
    let ids = ids.to_vec();
    Middleware::check(move |ctx| {
        ctx.event()
            .field(EventField::UserId)
            .is_some_and(|id| ids.is_empty() || ids.contains(&id))
    })
}

/// Passes events coming from one of the given groups. An empty slice passes
/// any event that carries a group id.
pub fn from_group(ids: &[i64]) -> Middleware {
    let ids = ids.to_vec();
    Middleware::check(move |ctx| {
        ctx.event()
            .field(EventField::GroupId)
            .is_some_and(|id| ids.is_empty() || ids.contains(&id))
    })
}

/// Passes message events sent outside any group.
pub fn from_private() -> Middleware {
    Middleware::check(|ctx| {
        let event = ctx.event();
        event.is_message() && event.field(EventField::GroupId).is_none()
    })
}

/// Passes events sent by a configured superuser.
pub fn from_superuser() -> Middleware {
    Middleware::check(|ctx| {
        ctx.event()
            .field(EventField::UserId)
            .is_some_and(|id| ctx.config().superusers.contains(&id))
    })
}

// =============================================================================
// Rate limiting
// =============================================================================

/// Per-key call-frequency limiter.
///
/// Passes the first event for a key, then declines further events with the
/// same key until the cooldown elapses. A declined event may trigger the
/// [`FrequencyLimiter::on_limited`] callback (say, to tell the sender to
/// slow down). A zero cooldown passes everything.
///
/// # Example
///
/// ```rust,ignore
/// handler
///     .use_middleware(middlewares::command(&["fortune"]))
///     .use_middleware(
///         middlewares::FrequencyLimiter::per_session(Duration::from_secs(30))
///             .on_limited(|ctx: Arc<Context>| async move {
///                 let _ = ctx.reply("one fortune per 30s, be patient").await;
///             })
///             .into_middleware(),
///     );
/// ```
pub struct FrequencyLimiter {
    cooldown: Duration,
    key: Arc<dyn Fn(&Context) -> String + Send + Sync>,
    on_limited: Option<Arc<dyn Fn(Arc<Context>) -> BoxFuture<'static, ()> + Send + Sync>>,
}

impl FrequencyLimiter {
    /// Limits by an arbitrary key derived from the context.
    pub fn new<K>(cooldown: Duration, key: K) -> Self
    where
        K: Fn(&Context) -> String + Send + Sync + 'static,
    {
        Self {
            cooldown,
            key: Arc::new(key),
            on_limited: None,
        }
    }

    /// Limits per session, so every conversation gets its own cooldown.
    pub fn per_session(cooldown: Duration) -> Self {
        Self::new(cooldown, |ctx| ctx.event().session_id())
    }

    /// Sets the callback fired for each declined event.
    pub fn on_limited<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_limited = Some(Arc::new(move |ctx| Box::pin(callback(ctx))));
        self
    }

    /// Finishes the builder.
    pub fn into_middleware(self) -> Middleware {
        let Self {
            cooldown,
            key,
            on_limited,
        } = self;
        let last_pass: Arc<Mutex<HashMap<String, Instant>>> = Arc::default();

        Middleware::new(move |ctx: Arc<Context>| {
            let key = Arc::clone(&key);
            let on_limited = on_limited.clone();
            let last_pass = Arc::clone(&last_pass);
            async move {
                if cooldown.is_zero() {
                    return true;
                }
                let key = key(&ctx);
                let ready = {
                    let mut last_pass = last_pass.lock();
                    let now = Instant::now();
                    match last_pass.get(&key) {
                        Some(last) if now.duration_since(*last) < cooldown => false,
                        _ => {
                            last_pass.insert(key, now);
                            true
                        }
                    }
                };
                if !ready {
                    if let Some(callback) = &on_limited {
                        callback(Arc::clone(&ctx)).await;
                    }
                }
                ready
            }
        })
    }
}

impl From<FrequencyLimiter> for Middleware {
    fn from(limiter: FrequencyLimiter) -> Self {
        limiter.into_middleware()
    }
}

// =============================================================================
// Text matching
// =============================================================================

/// Passes message events starting with any of `prefixes`, recording a
/// [`PrefixMatch`] under [`KEY_PREFIX_MATCH`].
pub fn starts_with(prefixes: &[&str]) -> Middleware {
    let prefixes = owned(prefixes);
    Middleware::check(move |ctx| {
        let event = ctx.event();
        if !event.is_message() {
            return false;
        }
        let text = event.plain_text();
        for prefix in &prefixes {
            if let Some(remainder) = text.strip_prefix(prefix.as_str()) {
                ctx.set(
                    KEY_PREFIX_MATCH,
                    PrefixMatch {
                        prefix: prefix.clone(),
                        remainder: remainder.to_string(),
                    },
                );
                return true;
            }
        }
        false
    })
}

/// Passes message events ending with any of `suffixes`, recording a
/// [`SuffixMatch`] under [`KEY_SUFFIX_MATCH`].
pub fn ends_with(suffixes: &[&str]) -> Middleware {
    let suffixes = owned(suffixes);
    Middleware::check(move |ctx| {
        let event = ctx.event();
        if !event.is_message() {
            return false;
        }
        let text = event.plain_text();
        for suffix in &suffixes {
            if let Some(remainder) = text.strip_suffix(suffix.as_str()) {
                ctx.set(
                    KEY_SUFFIX_MATCH,
                    SuffixMatch {
                        suffix: suffix.clone(),
                        remainder: remainder.to_string(),
                    },
                );
                return true;
            }
        }
        false
    })
}

/// Passes message events whose whole text equals one of `candidates`.
pub fn full_match(candidates: &[&str]) -> Middleware {
    let candidates = owned(candidates);
    Middleware::check(move |ctx| {
        let event = ctx.event();
        event.is_message() && candidates.iter().any(|text| *text == event.plain_text())
    })
}

/// Passes message events containing any of `words`, recording the first hit
/// as a [`KeywordHit`] under [`KEY_KEYWORD`].
pub fn keyword(words: &[&str]) -> Middleware {
    let words = owned(words);
    Middleware::check(move |ctx| {
        let event = ctx.event();
        if !event.is_message() {
            return false;
        }
        let text = event.plain_text();
        for word in &words {
            if text.contains(word.as_str()) {
                ctx.set(KEY_KEYWORD, KeywordHit { keyword: word.clone() });
                return true;
            }
        }
        false
    })
}

/// Matches messages of the form `<prefix><name> [args...]`.
///
/// Prefixes come from the bot configuration. On a match a [`CommandMatch`]
/// is recorded under [`KEY_COMMAND`]. The name must end at a word boundary,
/// so `ping` does not match `/pingpong`.
pub fn command(names: &[&str]) -> Middleware {
    let names = owned(names);
    Middleware::check(move |ctx| {
        let event = ctx.event();
        if !event.is_message() {
            return false;
        }
        let text = event.plain_text();
        let text = text.trim_start();
        let Some((prefix, after_prefix)) = ctx
            .config()
            .command_prefixes
            .iter()
            .find_map(|prefix| Some((prefix.clone(), text.strip_prefix(prefix.as_str())?)))
        else {
            return false;
        };
        for name in &names {
            let Some(after_name) = after_prefix.strip_prefix(name.as_str()) else {
                continue;
            };
            if !after_name.is_empty() && !after_name.starts_with(char::is_whitespace) {
                continue;
            }
            let remainder = after_name.trim();
            ctx.set(
                KEY_COMMAND,
                CommandMatch {
                    prefix,
                    name: name.clone(),
                    args: remainder.split_whitespace().map(str::to_string).collect(),
                    remainder: remainder.to_string(),
                },
            );
            return true;
        }
        false
    })
}

/// Passes message events matching `pattern`, recording a [`RegexMatch`]
/// under [`KEY_REGEX`].
pub fn regex(pattern: Regex) -> Middleware {
    Middleware::check(move |ctx| {
        let event = ctx.event();
        if !event.is_message() {
            return false;
        }
        let text = event.plain_text();
        match pattern.captures(&text) {
            Some(captures) => {
                let matched = captures
                    .get(0)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                let groups: Vec<String> = captures
                    .iter()
                    .skip(1)
                    .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                ctx.set(
                    KEY_REGEX,
                    RegexMatch {
                        matched,
                        captures: groups,
                    },
                );
                true
            }
            None => false,
        }
    })
}

/// Like [`command`], but parses the remainder with shell-like quoting into a
/// clap command.
///
/// On success a [`ShellCommand`] wrapping the parsed options is recorded
/// under [`KEY_SHELL_COMMAND`], next to the [`CommandMatch`]. On a parse
/// failure (including `--help`) clap's rendered message is sent back to the
/// sender and the handler declines, leaving the event to others.
#[cfg(feature = "command")]
pub fn shell_command<T>(names: &[&str]) -> Middleware
where
    T: clap::Parser + Send + Sync + 'static,
{
    let matcher = command(names);
    Middleware::new(move |ctx: Arc<Context>| {
        let matcher = matcher.clone();
        async move {
            if !matcher.call(Arc::clone(&ctx)).await {
                return false;
            }
            let Some(matched) = ctx.get::<CommandMatch>(KEY_COMMAND) else {
                return false;
            };
            let mut argv = vec![matched.name.clone()];
            argv.extend(shell_split(&matched.remainder));
            match T::try_parse_from(&argv) {
                Ok(opts) => {
                    ctx.set(KEY_SHELL_COMMAND, ShellCommand(opts));
                    true
                }
                Err(error) => {
                    let _ = ctx.reply(error.to_string()).await;
                    false
                }
            }
        }
    })
}

/// Shell-like argument splitting.
///
/// Handles space-separated arguments, single and double quoted strings, and
/// backslash escapes within double quotes.
pub fn shell_split(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
            }
            ' ' | '\t' if !in_single_quote && !in_double_quote => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
