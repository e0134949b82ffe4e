//! Keyword Bot Example
//!
//! A small moderation bot driven by keyword filters. Each line read from
//! stdin is treated as a chat message in the form `author: text` and posted
//! to the group given on the command line.
//!
//! # Listeners
//!
//! ```text
//! priority  id      filter
//! -100      ban     "ban {{target}}"            (regex_find, admins only)
//!    0      mute    ANY of "mute {{target}} {{minutes}}" / "mute {{target}}" (admins only)
//!    0      greet   ANY of "hello" / "hi"        (declared as JSON)
//!  100      echo    "/echo {{text}}"            (regex_matches)
//! ```
//!
//! A processing interceptor drops everything posted by `spammer`, and a
//! global listener interceptor logs how long each listener took.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package keyword-bot -- --group lobby --admin alice
//! alice: ban mallory
//! bob: hello there
//! bob: /echo anyone home?
//! ```

use std::any::Any;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use warden::framework::FilterGroupSpec;
use warden::prelude::*;

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Parser)]
#[command(about = "Keyword moderation bot reading chat lines from stdin")]
struct Args {
    /// Configuration file (defaults to ./warden.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Group the messages are posted to.
    #[arg(long, default_value = "lobby")]
    group: String,

    /// Authors allowed to use moderation commands.
    #[arg(long = "admin", default_value = "alice")]
    admins: Vec<String>,
}

// ============================================================================
// Event
// ============================================================================

#[derive(Debug, Clone)]
struct ChatMessage {
    group: String,
    author: String,
    text: String,
}

impl ChatMessage {
    /// Parses `author: text`; lines without an author come from `anonymous`.
    fn parse(group: &str, line: &str) -> Self {
        let (author, text) = match line.split_once(':') {
            Some((author, text)) if !author.trim().is_empty() => (author.trim(), text.trim()),
            _ => ("anonymous", line.trim()),
        };
        Self {
            group: group.to_string(),
            author: author.to_string(),
            text: text.to_string(),
        }
    }
}

impl Event for ChatMessage {
    fn event_name(&self) -> &'static str {
        "chat_message"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn bot_id(&self) -> Option<&str> {
        Some("keyword-bot")
    }

    fn author_id(&self) -> Option<&str> {
        Some(&self.author)
    }

    fn group_id(&self) -> Option<&str> {
        Some(&self.group)
    }

    fn segments(&self) -> Vec<RichTextSegment> {
        vec![RichTextSegment::text(self.text.clone())]
    }
}

// ============================================================================
// Listeners
// ============================================================================

fn listeners(args: &Args) -> Result<Vec<Listener>> {
    let admins = args
        .admins
        .iter()
        .fold(TargetFilter::new(), |target, admin| target.author(admin.as_str()));

    let ban = Listener::builder("ban")
        .priority(Priority::HIGH)
        .filter(
            Filter::builder()
                .target(admins.clone())
                .value("ban {{target}}")
                .match_type(MatchType::RegexFind)
                .build()?,
        )
        .param(ParamDescriptor::string("target"))
        .handler(|args: BoundArgs| async move {
            format!("banned {}", args.get_str("target").unwrap_or_default())
        });

    let mute_for = Filter::builder()
        .target(admins.clone())
        .value("mute {{target}} {{minutes}}")
        .match_type(MatchType::RegexFind)
        .build()?;
    let mute_default = Filter::builder()
        .target(admins)
        .value("mute {{target}}")
        .match_type(MatchType::RegexFind)
        .build()?;
    let mute = Listener::builder("mute")
        .filter_group(
            FilterGroup::new(MultiMatchType::Any)
                .with(mute_for)
                .with(mute_default),
        )
        .param(ParamDescriptor::string("target"))
        .param(ParamDescriptor::parsed::<u32>("minutes").default_value(10_u32))
        .handler(|args: BoundArgs| async move {
            let target = args.get_str("target").unwrap_or_default().to_string();
            let minutes = args.get::<u32>("minutes").unwrap_or(10);
            format!("muted {target} for {minutes} minutes")
        });

    let greeting: FilterGroupSpec = serde_json::from_value(serde_json::json!({
        "match_type": "any",
        "filters": [
            { "value": "hello", "match_type": "contains", "case_sensitive": false },
            { "value": "hi", "match_type": "starts_with", "case_sensitive": false }
        ]
    }))?;
    let greet = Listener::builder("greet")
        .filter_group(greeting.build()?)
        .handler(|event: EventOf<ChatMessage>| async move {
            format!("hello, {}!", event.author)
        });

    let echo = Listener::builder("echo")
        .priority(Priority::LOW)
        .filter(
            Filter::builder()
                .value("/echo {{text}}")
                .match_type(MatchType::RegexMatches)
                .build()?,
        )
        .param(ParamDescriptor::string("text"))
        .handler(|args: BoundArgs| async move { args.get_str("text").map(str::to_string) });

    Ok(vec![ban, mute, greet, echo])
}

fn install_interceptors(runtime: &WardenRuntime) {
    runtime.add_processing_interceptor(
        processing_interceptor_fn(|ctx, next| async move {
            if ctx.event().author_id() == Some("spammer") {
                debug!("Dropping message from spammer");
                return Ok::<_, BoxError>(EventResults::empty());
            }
            Ok(next.proceed(ctx).await?)
        }),
        Priority::HIGHEST,
    );

    runtime.add_listener_interceptor(
        listener_interceptor_fn(|ctx, next| async move {
            let started = Instant::now();
            let id = ctx.listener_id().to_string();
            let result = next.proceed(ctx).await;
            debug!(listener = %id, elapsed = ?started.elapsed(), "Listener timed");
            Ok::<_, BoxError>(result)
        }),
        Priority::NORMAL,
    );
}

// ============================================================================
// Main
// ============================================================================

fn print_result(item: &ListenerResult) {
    match &item.result {
        EventResult::Value(value) => match value.downcast_ref::<String>() {
            Some(reply) => println!("[{}] {}", item.listener_id(), reply),
            None => println!("[{}] <{}>", item.listener_id(), value.type_name()),
        },
        EventResult::Error(err) => {
            warn!(listener = item.listener_id(), error = %err, "Listener failed")
        }
        EventResult::Empty | EventResult::Invalid => {}
    }
}

async fn read_chat(runtime: &WardenRuntime, group: &str) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let message = ChatMessage::parse(group, &line);

        let results = match runtime.dispatch(BoxedEvent::new(message)).await {
            Ok(results) => results,
            Err(err) => {
                warn!(error = %err, "Dispatch aborted");
                continue;
            }
        };
        for item in results.collect_all().await {
            print_result(&item);
        }
    }

    info!("Input closed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = WardenRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    let runtime = builder.build()?;

    runtime.register_listeners(listeners(&args)?);
    install_interceptors(&runtime);
    info!(listeners = runtime.listener_count(), group = %args.group, "Keyword bot ready");

    runtime
        .run_until(async {
            if let Err(e) = read_chat(&runtime, &args.group).await {
                warn!(error = %e, "Failed to read chat input");
            }
        })
        .await;

    Ok(())
}
