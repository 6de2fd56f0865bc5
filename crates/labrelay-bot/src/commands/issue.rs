//! `issue` sub-commands.

use labrelay_core::{escape_html, join_names};
use labrelay_gitlab::{GitlabApi, GitlabError, IssueStateEvent, NewIssue, Note, Page};
use tracing::debug;

use super::{optional_number, CommandContext, Reply};

const DEFAULT_COMMENT_COUNT: u32 = 5;
const MAX_COMMENT_COUNT: u32 = 100;
const NOT_FOUND: &str = "Issue or repository not found.";

/// Second-level verbs of the `issue` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueVerb {
    Read,
    Create,
    Close,
    Reopen,
    Comment,
    Comments,
}

impl IssueVerb {
    const NAMES: [(&'static str, IssueVerb); 10] = [
        ("read", IssueVerb::Read),
        ("show", IssueVerb::Read),
        ("view", IssueVerb::Read),
        ("create", IssueVerb::Create),
        ("open", IssueVerb::Create),
        ("close", IssueVerb::Close),
        ("reopen", IssueVerb::Reopen),
        ("comment", IssueVerb::Comment),
        ("comments", IssueVerb::Comments),
        ("read-comments", IssueVerb::Comments),
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, verb)| *verb)
    }
}

pub(crate) fn help(ctx: &CommandContext<'_>) -> Reply {
    let prefix = ctx.prefix();
    Reply::html(format!(
        "<pre>\n\
Usage: {prefix} issue &lt;command&gt; ...\n\
- read &lt;repo&gt; &lt;id&gt;                    - Show an issue. Aliases: show, view.\n\
- create &lt;repo&gt; &lt;title&gt;\\n[body]         - Create an issue. Alias: open.\n\
- close &lt;repo&gt; &lt;id&gt;                   - Close an issue.\n\
- reopen &lt;repo&gt; &lt;id&gt;                  - Reopen a closed issue.\n\
- comment &lt;repo&gt; &lt;id&gt; &lt;text&gt;          - Comment on an issue.\n\
- read-comments &lt;repo&gt; &lt;id&gt; [n] [page] - Read the comments of an issue. Alias: comments.\n\
</pre>"
    ))
}

fn unknown_issue_command(ctx: &CommandContext<'_>) -> Reply {
    Reply::html(format!(
        "Unknown issue command. Type <code>{} help issue</code> for help.",
        ctx.prefix()
    ))
}

/// Issue number as typed by the user: `7` or `#7`.
fn parse_iid(arg: &str) -> Option<u64> {
    arg.strip_prefix('#')
        .unwrap_or(arg)
        .parse::<u64>()
        .ok()
        .filter(|iid| *iid > 0)
}

/// `None` when the command succeeded silently.
pub(crate) async fn dispatch(ctx: &CommandContext<'_>, api: &dyn GitlabApi) -> Option<Reply> {
    let Some(name) = ctx.args.first() else {
        return Some(help(ctx));
    };
    let Some(verb) = IssueVerb::from_name(name) else {
        debug!(sub_verb = %name, "Unknown issue command");
        return Some(unknown_issue_command(ctx));
    };

    let ctx = ctx.shifted();
    match verb {
        IssueVerb::Read => Some(read(&ctx, api).await),
        IssueVerb::Create => create(&ctx, api).await,
        IssueVerb::Close => set_state(&ctx, api, IssueStateEvent::Close, "close").await,
        IssueVerb::Reopen => set_state(&ctx, api, IssueStateEvent::Reopen, "reopen").await,
        IssueVerb::Comment => comment(&ctx, api).await,
        IssueVerb::Comments => Some(comments(&ctx, api).await),
    }
}

/// Reply for a failed read: 404 gets its own message.
fn read_error(e: GitlabError) -> Reply {
    if e.is_not_found() {
        Reply::text(NOT_FOUND)
    } else {
        Reply::text(format!("An error occurred: {}", e))
    }
}

async fn read(ctx: &CommandContext<'_>, api: &dyn GitlabApi) -> Reply {
    let usage = || ctx.usage("issue read &lt;repo&gt; &lt;id&gt;");
    let [repo, id, ..] = ctx.args else {
        return usage();
    };
    let Some(iid) = parse_iid(id) else {
        return usage();
    };

    let issue = match api.get_issue(repo, iid).await {
        Ok(issue) => issue,
        Err(e) => return read_error(e),
    };

    let mut html = format!(
        "Issue #{} by {}: <a href='{}'>{}</a><br/>\n",
        issue.iid,
        escape_html(&issue.author.name),
        escape_html(&issue.web_url),
        escape_html(&issue.title)
    );
    let assignees: Vec<String> = issue
        .assignees
        .iter()
        .map(|assignee| escape_html(&assignee.name))
        .collect();
    if !assignees.is_empty() {
        html.push_str(&format!("Assigned to {}.<br/>\n", join_names(&assignees)));
    }
    if let Some(description) = issue.description.as_deref().map(str::trim) {
        if !description.is_empty() {
            html.push_str(&format!(
                "<blockquote>{}</blockquote>",
                escape_html(description).replace('\n', "<br/>")
            ));
        }
    }
    Reply::html(html)
}

async fn create(ctx: &CommandContext<'_>, api: &dyn GitlabApi) -> Option<Reply> {
    let [repo, title @ ..] = ctx.args else {
        return Some(ctx.usage("issue create &lt;repo&gt; &lt;title&gt;\\n[body]"));
    };
    if title.is_empty() {
        return Some(ctx.usage("issue create &lt;repo&gt; &lt;title&gt;\\n[body]"));
    }

    let issue = NewIssue {
        title: title.join(" "),
        description: ctx.body.join("\n"),
    };
    match api.create_issue(repo, &issue).await {
        Ok(_) => None,
        Err(e) => Some(Reply::text(format!("Failed to create issue: {}", e))),
    }
}

async fn set_state(
    ctx: &CommandContext<'_>,
    api: &dyn GitlabApi,
    event: IssueStateEvent,
    name: &str,
) -> Option<Reply> {
    let [repo, id, ..] = ctx.args else {
        return Some(ctx.usage(&format!("issue {} &lt;repo&gt; &lt;id&gt;", name)));
    };
    let Some(iid) = parse_iid(id) else {
        return Some(ctx.usage(&format!("issue {} &lt;repo&gt; &lt;id&gt;", name)));
    };

    match api.update_issue_state(repo, iid, event).await {
        Ok(_) => None,
        Err(e) if e.is_not_found() => Some(Reply::text(NOT_FOUND)),
        Err(e) => Some(Reply::text(format!("Failed to {} issue: {}", name, e))),
    }
}

async fn comment(ctx: &CommandContext<'_>, api: &dyn GitlabApi) -> Option<Reply> {
    let usage = || Some(ctx.usage("issue comment &lt;repo&gt; &lt;id&gt; &lt;text&gt;"));
    let [repo, id, inline @ ..] = ctx.args else {
        return usage();
    };
    let Some(iid) = parse_iid(id) else {
        return usage();
    };

    let mut body = inline.join(" ");
    for line in ctx.body {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(line);
    }
    if body.trim().is_empty() {
        return usage();
    }

    match api.create_issue_note(repo, iid, &body).await {
        Ok(_) => None,
        Err(e) if e.is_not_found() => Some(Reply::text(NOT_FOUND)),
        Err(e) => Some(Reply::text(format!("Failed to comment on issue: {}", e))),
    }
}

fn render_note(ctx: &CommandContext<'_>, note: &Note) -> String {
    format!(
        "<b>{}</b> at {}:<blockquote>{}</blockquote>",
        escape_html(&note.author.name),
        ctx.format_time(&note.created_at),
        escape_html(note.body.trim()).replace('\n', "<br/>")
    )
}

async fn comments(ctx: &CommandContext<'_>, api: &dyn GitlabApi) -> Reply {
    let usage = || ctx.usage("issue read-comments &lt;repo&gt; &lt;id&gt; [n] [page]");
    let [repo, id, ..] = ctx.args else {
        return usage();
    };
    let (Some(iid), Ok(count), Ok(page)) = (
        parse_iid(id),
        optional_number(ctx.args, 2, DEFAULT_COMMENT_COUNT),
        optional_number(ctx.args, 3, 1),
    ) else {
        return usage();
    };

    let notes = match api
        .list_issue_notes(repo, iid, Page::new(page, count.min(MAX_COMMENT_COUNT)))
        .await
    {
        Ok(notes) => notes,
        Err(e) => return read_error(e),
    };
    if notes.is_empty() {
        return Reply::text("No comments.");
    }

    // Newest first from the API, oldest first in the room.
    let blocks: Vec<String> = notes
        .iter()
        .rev()
        .map(|note| render_note(ctx, note))
        .collect();
    Reply::html(blocks.join("\n"))
}
