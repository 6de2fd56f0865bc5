//! Webhook event to room notification.
//!
//! Every renderer is a pure function returning the HTML body to send, or
//! `None` when the event is not worth a notification.

use labrelay_core::{escape_html, first_line, format_duration, pluralize};

use crate::events::{
    IssuePayload, MergeRequestPayload, NotePayload, PipelinePayload, Project, PushPayload,
    WebhookEvent, WikiPagePayload,
};

/// Pushes with more commits than this always use the itemized list.
pub const COMPACT_PUSH_LIMIT: u64 = 4;

/// Rendering switches taken from the `options` config section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Avoid list markup for small pushes so IRC bridges relay them inline.
    pub irc_compatibility: bool,
}

/// How the commit list of a push is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushLayout {
    /// Header and commits separated by line breaks.
    Compact,
    /// Header followed by a `<ul>` of commits.
    Itemized,
}

impl PushLayout {
    pub fn select(total_commits: u64, options: &RenderOptions) -> Self {
        if options.irc_compatibility && total_commits <= COMPACT_PUSH_LIMIT {
            PushLayout::Compact
        } else {
            PushLayout::Itemized
        }
    }
}

/// Renders `event` into an HTML notification.
pub fn render(event: &WebhookEvent, options: &RenderOptions) -> Option<String> {
    match event {
        WebhookEvent::Push(push) => Some(render_push(push, options)),
        WebhookEvent::Tag(tag) => render_tag(tag),
        WebhookEvent::Issue {
            payload,
            confidential,
        } => render_issue(payload, *confidential),
        WebhookEvent::MergeRequest(mr) => render_merge_request(mr),
        WebhookEvent::Comment {
            payload,
            confidential,
        } => render_comment(payload, *confidential),
        WebhookEvent::Pipeline(pipeline) => render_pipeline(pipeline),
        WebhookEvent::WikiPage(page) => render_wiki_page(page),
    }
}

/// `open` → `opened`, `close` → `closed`, `merge` → `merged`.
///
/// Only needs to hold for the fixed action vocabulary GitLab emits.
pub fn past_tense(action: &str) -> String {
    if action.ends_with('e') {
        format!("{}d", action)
    } else {
        format!("{}ed", action)
    }
}

fn project_label(project: &Project) -> String {
    format!(
        "{}/{}",
        escape_html(&project.namespace),
        escape_html(&project.name)
    )
}

/// First eight characters of a commit id, escaped.
fn short_sha(sha: &str) -> String {
    escape_html(&sha.chars().take(8).collect::<String>())
}

fn link(href: &str, text: &str) -> String {
    format!("<a href='{}'>{}</a>", escape_html(href), text)
}

fn render_push(push: &PushPayload, options: &RenderOptions) -> String {
    let branch = push.git_ref.trim_start_matches("refs/heads/");
    let tree_url = format!("{}/tree/{}", push.project.web_url, branch);
    let user = escape_html(&push.user_name);

    if push.total_commits_count == 0 {
        return format!(
            "[{}] {} force pushed to or deleted branch {}",
            project_label(&push.project),
            user,
            link(&tree_url, &escape_html(branch))
        );
    }

    let header = format!(
        "[{}] {} by {}",
        link(
            &tree_url,
            &format!("{}#{}", project_label(&push.project), escape_html(branch))
        ),
        pluralize(push.total_commits_count, "new commit"),
        user
    );

    let commits: Vec<String> = push
        .commits
        .iter()
        .rev()
        .map(|commit| {
            let (title, more) = first_line(&commit.message);
            format!(
                "{}{} ({})",
                escape_html(title),
                if more { " (...)" } else { "" },
                short_sha(&commit.id)
            )
        })
        .collect();

    match PushLayout::select(push.total_commits_count, options) {
        PushLayout::Compact => {
            // One event of at most five lines. Some IRC bridges still turn
            // multi-line events into a paste link.
            let mut message = header;
            for commit in &commits {
                message.push_str("<br/>");
                message.push_str(commit);
            }
            message
        }
        PushLayout::Itemized => {
            let items: String = commits
                .iter()
                .map(|commit| format!("<li>{}</li>", commit))
                .collect();
            format!("{}<ul>{}</ul>", header, items)
        }
    }
}

fn render_tag(tag: &PushPayload) -> Option<String> {
    if tag.object_kind != "tag_push" {
        return None;
    }
    let name = tag.git_ref.trim_start_matches("refs/tags/");
    let user = escape_html(&tag.user_name);

    let message = match tag.checkout_sha.as_deref().filter(|sha| !sha.is_empty()) {
        Some(sha) => format!(
            "[{}] {} created tag {} at commit {}",
            project_label(&tag.project),
            user,
            link(
                &format!("{}/tags/{}", tag.project.web_url, name),
                &escape_html(name)
            ),
            short_sha(sha)
        ),
        None => format!(
            "[{}] {} deleted tag {}",
            project_label(&tag.project),
            user,
            escape_html(name)
        ),
    };
    Some(message)
}

/// Past tense of a state change, or `None` for edits and empty actions.
fn state_change(action: &str) -> Option<String> {
    match action {
        "" | "update" => None,
        action => Some(past_tense(action)),
    }
}

fn render_issue(issue: &IssuePayload, confidential: bool) -> Option<String> {
    let attrs = &issue.object_attributes;
    let action = state_change(&attrs.action)?;
    Some(format!(
        "[{}] {} {} {}issue {}",
        project_label(&issue.project),
        escape_html(&issue.user.name),
        action,
        if confidential { "confidential " } else { "" },
        link(
            &attrs.url,
            &format!("{} (#{})", escape_html(&attrs.title), attrs.iid)
        )
    ))
}

fn render_merge_request(mr: &MergeRequestPayload) -> Option<String> {
    let attrs = &mr.object_attributes;
    let action = state_change(&attrs.action)?;
    Some(format!(
        "[{}] {} {} merge request {}",
        project_label(&mr.project),
        escape_html(&mr.user.name),
        action,
        link(
            &attrs.url,
            &format!("{} (!{})", escape_html(&attrs.title), attrs.iid)
        )
    ))
}

fn render_comment(note: &NotePayload, confidential: bool) -> Option<String> {
    let attrs = &note.object_attributes;
    let (kind, sigil, target) = match attrs.noteable_type.as_str() {
        "Issue" => ("issue", '#', note.issue.as_ref()?),
        "MergeRequest" => ("merge request", '!', note.merge_request.as_ref()?),
        _ => return None,
    };

    let mut message = format!(
        "[{}] {} {} on {}{} {} ({}{})",
        project_label(&note.project),
        escape_html(&note.user.name),
        link(&attrs.url, "commented"),
        if confidential { "confidential " } else { "" },
        kind,
        escape_html(&target.title),
        sigil,
        target.iid
    );
    let body = attrs.note.trim();
    if !body.is_empty() {
        message.push_str("<blockquote>");
        message.push_str(&escape_html(body).replace('\n', "<br/>"));
        message.push_str("</blockquote>");
    }
    Some(message)
}

fn render_pipeline(pipeline: &PipelinePayload) -> Option<String> {
    let attrs = &pipeline.object_attributes;
    let duration = || format_duration(attrs.duration.unwrap_or(0.0).max(0.0).round() as u64);
    let outcome = match attrs.status.as_str() {
        "pending" => "pending".to_string(),
        "running" => "started".to_string(),
        "success" => format!("successfully completed in {}", duration()),
        "failed" => format!("failed in {}", duration()),
        _ => return None,
    };

    let mut message = format!(
        "[{}] Pipeline {} on {} {} {}",
        project_label(&pipeline.project),
        attrs.id,
        if attrs.tag { "tag" } else { "branch" },
        escape_html(&attrs.git_ref),
        outcome
    );

    let finished = matches!(attrs.status.as_str(), "success" | "failed");
    if finished && !pipeline.builds.is_empty() {
        message.push_str("<ul>");
        for build in &pipeline.builds {
            message.push_str(&format!(
                "<li>{} - {}</li>",
                link(
                    &format!("{}/-/jobs/{}", pipeline.project.web_url, build.id),
                    &format!(
                        "{}:{} ({})",
                        escape_html(&build.name),
                        escape_html(&build.stage),
                        build.id
                    )
                ),
                escape_html(&build.status)
            ));
        }
        message.push_str("</ul>");
    }
    Some(message)
}

fn render_wiki_page(page: &WikiPagePayload) -> Option<String> {
    let attrs = &page.object_attributes;
    if attrs.action.is_empty() {
        return None;
    }
    Some(format!(
        "[{}] {} {} page on wiki {}",
        project_label(&page.project),
        escape_html(&page.user.name),
        past_tense(&attrs.action),
        link(&attrs.url, &escape_html(&attrs.title))
    ))
}
