//! Commit commands: show, diff, log.

use std::sync::OnceLock;

use labrelay_core::{escape_html, first_line, pluralize, truncate_chars};
use labrelay_gitlab::{FileDiff, GitlabApi, Page};
use regex::Regex;

use super::{optional_number, CommandContext, Reply};

const DEFAULT_LOG_COUNT: u32 = 10;
const MAX_LOG_COUNT: u32 = 100;
const LOG_TITLE_WIDTH: usize = 80;
/// Room events are capped at 64 KiB, and each one carries the HTML plus a
/// plain-text copy.
const MAX_FILE_DIFF_BYTES: usize = 24 * 1024;

fn commit_url(ctx: &CommandContext<'_>, repo: &str, id: &str) -> String {
    escape_html(&format!("{}/{}/commit/{}", ctx.domain, repo, id))
}

pub(crate) async fn show(ctx: &CommandContext<'_>, api: &dyn GitlabApi) -> Reply {
    let [repo, sha, ..] = ctx.args else {
        return ctx.usage("show &lt;repo&gt; &lt;hash&gt;");
    };

    let commit = match api.get_commit(repo, sha).await {
        Ok(commit) => commit,
        Err(e) => return Reply::text(format!("An error occurred: {}", e)),
    };

    Reply::html(format!(
        "<a href='{}'>Commit {}</a> by {} at {}:<br/><blockquote>{}</blockquote>",
        commit_url(ctx, repo, &commit.id),
        escape_html(&commit.short_id),
        escape_html(&commit.author_name),
        ctx.format_time(&commit.committed_date),
        escape_html(commit.message.trim_end()).replace('\n', "<br/>")
    ))
}

/// Style of one line of a unified diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    /// `@@ -a,b +c,d @@`
    HunkHeader,
    /// `+++` / `---`
    FileHeader,
    Added,
    Removed,
    Context,
}

impl DiffLineKind {
    pub fn classify(line: &str) -> Self {
        if line.starts_with("@@") {
            DiffLineKind::HunkHeader
        } else if line.starts_with("+++") || line.starts_with("---") {
            DiffLineKind::FileHeader
        } else if line.starts_with('+') {
            DiffLineKind::Added
        } else if line.starts_with('-') {
            DiffLineKind::Removed
        } else {
            DiffLineKind::Context
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            DiffLineKind::HunkHeader => "#00A",
            DiffLineKind::FileHeader => "#000",
            DiffLineKind::Added => "#0A0",
            DiffLineKind::Removed => "#A00",
            DiffLineKind::Context => "#666",
        }
    }
}

fn hunk_location() -> &'static Regex {
    static HUNK: OnceLock<Regex> = OnceLock::new();
    HUNK.get_or_init(|| {
        Regex::new(r"^(@@ -\d+(?:,\d+)? \+\d+(?:,\d+)? @@)").expect("static regex")
    })
}

/// One colored line. Hunk headers only highlight the location; the rest of
/// the line is context.
fn render_diff_line(line: &str) -> String {
    let kind = DiffLineKind::classify(line);
    let escaped = escape_html(line);
    match kind {
        DiffLineKind::HunkHeader => {
            let highlighted = hunk_location().replace(
                &escaped,
                format!("<font color='{}'>$1</font>", kind.color()).as_str(),
            );
            format!(
                "<font color='{}'>{}</font>",
                DiffLineKind::Context.color(),
                highlighted
            )
        }
        _ => format!("<font color='{}'>{}</font>", kind.color(), escaped),
    }
}

/// One file's diff. Lines past [`MAX_FILE_DIFF_BYTES`] are cut and counted.
fn render_file_diff(file: &FileDiff) -> String {
    let header = format!("<b>{}</b><pre><code>", escape_html(&file.new_path));
    let total = file.diff.lines().count();
    let mut code = String::new();
    for (shown, line) in file.diff.lines().enumerate() {
        let rendered = render_diff_line(line);
        if header.len() + code.len() + rendered.len() > MAX_FILE_DIFF_BYTES {
            let omitted = pluralize((total - shown) as u64, "more line");
            code.push_str(&format!(
                "<font color='{}'>… {} not shown</font>\n",
                DiffLineKind::Context.color(),
                omitted
            ));
            break;
        }
        code.push_str(&rendered);
        code.push('\n');
    }
    if code.is_empty() {
        code.push('\n');
    }
    format!("{}{}</code></pre>", header, code)
}

pub(crate) async fn diff(ctx: &CommandContext<'_>, api: &dyn GitlabApi) -> Reply {
    let [repo, sha, ..] = ctx.args else {
        return ctx.usage("diff &lt;repo&gt; &lt;hash&gt;");
    };

    let files = match api.get_commit_diff(repo, sha).await {
        Ok(files) => files,
        Err(e) => return Reply::text(format!("An error occurred: {}", e)),
    };
    if files.is_empty() {
        return Reply::text(format!("Commit {} has no changes.", sha));
    }

    Reply::Many(
        files
            .iter()
            .map(|file| Reply::html(render_file_diff(file)))
            .collect(),
    )
}

/// Log line title: the first line, cut to width, marked when more follows.
fn log_title(message: &str) -> String {
    let (title, more) = first_line(message);
    let truncated = truncate_chars(title, LOG_TITLE_WIDTH);
    if truncated.len() == title.len() && more {
        format!("{} (…)", truncated)
    } else {
        truncated
    }
}

pub(crate) async fn log(ctx: &CommandContext<'_>, api: &dyn GitlabApi) -> Reply {
    let usage = || ctx.usage("log &lt;repo&gt; [n] [page]");
    let Some(repo) = ctx.args.first() else {
        return usage();
    };
    let (Ok(count), Ok(page)) = (
        optional_number(ctx.args, 1, DEFAULT_LOG_COUNT),
        optional_number(ctx.args, 2, 1),
    ) else {
        return usage();
    };

    let commits = match api
        .list_commits(repo, Page::new(page, count.min(MAX_LOG_COUNT)))
        .await
    {
        Ok(commits) => commits,
        Err(e) => return Reply::text(format!("An error occurred: {}", e)),
    };
    if commits.is_empty() {
        return Reply::text("No commits found.");
    }

    let lines: Vec<String> = commits
        .iter()
        .map(|commit| {
            format!(
                "<a href='{}'><font color='#AA0'>{}</font></a> {}",
                commit_url(ctx, repo, &commit.id),
                escape_html(&commit.short_id),
                escape_html(&log_title(&commit.message))
            )
        })
        .collect();
    Reply::html(lines.join("<br/>\n"))
}
