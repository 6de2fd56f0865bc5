//! Account and bot commands: ping, server, login, logout, whoami, help.

use labrelay_core::escape_html;
use labrelay_gitlab::GitlabApi;

use super::{issue, CommandContext, Reply};
use crate::session::SessionResolver;

pub(crate) fn ping() -> Reply {
    Reply::text("Pong.")
}

pub(crate) fn server(ctx: &CommandContext<'_>) -> Reply {
    Reply::text(format!("I'm using the GitLab server at {}", ctx.domain))
}

pub(crate) async fn login(
    ctx: &CommandContext<'_>,
    sessions: &SessionResolver,
    logged_in: bool,
) -> Reply {
    if logged_in {
        return Reply::text("You're already logged in.");
    }
    let Some(token) = ctx.args.first() else {
        return ctx.usage("login &lt;access token&gt;");
    };
    Reply::text(sessions.login(ctx.sender, token).await)
}

pub(crate) fn logout(ctx: &CommandContext<'_>, sessions: &SessionResolver) -> Reply {
    sessions.logout(ctx.sender);
    Reply::text("Access token removed successfully.")
}

pub(crate) async fn whoami(ctx: &CommandContext<'_>, api: &dyn GitlabApi) -> Reply {
    match api.current_user().await {
        Ok(user) => Reply::html(format!(
            "You're logged into {} as <a href='{}/{}'>{}</a>",
            ctx.host,
            escape_html(ctx.domain),
            escape_html(&user.username),
            escape_html(&user.name)
        )),
        Err(e) => Reply::text(format!("Unexpected error: {}", e)),
    }
}

pub(crate) fn help(ctx: &CommandContext<'_>, logged_in: bool) -> Reply {
    let topic = ctx.args.first().map(|topic| topic.to_ascii_lowercase());
    if topic.as_deref() == Some("issue") {
        return issue::help(ctx);
    }

    let prefix = ctx.prefix();
    if logged_in {
        Reply::html(format!(
            "<pre>\n\
Commands are prefixed with {prefix}\n\
- ping                   - Ping the bot.\n\
- server                 - Get the server this bot uses.\n\
- show &lt;repo&gt; &lt;hash&gt;     - Get details about a specific commit.\n\
- diff &lt;repo&gt; &lt;hash&gt;     - Get the diff of a specific commit.\n\
- log &lt;repo&gt; [n] [page]  - Get the log of a specific repo.\n\
- issue &lt;command&gt; ...    - Manage issues. See <code>{prefix} help issue</code>.\n\
- whoami                 - Check who you're logged in as.\n\
- logout                 - Remove your GitLab access token from storage.\n\
- login &lt;token&gt;          - Add a GitLab access token to storage.\n\
- help [issue]           - Show this help page.\n\
</pre>"
        ))
    } else {
        Reply::html(format!(
            "<b>You're not logged in.</b><br/>\n\
<pre>\n\
Commands are prefixed with {prefix}\n\
- ping          - Ping the bot.\n\
- server        - Get the server this bot uses.\n\
- login &lt;token&gt; - Add a GitLab access token to storage.\n\
- help          - Show this help page.\n\
</pre>"
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::tests::{fixture, run};
    use crate::commands::Reply;
    use crate::testing::{user, MockGitlab};
    use labrelay_gitlab::GitlabError;

    #[tokio::test]
    async fn test_whoami() {
        let fixture = fixture(
            MockGitlab {
                user: Some(user("Jane Doe", "jane")),
                ..Default::default()
            },
            true,
        );
        assert_eq!(
            run(&fixture, "!gitlab whoami").await,
            Some(Reply::html(
                "You're logged into gitlab.example.org as \
                 <a href='https://gitlab.example.org/jane'>Jane Doe</a>"
            ))
        );
    }

    #[tokio::test]
    async fn test_whoami_error() {
        let fixture = fixture(
            MockGitlab {
                error: Some(|| GitlabError::Http("timed out".to_string())),
                ..Default::default()
            },
            true,
        );
        assert_eq!(
            run(&fixture, "!gitlab whoami").await,
            Some(Reply::text("Unexpected error: HTTP error: timed out"))
        );
    }

    #[tokio::test]
    async fn test_login_when_logged_in() {
        let fixture = fixture(MockGitlab::default(), true);
        assert_eq!(
            run(&fixture, "!gitlab login glpat-new").await,
            Some(Reply::text("You're already logged in."))
        );
        assert_eq!(fixture.factory.api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_login_and_logout_flow() {
        let fixture = fixture(
            MockGitlab {
                user: Some(user("Jane Doe", "jane")),
                ..Default::default()
            },
            false,
        );

        let reply = run(&fixture, "!gitlab login glpat-1").await.unwrap();
        assert_eq!(
            reply.body(),
            "Successfully logged into GitLab at gitlab.example.org as Jane Doe"
        );

        let reply = run(&fixture, "!gitlab logout").await.unwrap();
        assert_eq!(reply, Reply::text("Access token removed successfully."));

        let reply = run(&fixture, "!gitlab logout").await.unwrap();
        assert!(reply.body().starts_with("That command can only be used"));
    }

    #[tokio::test]
    async fn test_help_depends_on_login() {
        let logged_out = fixture(MockGitlab::default(), false);
        let reply = run(&logged_out, "!gitlab help").await.unwrap();
        assert!(reply.body().contains("You're not logged in."));
        assert!(!reply.body().contains("whoami"));

        let logged_in = fixture(MockGitlab::default(), true);
        let reply = run(&logged_in, "!gitlab help").await.unwrap();
        assert!(!reply.body().contains("You're not logged in."));
        assert!(reply.body().contains("show &lt;repo&gt; &lt;hash&gt;"));

        let reply = run(&logged_in, "!gitlab help issue").await.unwrap();
        assert!(reply.body().contains("read-comments"));
    }
}
