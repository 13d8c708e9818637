//! Password-gated text commands for operating the pipeline from a chat.
//!
//! Commands accept either a `/` or a `!` prefix:
//! `auth <password>`, `status`, `pause <service>`, `resume <service>`, `help`.

use std::sync::Arc;

use {
    pixlive_state::{StateStore, keys},
    secrecy::{ExposeSecret, Secret},
    tracing::{info, warn},
};

use crate::manager::ServiceManager;

const HELP: &str = "Admin commands:\n\
/auth <password> - authenticate as admin\n\
/status - show analytics and services\n\
/pause <service> - pause a service\n\
/resume <service> - resume a service\n\
/help - show this message";

pub struct AdminConsole {
    state: Arc<StateStore>,
    services: Arc<ServiceManager>,
    password: Secret<String>,
}

impl AdminConsole {
    pub fn new(
        state: Arc<StateStore>,
        services: Arc<ServiceManager>,
        password: Secret<String>,
    ) -> Self {
        Self {
            state,
            services,
            password,
        }
    }

    /// Handle one message. Returns the reply, or `None` when the text is not a
    /// command.
    pub async fn handle(&self, user_id: i64, text: &str) -> Option<String> {
        let body = text.trim();
        let body = body.strip_prefix('/').or_else(|| body.strip_prefix('!'))?;
        let mut parts = body.split_whitespace();
        // `/status@MyBot` in group chats.
        let command = parts.next()?.split('@').next()?.to_lowercase();
        let arg = parts.next();

        let reply = match command.as_str() {
            "auth" => self.auth(user_id, arg).await,
            "help" | "start" => HELP.to_string(),
            "status" | "pause" | "resume" => {
                if !self.is_authorized(user_id).await {
                    return Some("Not authorized. Use /auth <password>".into());
                }
                match command.as_str() {
                    "status" => self.status().await,
                    "pause" => self.pause(arg).await,
                    _ => self.resume(arg).await,
                }
            },
            _ => "Unknown command. Use /help for available commands.".into(),
        };
        Some(reply)
    }

    async fn auth(&self, user_id: i64, password: Option<&str>) -> String {
        let Some(password) = password else {
            return "Usage: /auth <password>".into();
        };
        let expected = self.password.expose_secret();
        if expected.is_empty() || password != expected {
            warn!(user_id, "admin authentication failed");
            return "Wrong password".into();
        }

        let res = self
            .state
            .update(keys::AUTH_USERS, |cur| {
                let mut users: Vec<i64> = cur
                    .and_then(|v| v.as_array())
                    .map(|a| a.iter().filter_map(|u| u.as_i64()).collect())
                    .unwrap_or_default();
                if !users.contains(&user_id) {
                    users.push(user_id);
                }
                users.into()
            })
            .await;
        match res {
            Ok(_) => {
                info!(user_id, "admin authenticated");
                "Authenticated".into()
            },
            Err(e) => {
                warn!(user_id, error = %e, "failed to persist admin user");
                format!("Error: {e}")
            },
        }
    }

    async fn is_authorized(&self, user_id: i64) -> bool {
        self.state
            .get::<Vec<i64>>(keys::AUTH_USERS, Vec::new())
            .await
            .contains(&user_id)
    }

    async fn status(&self) -> String {
        let sent: i64 = self.state.get(keys::POSTS_SENT, 0).await;
        let mut out = format!("Posts sent: {sent}");
        let statuses = self.services.statuses().await;
        if !statuses.is_empty() {
            out.push_str("\nServices:");
            for s in statuses {
                let label = if s.paused { "PAUSED" } else { "RUNNING" };
                out.push_str(&format!("\n{}: {label}", s.name));
            }
        }
        out
    }

    async fn pause(&self, name: Option<&str>) -> String {
        let Some(name) = name else {
            return "Usage: /pause <service_name>".into();
        };
        if self.services.pause(name).await {
            format!("Paused: {name}")
        } else {
            format!("Service not found: {name}")
        }
    }

    async fn resume(&self, name: Option<&str>) -> String {
        let Some(name) = name else {
            return "Usage: /resume <service_name>".into();
        };
        if self.services.resume(name).await {
            format!("Resumed: {name}")
        } else {
            format!("Service not found: {name}")
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::manager::ServiceHandle};

    struct Startable;
    impl ServiceHandle for Startable {
        fn can_start(&self) -> bool {
            true
        }
    }

    async fn console(dir: &tempfile::TempDir) -> (AdminConsole, Arc<StateStore>) {
        let state = Arc::new(StateStore::open(dir.path().join("state.json")).await.unwrap());
        let services = Arc::new(ServiceManager::new());
        services
            .register("deviantart:alice", Arc::new(Startable))
            .await;
        let console = AdminConsole::new(
            Arc::clone(&state),
            services,
            Secret::new("hunter2".into()),
        );
        (console, state)
    }

    #[tokio::test]
    async fn non_commands_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (console, _) = console(&dir).await;
        assert_eq!(console.handle(1, "hello there").await, None);
        assert_eq!(console.handle(1, "/").await, None);
    }

    #[tokio::test]
    async fn commands_require_auth() {
        let dir = tempfile::tempdir().unwrap();
        let (console, _) = console(&dir).await;
        let reply = console.handle(1, "/status").await.unwrap();
        assert!(reply.starts_with("Not authorized"));
        let reply = console.handle(1, "!pause deviantart:alice").await.unwrap();
        assert!(reply.starts_with("Not authorized"));
    }

    #[tokio::test]
    async fn auth_persists_user() {
        let dir = tempfile::tempdir().unwrap();
        let (console, state) = console(&dir).await;

        assert_eq!(console.handle(7, "/auth nope").await.unwrap(), "Wrong password");
        assert_eq!(console.handle(7, "/auth").await.unwrap(), "Usage: /auth <password>");
        assert_eq!(console.handle(7, "/auth hunter2").await.unwrap(), "Authenticated");
        console.handle(7, "/auth hunter2").await;

        let users: Vec<i64> = state.get(keys::AUTH_USERS, Vec::new()).await;
        assert_eq!(users, vec![7]);
    }

    #[tokio::test]
    async fn status_pause_resume() {
        let dir = tempfile::tempdir().unwrap();
        let (console, state) = console(&dir).await;
        state.set(keys::POSTS_SENT, 12).await.unwrap();
        console.handle(7, "/auth hunter2").await;

        let status = console.handle(7, "/status").await.unwrap();
        assert!(status.contains("Posts sent: 12"));
        assert!(status.contains("deviantart:alice: RUNNING"));

        assert_eq!(
            console.handle(7, "!pause deviantart:alice").await.unwrap(),
            "Paused: deviantart:alice"
        );
        assert!(console.handle(7, "/status").await.unwrap().contains("PAUSED"));
        assert_eq!(
            console.handle(7, "/resume deviantart:alice").await.unwrap(),
            "Resumed: deviantart:alice"
        );
        assert_eq!(
            console.handle(7, "/pause ghost").await.unwrap(),
            "Service not found: ghost"
        );
        assert_eq!(
            console.handle(7, "/pause").await.unwrap(),
            "Usage: /pause <service_name>"
        );
    }

    #[tokio::test]
    async fn help_and_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let (console, _) = console(&dir).await;
        assert!(console.handle(1, "/help").await.unwrap().contains("/auth <password>"));
        assert!(console.handle(1, "/HELP@pixlive_bot").await.unwrap().contains("/status"));
        assert!(console.handle(1, "/frobnicate").await.unwrap().starts_with("Unknown command"));
    }
}
