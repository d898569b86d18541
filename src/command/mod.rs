//! Command dispatch for Gator.
//!
//! A [`CommandRegistry`] maps command names to boxed async handlers. It is
//! filled once at start-up and only read afterwards. Handlers that need a
//! logged-in user are wrapped with [`logged_in`], which resolves the session
//! user before the handler runs.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::config::Config;
use crate::db::User;
use crate::session::Session;
use crate::store::Store;
use crate::{GatorError, Result};

/// A parsed command line: the command name and its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name.
    pub name: String,
    /// Arguments after the name.
    pub args: Vec<String>,
}

impl Command {
    /// Create a command.
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a command from arguments (program name already removed).
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let name = args
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| GatorError::Usage("gator <command> [args...]".to_string()))?;
        Ok(Self {
            name,
            args: args.collect(),
        })
    }

    /// Required positional argument, or a usage error naming `usage`.
    pub fn arg(&self, index: usize, usage: &str) -> Result<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| GatorError::Usage(usage.to_string()))
    }
}

/// Everything a handler may touch.
pub struct State {
    /// Persistent storage.
    pub store: Arc<dyn Store>,
    /// Session (current user, database URL).
    pub session: Session,
    /// Application configuration.
    pub config: Config,
}

impl State {
    /// Create handler state.
    pub fn new(store: Arc<dyn Store>, session: Session, config: Config) -> Self {
        Self {
            store,
            session,
            config,
        }
    }
}

/// A registered command handler.
pub type Handler =
    Box<dyn for<'a> Fn(&'a mut State, &'a Command) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// Box a handler function or closure.
pub fn handler<F>(f: F) -> Handler
where
    F: for<'a> Fn(&'a mut State, &'a Command) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Wrap a handler that needs the logged-in user.
///
/// With no user in the session this fails with [`GatorError::NotLoggedIn`]
/// without touching the store. A user the store cannot resolve fails with
/// [`GatorError::UserLookup`]. Otherwise the wrapped handler runs with the
/// resolved [`User`].
pub fn logged_in<H>(inner: H) -> Handler
where
    H: for<'a> Fn(&'a mut State, &'a Command, User) -> BoxFuture<'a, Result<()>>
        + Send
        + Sync
        + 'static,
{
    let inner = Arc::new(inner);
    handler(move |state, cmd| {
        let inner = Arc::clone(&inner);
        async move {
            let name = state
                .session
                .current_user()
                .ok_or(GatorError::NotLoggedIn)?
                .to_string();

            let user = state
                .store
                .get_user(&name)
                .await
                .map_err(|e| GatorError::UserLookup(e.to_string()))?;

            (*inner)(state, cmd, user).await
        }
        .boxed()
    })
}

/// Name → handler map.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Handler>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in command.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("login", handler(handlers::login));
        registry.register("register", handler(handlers::register));
        registry.register("reset", handler(handlers::reset));
        registry.register("users", handler(handlers::users));
        registry.register("agg", handler(handlers::agg));
        registry.register("addfeed", logged_in(handlers::addfeed));
        registry.register("feeds", handler(handlers::feeds));
        registry.register("follow", logged_in(handlers::follow));
        registry.register("following", logged_in(handlers::following));
        registry.register("unfollow", logged_in(handlers::unfollow));
        registry.register("browse", logged_in(handlers::browse));
        registry
    }

    /// Register `handler` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, handler: Handler) {
        self.handlers.insert(name.into(), handler);
    }

    /// Whether a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Dispatch `cmd` to its handler.
    pub async fn run(&self, state: &mut State, cmd: &Command) -> Result<()> {
        let handler = self
            .handlers
            .get(&cmd.name)
            .ok_or_else(|| GatorError::CommandNotFound(cmd.name.clone()))?;

        debug!("Running command {} {:?}", cmd.name, cmd.args);
        handler(state, cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser};
    use crate::store::SqliteStore;

    async fn setup_state() -> State {
        let store = SqliteStore::new(Database::open_in_memory().await.unwrap());
        State::new(
            Arc::new(store),
            Session::in_memory("sqlite::memory:"),
            Config::default(),
        )
    }

    fn record_user<'a>(
        state: &'a mut State,
        _cmd: &'a Command,
        user: User,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            state.session.set_user(format!("seen:{}", user.name))?;
            Ok(())
        }
        .boxed()
    }

    #[test]
    fn test_from_args() {
        let cmd = Command::from_args(vec!["addfeed".to_string(), "A".into(), "B".into()]).unwrap();
        assert_eq!(cmd.name, "addfeed");
        assert_eq!(cmd.args, vec!["A", "B"]);
        assert_eq!(cmd.arg(1, "x").unwrap(), "B");
        assert!(matches!(cmd.arg(2, "x"), Err(GatorError::Usage(_))));
    }

    #[test]
    fn test_from_args_empty() {
        let err = Command::from_args(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, GatorError::Usage(_)));
    }

    #[test]
    fn test_defaults_registered() {
        let registry = CommandRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec![
                "addfeed",
                "agg",
                "browse",
                "feeds",
                "follow",
                "following",
                "login",
                "register",
                "reset",
                "unfollow",
                "users"
            ]
        );
    }

    #[test]
    fn test_contains() {
        let registry = CommandRegistry::with_defaults();
        assert!(registry.contains("browse"));
        assert!(!registry.contains("frobnicate"));
        assert!(!CommandRegistry::new().contains("browse"));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let mut state = setup_state().await;
        let registry = CommandRegistry::with_defaults();

        let err = registry
            .run(&mut state, &Command::new("frobnicate", Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, GatorError::CommandNotFound(ref name) if name == "frobnicate"));
    }

    #[tokio::test]
    async fn test_register_custom_closure() {
        let mut state = setup_state().await;
        let mut registry = CommandRegistry::new();
        registry.register(
            "whoami",
            handler(|state, cmd| {
                async move {
                    state.session.set_user(cmd.arg(0, "whoami <name>")?)?;
                    Ok(())
                }
                .boxed()
            }),
        );

        registry
            .run(&mut state, &Command::new("whoami", ["dave"]))
            .await
            .unwrap();
        assert_eq!(state.session.current_user(), Some("dave"));
    }

    #[tokio::test]
    async fn test_logged_in_requires_session_user() {
        let mut state = setup_state().await;
        let wrapped = logged_in(record_user);

        let err = wrapped(&mut state, &Command::new("x", Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, GatorError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_logged_in_unknown_user() {
        let mut state = setup_state().await;
        state.session.set_user("ghost").unwrap();
        let wrapped = logged_in(record_user);

        let err = wrapped(&mut state, &Command::new("x", Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, GatorError::UserLookup(_)));
    }

    #[tokio::test]
    async fn test_logged_in_injects_user() {
        let mut state = setup_state().await;
        state.store.create_user(NewUser::new("alice")).await.unwrap();
        state.session.set_user("alice").unwrap();
        let wrapped = logged_in(record_user);

        wrapped(&mut state, &Command::new("x", Vec::<String>::new()))
            .await
            .unwrap();
        assert_eq!(state.session.current_user(), Some("seen:alice"));
    }
}
