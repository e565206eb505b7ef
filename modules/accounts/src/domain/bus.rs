//! Routes commands to the handler registered for their kind.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::domain::commands::{Command, CommandKind, CommandOutput};
use crate::domain::error::DomainError;
use crate::domain::handlers::CommandHandler;

pub struct CommandBus {
    handlers: HashMap<CommandKind, Arc<dyn CommandHandler>>,
}

#[derive(Default)]
pub struct CommandBusBuilder {
    handlers: HashMap<CommandKind, Arc<dyn CommandHandler>>,
}

impl CommandBusBuilder {
    /// Registers `handler` for every kind it declares. A later registration
    /// for the same kind replaces the earlier one.
    pub fn register(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        for kind in handler.kinds() {
            if self.handlers.insert(*kind, handler.clone()).is_some() {
                tracing::warn!(%kind, "command handler replaced");
            }
        }
        self
    }

    pub fn build(self) -> CommandBus {
        CommandBus {
            handlers: self.handlers,
        }
    }
}

impl CommandBus {
    pub fn builder() -> CommandBusBuilder {
        CommandBusBuilder::default()
    }

    pub fn handles(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Runs `command` on its handler and returns the handler's result as is.
    ///
    /// # Panics
    /// When no handler is registered for the command's kind; that is a wiring
    /// bug, not a runtime condition.
    #[instrument(name = "accounts.dispatch", skip_all, fields(kind = %command.kind()))]
    pub async fn dispatch(
        &self,
        cancel: &CancellationToken,
        command: Command,
    ) -> Result<CommandOutput, DomainError> {
        let kind = command.kind();
        let Some(handler) = self.handlers.get(&kind) else {
            panic!("no command handler registered for {kind}");
        };
        handler.handle(cancel, command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::id::Id;
    use crate::contract::model::NewClient;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recording {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CommandHandler for Recording {
        fn kinds(&self) -> &'static [CommandKind] {
            &[CommandKind::DeleteClient]
        }

        async fn handle(
            &self,
            _cancel: &CancellationToken,
            command: Command,
        ) -> Result<CommandOutput, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match command {
                Command::DeleteClient { id } => Err(DomainError::client_not_found(id)),
                _ => Ok(CommandOutput::None),
            }
        }
    }

    #[tokio::test]
    async fn dispatch_invokes_the_registered_handler_and_keeps_its_error() {
        let handler = Arc::new(Recording {
            calls: AtomicUsize::new(0),
        });
        let bus = CommandBus::builder().register(handler.clone()).build();
        assert!(bus.handles(CommandKind::DeleteClient));
        assert!(!bus.handles(CommandKind::CreateUser));

        let id = Id::new();
        let err = bus
            .dispatch(&CancellationToken::new(), Command::DeleteClient { id })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::ClientNotFound { id: got } if got == id));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "no command handler registered for create_client")]
    async fn dispatch_of_unregistered_kind_panics() {
        let bus = CommandBus::builder().build();
        let _ = bus
            .dispatch(
                &CancellationToken::new(),
                Command::CreateClient(NewClient {
                    name: "Acme".into(),
                }),
            )
            .await;
    }
}
