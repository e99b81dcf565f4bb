use crate::services::AdminGate;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

/// Thin teloxide endpoints that turn updates into gate events.
pub mod handlers;
/// Inline keyboards of the admin panel.
pub mod keyboards;
/// Outbound message abstraction over the Bot API.
pub mod transport;
/// Rendered texts of every bot reply.
pub mod views;

/// Supported bot commands.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Open the admin panel. Anything after the command, such as a deep-link payload, is ignored.
    #[allow(dead_code)]
    Start(String),
}

/// Result type returned by handlers.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Dispatcher tree: `/start`, any other text, inline buttons.
pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let messages = Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint(
            |msg: Message, cmd: Command, gate: AdminGate| async move {
                match cmd {
                    Command::Start(_) => handlers::start(msg, gate).await,
                }
            },
        ))
        .branch(dptree::endpoint(handlers::text));

    let callbacks = Update::filter_callback_query().endpoint(handlers::callback);

    dptree::entry().branch(messages).branch(callbacks)
}
