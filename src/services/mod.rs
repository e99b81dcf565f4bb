/// Password gate and admin panel navigation.
pub mod auth;
/// Contact intake persistence and admin fan-out.
pub mod contact;

pub use auth::{AdminGate, CallbackEvent, ChatUser, TextEvent};
pub use contact::ContactService;
