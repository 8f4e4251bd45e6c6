pub mod auth;
pub mod events;
pub mod health;
pub mod messaging;
pub mod resources;
pub mod users;

pub use auth::*;
pub use events::*;
pub use health::*;
pub use messaging::*;
pub use resources::*;
pub use users::*;
