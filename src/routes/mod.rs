mod health_check;
mod subscribe;
mod subscriptions;
mod unsubscribe;

pub use health_check::health_check;
pub use subscribe::*;
pub use subscriptions::*;
pub use unsubscribe::*;
