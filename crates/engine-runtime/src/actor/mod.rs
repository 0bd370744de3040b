#[allow(clippy::module_inception)]
pub mod actor;
pub mod messages;
pub mod progress;
pub mod spawn;

pub use actor::{Actor, ActorContext, ActorRef};
pub use progress::{ProgressActor, ProgressHandle};
pub use spawn::spawn_actor;
