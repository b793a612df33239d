mod call;
mod call_event;
mod media;

pub use call::*;
pub use call_event::*;
pub use media::*;
