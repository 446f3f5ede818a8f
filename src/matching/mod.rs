//! Route resolution: turning a request into a key and a recorded response

mod key;
mod resolver;
mod sequencer;

pub use key::{AbsoluteUrl, PathAndQuery, RouteKey, RouteKeyStrategy, VaryHeaderAware};
pub use resolver::RouteResolver;
pub use sequencer::ResponseSequencer;
