mod pointer;
mod scroll;

pub use pointer::{wire_input_handlers, InputWiring};
pub use scroll::{sync_scroll, wire_scroll_handler};
