//! Browser bindings: DOM geometry, scrolling, scheduling, clipboard and the
//! exported `CellGrid` object.

mod clipboard;
mod grid;
mod host;
mod logger;
mod scheduler;

pub use clipboard::NavigatorClipboard;
pub use grid::CellGrid;
pub use host::{DomGeometry, DomHost, DomScrollContainer, SCROLL_MARKER};
pub use logger::install as install_logger;
pub use scheduler::BrowserScheduler;
