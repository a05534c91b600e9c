pub mod gateway;
pub mod handler;
pub mod router;

mod msg_change_handler;
mod msg_cursor_handler;
mod msg_join_handler;
mod msg_leave_handler;
mod msg_ping_handler;

pub use gateway::{Attachment, Delivery, Gateway, Outbound};
pub use handler::websocket_handler;
pub use router::EventRouter;
