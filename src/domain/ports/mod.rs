mod channel_transport_port;
mod message_service_port;
mod notification_port;

pub use channel_transport_port::{ChannelEvent, ChannelTransportPort, TypingSignal};
pub use message_service_port::{MessageServicePort, SendMessageRequest};
pub use notification_port::NotificationPort;
