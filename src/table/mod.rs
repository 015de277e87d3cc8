mod actor;
pub mod broadcast;
pub mod command;
pub mod events;
pub mod fold;
pub mod instance;
pub mod seats;
pub mod spectator;
pub mod timers;
pub mod transport;

pub use command::{
    FastFoldHooks, ReseatCandidate, SeatPlayerRequest, SeatSummary, TableHandle, TableStatus,
};
pub use events::{ClientGameState, EgressEvent, IngressEvent};
pub use instance::TableInstance;
pub use transport::{ChannelTransport, ClientTransport};
