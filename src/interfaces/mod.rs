// ============================================================================
// Interfaces Module
// Trait seams for every external collaborator, with in-memory reference
// implementations usable in tests and simulations
// ============================================================================

pub mod clock;
pub mod event_handler;
pub mod margin_protocol;
pub mod price_oracle;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event_handler::{
    EventHandler, LoggingEventHandler, NoOpEventHandler, OrderEvent, RecordingEventHandler,
};
pub use margin_protocol::{
    InMemoryMarginProtocol, Instruction, InstructionBatch, MarginProtocol, ProtocolError,
};
pub use price_oracle::{FixedRateOracle, OracleError, PriceOracle};
pub use token::{InMemoryLedger, LedgerCheckpoint, TokenError, TokenLedger};
