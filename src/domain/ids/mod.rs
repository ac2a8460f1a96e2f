//! Protocol identifiers

mod direct_id;
mod party;
mod structured;
mod token;

pub use direct_id::DirectId;
pub use party::{Operator, OperatorId, PartyId, PartyRole, Provider, ProviderId};
pub use structured::{
    ContractId, ContractKind, EvseId, EvseKind, IdKind, ParkingId, ParkingKind, StructuredId,
    TariffId, TariffKind,
};
pub use token::{EmtId, TokenRepresentation, TokenSubType, TokenType};
