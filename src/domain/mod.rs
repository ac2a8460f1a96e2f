pub mod authorisation;
pub mod direct;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod ids;
pub mod status;

// Re-export commonly used types
pub use authorisation::RoamingAuthorisationInfo;
pub use direct::{
    BillingItem, ChargingLimits, ChargingPeriod, Currency, DirectOperation, DirectSession,
    DirectSessionState, MeterReading, ReleaseOutcome, SessionError, SessionTelemetry,
    StateOfCharge,
};
pub use endpoint::{EndpointRegistration, EndpointRole};
pub use error::{DomainError, DomainResult};
pub use ids::{
    ContractId, DirectId, EmtId, EvseId, OperatorId, ParkingId, ProviderId, TariffId,
    TokenRepresentation, TokenSubType, TokenType,
};
pub use status::{EvseMajorStatus, EvseMinorStatus, EvseStatus, ParkingStatus, ParkingStatusType};
