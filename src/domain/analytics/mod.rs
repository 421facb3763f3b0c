//! Analytics value types shared by the engines, the session layer and the
//! persistence/broadcast collaborators.

pub mod collapse_field;
pub mod indicators;
pub mod session;
pub mod stream;
pub mod warmup;
pub mod z_grid;

pub use collapse_field::{
    CollapseFieldSnapshot, ConfidenceInterval, DealerSign, FieldPoint, ForwardProjection, Hazard,
    ImbalanceSource, Particle, PoolField,
};
pub use indicators::{BollingerBands, CloudPosition, IchimokuCloud, IchimokuValues, IndicatorSnapshot};
pub use session::{SessionSnapshot, SessionSummary};
pub use stream::{MessageKind, StreamMessage};
pub use warmup::WarmupState;
pub use z_grid::ZGrid;
