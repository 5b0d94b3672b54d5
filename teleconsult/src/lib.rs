pub use teleconsult_core::model::{ParticipantId, RoomId};

pub mod model {
    pub use teleconsult_core::model::*;
}

#[cfg(feature = "engine")]
pub mod engine {
    pub use teleconsult_engine::*;
}
