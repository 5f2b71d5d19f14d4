pub mod attendance;
pub mod clock;
pub mod enrollment;
pub mod identity;
pub mod notifications;
pub mod store;
