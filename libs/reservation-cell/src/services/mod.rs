pub mod availability;
pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod notify;
pub mod schedule;

pub use availability::AvailabilityService;
pub use booking::BookingService;
pub use conflict::ConflictService;
pub use lifecycle::CitaLifecycleService;
pub use notify::NotificationService;
