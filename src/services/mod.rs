pub mod activity_service;
pub mod image_service;
pub mod user_service;

pub use activity_service::{ActivityLogPage, ActivityLogParams, ActivityLogQuery, ActivityService};
pub use image_service::{ImageError, ImageService, ImageUpload};
pub use user_service::{EnsureUserOutcome, ProfileUpdate, StaffRole, UserService};
