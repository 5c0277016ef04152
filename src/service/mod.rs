//! Service layer: business logic orchestration.
//!
//! Services check ownership, enforce naming rules, and keep the metadata
//! store and the on-disk trees in step. Handlers stay thin and only map
//! DTOs in and out.

pub mod library_service;
pub mod recycle_service;
pub mod share_service;
pub mod user_service;

pub use library_service::{Image, LibraryService};
pub use recycle_service::RecycleService;
pub use share_service::{ShareService, ShareSnapshots};
pub use user_service::UserService;
