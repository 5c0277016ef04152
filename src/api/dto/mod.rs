//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names follow the note client's wire format (`index_id`,
//! `kb_file_id`, ...). Every response is wrapped in [`ApiResponse`].

pub mod common_dto;
pub mod file_dto;
pub mod index_dto;
pub mod recycle_dto;
pub mod share_dto;
pub mod user_dto;

pub use common_dto::*;
pub use file_dto::*;
pub use index_dto::*;
pub use recycle_dto::*;
pub use share_dto::*;
pub use user_dto::*;
