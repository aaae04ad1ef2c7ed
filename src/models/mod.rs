pub mod server_model;
pub mod view_model;
